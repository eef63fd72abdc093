//! Logical layer configurations.
//!
//! An operation on the engine is fully described by a [`LayerSet`]: one
//! result layer and up to four input layers. The engine composes input 1 at
//! the bottom and inputs 2 through 4 over it in order, writing the result
//! layer.
//!
//! Everything here is plain data. [`crate::regs`] turns a validated set into
//! register writes.

use smart_default::SmartDefault;

use crate::area::Rect;
use crate::buffer::{Buffer, ColorKey};
use crate::engine::Generation;
use crate::error::Error;
use crate::fixed::FixedMatrix;
use crate::pixel::PixelFormat;

/// Number of input layers.
pub const INPUT_LAYERS: usize = 4;

/// Where an input layer's pixels come from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelSource {
    /// Read by DMA from the layer address.
    #[default]
    Memory,
    /// Every pixel inside the layer bounds is this ARGB8888 color.
    Constant(u32),
}

/// Source sampling when the layer is transformed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadMatrix {
    /// Nearest pixel.
    #[default]
    OneByOne,
    /// Filter over a 2x2 neighbourhood.
    TwoByTwo,
}

impl ReadMatrix {
    pub fn for_quality(high_quality: bool) -> Self {
        if high_quality {
            ReadMatrix::TwoByTwo
        } else {
            ReadMatrix::OneByOne
        }
    }
}

/// AXI burst length used by a layer's DMA.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Burst {
    Single = 0,
    Incr4 = 1,
    Incr8 = 2,
    #[default]
    Incr16 = 3,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

/// Hardware flow control between a peripheral FIFO and a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, SmartDefault)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handshake {
    /// Handshake line, `0..16`.
    pub index: u8,
    pub polarity: Polarity,
    /// log2 of the number of beats per request, `0..8`.
    #[default(4)]
    pub burst_size_log: u8,
}

impl Handshake {
    fn validate(&self) -> Result<(), Error> {
        if self.index < 16 && self.burst_size_log < 8 {
            Ok(())
        } else {
            Err(Error::InvalidRange)
        }
    }
}

/// The region of the result a layer contributes to, in result-layer
/// coordinates, half open: `[x_min, x_max) x [y_min, y_max)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Window {
    pub x_min: u16,
    pub y_min: u16,
    pub x_max: u16,
    pub y_max: u16,
}

impl Window {
    /// The whole of a `w` x `h` result.
    pub fn full(w: u16, h: u16) -> Self {
        Window {
            x_min: 0,
            y_min: 0,
            x_max: w,
            y_max: h,
        }
    }

    /// The window covering `r`, which must lie in non-negative coordinates.
    pub fn from_rect(r: &Rect) -> Self {
        Window {
            x_min: r.x as u16,
            y_min: r.y as u16,
            x_max: (r.x + r.w) as u16,
            y_max: (r.y + r.h) as u16,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }
}

/// One input layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, SmartDefault)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLayer {
    pub address: u32,
    pub width: u16,
    pub height: u16,
    /// Bytes per source line.
    pub line_length: u32,
    #[default(PixelFormat::Argb8888)]
    pub format: PixelFormat,
    pub source: PixelSource,
    /// Global alpha multiplied into every pixel.
    #[default(0xFF)]
    pub opacity: u8,
    pub color_key: Option<ColorKey>,
    pub read_matrix: ReadMatrix,
    pub burst: Burst,
    pub handshake: Option<Handshake>,
    pub window: Window,
    /// Result-pixel to source-pixel transform.
    pub matrix: FixedMatrix,
}

impl InputLayer {
    /// A layer reading `buf` through `matrix`, contributing inside `window`.
    pub fn from_buffer(
        buf: &Buffer,
        matrix: FixedMatrix,
        window: Window,
    ) -> Self {
        InputLayer {
            address: buf.address,
            width: buf.width,
            height: buf.height,
            line_length: buf.line_length(),
            format: buf.format,
            opacity: buf.opacity,
            color_key: buf.color_key,
            read_matrix: ReadMatrix::for_quality(buf.high_quality),
            matrix,
            window,
            ..Default::default()
        }
    }

    /// A `width` x `height` layer of solid ARGB8888 `color`.
    pub fn constant(
        color: u32,
        width: u16,
        height: u16,
        matrix: FixedMatrix,
        window: Window,
    ) -> Self {
        InputLayer {
            width,
            height,
            format: PixelFormat::Argb8888,
            source: PixelSource::Constant(color),
            matrix,
            window,
            ..Default::default()
        }
    }

    /// The part of `target` under `rect`, read back untransformed so the
    /// result can blend over existing content.
    pub fn background(target: &Buffer, rect: &Rect) -> Self {
        InputLayer {
            address: target.pixel_address(rect.x, rect.y),
            width: rect.w as u16,
            height: rect.h as u16,
            line_length: target.line_length(),
            format: target.format,
            window: Window::full(rect.w as u16, rect.h as u16),
            ..Default::default()
        }
    }

    fn validate(&self, generation: Generation) -> Result<(), Error> {
        if self.source == PixelSource::Memory && self.address == 0 {
            return Err(Error::NullSource);
        }
        if self.width == 0 || self.height == 0 || self.window.is_empty() {
            return Err(Error::InvalidRange);
        }
        if let Some(hs) = &self.handshake {
            if !generation.has_handshake() {
                return Err(Error::Unsupported);
            }
            hs.validate()?;
        }
        Ok(())
    }
}

/// The layer the engine writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, SmartDefault)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResultLayer {
    pub address: u32,
    pub width: u16,
    pub height: u16,
    pub line_length: u32,
    #[default(PixelFormat::Argb8888)]
    pub format: PixelFormat,
    pub burst: Burst,
    pub handshake: Option<Handshake>,
}

impl ResultLayer {
    /// The `rect` portion of `target`.
    pub fn for_rect(target: &Buffer, rect: &Rect) -> Self {
        ResultLayer {
            address: target.pixel_address(rect.x, rect.y),
            width: rect.w as u16,
            height: rect.h as u16,
            line_length: target.line_length(),
            format: target.format,
            ..Default::default()
        }
    }

    fn validate(&self, generation: Generation) -> Result<(), Error> {
        if self.address == 0 {
            return Err(Error::NullTarget);
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidRange);
        }
        if let Some(hs) = &self.handshake {
            if !generation.has_handshake() {
                return Err(Error::Unsupported);
            }
            hs.validate()?;
        }
        Ok(())
    }
}

/// Multi-frame continuation settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reload {
    /// Re-arm from the shadow registers when a frame completes.
    pub auto_reload: bool,
    /// Address of the next linked-list item to load when this one finishes.
    pub linked_list: Option<u32>,
}

/// Everything the engine needs for one operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerSet {
    pub result: ResultLayer,
    /// Inputs 1 through 4. `None` disables the layer.
    pub inputs: [Option<InputLayer>; INPUT_LAYERS],
    pub reload: Reload,
}

impl LayerSet {
    pub fn new(result: ResultLayer) -> Self {
        LayerSet {
            result,
            ..Default::default()
        }
    }

    /// Sets input `n` (1-based, matching the hardware naming).
    ///
    /// # Panics
    ///
    /// If `n` is not in `1..=INPUT_LAYERS`.
    pub fn with_input(mut self, n: usize, layer: InputLayer) -> Self {
        assert!((1..=INPUT_LAYERS).contains(&n), "no input layer {}", n);
        self.inputs[n - 1] = Some(layer);
        self
    }

    /// Bitmask of enabled layers: bit 0 is the result, bit `n` is input `n`.
    pub fn enable_mask(&self) -> u32 {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_some())
            .fold(1, |m, (i, _)| m | 1 << (i + 1))
    }

    /// Checks the set against what `generation` can do. A set that passes
    /// can be programmed without further checks.
    pub fn validate(&self, generation: Generation) -> Result<(), Error> {
        self.result.validate(generation)?;
        for layer in self.inputs.iter().flatten() {
            layer.validate(generation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Buffer {
        Buffer::new(0x6000_0000, PixelFormat::Rgb565, 480, 272)
    }

    #[test]
    fn defaults() {
        let l = InputLayer::default();
        assert_eq!(l.opacity, 0xFF);
        assert_eq!(l.burst, Burst::Incr16);
        assert!(l.matrix.is_identity());
        assert_eq!(Handshake::default().burst_size_log, 4);
    }

    #[test]
    fn background_and_result_share_origin() {
        let r = Rect::new(10, 20, 30, 40);
        let bg = InputLayer::background(&target(), &r);
        let out = ResultLayer::for_rect(&target(), &r);
        assert_eq!(bg.address, out.address);
        assert_eq!(out.address, 0x6000_0000 + 20 * 960 + 20);
        assert_eq!(bg.window, Window::full(30, 40));
    }

    #[test]
    fn enable_mask_tracks_inputs() {
        let r = Rect::new(0, 0, 8, 8);
        let set = LayerSet::new(ResultLayer::for_rect(&target(), &r))
            .with_input(2, InputLayer::background(&target(), &r));
        assert_eq!(set.enable_mask(), 0b101);
    }

    #[test]
    fn validation() {
        let g = Generation::PpeV2;
        let r = Rect::new(0, 0, 8, 8);
        let good = LayerSet::new(ResultLayer::for_rect(&target(), &r))
            .with_input(1, InputLayer::background(&target(), &r));
        assert_eq!(good.validate(g), Ok(()));

        let mut bad = good;
        bad.result.address = 0;
        assert_eq!(bad.validate(g), Err(Error::NullTarget));

        let mut bad = good;
        bad.inputs[0].as_mut().unwrap().address = 0;
        assert_eq!(bad.validate(g), Err(Error::NullSource));

        // Constant layers need no address.
        let mut ok = good;
        let fill = InputLayer::constant(
            0,
            8,
            8,
            FixedMatrix::IDENTITY,
            Window::full(8, 8),
        );
        ok.inputs[0] = Some(fill);
        assert_eq!(ok.validate(g), Ok(()));

        let mut bad = good;
        bad.inputs[0].as_mut().unwrap().window.x_max = 0;
        assert_eq!(bad.validate(g), Err(Error::InvalidRange));

        let mut bad = good;
        bad.inputs[0].as_mut().unwrap().handshake = Some(Handshake {
            index: 16,
            ..Default::default()
        });
        assert_eq!(bad.validate(g), Err(Error::InvalidRange));

        let mut v1 = good;
        v1.inputs[0].as_mut().unwrap().handshake = Some(Handshake::default());
        assert_eq!(v1.validate(Generation::Ppe), Err(Error::Unsupported));
        assert_eq!(v1.validate(Generation::PpeV2), Ok(()));
    }

    #[test]
    fn inputs_are_numbered_from_one() {
        let r = Rect::new(0, 0, 8, 8);
        let bg = InputLayer::background(&target(), &r);
        let set = LayerSet::new(ResultLayer::for_rect(&target(), &r))
            .with_input(1, bg)
            .with_input(INPUT_LAYERS, bg);
        assert_eq!(set.enable_mask(), 0b10011);
    }

    #[test]
    #[should_panic(expected = "no input layer 0")]
    fn input_zero_panics() {
        let r = Rect::new(0, 0, 8, 8);
        let bg = InputLayer::background(&target(), &r);
        let _ = LayerSet::new(ResultLayer::for_rect(&target(), &r))
            .with_input(0, bg);
    }

    #[test]
    #[should_panic(expected = "no input layer 5")]
    fn input_past_last_panics() {
        let r = Rect::new(0, 0, 8, 8);
        let bg = InputLayer::background(&target(), &r);
        let _ = LayerSet::new(ResultLayer::for_rect(&target(), &r))
            .with_input(INPUT_LAYERS + 1, bg);
    }
}
