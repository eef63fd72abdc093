//! Blit and blend entry points.
//!
//! Each entry point is a fixed recipe over the engine's layers:
//!
//! - Input 1 is the background: the target's own pixels read back, a
//!   constant, or nothing.
//! - Inputs 2 through 4 are sources, drawn over input 1 in order.
//! - The result layer is the part of the target that can change, so the
//!   engine never touches pixels a source can't reach.
//!
//! Source matrices are the inverse of the caller's transform, shifted so
//! that they map result pixels (not target pixels) to source pixels.

use math::{Mat3, Mat3f};

use crate::area::{get_area, Rect};
use crate::buffer::{Buffer, ColorKey};
use crate::engine::{Ppe, Transfer};
use crate::error::Error;
use crate::fixed::FixedMatrix;
use crate::imdc::{DecodeRange, Decompressor, DmaConfig};
use crate::layer::{
    Handshake, InputLayer, LayerSet, Polarity, ResultLayer, Window,
    INPUT_LAYERS,
};
use crate::regs::Bus;

/// Most sources one blend can take. Input 1 is always the background.
pub const MAX_SOURCES: usize = INPUT_LAYERS - 1;

/// How a single source is combined with the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlitMode {
    /// Source pixels replace target pixels.
    Bypass,
    /// Source is alpha-composited over the target.
    SrcOver,
    /// The source's footprint is filled with this ARGB8888 color and
    /// composited over the target. Source pixels are never read, so the
    /// source may have a null address; only its size and opacity count.
    ConstMask(u32),
}

/// What multi-source blends draw over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Background {
    /// The target's existing pixels. Only the union of the source
    /// footprints is processed.
    Destination,
    /// Transparent black. The whole target is processed, so every pixel
    /// no source covers ends up cleared.
    Transparent,
}

/// A source for [`Ppe::blend_multi`]: a surface and where it goes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlendLayer {
    pub buffer: Buffer,
    /// Source pixel to target pixel.
    pub matrix: Mat3f,
}

/// An untransformed source: the `clip` part of `buffer`, moved by `offset`.
/// Source pixel `(x, y)` lands on target pixel `(x + dx, y + dy)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layer {
    pub buffer: Buffer,
    pub clip: Rect,
    pub offset: (i32, i32),
}

impl Layer {
    /// All of `buffer`, drawn at `(x, y)`.
    pub fn at(buffer: Buffer, x: i32, y: i32) -> Self {
        Layer {
            clip: buffer.bounds(),
            buffer,
            offset: (x, y),
        }
    }

    /// The same placement as a general blend source, or `None` if the clip
    /// misses the buffer.
    pub fn blend_layer(&self) -> Option<BlendLayer> {
        let clip = self.buffer.bounds().intersect(&self.clip)?;
        let buffer = self.buffer.sub_buffer(&clip)?;
        let (dx, dy) = self.offset;
        let (x, y) = ((clip.x + dx) as f32, (clip.y + dy) as f32);
        Some(BlendLayer {
            buffer,
            matrix: Mat3::translate(x, y),
        })
    }
}

/// Up to [`MAX_SOURCES`] [`Layer`]s, bottom first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputList {
    layers: [Option<Layer>; MAX_SOURCES],
}

impl InputList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Layer) -> Result<(), Error> {
        let slot = self
            .layers
            .iter_mut()
            .find(|l| l.is_none())
            .ok_or(Error::TooManyLayers)?;
        *slot = Some(layer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().flatten()
    }
}

/// A decoded image streamed out of the decompressor's FIFO.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamSource {
    pub range: DecodeRange,
    pub dma: DmaConfig,
    /// Target position of the decoded region's top left pixel.
    pub x: i32,
    pub y: i32,
    pub opacity: u8,
    pub color_key: Option<ColorKey>,
}

impl StreamSource {
    pub fn new(range: DecodeRange, dma: DmaConfig, x: i32, y: i32) -> Self {
        StreamSource {
            range,
            dma,
            x,
            y,
            opacity: 0xFF,
            color_key: None,
        }
    }
}

fn invert(forward: &Mat3f) -> Result<Mat3f, Error> {
    forward.try_inverse().ok_or_else(|| {
        log::warn!("ppe: singular transform (det {})", forward.determinant());
        Error::InvalidMatrix
    })
}

/// Shifts `inverse` (target to source) to start at `origin` of the target,
/// and quantizes it.
fn local_matrix(
    inverse: &Mat3f,
    origin: &Rect,
) -> Result<FixedMatrix, Error> {
    let mut m = *inverse;
    m.translate_by(origin.x as f32, origin.y as f32);
    FixedMatrix::from_matrix(&m).map_err(|e| {
        log::warn!("ppe: transform exceeds Q16.16 range");
        Error::from(e)
    })
}

/// A constant `color` layer covering all of `area`.
fn fill_layer(color: u32, area: &Rect) -> InputLayer {
    let (w, h) = (area.w as u16, area.h as u16);
    let window = Window::full(w, h);
    InputLayer::constant(color, w, h, FixedMatrix::IDENTITY, window)
}

fn background_layer(
    target: &Buffer,
    area: &Rect,
    background: Background,
) -> InputLayer {
    match background {
        Background::Destination => InputLayer::background(target, area),
        Background::Transparent => fill_layer(0, area),
    }
}

fn check_endpoints(
    target: &Buffer,
    source: &Buffer,
    mode: BlitMode,
) -> Result<(), Error> {
    if target.is_null() {
        return Err(Error::NullTarget);
    }
    if source.is_null() && !matches!(mode, BlitMode::ConstMask(_)) {
        return Err(Error::NullSource);
    }
    Ok(())
}

/// The single-source recipe: source on input 2, background on input 1
/// unless bypassing, result over `area`.
fn single_source(
    target: &Buffer,
    source: &Buffer,
    inverse: &Mat3f,
    area: &Rect,
    mode: BlitMode,
) -> Result<LayerSet, Error> {
    let matrix = local_matrix(inverse, area)?;
    let window = Window::full(area.w as u16, area.h as u16);
    let src = match mode {
        BlitMode::ConstMask(color) => {
            let (w, h) = (source.width, source.height);
            InputLayer {
                opacity: source.opacity,
                ..InputLayer::constant(color, w, h, matrix, window)
            }
        }
        _ => InputLayer::from_buffer(source, matrix, window),
    };

    let mut set =
        LayerSet::new(ResultLayer::for_rect(target, area)).with_input(2, src);
    if mode != BlitMode::Bypass {
        set = set.with_input(1, InputLayer::background(target, area));
    }
    Ok(set)
}

/// `a * b / 255`, rounded.
fn mul_alpha(a: u8, b: u8) -> u8 {
    ((u32::from(a) * u32::from(b) + 127) / 255) as u8
}

impl<B: Bus> Ppe<B> {
    /// Draws `source` onto `target` through `forward`, which maps source
    /// pixels to target pixels.
    ///
    /// Only the part of the target the transformed source covers is
    /// processed. A source with zero opacity, or one that lands entirely
    /// off the target, succeeds without starting the engine.
    pub fn blit(
        &mut self,
        target: &Buffer,
        source: &Buffer,
        forward: &Mat3f,
        mode: BlitMode,
    ) -> Result<Transfer<'_, B>, Error> {
        check_endpoints(target, source, mode)?;
        if source.opacity == 0 {
            return Ok(Transfer::noop());
        }
        let inverse = invert(forward)?;
        let (w, h) = (target.width, target.height);
        let area = match get_area(&source.bounds(), forward, w, h) {
            Some(area) => area,
            None => return Ok(Transfer::noop()),
        };
        let set = single_source(target, source, &inverse, &area, mode)?;
        self.run(&set)
    }

    /// Like [`Ppe::blit`], but with the target-to-source matrix given
    /// directly and the target rectangle to process chosen by the caller.
    /// `rect` is clipped to the target.
    pub fn blit_inverse(
        &mut self,
        target: &Buffer,
        source: &Buffer,
        inverse: &Mat3f,
        rect: &Rect,
        mode: BlitMode,
    ) -> Result<Transfer<'_, B>, Error> {
        check_endpoints(target, source, mode)?;
        if source.opacity == 0 {
            return Ok(Transfer::noop());
        }
        let area = match target.bounds().intersect(rect) {
            Some(area) => area,
            None => return Ok(Transfer::noop()),
        };
        let set = single_source(target, source, inverse, &area, mode)?;
        self.run(&set)
    }

    /// Fills `rect` with ARGB8888 `color`, composited over the target.
    ///
    /// The color's alpha is scaled by the target's opacity. A fully opaque
    /// result skips reading the target back.
    pub fn mask(
        &mut self,
        target: &Buffer,
        rect: &Rect,
        color: u32,
    ) -> Result<Transfer<'_, B>, Error> {
        if target.is_null() {
            return Err(Error::NullTarget);
        }
        let alpha = mul_alpha((color >> 24) as u8, target.opacity);
        if alpha == 0 {
            return Ok(Transfer::noop());
        }
        let area = match target.bounds().intersect(rect) {
            Some(area) => area,
            None => return Ok(Transfer::noop()),
        };

        let color = u32::from(alpha) << 24 | color & 0x00FF_FFFF;
        let mut set = LayerSet::new(ResultLayer::for_rect(target, &area))
            .with_input(2, fill_layer(color, &area));
        if alpha != 0xFF {
            set = set.with_input(1, InputLayer::background(target, &area));
        }
        self.run(&set)
    }

    /// Composites up to three transformed sources over `background` in one
    /// pass. `layers[0]` is drawn first.
    ///
    /// Each source only contributes inside its own footprint. Over the
    /// destination, the processed area is the union of the footprints;
    /// over a transparent background it is the whole target.
    pub fn blend_multi(
        &mut self,
        target: &Buffer,
        layers: &[BlendLayer],
        background: Background,
    ) -> Result<Transfer<'_, B>, Error> {
        if target.is_null() {
            return Err(Error::NullTarget);
        }
        if layers.len() > MAX_SOURCES {
            return Err(Error::TooManyLayers);
        }
        self.blend(target, layers.iter().copied(), background)
    }

    /// [`Ppe::blend_multi`] for untransformed, clipped and offset sources.
    pub fn blend_list(
        &mut self,
        target: &Buffer,
        list: &InputList,
        background: Background,
    ) -> Result<Transfer<'_, B>, Error> {
        if target.is_null() {
            return Err(Error::NullTarget);
        }
        // Clipping rebases the address, so check before it does.
        if list.iter().any(|l| l.buffer.is_null()) {
            return Err(Error::NullSource);
        }
        let layers = list.iter().filter_map(Layer::blend_layer);
        self.blend(target, layers, background)
    }

    fn blend(
        &mut self,
        target: &Buffer,
        layers: impl Iterator<Item = BlendLayer>,
        background: Background,
    ) -> Result<Transfer<'_, B>, Error> {
        let mut placed: [Option<(BlendLayer, Mat3f, Rect)>; MAX_SOURCES] =
            [None; MAX_SOURCES];
        let mut count = 0;
        let mut union: Option<Rect> = None;
        let (w, h) = (target.width, target.height);

        for (i, layer) in layers.enumerate() {
            if i == MAX_SOURCES {
                return Err(Error::TooManyLayers);
            }
            if layer.buffer.is_null() {
                return Err(Error::NullSource);
            }
            let inverse = invert(&layer.matrix)?;
            if layer.buffer.opacity == 0 {
                continue;
            }
            let bounds = layer.buffer.bounds();
            if let Some(footprint) = get_area(&bounds, &layer.matrix, w, h) {
                union = Some(union.map_or(footprint, |u| u.union(&footprint)));
                placed[count] = Some((layer, inverse, footprint));
                count += 1;
            }
        }

        let area = match (background, union) {
            (Background::Transparent, _) => target.bounds(),
            (Background::Destination, Some(u)) => u,
            (Background::Destination, None) => return Ok(Transfer::noop()),
        };

        let mut set = LayerSet::new(ResultLayer::for_rect(target, &area))
            .with_input(1, background_layer(target, &area, background));
        for (i, &(layer, inverse, footprint)) in
            placed.iter().flatten().enumerate()
        {
            let matrix = local_matrix(&inverse, &area)?;
            let window =
                Window::from_rect(&footprint.translate(-area.x, -area.y));
            let src = InputLayer::from_buffer(&layer.buffer, matrix, window);
            set = set.with_input(i + 2, src);
        }
        self.run(&set)
    }

    /// Composites a region of a compressed image onto `target` at
    /// `(stream.x, stream.y)`, reading decoded pixels straight from the
    /// decompressor's FIFO.
    ///
    /// The decoded region must fit entirely inside the target, since the
    /// stream can't be clipped once it starts. The decoder is started only
    /// after everything else has been checked, just before the engine.
    /// Needs an engine with handshake support.
    pub fn blend_handshake<D: Decompressor>(
        &mut self,
        target: &Buffer,
        decoder: &mut D,
        image: &D::Image,
        stream: &StreamSource,
        background: Background,
    ) -> Result<Transfer<'_, B>, Error> {
        if !self.generation().has_handshake() {
            return Err(Error::Unsupported);
        }
        if target.is_null() {
            return Err(Error::NullTarget);
        }
        if stream.opacity == 0 {
            return Ok(Transfer::noop());
        }
        if stream.range.is_empty() {
            return Err(Error::InvalidRange);
        }
        let (w, h) = (stream.range.width(), stream.range.height());
        let area = Rect::new(stream.x, stream.y, i32::from(w), i32::from(h));
        if !target.bounds().contains(&area) {
            return Err(Error::InvalidRange);
        }

        let format = decoder.output_format(image);
        let src = InputLayer {
            address: decoder.tx_fifo_address(),
            width: w,
            height: h,
            line_length: u32::from(w) * format.bytes_per_pixel(),
            format,
            opacity: stream.opacity,
            color_key: stream.color_key,
            handshake: Some(Handshake {
                index: stream.dma.handshake,
                polarity: Polarity::ActiveHigh,
                burst_size_log: stream.dma.burst_size_log,
            }),
            window: Window::full(w, h),
            ..Default::default()
        };
        let set = LayerSet::new(ResultLayer::for_rect(target, &area))
            .with_input(1, background_layer(target, &area, background))
            .with_input(2, src);
        set.validate(self.generation())?;

        decoder.decode(image, &stream.range, &stream.dma)?;
        Ok(self.start(&set))
    }
}
