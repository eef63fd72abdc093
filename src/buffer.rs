//! Surface descriptions.

use crate::area::Rect;
use crate::pixel::PixelFormat;

/// How a [`ColorKey`] range selects transparent pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyMode {
    /// Pixels whose color lies within `[min, max]` are transparent.
    Inside,
    /// Pixels whose color lies outside `[min, max]` are transparent.
    Outside,
}

/// A color range treated as transparent while compositing. Both bounds are
/// in the layer's own pixel format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorKey {
    pub min: u32,
    pub max: u32,
    pub mode: KeyMode,
}

impl ColorKey {
    /// Keys out exactly one color.
    pub const fn single(color: u32) -> Self {
        ColorKey {
            min: color,
            max: color,
            mode: KeyMode::Inside,
        }
    }
}

/// A pixel surface in memory.
///
/// `address` is a bus address as seen by the engine's DMA; zero means "no
/// surface". The driver never dereferences it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buffer {
    pub address: u32,
    pub format: PixelFormat,
    pub width: u16,
    pub height: u16,
    /// Bytes from one line to the next. Zero means lines are packed.
    pub stride: u32,
    /// Global alpha applied to the whole surface when it is a source.
    pub opacity: u8,
    pub color_key: Option<ColorKey>,
    /// Sample 2x2 neighbourhoods instead of the nearest pixel when
    /// transforming.
    pub high_quality: bool,
}

impl Buffer {
    /// A packed, fully opaque surface with no color key.
    pub const fn new(
        address: u32,
        format: PixelFormat,
        width: u16,
        height: u16,
    ) -> Self {
        Buffer {
            address,
            format,
            width,
            height,
            stride: 0,
            opacity: 0xFF,
            color_key: None,
            high_quality: false,
        }
    }

    pub const fn with_stride(self, stride: u32) -> Self {
        Buffer { stride, ..self }
    }

    pub const fn with_opacity(self, opacity: u8) -> Self {
        Buffer { opacity, ..self }
    }

    pub const fn with_color_key(self, key: ColorKey) -> Self {
        Buffer {
            color_key: Some(key),
            ..self
        }
    }

    pub const fn with_high_quality(self, high_quality: bool) -> Self {
        Buffer {
            high_quality,
            ..self
        }
    }

    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    /// Bytes from the start of one line to the start of the next.
    pub fn line_length(&self) -> u32 {
        if self.stride != 0 {
            self.stride
        } else {
            u32::from(self.width) * self.format.bytes_per_pixel()
        }
    }

    /// Bus address of the pixel at `(x, y)`. No bounds check; the result
    /// wraps around the 32-bit bus.
    pub fn pixel_address(&self, x: i32, y: i32) -> u32 {
        let row = (y as u32).wrapping_mul(self.line_length());
        let col = (x as u32).wrapping_mul(self.format.bytes_per_pixel());
        self.address.wrapping_add(row).wrapping_add(col)
    }

    /// The whole surface as a rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, i32::from(self.width), i32::from(self.height))
    }

    /// A view of the `clip` portion of this surface, sharing its lines.
    /// `clip` is clipped to the surface first. A view of a null surface is
    /// null.
    pub fn sub_buffer(&self, clip: &Rect) -> Option<Buffer> {
        let clip = self.bounds().intersect(clip)?;
        let address = if self.is_null() {
            0
        } else {
            self.pixel_address(clip.x, clip.y)
        };
        Some(Buffer {
            address,
            width: clip.w as u16,
            height: clip.h as u16,
            stride: self.line_length(),
            ..*self
        })
    }
}
