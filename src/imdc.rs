//! The image decompressor (IMDC) as seen from the engine.
//!
//! The decompressor streams decoded pixels into its TX FIFO, and the engine
//! can read that FIFO directly as an input layer with a DMA handshake
//! pacing the two (see [`crate::Ppe::blend_handshake`]). Driving the
//! decompressor itself belongs to its own driver; this module only names the
//! operations the engine side needs.

use crate::pixel::PixelFormat;

/// The region of a compressed image to decode, in image pixels. Both ends
/// are exclusive: lines `start_line..end_line`, columns
/// `start_column..end_column`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeRange {
    pub start_line: u16,
    pub end_line: u16,
    pub start_column: u16,
    pub end_column: u16,
}

impl DecodeRange {
    /// The whole of a `width` x `height` image.
    pub fn full(width: u16, height: u16) -> Self {
        DecodeRange {
            start_line: 0,
            end_line: height,
            start_column: 0,
            end_column: width,
        }
    }

    pub fn width(&self) -> u16 {
        self.end_column.saturating_sub(self.start_column)
    }

    pub fn height(&self) -> u16 {
        self.end_line.saturating_sub(self.start_line)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// The DMA channel feeding the decompressor, and the handshake it shares
/// with the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    pub channel: u8,
    /// Handshake line between the decompressor FIFO and the engine.
    pub handshake: u8,
    /// log2 of the beats moved per handshake request.
    pub burst_size_log: u8,
}

/// The decompressor refused to start.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeError;

/// What the engine needs from a decompressor driver.
pub trait Decompressor {
    /// A compressed image as the driver describes it (header plus data).
    type Image: ?Sized;

    /// Bus address of the TX FIFO register the decoded pixels appear at.
    fn tx_fifo_address(&self) -> u32;

    /// Pixel format of the decoded stream for `image`.
    fn output_format(&self, image: &Self::Image) -> PixelFormat;

    /// Starts decoding `range` of `image` into the TX FIFO, fed by `dma`.
    /// Returns as soon as the decoder is running.
    fn decode(
        &mut self,
        image: &Self::Image,
        range: &DecodeRange,
        dma: &DmaConfig,
    ) -> Result<(), DecodeError>;

    /// Address of the compressed data for `line` of `image`, from the
    /// image's line table.
    fn line_address(&self, image: &Self::Image, line: u16) -> Option<u32>;
}
