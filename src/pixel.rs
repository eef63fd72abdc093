//! Pixel formats understood by the layer DMA.

macro_rules! pixel_formats {
    ($($(#[$m:meta])* $name:ident = $code:expr, $bytes:expr, $a:expr;)*) => {
        /// Memory layout of one pixel.
        ///
        /// Names list components from the most significant bits down, so
        /// `Argb8888` keeps alpha in bits 31:24. The discriminant is the value
        /// of the layer format field.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum PixelFormat {
            $($(#[$m])* $name = $code,)*
        }

        impl PixelFormat {
            /// Every supported format, in code order.
            pub const ALL: &'static [PixelFormat] = &[$(PixelFormat::$name,)*];

            /// Bytes occupied by one pixel.
            pub const fn bytes_per_pixel(self) -> u32 {
                match self {
                    $(PixelFormat::$name => $bytes,)*
                }
            }

            /// Whether the format carries its own alpha channel.
            pub const fn has_alpha(self) -> bool {
                match self {
                    $(PixelFormat::$name => $a,)*
                }
            }

            /// Value written into the layer format field.
            pub const fn code(self) -> u32 {
                self as u32
            }
        }
    };
}

pixel_formats! {
    Abgr4444 = 0x00, 2, true;
    Bgra4444 = 0x01, 2, true;
    Argb4444 = 0x02, 2, true;
    Rgba4444 = 0x03, 2, true;
    Bgr565 = 0x04, 2, false;
    Rgb565 = 0x05, 2, false;
    Abgr8565 = 0x06, 3, true;
    Bgra5658 = 0x07, 3, true;
    Argb8565 = 0x08, 3, true;
    Rgba5658 = 0x09, 3, true;
    Abgr1555 = 0x0A, 2, true;
    Bgra5551 = 0x0B, 2, true;
    Argb1555 = 0x0C, 2, true;
    Rgba5551 = 0x0D, 2, true;
    Bgr888 = 0x0E, 3, false;
    Rgb888 = 0x0F, 3, false;
    Abgr8888 = 0x10, 4, true;
    Bgra8888 = 0x11, 4, true;
    Argb8888 = 0x12, 4, true;
    Rgba8888 = 0x13, 4, true;
    Xbgr8888 = 0x14, 4, false;
    Bgrx8888 = 0x15, 4, false;
    Xrgb8888 = 0x16, 4, false;
    Rgbx8888 = 0x17, 4, false;
    Xbgr4444 = 0x18, 2, false;
    Bgrx4444 = 0x19, 2, false;
    Xrgb4444 = 0x1A, 2, false;
    Rgbx4444 = 0x1B, 2, false;
    Xbgr1555 = 0x1C, 2, false;
    Bgrx5551 = 0x1D, 2, false;
    Xrgb1555 = 0x1E, 2, false;
    Rgbx5551 = 0x1F, 2, false;
    Xbgr8565 = 0x20, 3, false;
    Bgrx5658 = 0x21, 3, false;
    Xrgb8565 = 0x22, 3, false;
    Rgbx5658 = 0x23, 3, false;
    /// Alpha only; color comes from the layer's constant pixel.
    A8 = 0x24, 1, true;
    /// Luminance only.
    L8 = 0x25, 1, false;
    /// 4-bit alpha, 4-bit luminance.
    Al44 = 0x26, 1, true;
    Al88 = 0x27, 2, true;
    La88 = 0x28, 2, true;
    /// Luminance replicated into three bytes.
    L888 = 0x29, 3, false;
    Xl88 = 0x2A, 2, false;
    Argb8888Premul = 0x2B, 4, true;
    Argb8565Premul = 0x2C, 3, true;
    Argb4444Premul = 0x2D, 2, true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_sizes_sane() {
        for (i, f) in PixelFormat::ALL.iter().enumerate() {
            assert_eq!(f.code(), i as u32, "{:?}", f);
            assert!((1..=4).contains(&f.bytes_per_pixel()), "{:?}", f);
        }
    }

    #[test]
    fn spot_checks() {
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Argb8565.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Argb8888.bytes_per_pixel(), 4);
        assert!(PixelFormat::Argb8888.has_alpha());
        assert!(!PixelFormat::Xrgb8888.has_alpha());
    }
}
