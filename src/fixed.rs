//! Q16.16 encoding of transform matrices for the layer matrix registers.

use math::Mat3f;

/// The matrix registers hold 32-bit two's complement Q16.16 values.
const ONE: f32 = 65536.;

/// A matrix element is outside what Q16.16 can represent, or is NaN.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Overflow;

/// A transform quantized for the hardware, row-major.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedMatrix(pub [i32; 9]);

impl Default for FixedMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FixedMatrix {
    pub const IDENTITY: Self =
        FixedMatrix([0x1_0000, 0, 0, 0, 0x1_0000, 0, 0, 0, 0x1_0000]);

    /// Scales each element by 65536 and truncates toward zero.
    ///
    /// Elements outside `[-32768, 32768)` would wrap in the 32-bit register
    /// and are rejected instead.
    pub fn from_matrix(m: &Mat3f) -> Result<Self, Overflow> {
        let mut out = [0; 9];
        let rows = m.to_rows();
        for (o, &v) in out.iter_mut().zip(rows.iter().flatten()) {
            let scaled = v * ONE;
            // Also rejects NaN.
            if !(scaled >= i32::MIN as f32 && scaled < -(i32::MIN as f32)) {
                return Err(Overflow);
            }
            *o = scaled as i32;
        }
        Ok(FixedMatrix(out))
    }

    /// Register bit patterns, in register order.
    pub fn words(&self) -> [u32; 9] {
        let mut w = [0; 9];
        for (w, &v) in w.iter_mut().zip(self.0.iter()) {
            *w = v as u32;
        }
        w
    }

    /// Converts back to floating point, mostly for diagnostics.
    pub fn to_matrix(&self) -> Mat3f {
        let e = |i: usize| self.0[i] as f32 / ONE;
        Mat3f::from_rows([
            [e(0), e(1), e(2)],
            [e(3), e(4), e(5)],
            [e(6), e(7), e(8)],
        ])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl From<FixedMatrix> for Mat3f {
    fn from(m: FixedMatrix) -> Self {
        m.to_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::Matrix;

    #[test]
    fn identity_encodes_to_one() {
        let m = FixedMatrix::from_matrix(&Mat3f::identity()).unwrap();
        assert_eq!(m.0, [65536, 0, 0, 0, 65536, 0, 0, 0, 65536]);
        assert!(m.is_identity());
    }

    #[test]
    fn fractions_truncate_toward_zero() {
        let m = Mat3f::from_rows([
            [0.5, -0.5, 1.0 / 3.0],
            [-1.0 / 3.0, 2.25, -7.0],
            [0., 0., 1.],
        ]);
        let f = FixedMatrix::from_matrix(&m).unwrap();
        assert_eq!(
            f.0,
            [32768, -32768, 21845, -21845, 147456, -458752, 0, 0, 65536]
        );
        assert_eq!(f.words()[1], 0xFFFF_8000);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut m = Mat3f::identity();
        m.translate_by(40000., 0.);
        assert_eq!(FixedMatrix::from_matrix(&m), Err(Overflow));

        let mut m = Mat3f::identity();
        m.translate_by(-32768., 0.);
        assert!(FixedMatrix::from_matrix(&m).is_ok());

        let nan = Mat3f::from_rows([
            [f32::NAN, 0., 0.],
            [0., 1., 0.],
            [0., 0., 1.],
        ]);
        assert_eq!(FixedMatrix::from_matrix(&nan), Err(Overflow));
    }

    #[test]
    fn to_matrix_inverts_encoding() {
        let mut m = Mat3f::identity();
        m.translate_by(3.25, -12.5);
        m.scale_by(0.5, 2.);
        let back = FixedMatrix::from_matrix(&m).unwrap().to_matrix();
        assert_eq!(back, m);
    }
}
