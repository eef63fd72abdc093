//! Angle to (sine, cosine) strategies.
//!
//! The engine firmware rotates using a quarter-wave table with one entry per
//! whole degree. Matching its output bit for bit means using [`SineTable`];
//! host tools that would rather have accurate trig can use [`Libm`].

/// Source of sine and cosine for rotation matrices. Angles are in degrees.
pub trait SinCos {
    fn sin_cos(&self, degrees: f32) -> (f32, f32);
}

/// `round(32767 * sin(d))` for each whole degree `d` in `0..=90`.
pub static SINE_TABLE: [i16; 91] = [
    0, 572, 1144, 1715, 2286, 2856, 3425, 3993, 4560, 5126, //
    5690, 6252, 6813, 7371, 7927, 8481, 9032, 9580, 10126, 10668, //
    11207, 11743, 12275, 12803, 13328, 13848, 14364, 14876, 15383, 15886, //
    16383, 16876, 17364, 17846, 18323, 18794, 19260, 19720, 20173, 20621, //
    21062, 21497, 21925, 22347, 22762, 23170, 23571, 23964, 24351, 24730, //
    25101, 25465, 25821, 26169, 26509, 26841, 27165, 27481, 27788, 28087, //
    28377, 28659, 28932, 29196, 29451, 29697, 29934, 30162, 30381, 30591, //
    30791, 30982, 31163, 31335, 31498, 31650, 31794, 31927, 32051, 32165, //
    32269, 32364, 32448, 32523, 32587, 32642, 32687, 32722, 32747, 32762, //
    32767,
];

/// Quarter-wave lookup with quadrant reflection. Fractional degrees are
/// truncated toward zero, as the firmware's integer cast does.
#[derive(Copy, Clone, Debug, Default)]
pub struct SineTable;

impl SineTable {
    /// Sine of a whole number of degrees, as the raw table value scaled by
    /// 32767.
    pub fn sin_raw(self, degrees: i32) -> i32 {
        let d = degrees.rem_euclid(360) as usize;
        match d {
            0..=90 => i32::from(SINE_TABLE[d]),
            91..=180 => i32::from(SINE_TABLE[180 - d]),
            181..=270 => -i32::from(SINE_TABLE[d - 180]),
            _ => -i32::from(SINE_TABLE[360 - d]),
        }
    }

    pub fn sin_cos_deg(self, degrees: i32) -> (f32, f32) {
        let sin = self.sin_raw(degrees);
        let cos = self.sin_raw(degrees.wrapping_add(90));
        (sin as f32 / 32767., cos as f32 / 32767.)
    }
}

impl SinCos for SineTable {
    fn sin_cos(&self, degrees: f32) -> (f32, f32) {
        self.sin_cos_deg(degrees as i32)
    }
}

/// Full-precision trig from `libm`. Does not match firmware output.
#[derive(Copy, Clone, Debug, Default)]
pub struct Libm;

impl SinCos for Libm {
    fn sin_cos(&self, degrees: f32) -> (f32, f32) {
        let r = degrees * (core::f32::consts::PI / 180.);
        (libm::sinf(r), libm::cosf(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_symmetry() {
        let t = SineTable;
        for d in 0..=90 {
            let s = t.sin_raw(d);
            assert_eq!(t.sin_raw(180 - d), s);
            assert_eq!(t.sin_raw(180 + d), -s);
            assert_eq!(t.sin_raw(360 - d), -s);
            assert_eq!(t.sin_raw(d - 360), s);
        }
    }

    #[test]
    fn cardinal_angles() {
        let t = SineTable;
        assert_eq!(t.sin_cos_deg(0), (0., 1.));
        assert_eq!(t.sin_cos_deg(90), (1., 0.));
        assert_eq!(t.sin_cos_deg(180), (0., -1.));
        assert_eq!(t.sin_cos_deg(270), (-1., 0.));
        assert_eq!(t.sin_cos_deg(-90), (-1., 0.));
    }

    #[test]
    fn table_tracks_libm() {
        for d in -360..=360 {
            let (ts, tc) = SineTable.sin_cos(d as f32);
            let (ls, lc) = Libm.sin_cos(d as f32);
            assert!((ts - ls).abs() < 1e-4, "sin({})", d);
            assert!((tc - lc).abs() < 1e-4, "cos({})", d);
        }
    }

    #[test]
    fn fractional_degrees_truncate() {
        assert_eq!(SineTable.sin_cos(30.9), SineTable.sin_cos_deg(30));
    }
}
