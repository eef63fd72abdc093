//! Projective transform from four point correspondences.

use crate::{Mat3, Mat3f, Vec2f};

/// Pivots smaller than this are treated as zero.
pub const PIVOT_EPSILON: f32 = 1.19e-7;

/// The point configuration does not determine a unique transform (three or
/// more points collinear, or repeated points).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Singular;

/// Finds the projective transform that maps each `src[i]` onto `dst[i]`.
///
/// Each correspondence contributes two rows of the usual 8x8 system in the
/// unknowns `a..h` of
///
/// ```text
///     | a b c |
///     | d e f |
///     | g h 1 |
/// ```
///
/// which is then solved by Gaussian elimination with partial pivoting.
pub fn get_transform_matrix(
    src: &[Vec2f; 4],
    dst: &[Vec2f; 4],
) -> Result<Mat3f, Singular> {
    // Augmented matrix: 8 coefficients plus the right-hand side.
    let mut a = [[0f32; 9]; 8];
    for i in 0..4 {
        let (x, y) = (src[i].0, src[i].1);
        let (u, v) = (dst[i].0, dst[i].1);
        a[2 * i] = [x, y, 1., 0., 0., 0., -x * u, -y * u, u];
        a[2 * i + 1] = [0., 0., 0., x, y, 1., -x * v, -y * v, v];
    }

    let h = solve(&mut a)?;
    Ok(Mat3::from_rows([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], 1.],
    ]))
}

fn solve(a: &mut [[f32; 9]; 8]) -> Result<[f32; 8], Singular> {
    const N: usize = 8;

    for col in 0..N {
        // Bring the row with the largest magnitude in this column up.
        let mut pivot = col;
        for row in col + 1..N {
            if libm::fabsf(a[row][col]) > libm::fabsf(a[pivot][col]) {
                pivot = row;
            }
        }
        if !(libm::fabsf(a[pivot][col]) >= PIVOT_EPSILON) {
            return Err(Singular);
        }
        a.swap(col, pivot);

        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0. {
                continue;
            }
            for k in col..=N {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let mut x = [0f32; N];
    for row in (0..N).rev() {
        let mut sum = a[row][N];
        for k in row + 1..N {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, Vec2};

    const SQUARE: [Vec2f; 4] = [
        Vec2(0., 0.),
        Vec2(100., 0.),
        Vec2(100., 100.),
        Vec2(0., 100.),
    ];

    #[test]
    fn identity_correspondence() {
        let m = get_transform_matrix(&SQUARE, &SQUARE).unwrap();
        let (m, id) = (m.to_rows(), Mat3f::identity().to_rows());
        for r in 0..3 {
            for c in 0..3 {
                assert!((m[r][c] - id[r][c]).abs() < 1e-5, "[{}][{}]", r, c);
            }
        }
    }

    #[test]
    fn collinear_is_singular() {
        let line = [
            Vec2(0., 0.),
            Vec2(1., 1.),
            Vec2(2., 2.),
            Vec2(3., 3.),
        ];
        assert_eq!(get_transform_matrix(&line, &SQUARE), Err(Singular));
    }

    #[test]
    fn recovers_known_transform() {
        let mut t = Mat3f::identity();
        t.translate_by(12., -7.);
        t.scale_by(1.5, 0.75);
        t.perspective_by(0.001, 0.002);

        let mut dst = [Vec2(0., 0.); 4];
        for (d, s) in dst.iter_mut().zip(SQUARE.iter()) {
            *d = t.map_point(*s);
        }
        let m = get_transform_matrix(&SQUARE, &dst).unwrap();
        for s in SQUARE.iter() {
            let (want, got) = (t.map_point(*s), m.map_point(*s));
            assert!((want.0 - got.0).abs() < 1e-2, "{:?} vs {:?}", want, got);
            assert!((want.1 - got.1).abs() < 1e-2, "{:?} vs {:?}", want, got);
        }
        let inside = Vec2(37., 61.);
        let (want, got) = (t.map_point(inside), m.map_point(inside));
        assert!((want.0 - got.0).abs() < 1e-2);
        assert!((want.1 - got.1).abs() < 1e-2);
    }
}
