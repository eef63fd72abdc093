//! `no_std` linear algebra for 2D homogeneous transforms.
//!
//! Matrices act on column vectors, so a point `p` maps to `m * p`. The
//! in-place composition helpers (`translate_by` and friends) multiply on the
//! *right*: the transform composed last is the first one a point sees.

#![cfg_attr(not(test), no_std)]

mod solve;
mod trig;

pub use solve::{get_transform_matrix, Singular, PIVOT_EPSILON};
pub use trig::{Libm, SinCos, SineTable, SINE_TABLE};

use core::ops::{Div, Mul, MulAssign, Neg};

use num_traits::{one, zero, One, Zero};

/// Scalars vectors are built from.
pub trait Element: Zero + One {}

impl<T> Element for T where T: Zero + One {}

/// Fixed-length vectors with a dot product.
pub trait Vector {
    type Element: Element;

    fn dot(self, other: Self) -> Self::Element;
}

/// Homogeneous vectors: dividing by the last component gives the cartesian
/// point one dimension down.
pub trait Project: Vector
where
    Self::Element: Div<Output = Self::Element>,
{
    type Project: Vector<Element = Self::Element>;

    fn project(self) -> Self::Project;
}

/// Cartesian vectors: appending a 1 gives the homogeneous form.
pub trait Augment: Vector
where
    Self::Element: One + Div<Output = Self::Element>,
{
    type Augment: Project<Element = Self::Element>;

    fn augment(self) -> Self::Augment;
}

/// Square matrices.
pub trait Matrix {
    type Element: Element;
    type Row: Vector<Element = Self::Element>;

    fn identity() -> Self;
    fn transpose(self) -> Self;
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec3<T>(pub T, pub T, pub T);

impl<T: Element> Vector for Vec3<T> {
    type Element = T;

    fn dot(self, o: Self) -> T {
        self.0 * o.0 + self.1 * o.1 + self.2 * o.2
    }
}

impl<T> Project for Vec3<T>
where
    T: Element + Clone + Div<Output = T>,
{
    type Project = Vec2<T>;

    fn project(self) -> Vec2<T> {
        let Vec3(x, y, w) = self;
        Vec2(x / w.clone(), y / w)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec2<T>(pub T, pub T);

impl<T: Element> Vector for Vec2<T> {
    type Element = T;

    fn dot(self, o: Self) -> T {
        self.0 * o.0 + self.1 * o.1
    }
}

impl<T> Augment for Vec2<T>
where
    T: Element + Clone + Div<Output = T>,
{
    type Augment = Vec3<T>;

    fn augment(self) -> Vec3<T> {
        Vec3(self.0, self.1, one())
    }
}

/// A 3x3 matrix stored as three rows.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mat3<T>(pub Vec3<T>, pub Vec3<T>, pub Vec3<T>);

impl<T: Element> Mat3<T> {
    /// Scales `x` and `y` about the origin.
    pub fn scale(x: T, y: T) -> Self {
        Mat3::from_rows([
            [x, zero(), zero()],
            [zero(), y, zero()],
            [zero(), zero(), one()],
        ])
    }

    /// Rotation from a precomputed sine and cosine, counterclockwise in a
    /// y-up frame (clockwise on a y-down screen).
    pub fn rotate_pre(sin: T, cos: T) -> Self
    where
        T: Neg<Output = T> + Clone,
    {
        Mat3::from_rows([
            [cos.clone(), -sin.clone(), zero()],
            [sin, cos, zero()],
            [zero(), zero(), one()],
        ])
    }

    pub fn translate(x: T, y: T) -> Self {
        Mat3::from_rows([
            [one(), zero(), x],
            [zero(), one(), y],
            [zero(), zero(), one()],
        ])
    }

    /// Puts `(x, y)` in the bottom row, so `w = x * px + y * py + 1`.
    pub fn perspective(x: T, y: T) -> Self {
        Mat3::from_rows([
            [one(), zero(), zero()],
            [zero(), one(), zero()],
            [x, y, one()],
        ])
    }
}

impl<T> Mat3<T> {
    pub fn from_rows(rows: [[T; 3]; 3]) -> Self {
        let [[a, b, c], [d, e, f], [g, h, i]] = rows;
        Mat3(Vec3(a, b, c), Vec3(d, e, f), Vec3(g, h, i))
    }

    pub fn to_rows(self) -> [[T; 3]; 3] {
        let Mat3(Vec3(a, b, c), Vec3(d, e, f), Vec3(g, h, i)) = self;
        [[a, b, c], [d, e, f], [g, h, i]]
    }
}

impl<T: Element> Matrix for Mat3<T> {
    type Element = T;
    type Row = Vec3<T>;

    fn identity() -> Self {
        Mat3::scale(one(), one())
    }

    fn transpose(self) -> Self {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.to_rows();
        Mat3::from_rows([[a, d, g], [b, e, h], [c, f, i]])
    }
}

impl<T: Element + Clone> Mul<Vec3<T>> for Mat3<T> {
    type Output = Vec3<T>;

    fn mul(self, v: Vec3<T>) -> Vec3<T> {
        let Mat3(r0, r1, r2) = self;
        Vec3(r0.dot(v.clone()), r1.dot(v.clone()), r2.dot(v))
    }
}

impl<T: Element + Clone> Mul for Mat3<T> {
    type Output = Mat3<T>;

    fn mul(self, rhs: Mat3<T>) -> Mat3<T> {
        // Each row of the product is a row of `self` times `rhs`, i.e. the
        // transposed `rhs` times that row.
        let cols = rhs.transpose();
        let Mat3(r0, r1, r2) = self;
        Mat3(cols.clone() * r0, cols.clone() * r1, cols * r2)
    }
}

/// `m *= n` overwrites `m` with `m * n`.
impl<T: Element + Clone> MulAssign for Mat3<T> {
    fn mul_assign(&mut self, rhs: Mat3<T>) {
        *self = self.clone() * rhs;
    }
}

impl Mat3f {
    /// Composes a translation onto `self`.
    pub fn translate_by(&mut self, x: f32, y: f32) {
        *self *= Mat3::translate(x, y);
    }

    /// Composes a scale onto `self`.
    pub fn scale_by(&mut self, x: f32, y: f32) {
        *self *= Mat3::scale(x, y);
    }

    /// Composes a rotation by `degrees` onto `self`, getting sine and cosine
    /// from `trig`.
    pub fn rotate_by<S: SinCos + ?Sized>(&mut self, degrees: f32, trig: &S) {
        let (sin, cos) = trig.sin_cos(degrees);
        *self *= Mat3::rotate_pre(sin, cos);
    }

    /// Composes a projective term onto `self`.
    pub fn perspective_by(&mut self, x: f32, y: f32) {
        *self *= Mat3::perspective(x, y);
    }

    /// Rotation by whole `degrees` using the hardware-compatible sine table.
    pub fn rotate_deg(degrees: i32) -> Self {
        let (sin, cos) = SineTable.sin_cos_deg(degrees);
        Mat3::rotate_pre(sin, cos)
    }

    pub fn determinant(&self) -> f32 {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.to_rows();
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Closed-form inverse via the adjugate.
    ///
    /// There is no singularity check: a zero determinant produces infinities
    /// or NaNs. Use [`Mat3f::try_inverse`] unless the matrix is known to be
    /// invertible.
    pub fn inverse(&self) -> Self {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.to_rows();
        let det = self.determinant();
        let r = 1. / det;
        Mat3::from_rows([
            [(e * i - f * h) * r, (c * h - b * i) * r, (b * f - c * e) * r],
            [(f * g - d * i) * r, (a * i - c * g) * r, (c * d - a * f) * r],
            [(d * h - e * g) * r, (b * g - a * h) * r, (a * e - b * d) * r],
        ])
    }

    /// Inverse, or `None` if the determinant is too close to zero (or not a
    /// number) for the result to mean anything.
    pub fn try_inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.is_nan() || libm::fabsf(det) < f32::EPSILON {
            None
        } else {
            Some(self.inverse())
        }
    }

    /// Maps a cartesian point through the matrix, including the homogeneous
    /// divide.
    pub fn map_point(&self, p: Vec2f) -> Vec2f {
        (*self * p.augment()).project()
    }
}

/// Convenient shorthand for `Vec2<f32>`.
pub type Vec2f = Vec2<f32>;
/// Convenient shorthand for `Vec3<f32>`.
pub type Vec3f = Vec3<f32>;

/// Convenient shorthand for `Mat3<f32>`.
pub type Mat3f = Mat3<f32>;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: &Mat3f, b: &Mat3f, tol: f32) {
        let (a, b) = (a.to_rows(), b.to_rows());
        for r in 0..3 {
            for c in 0..3 {
                let scale = 1f32.max(a[r][c].abs()).max(b[r][c].abs());
                assert!(
                    (a[r][c] - b[r][c]).abs() <= tol * scale,
                    "element [{}][{}]: {} vs {}",
                    r,
                    c,
                    a[r][c],
                    b[r][c],
                );
            }
        }
    }

    fn random_matrix(rng: &mut impl Rng) -> Mat3f {
        let mut rows = [[0f32; 3]; 3];
        for row in rows.iter_mut() {
            for e in row.iter_mut() {
                *e = rng.gen_range(-4.0, 4.0);
            }
        }
        Mat3::from_rows(rows)
    }

    #[test]
    fn inverse_round_trip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        let mut checked = 0;
        while checked < 200 {
            let m = random_matrix(&mut rng);
            if m.determinant().abs() < 0.5 {
                continue;
            }
            assert_close(&m.inverse().inverse(), &m, 1e-4);
            assert_close(&(m * m.inverse()), &Mat3::identity(), 1e-4);
            checked += 1;
        }
    }

    #[test]
    fn singular_has_no_inverse() {
        let m = Mat3::from_rows([[1., 2., 3.], [2., 4., 6.], [0., 0., 1.]]);
        assert_eq!(m.try_inverse(), None);
        assert!(Mat3f::identity().try_inverse().is_some());
    }

    #[test]
    fn identity_composition() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let m = random_matrix(&mut rng);
            assert_eq!(m * Mat3::identity(), m);
            assert_eq!(Mat3::identity() * m, m);
            let mut n = m;
            n *= Mat3::identity();
            assert_eq!(n, m);
        }
    }

    #[test]
    fn translate_then_scale_order() {
        let mut m = Mat3f::identity();
        m.translate_by(5., 0.);
        m.scale_by(2., 1.);
        // m = T * S, so the scale hits the point first: (1*2 + 5, 1).
        let p = m * Vec3(1., 1., 1.);
        assert_eq!(p, Vec3(7., 1., 1.));
    }

    #[test]
    fn perspective_divides() {
        let mut m = Mat3f::identity();
        m.perspective_by(0.5, 0.);
        let p = m.map_point(Vec2(2., 4.));
        // w = 0.5 * 2 + 1 = 2
        assert_eq!(p, Vec2(1., 2.));
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut m = Mat3f::identity();
        m.rotate_by(90., &SineTable);
        let p = m.map_point(Vec2(1., 0.));
        assert!(p.0.abs() < 1e-6);
        assert!((p.1 - 1.).abs() < 1e-6);

        let q = Mat3f::rotate_deg(180).map_point(Vec2(1., 0.));
        assert!((q.0 + 1.).abs() < 1e-6);
        assert!(q.1.abs() < 1e-6);
    }
}
