//! Rectangles and the destination-area projector.

use math::{Mat3f, Vec2};

/// An integer rectangle.
///
/// Stored as origin plus size. The corner accessors use inclusive bounds, so
/// `right() == x + w - 1`; [`Rect::from_corners`] takes the same convention.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Builds a rectangle from inclusive corners.
    pub const fn from_corners(
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> Self {
        Rect {
            x: left,
            y: top,
            w: right - left + 1,
            h: bottom - top + 1,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.w - 1
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h - 1
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// The overlap of two rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            None
        } else {
            Some(Rect::from_corners(left, top, right, bottom))
        }
    }

    /// Smallest rectangle covering both. Empty rectangles don't contribute.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_corners(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn contains(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// Computes the part of a `width` x `height` canvas that `rect` can touch
/// once mapped through `m`.
///
/// The four corners of `rect` are projected (with the homogeneous divide, so
/// perspective matrices work) and their bounding box is clipped to the
/// canvas. This is exact for anything that maps straight lines to straight
/// lines, which every 3x3 matrix does.
///
/// Returns `None` if the box misses the canvas, if a corner projects to NaN
/// (the homogeneous coordinate went to zero), or if nothing is left after
/// clipping.
pub fn get_area(
    rect: &Rect,
    m: &Mat3f,
    width: u16,
    height: u16,
) -> Option<Rect> {
    if rect.is_empty() || width == 0 || height == 0 {
        return None;
    }

    let corners = [
        (rect.left(), rect.top()),
        (rect.right(), rect.top()),
        (rect.left(), rect.bottom()),
        (rect.right(), rect.bottom()),
    ];

    let (mut x_min, mut y_min) = (f32::INFINITY, f32::INFINITY);
    let (mut x_max, mut y_max) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &(x, y) in corners.iter() {
        let p = m.map_point(Vec2(x as f32, y as f32));
        if p.0.is_nan() || p.1.is_nan() {
            return None;
        }
        x_min = x_min.min(p.0);
        x_max = x_max.max(p.0);
        y_min = y_min.min(p.1);
        y_max = y_max.max(p.1);
    }

    let (w, h) = (f32::from(width), f32::from(height));
    if x_max < 0. || y_max < 0. || x_min >= w || y_min >= h {
        return None;
    }

    let (x0, x1) = clip_span(x_min, x_max, width);
    let (y0, y1) = clip_span(y_min, y_max, height);
    let area = Rect::from_corners(x0, y0, x1, y1);
    if area.is_empty() {
        None
    } else {
        Some(area)
    }
}

/// Rounds `[lo, hi]` outward to whole pixels and clamps it to `[0, dim)`.
fn clip_span(lo: f32, hi: f32, dim: u16) -> (i32, i32) {
    let last = f32::from(dim - 1);
    let lo = libm::floorf(lo).max(0.).min(last);
    let hi = libm::ceilf(hi).max(0.).min(last);
    (lo as i32, hi as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::{Mat3, Matrix};
    use rand::{Rng, SeedableRng};

    #[test]
    fn pure_translation() {
        let mut m = Mat3f::identity();
        m.translate_by(5., 5.);
        let area = get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100);
        assert_eq!(area, Some(Rect::new(5, 5, 10, 10)));
    }

    #[test]
    fn off_canvas() {
        let mut m = Mat3f::identity();
        m.translate_by(200., 0.);
        assert_eq!(get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100), None);

        let mut m = Mat3f::identity();
        m.translate_by(-20., -20.);
        assert_eq!(get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100), None);
    }

    #[test]
    fn partially_off_canvas_is_clamped() {
        let mut m = Mat3f::identity();
        m.translate_by(95., -3.);
        let area = get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100);
        assert_eq!(area, Some(Rect::new(95, 0, 5, 7)));
    }

    #[test]
    fn scale_grows_area() {
        let mut m = Mat3f::identity();
        m.scale_by(2., 3.);
        let area = get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100);
        // Corners at 0 and 9 map to 0 and 18 / 27.
        assert_eq!(area, Some(Rect::new(0, 0, 19, 28)));
    }

    #[test]
    fn perspective_shrinks_far_corners() {
        let mut m = Mat3f::identity();
        m.perspective_by(0.001, 0.002);
        // Far corners divide by w > 1:
        //   (99, 0)  -> (90.08, 0)      w = 1.099
        //   (0, 99)  -> (0, 82.64)      w = 1.198
        //   (99, 99) -> (76.33, 76.33)  w = 1.297
        let area = get_area(&Rect::new(0, 0, 100, 100), &m, 200, 200);
        assert_eq!(area, Some(Rect::new(0, 0, 92, 84)));
    }

    #[test]
    fn degenerate_projection() {
        let m = Mat3::from_rows([[1., 0., 0.], [0., 1., 0.], [0., 0., 0.]]);
        assert_eq!(get_area(&Rect::new(0, 0, 10, 10), &m, 100, 100), None);
    }

    #[test]
    fn clamp_invariant_holds_for_random_affine() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xa5ea);
        for _ in 0..2000 {
            let width: u16 = rng.gen_range(1, 800);
            let height: u16 = rng.gen_range(1, 600);
            let mut m = Mat3f::identity();
            let dx = rng.gen_range(-400., 1200.);
            let dy = rng.gen_range(-400., 1000.);
            m.translate_by(dx, dy);
            m.rotate_by(rng.gen_range(-360., 360.), &math::SineTable);
            m.scale_by(rng.gen_range(0.1, 4.), rng.gen_range(0.1, 4.));
            let (w, h) = (rng.gen_range(1, 300), rng.gen_range(1, 300));
            let src = Rect::new(0, 0, w, h);

            if let Some(a) = get_area(&src, &m, width, height) {
                assert!(a.x >= 0 && a.y >= 0, "{:?}", a);
                assert!(a.w > 0 && a.h > 0, "{:?}", a);
                let (right, bottom) = (a.x + a.w, a.y + a.h);
                assert!(right <= i32::from(width), "{:?} in {}", a, width);
                assert!(bottom <= i32::from(height), "{:?} in {}", a, height);
            }
        }
    }

    #[test]
    fn intersect_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert_eq!(a.intersect(&Rect::new(10, 0, 4, 4)), None);
        assert_eq!(a.union(&Rect::default()), a);
        assert!(a.contains(&Rect::new(2, 2, 8, 8)));
        assert!(!a.contains(&b));
    }

    #[test]
    fn corner_views_agree() {
        let r = Rect::from_corners(3, 4, 12, 20);
        assert_eq!(r, Rect::new(3, 4, 10, 17));
        assert_eq!((r.left(), r.top(), r.right(), r.bottom()), (3, 4, 12, 20));
    }
}
