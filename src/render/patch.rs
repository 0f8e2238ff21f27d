use crate::math::{Matrix3, Point2, Vector2};

/// Pixels covered by one projected voxel, relative to its anchor pixel.
///
/// Row `top + i` covers columns `lines[i].0 .. lines[i].1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub top: i32,
    pub bottom: i32,
    pub lines: Vec<(i32, i32)>,
}

/// Whether a projected voxel can span more than one pixel.
#[must_use]
pub fn needs_patch(m: &Matrix3) -> bool {
    (0..3).any(|c| m[(0, c)].hypot(m[(1, c)]) >= 0.99)
}

fn cross(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull, counter-clockwise (monotone chain).
fn hull(mut pts: Vec<Point2>) -> Vec<Point2> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    let mut lower: Vec<Point2> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Horizontal extent of a convex polygon within the band `y0 <= y <= y1`.
fn band_extent(poly: &[Point2], y0: f64, y1: f64) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let n = poly.len();
    let mut take = |x: f64| {
        lo = lo.min(x);
        hi = hi.max(x);
    };
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if (y0..=y1).contains(&a.y) {
            take(a.x);
        }
        for y in [y0, y1] {
            if (a.y - y) * (b.y - y) < 0.0 {
                take(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }
    (lo <= hi).then_some((lo, hi))
}

impl Patch {
    /// Scanline cover of the unit voxel projected by the first two rows of `m`.
    ///
    /// The corners are shifted by a quarter pixel to match the anchor
    /// `floor(x + .25)` used when the patch is stamped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_projection(m: &Matrix3) -> Self {
        let axis = |c: usize| Vector2::new(m[(0, c)], m[(1, c)]);
        let (a, b, c) = (axis(0), axis(1), axis(2));
        let mut corners = Vec::with_capacity(8);
        for sa in [-0.5, 0.5] {
            for sb in [-0.5, 0.5] {
                for sc in [-0.5, 0.5] {
                    let v = a * sa + b * sb + c * sc;
                    corners.push(Point2::new(v.x + 0.25, v.y + 0.25));
                }
            }
        }
        let poly = hull(corners);
        let (ymin, ymax) = poly
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let top = ymin.floor() as i32;
        let bottom = (ymax.floor() as i32).max(top);

        let lines = (top..=bottom)
            .map(|j| {
                let y0 = f64::from(j);
                match band_extent(&poly, y0, y0 + 1.0) {
                    Some((lo, hi)) => {
                        let left = lo.floor() as i32;
                        (left, (hi.ceil() as i32).max(left + 1))
                    }
                    None => (0, 0),
                }
            })
            .collect();
        Self { top, bottom, lines }
    }

    /// Covered pixel offsets, row by row.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.lines
            .iter()
            .zip(self.top..)
            .flat_map(|(&(l, r), y)| (l..r).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn small_voxels_need_no_patch() {
        assert!(!needs_patch(&Matrix3::from_diagonal(&Vector3::new(0.5, 0.5, 9.0))));
        assert!(needs_patch(&Matrix3::from_diagonal(&Vector3::new(1.0, 0.5, 1.0))));
    }

    #[test]
    fn two_pixel_voxel_covers_a_block() {
        let p = Patch::from_projection(&Matrix3::from_diagonal(&Vector3::new(2.0, 2.0, 5.0)));
        // Corners span [-0.75, 1.25] in both axes.
        assert_eq!((p.top, p.bottom), (-1, 1));
        assert_eq!(p.lines, vec![(-1, 2); 3]);
        assert_eq!(p.offsets().count(), 9);
    }

    #[test]
    fn rotated_voxel_is_narrower_at_the_tips() {
        let s = std::f64::consts::FRAC_1_SQRT_2 * 3.0;
        let m = Matrix3::new(s, -s, 0.0, s, s, 0.0, 0.0, 0.0, 1.0);
        let p = Patch::from_projection(&m);
        let widths: Vec<i32> = p.lines.iter().map(|(l, r)| r - l).collect();
        let mid = widths.len() / 2;
        assert!(widths[0] < widths[mid]);
        assert!(widths[widths.len() - 1] < widths[mid]);
        assert!(p.offsets().any(|o| o == (0, 0)));
    }
}
