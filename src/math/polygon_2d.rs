use super::{Point2, Vector2, TOLERANCE};

/// Minimum distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < 1e-20 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    (p - (a + d * t)).norm()
}

/// Point-in-polygon test that counts points on the outline as inside.
#[must_use]
pub fn contains_point(polygon: &[Point2], p: &Point2) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        if point_to_segment_dist(p, a, b) < 1e-9 {
            return true;
        }
    }
    let mut inside = false;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Parameters `t` at which the line `origin + t * dir` crosses the outline, sorted.
///
/// Vertices lying exactly on the line are counted on one side only, so the
/// crossings pair up into inside intervals under the even-odd rule.
#[must_use]
pub fn line_crossings(polygon: &[Point2], origin: &Point2, dir: &Vector2) -> Vec<f64> {
    let n = polygon.len();
    let normal = Vector2::new(-dir.y, dir.x);
    let dir_sq = dir.norm_squared();
    let mut ts = Vec::new();
    if n < 3 || dir_sq < TOLERANCE {
        return ts;
    }
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        let da = (a - origin).dot(&normal);
        let db = (b - origin).dot(&normal);
        if (da > 0.0) != (db > 0.0) {
            let s = da / (da - db);
            let hit = a + (b - a) * s;
            ts.push((hit - origin).dot(dir) / dir_sq);
        }
    }
    ts.sort_by(f64::total_cmp);
    ts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ]
    }

    #[test]
    fn contains_interior_and_outline() {
        let sq = square();
        assert!(contains_point(&sq, &Point2::new(2.0, 2.0)));
        assert!(contains_point(&sq, &Point2::new(0.0, 2.0)));
        assert!(contains_point(&sq, &Point2::new(4.0, 4.0)));
        assert!(!contains_point(&sq, &Point2::new(4.5, 2.0)));
        assert!(!contains_point(&[], &Point2::new(0.0, 0.0)));
    }

    #[test]
    fn crossings_of_horizontal_line() {
        let ts = line_crossings(&square(), &Point2::new(-1.0, 2.0), &Vector2::new(1.0, 0.0));
        assert_eq!(ts.len(), 2);
        assert!((ts[0] - 1.0).abs() < TOLERANCE);
        assert!((ts[1] - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn crossings_through_vertex_pair_up() {
        let diamond = vec![
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 2.0),
        ];
        let ts = line_crossings(&diamond, &Point2::new(-1.0, 2.0), &Vector2::new(1.0, 0.0));
        assert_eq!(ts.len() % 2, 0);
        let ts = line_crossings(&diamond, &Point2::new(-1.0, 1.0), &Vector2::new(1.0, 0.0));
        assert_eq!(ts.len(), 2);
        assert!((ts[0] - 2.0).abs() < 1e-9);
        assert!((ts[1] - 4.0).abs() < 1e-9);
    }
}
