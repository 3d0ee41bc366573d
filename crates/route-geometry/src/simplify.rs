//! Douglas-Peucker path simplification returning retained indices
//!
//! The simplifier works on planar `(x, y)` samples tagged with the index of the point they came
//! from, and returns those tags for the points it keeps. It never mutates its input, so the
//! route can run it once per tolerance of the weight ladder over the same slice.
//!
//! Because the split point of every sub-segment does not depend on the tolerance, the points
//! kept at a coarse tolerance are always a subset of the points kept at a finer one.

/// A planar sample carrying the index of the route point it represents
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplifyPoint {
    pub x: f64,
    pub y: f64,
    pub index: usize,
}

impl SimplifyPoint {
    pub fn new(x: f64, y: f64, index: usize) -> Self {
        Self { x, y, index }
    }
}

/// Simplify `points` at `tolerance` and return the retained `index` tags in input order
///
/// The first and last samples are always kept. On equal maximum distances the first sample in
/// scan order is chosen, so results are deterministic.
pub fn simplify(points: &[SimplifyPoint], tolerance: f64) -> Vec<usize> {
    if points.len() <= 2 {
        return points.iter().map(|p| p.index).collect();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    // Explicit stack instead of recursion: routes can have hundreds of thousands of points
    let mut stack = vec![(0usize, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (max_index, max_distance) = farthest_from_chord(points, start, end);
        if max_distance > tolerance {
            keep[max_index] = true;
            stack.push((max_index, end));
            stack.push((start, max_index));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p.index))
        .collect()
}

/// Interior sample farthest from the chord `points[start]..points[end]`
fn farthest_from_chord(points: &[SimplifyPoint], start: usize, end: usize) -> (usize, f64) {
    let first = points[start];
    let last = points[end];
    let mut max_distance = 0.0;
    let mut max_index = start + 1;

    for (offset, point) in points[start + 1..end].iter().enumerate() {
        let distance = perpendicular_distance(point, &first, &last);
        if distance > max_distance {
            max_distance = distance;
            max_index = start + 1 + offset;
        }
    }

    (max_index, max_distance)
}

/// Distance from `point` to the infinite line through `a` and `b`
///
/// Falls back to the distance to `a` when the chord is degenerate (closed loops).
#[inline]
fn perpendicular_distance(point: &SimplifyPoint, a: &SimplifyPoint, b: &SimplifyPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return (point.x - a.x).hypot(point.y - a.y);
    }
    ((point.x - a.x) * dy - (point.y - a.y) * dx).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[(f64, f64)]) -> Vec<SimplifyPoint> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| SimplifyPoint::new(x, y, i))
            .collect()
    }

    #[test]
    fn test_short_inputs_are_kept() {
        assert!(simplify(&[], 1.0).is_empty());
        assert_eq!(simplify(&line(&[(0.0, 0.0)]), 1.0), vec![0]);
        assert_eq!(simplify(&line(&[(0.0, 0.0), (1.0, 1.0)]), 1.0), vec![0, 1]);
    }

    #[test]
    fn test_collinear_points_are_dropped() {
        let points = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        assert_eq!(simplify(&points, 0.01), vec![0, 3]);
    }

    #[test]
    fn test_corner_is_kept() {
        let points = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)]);
        assert_eq!(simplify(&points, 0.1), vec![0, 2, 4]);
    }

    #[test]
    fn test_tolerance_is_exclusive() {
        let points = line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        assert_eq!(simplify(&points, 1.0), vec![0, 2]);
        assert_eq!(simplify(&points, 0.999), vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_pick_first_in_scan_order() {
        // Points 1 and 3 are equally far from the chord; with a tolerance between the two
        // levels only the first one splits the segment
        let points = line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (3.0, 1.0), (4.0, 0.0)]);
        let kept = simplify(&points, 0.5);
        assert_eq!(kept[..2], [0, 1]);
        assert_eq!(farthest_from_chord(&points, 0, 4).0, 1);
    }

    #[test]
    fn test_returns_index_tags() {
        let points = vec![
            SimplifyPoint::new(0.0, 0.0, 10),
            SimplifyPoint::new(1.0, 5.0, 11),
            SimplifyPoint::new(2.0, 0.0, 12),
        ];
        assert_eq!(simplify(&points, 1.0), vec![10, 11, 12]);
    }

    #[test]
    fn test_degenerate_chord_on_loop() {
        let points = line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let kept = simplify(&points, 0.5);
        assert!(kept.contains(&2));
    }

    #[test]
    fn test_coarser_tolerance_is_subset() {
        let points: Vec<SimplifyPoint> = (0..200)
            .map(|i| {
                let t = i as f64 / 10.0;
                SimplifyPoint::new(t, (t * 1.3).sin() + (t * 7.1).cos() * 0.2, i)
            })
            .collect();

        let tolerances = [0.01, 0.05, 0.1, 0.3, 0.8];
        for pair in tolerances.windows(2) {
            let fine = simplify(&points, pair[0]);
            let coarse = simplify(&points, pair[1]);
            assert!(coarse.len() <= fine.len());
            assert!(coarse.iter().all(|i| fine.contains(i)));
        }
    }

    #[test]
    fn test_input_is_not_modified() {
        let points = line(&[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]);
        let copy = points.clone();
        let first = simplify(&points, 0.5);
        let second = simplify(&points, 0.5);
        assert_eq!(points, copy);
        assert_eq!(first, second);
    }
}
