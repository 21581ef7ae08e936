//! Half-plane clipping (Sutherland–Hodgman) building the convex part of a
//! Voronoi cell: bounding rectangle, bisectors and the optional cut-off
//! polygon. Only convex rings are clipped here; the intersection with the
//! (possibly non-convex) walkable area is left to `geo::BooleanOps`.
//!
//! Rings are passed around without the closing point.

use geo::{Coord, Rect};

use crate::lib::constants::EPSILON_TINY;

/// Closed half-plane `{ p : normal · p <= offset }`
#[derive(Debug, Clone, Copy)]
pub struct HalfPlane {
    pub normal: Coord<f64>,
    pub offset: f64,
}

impl HalfPlane {
    pub fn new(normal: Coord<f64>, offset: f64) -> Self {
        HalfPlane { normal, offset }
    }

    /// Points closer to `own` than to `other`.
    /// Returns None for coincident points since no bisector exists.
    pub fn bisector(own: Coord<f64>, other: Coord<f64>) -> Option<Self> {
        let normal = Coord { x: other.x - own.x, y: other.y - own.y };
        if normal.x.abs() < EPSILON_TINY && normal.y.abs() < EPSILON_TINY {
            return None;
        }
        let offset = ((other.x * other.x + other.y * other.y) - (own.x * own.x + own.y * own.y)) / 2.0;
        Some(HalfPlane::new(normal, offset))
    }

    #[inline]
    fn signed_distance(&self, p: Coord<f64>) -> f64 {
        self.normal.x * p.x + self.normal.y * p.y - self.offset
    }

    #[inline]
    pub fn contains(&self, p: Coord<f64>) -> bool {
        self.signed_distance(p) <= 0.0
    }

    // Intersection of segment AB with the boundary line; caller guarantees A and B are on different sides
    fn crossing(&self, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
        let da = self.signed_distance(a);
        let db = self.signed_distance(b);
        let t = da / (da - db);
        Coord { x: a.x + t * (b.x - a.x), y: a.y + t * (b.y - a.y) }
    }
}

/// Clips ring by a single half-plane
pub fn clip_by_half_plane(ring: &[Coord<f64>], half_plane: &HalfPlane) -> Vec<Coord<f64>> {
    let n = ring.len();
    let mut output = Vec::with_capacity(n + 2);
    if n == 0 {
        return output;
    }
    let mut previous = ring[n - 1];
    let mut previous_inside = half_plane.contains(previous);
    for &current in ring.iter() {
        let current_inside = half_plane.contains(current);
        if current_inside {
            if !previous_inside {
                output.push(half_plane.crossing(previous, current));
            }
            output.push(current);
        } else if previous_inside {
            output.push(half_plane.crossing(previous, current));
        }
        previous = current;
        previous_inside = current_inside;
    }
    output
}

/// Clips ring by every half-plane in turn; stops early once nothing is left
pub fn clip_by_half_planes<'a, I>(ring: &[Coord<f64>], half_planes: I) -> Vec<Coord<f64>>
where
    I: IntoIterator<Item = &'a HalfPlane>,
{
    let mut current = ring.to_vec();
    for half_plane in half_planes {
        current = clip_by_half_plane(&current, half_plane);
        if current.len() < 3 {
            return Vec::new();
        }
    }
    current
}

/// Counter-clockwise ring of rectangle corners
pub fn rect_ring(rect: &Rect<f64>) -> Vec<Coord<f64>> {
    let min = rect.min();
    let max = rect.max();
    vec![
        Coord { x: min.x, y: min.y },
        Coord { x: max.x, y: min.y },
        Coord { x: max.x, y: max.y },
        Coord { x: min.x, y: max.y },
    ]
}

/// Half-planes of a regular polygon inscribed into circle.
/// `quad_segments` is number of segments per quarter of circle.
pub fn circle_half_planes(center: Coord<f64>, radius: f64, quad_segments: usize) -> Vec<HalfPlane> {
    let segments = 4 * quad_segments.max(1);
    let step = 2.0 * std::f64::consts::PI / segments as f64;
    let vertices: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = i as f64 * step;
            Coord { x: center.x + radius * angle.cos(), y: center.y + radius * angle.sin() }
        })
        .collect();
    (0..segments)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % segments];
            // Outward normal of counter-clockwise edge
            let normal = Coord { x: b.y - a.y, y: a.x - b.x };
            HalfPlane::new(normal, normal.x * a.x + normal.y * a.y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, LineString, Polygon};

    fn area(ring: &[Coord<f64>]) -> f64 {
        Polygon::new(LineString::new(ring.to_vec()), vec![]).unsigned_area()
    }

    fn square(min: f64, max: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x: min, y: min },
            Coord { x: max, y: min },
            Coord { x: max, y: max },
            Coord { x: min, y: max },
        ]
    }

    #[test]
    fn test_bisector_clip() {
        let ring = square(0.0, 4.0);
        let own = Coord { x: 1.0, y: 2.0 };
        let other = Coord { x: 3.0, y: 2.0 };
        let hp = HalfPlane::bisector(own, other).unwrap();
        let clipped = clip_by_half_plane(&ring, &hp);
        assert!((area(&clipped) - 8.0).abs() < 1e-12);
        assert!(clipped.iter().all(|c| c.x <= 2.0 + 1e-12));
    }

    #[test]
    fn test_coincident_bisector() {
        let p = Coord { x: 1.0, y: 1.0 };
        assert!(HalfPlane::bisector(p, p).is_none());
    }

    #[test]
    fn test_rect_ring() {
        let rect = Rect::new(Coord { x: 3.0, y: 3.0 }, Coord { x: 5.0, y: 6.0 });
        let ring = rect_ring(&rect);
        assert_eq!(ring.len(), 4);
        assert!((area(&ring) - 6.0).abs() < 1e-12);
        let far = HalfPlane::new(Coord { x: 1.0, y: 0.0 }, 0.0);
        assert!(clip_by_half_planes(&ring, [far].iter()).is_empty());
    }

    #[test]
    fn test_circle_half_planes() {
        let center = Coord { x: 0.0, y: 0.0 };
        let big = square(-10.0, 10.0);
        let clipped = clip_by_half_planes(&big, circle_half_planes(center, 1.0, 64).iter());
        let circle_area = area(&clipped);
        assert!((circle_area - std::f64::consts::PI).abs() < 1e-2);
        // Square inscribed polygon for a single segment per quarter
        let clipped = clip_by_half_planes(&big, circle_half_planes(center, 1.0, 1).iter());
        assert!((area(&clipped) - 2.0).abs() < 1e-9);
    }
}
