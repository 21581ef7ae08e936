use geo::Coord;

use crate::lib::constants::EPSILON_TINY;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum PointsOrientation {
    Collinear,
    Clockwise,
    CounterClockwise
}

// get_orientation Gets orientations of points P -> Q -> R.
// Possible output values: Collinear / Clockwise or CounterClockwise
// Input: points P, Q and R in provided order
pub fn get_orientation(p: Coord<f64>, q: Coord<f64>, r: Coord<f64>) -> PointsOrientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val.abs() < EPSILON_TINY {
        return PointsOrientation::Collinear;
    }
    if val > 0.0 {
        return PointsOrientation::Clockwise;
    }
    PointsOrientation::CounterClockwise
}

// is_degenerate Checks if all points of the ring lie on a single line
pub fn is_degenerate(ring: &[Coord<f64>]) -> bool {
    if ring.len() < 3 {
        return true;
    }
    let p = ring[0];
    let q = match ring.iter().skip(1).find(|c| **c != p) {
        Some(q) => *q,
        None => return true,
    };
    ring.iter().all(|r| get_orientation(p, q, *r) == PointsOrientation::Collinear)
}

// distance Euclidean distance between two coordinates
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}
