use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use tracing::{debug, info, warn};

use crate::lib::constants::EPSILON_TINY;
use crate::lib::spatial::{circle_half_planes, clip_by_half_planes, rect_ring, HalfPlane, WalkableArea};
use crate::lib::trajectory::{FrameNumber, PedestrianID, TrajectoryData, TrajectoryRow};

/// Restricts every Voronoi cell to a circle around its pedestrian
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutOff {
    pub radius: f64,
    /// Segments per quarter of the circle approximation
    pub quad_segments: usize,
}

/// Voronoi cell of a pedestrian in a single frame, clipped to the walkable area.
/// A non-convex walkable area may split the cell into several parts.
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    pub id: PedestrianID,
    pub frame: FrameNumber,
    pub polygon: MultiPolygon<f64>,
    /// Individual density: 1 / area of the cell
    pub density: f64,
}

/// Computes Voronoi cells for every (pedestrian, frame) of the trajectory.
/// Result is ordered by (frame, id).
pub fn compute_voronoi_cells(trajectory: &TrajectoryData, walkable_area: &WalkableArea, cut_off: Option<&CutOff>) -> Vec<VoronoiCell> {
    let mut cells = Vec::with_capacity(trajectory.rows().len());
    for (frame, rows) in trajectory.frames() {
        let frame_cells = compute_frame_cells(frame, &rows, walkable_area, cut_off);
        if frame_cells.len() != rows.len() {
            warn!(file = trajectory.source(), frame, dropped = rows.len() - frame_cells.len(), "degenerate Voronoi cells dropped");
        }
        cells.extend(frame_cells);
    }
    info!(file = trajectory.source(), cells = cells.len(), "Voronoi cells computed");
    cells
}

/// Cells of all pedestrians observed in one frame.
/// Pedestrians sharing a position do not split each other's cell.
///
/// The convex part (bounding box of the walkable area, bisectors, cut-off) is
/// clipped first, then intersected with the walkable polygon.
pub fn compute_frame_cells(frame: FrameNumber, rows: &[&TrajectoryRow], walkable_area: &WalkableArea, cut_off: Option<&CutOff>) -> Vec<VoronoiCell> {
    let positions: Vec<Coord<f64>> = rows.iter().map(|row| Coord { x: row.x, y: row.y }).collect();
    let bounds = rect_ring(&walkable_area.bounds());
    let mut cells = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let own = positions[i];
        let mut half_planes: Vec<HalfPlane> = Vec::with_capacity(positions.len());
        for (j, other) in positions.iter().enumerate() {
            if i == j {
                continue;
            }
            match HalfPlane::bisector(own, *other) {
                Some(hp) => half_planes.push(hp),
                None => {
                    debug!(frame, id = row.id, other = rows[j].id, "coincident pedestrians");
                }
            }
        }
        if let Some(co) = cut_off {
            half_planes.extend(circle_half_planes(own, co.radius, co.quad_segments));
        }
        let ring = clip_by_half_planes(&bounds, half_planes.iter());
        if ring.len() < 3 {
            continue;
        }
        let convex = Polygon::new(LineString::new(ring), vec![]);
        let polygon = walkable_area.polygon().intersection(&convex);
        let area = polygon.unsigned_area();
        if area < EPSILON_TINY {
            continue;
        }
        cells.push(VoronoiCell {
            id: row.id,
            frame,
            polygon,
            density: 1.0 / area,
        });
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::spatial::distance;
    use crate::lib::trajectory::TrajectoryUnit;
    use geo::CoordsIter;
    use rand::Rng;

    fn walkable_area() -> WalkableArea {
        WalkableArea::new(&[[-6.0, 5.0], [0.0, 5.0], [0.0, 7.0], [-6.0, 7.0]]).unwrap()
    }

    fn row(id: i64, frame: i64, x: f64, y: f64) -> TrajectoryRow {
        TrajectoryRow { id, frame, x, y }
    }

    /// Inside the walkable area or within 1e-7 of its boundary
    fn near_walkable(wa: &WalkableArea, p: Coord<f64>) -> bool {
        if wa.covers(p.x, p.y) {
            return true;
        }
        wa.polygon().exterior().lines().any(|line| {
            let d = line.delta();
            let t = (((p.x - line.start.x) * d.x + (p.y - line.start.y) * d.y) / (d.x * d.x + d.y * d.y)).clamp(0.0, 1.0);
            let closest = Coord { x: line.start.x + t * d.x, y: line.start.y + t * d.y };
            distance(closest, p) < 1e-7
        })
    }

    #[test]
    fn test_single_pedestrian() {
        let wa = walkable_area();
        let r = row(1, 0, -3.0, 6.0);
        let cells = compute_frame_cells(0, &[&r], &wa, None);
        assert_eq!(cells.len(), 1);
        assert!((cells[0].polygon.unsigned_area() - 12.0).abs() < 1e-6);
        assert!((cells[0].density - 1.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_pedestrians() {
        let wa = walkable_area();
        let a = row(1, 0, -5.0, 6.0);
        let b = row(2, 0, -1.0, 6.0);
        let cells = compute_frame_cells(0, &[&a, &b], &wa, None);
        assert_eq!(cells.len(), 2);
        // Bisector at x = -3
        assert!((cells[0].polygon.unsigned_area() - 6.0).abs() < 1e-6);
        assert!((cells[1].polygon.unsigned_area() - 6.0).abs() < 1e-6);
        assert!(cells[0].polygon.exterior_coords_iter().all(|c| c.x <= -3.0 + 1e-6));
    }

    #[test]
    fn test_coincident_pedestrians() {
        let wa = walkable_area();
        let a = row(1, 0, -3.0, 6.0);
        let b = row(2, 0, -3.0, 6.0);
        let cells = compute_frame_cells(0, &[&a, &b], &wa, None);
        assert_eq!(cells.len(), 2);
        assert!((cells[0].polygon.unsigned_area() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_cut_off() {
        let wa = walkable_area();
        let r = row(1, 0, -3.0, 6.0);
        let cut_off = CutOff { radius: 0.5, quad_segments: 1 };
        let cells = compute_frame_cells(0, &[&r], &wa, Some(&cut_off));
        // Diamond inscribed into circle of radius 0.5
        assert!((cells[0].polygon.unsigned_area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cells_tile_walkable_area() {
        let wa = walkable_area();
        let mut rng = rand::rng();
        let rows: Vec<TrajectoryRow> = (0..30)
            .map(|id| row(id, 0, rng.random_range(-5.9..-0.1), rng.random_range(5.1..6.9)))
            .collect();
        let data = TrajectoryData::new("random.txt".to_string(), 25.0, TrajectoryUnit::Meter, rows).unwrap();
        let cells = compute_voronoi_cells(&data, &wa, None);
        assert_eq!(cells.len(), 30);
        let total: f64 = cells.iter().map(|c| c.polygon.unsigned_area()).sum();
        assert!((total - wa.area()).abs() < 1e-6);
        for cell in cells.iter() {
            let own = data.rows().iter().find(|r| r.id == cell.id).unwrap();
            assert!(cell.polygon.unsigned_area() > 0.0);
            assert!(cell.polygon.exterior_coords_iter().all(|c| near_walkable(&wa, c)));
            assert!(own.frame == cell.frame);
        }
    }

    #[test]
    fn test_non_convex_walkable_area() {
        // U-shape: 3x3 square with the notch [1, 2] x [1, 3] removed
        let wa = WalkableArea::new(&[[0.0, 0.0], [3.0, 0.0], [3.0, 3.0], [2.0, 3.0], [2.0, 1.0], [1.0, 1.0], [1.0, 3.0], [0.0, 3.0]]).unwrap();
        let a = row(1, 0, 0.5, 2.5);
        let b = row(2, 0, 1.5, 0.5);
        let cells = compute_frame_cells(0, &[&a, &b], &wa, None);
        assert_eq!(cells.len(), 2);
        // Bisector x - 2y = -2 crosses both arms, the upper part is split by the notch
        assert_eq!(cells[0].polygon.0.len(), 2);
        assert!((cells[0].polygon.unsigned_area() - 2.5).abs() < 1e-6);
        assert!((cells[1].polygon.unsigned_area() - 4.5).abs() < 1e-6);
        assert!((cells[0].density - 0.4).abs() < 1e-6);
        for cell in cells.iter() {
            for polygon in cell.polygon.iter() {
                for line in polygon.exterior().lines() {
                    let mid = Coord { x: (line.start.x + line.end.x) / 2.0, y: (line.start.y + line.end.y) / 2.0 };
                    assert!(near_walkable(&wa, mid), "edge midpoint ({}, {}) outside walkable area", mid.x, mid.y);
                }
            }
        }
        let total: f64 = cells.iter().map(|c| c.polygon.unsigned_area()).sum();
        assert!((total - wa.area()).abs() < 1e-6);
    }
}
