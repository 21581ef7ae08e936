use geo::{Area, BooleanOps, BoundingRect};
use tracing::debug;

use crate::lib::constants::EPSILON_TINY;
use crate::lib::profiles::{Grid, ProfileTable};

/// Overlap of one Voronoi polygon with one grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOverlap {
    pub cell: usize,
    pub area: f64,
}

/// Sparse (grid cell x profile row) overlap areas.
/// Only positive overlaps are kept; slivers below `EPSILON_TINY` count as touching.
#[derive(Debug, Clone)]
pub struct GridIntersections {
    /// Indexed by profile table row, each ordered by cell index
    per_row: Vec<Vec<CellOverlap>>,
}

impl GridIntersections {
    /// Overlaps of profile table row
    pub fn row(&self, idx: usize) -> &[CellOverlap] {
        &self.per_row[idx]
    }
    pub fn len(&self) -> usize {
        self.per_row.iter().map(|overlaps| overlaps.len()).sum()
    }
}

/// Intersects every Voronoi polygon of the profile table with the grid cells overlapping its bounding box
pub fn compute_grid_intersections(grid: &Grid, table: &ProfileTable) -> GridIntersections {
    let mut per_row = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let mut overlaps = Vec::new();
        let bbox = match row.polygon.bounding_rect() {
            Some(b) => b,
            None => {
                per_row.push(overlaps);
                continue;
            }
        };
        for cell_idx in grid.candidate_cells(&bbox) {
            let cell = grid.cells()[cell_idx].to_polygon();
            let area = row.polygon.intersection(&cell).unsigned_area();
            if area > EPSILON_TINY {
                overlaps.push(CellOverlap { cell: cell_idx, area });
            }
        }
        per_row.push(overlaps);
    }
    let intersections = GridIntersections { per_row };
    debug!(file = table.source(), overlaps = intersections.len(), "grid intersections computed");
    intersections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::kinematics::{compute_individual_speed, SpeedBorderMethod};
    use crate::lib::spatial::WalkableArea;
    use crate::lib::trajectory::{TrajectoryData, TrajectoryRow, TrajectoryUnit};
    use crate::lib::voronoi::compute_voronoi_cells;

    #[test]
    fn test_overlaps_sum_to_polygon_area() {
        let wa = WalkableArea::new(&[[-6.0, 5.0], [0.0, 5.0], [0.0, 7.0], [-6.0, 7.0]]).unwrap();
        let rows = vec![
            TrajectoryRow { id: 1, frame: 0, x: -5.0, y: 6.0 },
            TrajectoryRow { id: 1, frame: 1, x: -4.9, y: 6.1 },
            TrajectoryRow { id: 2, frame: 0, x: -1.3, y: 5.4 },
            TrajectoryRow { id: 2, frame: 1, x: -1.4, y: 5.5 },
        ];
        let data = TrajectoryData::new("a.txt".to_string(), 25.0, TrajectoryUnit::Meter, rows).unwrap();
        let table = ProfileTable::merge(
            &data,
            &compute_individual_speed(&data, 1, SpeedBorderMethod::SingleSided),
            &compute_voronoi_cells(&data, &wa, None),
        );
        let grid = Grid::new(&wa, 0.4).unwrap();
        let intersections = compute_grid_intersections(&grid, &table);
        for (idx, row) in table.rows().iter().enumerate() {
            let total: f64 = intersections.row(idx).iter().map(|o| o.area).sum();
            assert!((total - 1.0 / row.density).abs() < 1e-6);
            assert!(intersections.row(idx).iter().all(|o| o.area > 0.0 && o.area <= grid.cell_area() + 1e-9));
        }
    }
}
