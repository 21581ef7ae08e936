use geo::{Area, BooleanOps, Coord, Rect};
use ndarray::Array2;

use crate::lib::constants::EPSILON;
use crate::lib::errors::{AppError, Result};
use crate::lib::spatial::WalkableArea;

/// Square cells tiling the bounding rectangle of the walkable area.
/// Cells are stored row-major; the first row is at the top (max y), the first column at the left (min x).
#[derive(Debug, Clone)]
pub struct Grid {
    /// Index = row * cols + col
    cells: Vec<Rect<f64>>,
    cell_size: f64,
    rows: usize,
    cols: usize,
    min_x: f64,
    max_y: f64,
}

impl Grid {
    pub fn new(walkable_area: &WalkableArea, cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(AppError::InvalidSettings(format!("grid size must be positive, got {}", cell_size)));
        }
        let bounds = walkable_area.bounds();
        let (min_x, max_y) = (bounds.min().x, bounds.max().y);
        // Tolerance keeps exact multiples (e.g. 6.0 / 0.4) from producing an extra column
        let cols = ((bounds.width() / cell_size - EPSILON).ceil() as usize).max(1);
        let rows = ((bounds.height() / cell_size - EPSILON).ceil() as usize).max(1);

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let top = max_y - row as f64 * cell_size;
            let bottom = max_y - (row + 1) as f64 * cell_size;
            for col in 0..cols {
                let left = min_x + col as f64 * cell_size;
                let right = min_x + (col + 1) as f64 * cell_size;
                cells.push(Rect::new(Coord { x: left, y: bottom }, Coord { x: right, y: top }));
            }
        }
        Ok(Grid { cells, cell_size, rows, cols, min_x, max_y })
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }
    /// Top-left corner of the grid
    pub fn origin(&self) -> Coord<f64> {
        Coord { x: self.min_x, y: self.max_y }
    }
    pub fn cells(&self) -> &[Rect<f64>] {
        &self.cells
    }
    /// (row, col) of flat cell index
    #[inline]
    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols, idx % self.cols)
    }
    pub fn cell_center(&self, idx: usize) -> Coord<f64> {
        self.cells[idx].center()
    }

    /// Index of cell containing point. Points on the outer edges belong to the border cells.
    /// Returns None if point is outside of grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<usize> {
        let col = Self::axis_index(x - self.min_x, self.cell_size, self.cols)?;
        let row = Self::axis_index(self.max_y - y, self.cell_size, self.rows)?;
        Some(row * self.cols + col)
    }

    /// Indices of cells overlapping bounding box (clamped to grid bounds)
    pub fn candidate_cells(&self, bbox: &Rect<f64>) -> Vec<usize> {
        let col_start = ((bbox.min().x - self.min_x) / self.cell_size).floor().max(0.0) as usize;
        let col_end = (((bbox.max().x - self.min_x) / self.cell_size).ceil().max(0.0) as usize).min(self.cols);
        let row_start = ((self.max_y - bbox.max().y) / self.cell_size).floor().max(0.0) as usize;
        let row_end = (((self.max_y - bbox.min().y) / self.cell_size).ceil().max(0.0) as usize).min(self.rows);

        let mut candidates = Vec::new();
        for row in row_start..row_end {
            for col in col_start..col_end {
                candidates.push(row * self.cols + col);
            }
        }
        candidates
    }

    /// Fraction of each cell covered by walkable area, shaped (rows, cols)
    pub fn walkable_coverage(&self, walkable_area: &WalkableArea) -> Array2<f64> {
        let cell_area = self.cell_area();
        let mut coverage = Array2::<f64>::zeros((self.rows, self.cols));
        for (idx, cell) in self.cells.iter().enumerate() {
            let covered = walkable_area.polygon().intersection(&cell.to_polygon()).unsigned_area();
            coverage[self.position(idx)] = covered / cell_area;
        }
        coverage
    }

    fn axis_index(offset: f64, cell_size: f64, count: usize) -> Option<usize> {
        let extent = cell_size * count as f64;
        if !(offset >= -EPSILON && offset <= extent + EPSILON) {
            return None;
        }
        let idx = (offset / cell_size).floor().max(0.0) as usize;
        Some(idx.min(count - 1))
    }
}
