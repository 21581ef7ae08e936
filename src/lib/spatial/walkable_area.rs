use geo::{Area, BoundingRect, Coord, Intersects, LineString, Polygon, Rect};

use crate::lib::constants::EPSILON_TINY;
use crate::lib::errors::{AppError, Result};
use crate::lib::spatial::geometry::is_degenerate;

/// Polygon bounding the space pedestrians may occupy.
/// Only the exterior ring is supported; obstacles (holes) are not.
#[derive(Debug, Clone)]
pub struct WalkableArea {
    polygon: Polygon<f64>,
    bounds: Rect<f64>,
    area: f64,
}

impl WalkableArea {
    pub fn new(coordinates: &[[f64; 2]]) -> Result<Self> {
        let mut ring: Vec<Coord<f64>> = coordinates
            .iter()
            .map(|pt| Coord { x: pt[0], y: pt[1] })
            .collect();
        // Accept both open and explicitly closed rings
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(AppError::InvalidGeometry("walkable area has non-finite coordinates".to_string()));
        }
        if is_degenerate(&ring) {
            return Err(AppError::InvalidGeometry(format!(
                "walkable area needs at least 3 non-collinear points, got {}",
                ring.len()
            )));
        }
        let polygon = Polygon::new(LineString::new(ring), vec![]);
        let area = polygon.unsigned_area();
        if area < EPSILON_TINY {
            return Err(AppError::InvalidGeometry("walkable area has zero area".to_string()));
        }
        let bounds = polygon
            .bounding_rect()
            .ok_or_else(|| AppError::InvalidGeometry("walkable area has no bounds".to_string()))?;
        Ok(WalkableArea { polygon, bounds, area })
    }
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }
    pub fn area(&self) -> f64 {
        self.area
    }
    /// Checks if point lies inside walkable area or on its boundary
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.polygon.intersects(&Coord { x, y })
    }
}
