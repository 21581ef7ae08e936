use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lib::constants::CENTIMETERS_PER_METER;
use crate::lib::errors::{AppError, Result};

pub type PedestrianID = i64;
pub type FrameNumber = i64;

/// Unit of coordinates in trajectory files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrajectoryUnit {
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "cm")]
    Centimeter,
}

impl TrajectoryUnit {
    /// Factor converting a coordinate in this unit into metres
    pub fn to_meters(&self) -> f64 {
        match self {
            TrajectoryUnit::Meter => 1.0,
            TrajectoryUnit::Centimeter => 1.0 / CENTIMETERS_PER_METER,
        }
    }
}

impl Default for TrajectoryUnit {
    fn default() -> Self {
        TrajectoryUnit::Meter
    }
}

impl FromStr for TrajectoryUnit {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(TrajectoryUnit::Meter),
            "cm" | "centimeter" | "centimeters" => Ok(TrajectoryUnit::Centimeter),
            _ => Err(AppError::InvalidSettings(format!("unknown trajectory unit '{}'", s))),
        }
    }
}

impl fmt::Display for TrajectoryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryUnit::Meter => write!(f, "m"),
            TrajectoryUnit::Centimeter => write!(f, "cm"),
        }
    }
}

/// Single observation of a pedestrian. Coordinates are in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryRow {
    pub id: PedestrianID,
    pub frame: FrameNumber,
    pub x: f64,
    pub y: f64,
}

/// Trajectories loaded from one input file.
/// Rows are unique by (id, frame) and ordered by (frame, id).
#[derive(Debug, Clone)]
pub struct TrajectoryData {
    source: String,
    frame_rate: f64,
    unit: TrajectoryUnit,
    rows: Vec<TrajectoryRow>,
}

impl TrajectoryData {
    pub fn new(source: String, frame_rate: f64, unit: TrajectoryUnit, mut rows: Vec<TrajectoryRow>) -> Result<Self> {
        rows.sort_by_key(|row| (row.frame, row.id));
        for pair in rows.windows(2) {
            if pair[0].frame == pair[1].frame && pair[0].id == pair[1].id {
                return Err(AppError::DuplicateKey {
                    file: source,
                    id: pair[0].id,
                    frame: pair[0].frame,
                });
            }
        }
        Ok(TrajectoryData { source, frame_rate, unit, rows })
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }
    /// Unit the file has been read in (rows are always stored in metres)
    pub fn unit(&self) -> TrajectoryUnit {
        self.unit
    }
    pub fn rows(&self) -> &[TrajectoryRow] {
        &self.rows
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Rows grouped by frame
    pub fn frames(&self) -> BTreeMap<FrameNumber, Vec<&TrajectoryRow>> {
        let mut frames: BTreeMap<FrameNumber, Vec<&TrajectoryRow>> = BTreeMap::new();
        for row in self.rows.iter() {
            frames.entry(row.frame).or_default().push(row);
        }
        frames
    }
    /// Rows grouped by pedestrian, each group ordered by frame
    pub fn pedestrians(&self) -> BTreeMap<PedestrianID, Vec<&TrajectoryRow>> {
        let mut pedestrians: BTreeMap<PedestrianID, Vec<&TrajectoryRow>> = BTreeMap::new();
        for row in self.rows.iter() {
            pedestrians.entry(row.id).or_default().push(row);
        }
        pedestrians
    }
    pub fn keys(&self) -> BTreeSet<(PedestrianID, FrameNumber)> {
        self.rows.iter().map(|row| (row.id, row.frame)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn row(id: i64, frame: i64, x: f64, y: f64) -> TrajectoryRow {
        TrajectoryRow { id, frame, x, y }
    }
    #[test]
    fn test_rows_ordering() {
        let data = TrajectoryData::new(
            "a.txt".to_string(),
            25.0,
            TrajectoryUnit::Meter,
            vec![row(2, 1, 0.0, 0.0), row(1, 1, 0.0, 0.0), row(1, 0, 0.0, 0.0)],
        ).unwrap();
        let keys: Vec<(i64, i64)> = data.rows().iter().map(|r| (r.id, r.frame)).collect();
        assert_eq!(keys, vec![(1, 0), (1, 1), (2, 1)]);
        assert_eq!(data.frames().len(), 2);
        assert_eq!(data.pedestrians()[&1].len(), 2);
    }
    #[test]
    fn test_duplicate_key() {
        let result = TrajectoryData::new(
            "a.txt".to_string(),
            25.0,
            TrajectoryUnit::Meter,
            vec![row(1, 0, 0.0, 0.0), row(1, 0, 1.0, 1.0)],
        );
        match result {
            Err(AppError::DuplicateKey { id, frame, .. }) => {
                assert_eq!(id, 1);
                assert_eq!(frame, 0);
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }
    #[test]
    fn test_unit() {
        assert_eq!("cm".parse::<TrajectoryUnit>().unwrap(), TrajectoryUnit::Centimeter);
        assert_eq!("M".parse::<TrajectoryUnit>().unwrap(), TrajectoryUnit::Meter);
        assert!("ft".parse::<TrajectoryUnit>().is_err());
        assert_eq!(TrajectoryUnit::Centimeter.to_meters(), 0.01);
    }
}
