use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::MultiPolygon;
use tracing::info;

use crate::lib::kinematics::SpeedRecord;
use crate::lib::trajectory::{FrameNumber, PedestrianID, TrajectoryData};
use crate::lib::voronoi::VoronoiCell;

/// Merged per-pedestrian-per-frame record: raw position, speed and Voronoi cell
#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub id: PedestrianID,
    pub frame: FrameNumber,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub v_x: f64,
    pub v_y: f64,
    /// Individual Voronoi density (1 / cell area)
    pub density: f64,
    pub polygon: MultiPolygon<f64>,
}

/// Profile table of one trajectory file, unique by (id, frame) and ordered by (frame, id)
#[derive(Debug, Clone)]
pub struct ProfileTable {
    source: String,
    frame_rate: f64,
    rows: Vec<ProfileRow>,
}

impl ProfileTable {
    /// Inner join of trajectory rows, speeds and Voronoi cells on (id, frame).
    /// Rows lacking a match in either table are dropped.
    pub fn merge(trajectory: &TrajectoryData, speeds: &[SpeedRecord], cells: &[VoronoiCell]) -> Self {
        let speed_by_key: HashMap<(PedestrianID, FrameNumber), &SpeedRecord> = speeds
            .iter()
            .map(|s| ((s.id, s.frame), s))
            .collect();
        let cell_by_key: HashMap<(PedestrianID, FrameNumber), &VoronoiCell> = cells
            .iter()
            .map(|c| ((c.id, c.frame), c))
            .collect();

        let mut rows = Vec::with_capacity(trajectory.rows().len());
        for traj_row in trajectory.rows() {
            let key = (traj_row.id, traj_row.frame);
            let (speed, cell) = match (speed_by_key.get(&key), cell_by_key.get(&key)) {
                (Some(s), Some(c)) => (s, c),
                _ => continue,
            };
            rows.push(ProfileRow {
                id: traj_row.id,
                frame: traj_row.frame,
                x: traj_row.x,
                y: traj_row.y,
                speed: speed.speed,
                v_x: speed.v_x,
                v_y: speed.v_y,
                density: cell.density,
                polygon: cell.polygon.clone(),
            });
        }
        info!(
            file = trajectory.source(),
            rows = rows.len(),
            dropped = trajectory.rows().len() - rows.len(),
            "profile table merged"
        );
        ProfileTable {
            source: trajectory.source().to_string(),
            frame_rate: trajectory.frame_rate(),
            rows,
        }
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }
    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn keys(&self) -> BTreeSet<(PedestrianID, FrameNumber)> {
        self.rows.iter().map(|row| (row.id, row.frame)).collect()
    }
    /// Row indices grouped by frame
    pub fn frames(&self) -> BTreeMap<FrameNumber, Vec<usize>> {
        let mut frames: BTreeMap<FrameNumber, Vec<usize>> = BTreeMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            frames.entry(row.frame).or_default().push(idx);
        }
        frames
    }
}
