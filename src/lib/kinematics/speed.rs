use std::fmt;
use std::str::FromStr;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lib::errors::AppError;
use crate::lib::trajectory::{FrameNumber, PedestrianID, TrajectoryData};

/// How frames lacking a full `[frame - step, frame + step]` window are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedBorderMethod {
    /// Missing end of the window is replaced by the current frame
    #[default]
    SingleSided,
    /// Frames without a full window produce no value
    Exclude,
    /// Window shrinks symmetrically to fit the available frames
    Adaptive,
}

impl FromStr for SpeedBorderMethod {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_sided" => Ok(SpeedBorderMethod::SingleSided),
            "exclude" => Ok(SpeedBorderMethod::Exclude),
            "adaptive" => Ok(SpeedBorderMethod::Adaptive),
            _ => Err(AppError::InvalidSettings(format!(
                "invalid speed border method '{}'. Supported methods are 'single_sided', 'exclude' and 'adaptive'",
                s
            ))),
        }
    }
}

impl fmt::Display for SpeedBorderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedBorderMethod::SingleSided => write!(f, "single_sided"),
            SpeedBorderMethod::Exclude => write!(f, "exclude"),
            SpeedBorderMethod::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Instantaneous speed of a pedestrian in a single frame (m/s)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRecord {
    pub id: PedestrianID,
    pub frame: FrameNumber,
    pub speed: f64,
    pub v_x: f64,
    pub v_y: f64,
}

/// Computes per-frame speed of every pedestrian by finite differences over `frame_step`.
/// Result is ordered by (frame, id).
pub fn compute_individual_speed(trajectory: &TrajectoryData, frame_step: i64, border_method: SpeedBorderMethod) -> Vec<SpeedRecord> {
    let frame_step = frame_step.max(1);
    let fps = trajectory.frame_rate();
    let mut records = Vec::with_capacity(trajectory.rows().len());

    for (id, rows) in trajectory.pedestrians() {
        // Sorted by frame; gaps in the frame numbers are allowed
        let samples: Vec<(FrameNumber, Vector2<f64>)> = rows
            .iter()
            .map(|row| (row.frame, Vector2::new(row.x, row.y)))
            .collect();
        for (idx, &(frame, _)) in samples.iter().enumerate() {
            let (start, end) = match speed_window(idx, samples.len(), frame_step as usize, border_method) {
                Some(w) => w,
                None => continue,
            };
            let (start_frame, start_position) = samples[start];
            let (end_frame, end_position) = samples[end];
            let elapsed = (end_frame - start_frame) as f64 / fps;
            let velocity = (end_position - start_position) / elapsed;
            records.push(SpeedRecord {
                id,
                frame,
                speed: velocity.norm(),
                v_x: velocity.x,
                v_y: velocity.y,
            });
        }
    }
    records.sort_by_key(|r| (r.frame, r.id));
    info!(file = trajectory.source(), records = records.len(), "individual speeds computed");
    records
}

// Indices of the first and last sample of the difference window, shifted by `step` samples around `idx`.
// None when no positive-length window exists
fn speed_window(idx: usize, len: usize, step: usize, border_method: SpeedBorderMethod) -> Option<(usize, usize)> {
    let has_before = idx >= step;
    let has_after = idx + step < len;
    let (start, end) = match border_method {
        SpeedBorderMethod::SingleSided => {
            let start = if has_before { idx - step } else { idx };
            let end = if has_after { idx + step } else { idx };
            (start, end)
        },
        SpeedBorderMethod::Exclude => {
            if !(has_before && has_after) {
                return None;
            }
            (idx - step, idx + step)
        },
        SpeedBorderMethod::Adaptive => {
            let reduced = step.min(idx).min(len.saturating_sub(idx + 1));
            (idx - reduced, idx + reduced)
        },
    };
    if end <= start {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::trajectory::{TrajectoryRow, TrajectoryUnit};

    // Pedestrian walking along x with 0.04 m per frame at 25 fps => 1 m/s
    fn straight_walk(frames: i64) -> TrajectoryData {
        let rows = (0..frames)
            .map(|f| TrajectoryRow { id: 1, frame: f, x: -5.0 + 0.04 * f as f64, y: 6.0 })
            .collect();
        TrajectoryData::new("walk.txt".to_string(), 25.0, TrajectoryUnit::Meter, rows).unwrap()
    }

    #[test]
    fn test_single_sided_keeps_borders() {
        let data = straight_walk(5);
        let speeds = compute_individual_speed(&data, 1, SpeedBorderMethod::SingleSided);
        assert_eq!(speeds.len(), 5);
        for record in speeds.iter() {
            assert!((record.speed - 1.0).abs() < 1e-9);
            assert!((record.v_x - 1.0).abs() < 1e-9);
            assert!(record.v_y.abs() < 1e-9);
        }
        assert_eq!(speeds.first().unwrap().frame, 0);
        assert_eq!(speeds.last().unwrap().frame, 4);
    }

    #[test]
    fn test_exclude_drops_borders() {
        let data = straight_walk(5);
        let speeds = compute_individual_speed(&data, 2, SpeedBorderMethod::Exclude);
        let frames: Vec<i64> = speeds.iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![2]);
    }

    #[test]
    fn test_adaptive_shrinks_window() {
        let data = straight_walk(5);
        let speeds = compute_individual_speed(&data, 2, SpeedBorderMethod::Adaptive);
        let frames: Vec<i64> = speeds.iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![1, 2, 3]);
        assert!(speeds.iter().all(|r| (r.speed - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_frame_gaps() {
        // Recorded every second frame, 0.08 m per sample at 25 fps => 1 m/s
        let rows = (0..3)
            .map(|i| TrajectoryRow { id: 1, frame: 2 * i, x: -5.0 + 0.08 * i as f64, y: 6.0 })
            .collect();
        let data = TrajectoryData::new("gaps.txt".to_string(), 25.0, TrajectoryUnit::Meter, rows).unwrap();
        let speeds = compute_individual_speed(&data, 1, SpeedBorderMethod::SingleSided);
        let frames: Vec<i64> = speeds.iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![0, 2, 4]);
        assert!(speeds.iter().all(|r| (r.speed - 1.0).abs() < 1e-9));
        let central = compute_individual_speed(&data, 1, SpeedBorderMethod::Exclude);
        assert_eq!(central.len(), 1);
        assert_eq!(central[0].frame, 2);
        assert!((central[0].speed - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_frame_pedestrian() {
        let rows = vec![TrajectoryRow { id: 7, frame: 3, x: -1.0, y: 6.0 }];
        let data = TrajectoryData::new("one.txt".to_string(), 25.0, TrajectoryUnit::Meter, rows).unwrap();
        assert!(compute_individual_speed(&data, 1, SpeedBorderMethod::SingleSided).is_empty());
    }

    #[test]
    fn test_border_method_parse() {
        assert_eq!("adaptive".parse::<SpeedBorderMethod>().unwrap(), SpeedBorderMethod::Adaptive);
        assert!("central".parse::<SpeedBorderMethod>().is_err());
    }
}
