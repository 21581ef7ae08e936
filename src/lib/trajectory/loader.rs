use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use globset::Glob;
use tracing::{debug, info, warn};

use crate::lib::constants::EPSILON;
use crate::lib::errors::{AppError, Result};
use crate::lib::spatial::WalkableArea;
use crate::lib::trajectory::{TrajectoryData, TrajectoryRow, TrajectoryUnit};

/// Metadata declared in comment lines of a trajectory file
#[derive(Debug, Default, PartialEq)]
struct HeaderMeta {
    frame_rate: Option<f64>,
    unit: Option<TrajectoryUnit>,
}

/// Loads every file in `directory` whose name matches `pattern`.
/// Returned map is keyed by file name.
pub fn load_trajectories(
    directory: &Path,
    pattern: &str,
    walkable_area: &WalkableArea,
    frame_rate: f64,
    unit: TrajectoryUnit,
) -> Result<BTreeMap<String, TrajectoryData>> {
    let matcher = Glob::new(pattern)?.compile_matcher();
    let entries = fs::read_dir(directory).map_err(|err| AppError::io(directory, err))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| AppError::io(directory, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matched = path
            .file_name()
            .map(|name| matcher.is_match(Path::new(name)))
            .unwrap_or(false);
        if matched {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(AppError::NoTrajectories {
            directory: directory.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    paths.sort();

    let mut trajectories = BTreeMap::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let contents = fs::read_to_string(&path).map_err(|err| AppError::io(&path, err))?;
        let data = parse_trajectory(&name, &contents, walkable_area, frame_rate, unit)?;
        if data.is_empty() {
            warn!(file = %name, "trajectory file has no rows");
        }
        debug!(file = %name, rows = data.rows().len(), pedestrians = data.pedestrians().len(), unit = %data.unit(), "trajectory loaded");
        trajectories.insert(name, data);
    }
    info!(files = trajectories.len(), "trajectories loaded from '{}'", directory.display());
    Ok(trajectories)
}

/// Parses whitespace separated `ID FRAME X Y [Z ...]` rows.
/// Frame rate and unit declared in the header must agree with the given ones.
pub fn parse_trajectory(
    source: &str,
    contents: &str,
    walkable_area: &WalkableArea,
    frame_rate: f64,
    unit: TrajectoryUnit,
) -> Result<TrajectoryData> {
    let mut meta = HeaderMeta::default();
    for line in contents.lines() {
        if let Some(comment) = line.trim().strip_prefix('#') {
            read_header_line(comment, &mut meta);
        }
    }
    if let Some(found) = meta.frame_rate {
        if (found - frame_rate).abs() > EPSILON {
            return Err(AppError::FrameRateMismatch {
                file: source.to_string(),
                expected: frame_rate,
                found,
            });
        }
    }
    if let Some(found) = meta.unit {
        if found != unit {
            return Err(AppError::UnitMismatch {
                file: source.to_string(),
                expected: unit.to_string(),
                found: found.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    let scale = unit.to_meters();

    for (idx, line) in contents.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        let malformed = |reason: String| AppError::MalformedTrajectory {
            file: source.to_string(),
            line: line_number,
            reason,
        };
        let columns: Vec<&str> = trimmed.split_whitespace().collect();
        if columns.len() < 4 {
            return Err(malformed(format!("expected at least 4 columns, got {}", columns.len())));
        }
        let id = parse_integer(columns[0]).ok_or_else(|| malformed(format!("bad pedestrian id '{}'", columns[0])))?;
        let frame = parse_integer(columns[1]).ok_or_else(|| malformed(format!("bad frame '{}'", columns[1])))?;
        if frame < 0 {
            return Err(malformed(format!("negative frame {}", frame)));
        }
        let x = parse_coordinate(columns[2]).ok_or_else(|| malformed(format!("bad x '{}'", columns[2])))?;
        let y = parse_coordinate(columns[3]).ok_or_else(|| malformed(format!("bad y '{}'", columns[3])))?;
        let (x, y) = (x * scale, y * scale);
        if !walkable_area.covers(x, y) {
            return Err(AppError::OutsideWalkableArea {
                file: source.to_string(),
                id,
                frame,
                x,
                y,
            });
        }
        rows.push(TrajectoryRow { id, frame, x, y });
    }
    TrajectoryData::new(source.to_string(), frame_rate, unit, rows)
}

fn read_header_line(comment: &str, meta: &mut HeaderMeta) {
    let lowered = comment.to_lowercase();
    if let Some(pos) = lowered.find("framerate") {
        let tail = &lowered[pos + "framerate".len()..];
        let number: String = tail
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Ok(value) = number.parse::<f64>() {
            meta.frame_rate = Some(value);
        }
    }
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == ':' || c == '(' || c == ')' || c == '[' || c == ']'))
        .collect();
    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).copied();
        let declared = match (*token, next) {
            ("x/cm", _) | ("in", Some("cm")) => Some(TrajectoryUnit::Centimeter),
            ("x/m", _) | ("in", Some("m")) => Some(TrajectoryUnit::Meter),
            _ => None,
        };
        if declared.is_some() {
            meta.unit = declared;
            break;
        }
    }
}

// Integer columns are sometimes exported as floats ("12.0")
fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(value) = s.parse::<i64>() {
        return Some(value);
    }
    let value = s.parse::<f64>().ok()?;
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    if value.is_finite() && value.fract() == 0.0 && in_range {
        return Some(value as i64);
    }
    None
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn walkable_area() -> WalkableArea {
        WalkableArea::new(&[[-6.0, 5.0], [0.0, 5.0], [0.0, 7.0], [-6.0, 7.0]]).unwrap()
    }

    #[test]
    fn test_parse_trajectory() {
        let contents = "\
# description: bottleneck
# framerate: 25.00 fps
# ID FR X Y Z
1 0 -3.0 6.0 1.7
1 1 -2.9 6.0 1.7

2 0 -1.0 5.5 1.6
";
        let data = parse_trajectory("a.txt", contents, &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap();
        assert_eq!(data.rows().len(), 3);
        assert_eq!(data.rows()[0], TrajectoryRow { id: 1, frame: 0, x: -3.0, y: 6.0 });
        assert_eq!(data.frame_rate(), 25.0);
    }

    #[test]
    fn test_centimeters() {
        let contents = "# x/cm\n1 0 -300 600\n";
        let data = parse_trajectory("a.txt", contents, &walkable_area(), 16.0, TrajectoryUnit::Centimeter).unwrap();
        assert!((data.rows()[0].x + 3.0).abs() < 1e-12);
        assert!((data.rows()[0].y - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatches() {
        let contents = "# framerate: 16\n1 0 -3.0 6.0\n";
        let err = parse_trajectory("a.txt", contents, &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        assert!(matches!(err, AppError::FrameRateMismatch { .. }));

        let contents = "# all positions in cm\n1 0 -300 600\n";
        let err = parse_trajectory("a.txt", contents, &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        assert!(matches!(err, AppError::UnitMismatch { .. }));

        // Words merely containing a unit are not a declaration
        let contents = "# recorded within main square\n1 0 -300 600\n";
        assert!(parse_trajectory("a.txt", contents, &walkable_area(), 25.0, TrajectoryUnit::Centimeter).is_ok());
    }

    #[test]
    fn test_header_meta() {
        let mut meta = HeaderMeta::default();
        read_header_line(" framerate: 16.00 fps", &mut meta);
        read_header_line(" ID FR X/cm Y/cm", &mut meta);
        assert_eq!(meta, HeaderMeta { frame_rate: Some(16.0), unit: Some(TrajectoryUnit::Centimeter) });
    }

    #[test]
    fn test_malformed() {
        let err = parse_trajectory("a.txt", "1 0 -3.0\n", &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        match err {
            AppError::MalformedTrajectory { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {:?}", other),
        }
        let err = parse_trajectory("a.txt", "1 0 -3.0 6.0\n1 x -3.0 6.0\n", &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        match err {
            AppError::MalformedTrajectory { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
        let err = parse_trajectory("a.txt", "1 0 3.0 6.0\n", &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        assert!(matches!(err, AppError::OutsideWalkableArea { .. }));
    }

    #[test]
    fn test_integer_columns() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("1e3"), Some(1000));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("1e30"), None);
        assert_eq!(parse_integer("-1e30"), None);
        assert_eq!(parse_integer("9223372036854775808.0"), None);

        for contents in ["1e30 0 -3.0 6.0\n", "1 1e30 -3.0 6.0\n"] {
            let err = parse_trajectory("a.txt", contents, &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
            assert!(matches!(err, AppError::MalformedTrajectory { line: 1, .. }));
        }
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in [("b.txt", "2 0 -1.0 6.0\n"), ("a.txt", "1 0 -3.0 6.0\n"), ("notes.md", "ignored")] {
            let mut file = fs::File::create(dir.path().join(name)).unwrap();
            file.write_all(contents.as_bytes()).unwrap();
        }
        let loaded = load_trajectories(dir.path(), "*.txt", &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap();
        let names: Vec<&String> = loaded.keys().collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let err = load_trajectories(dir.path(), "*.csv", &walkable_area(), 25.0, TrajectoryUnit::Meter).unwrap_err();
        assert!(matches!(err, AppError::NoTrajectories { .. }));
    }
}
