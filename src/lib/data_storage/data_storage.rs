use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use geo::MultiPolygon;
use ndarray::Array2;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::lib::constants::PROFILE_TABLE_FORMAT_VERSION;
use crate::lib::errors::{AppError, Result};
use crate::lib::profiles::{Grid, Profile, ProfileMethods, ProfileRow, ProfileTable};
use crate::lib::trajectory::{FrameNumber, PedestrianID};

/// Persisted profile tables keyed by trajectory file name
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StoredProfileTables {
    pub format_version: u32,
    pub tables: BTreeMap<String, StoredProfileTable>,
}

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StoredProfileTable {
    pub frame_rate: f64,
    /// Ordered by (frame, id)
    pub rows: Vec<StoredProfileRow>,
}

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StoredProfileRow {
    pub id: PedestrianID,
    pub frame: FrameNumber,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub v_x: f64,
    pub v_y: f64,
    pub density: f64,
    /// Open exterior ring of every part of the Voronoi polygon
    pub polygon: Vec<Vec<[f64; 2]>>,
}

impl From<&ProfileRow> for StoredProfileRow {
    fn from(row: &ProfileRow) -> Self {
        StoredProfileRow {
            id: row.id,
            frame: row.frame,
            x: row.x,
            y: row.y,
            speed: row.speed,
            v_x: row.v_x,
            v_y: row.v_y,
            density: row.density,
            polygon: open_rings(&row.polygon),
        }
    }
}

/// Exterior rings without the closing point
fn open_rings(polygon: &MultiPolygon<f64>) -> Vec<Vec<[f64; 2]>> {
    polygon
        .iter()
        .map(|part| {
            let coords = &part.exterior().0;
            let open = coords.len().saturating_sub(1);
            coords[..open].iter().map(|c| [c.x, c.y]).collect()
        })
        .collect()
}

impl From<&ProfileTable> for StoredProfileTable {
    fn from(table: &ProfileTable) -> Self {
        StoredProfileTable {
            frame_rate: table.frame_rate(),
            rows: table.rows().iter().map(StoredProfileRow::from).collect(),
        }
    }
}

/// Averaged profiles and the grid they are defined on
#[derive(Serialize, Debug, Clone)]
pub struct StoredProfiles {
    pub format_version: u32,
    pub grid: StoredGrid,
    pub density_method: String,
    pub speed_method: String,
    pub combined: StoredProfile,
    pub files: BTreeMap<String, StoredProfile>,
}

#[derive(Serialize, Debug, Clone)]
pub struct StoredGrid {
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f64,
    /// Top-left corner
    pub origin: [f64; 2],
}

/// Row-major values, first row at the top. Undefined values are null.
#[derive(Serialize, Debug, Clone)]
pub struct StoredProfile {
    pub frames: usize,
    pub density: Vec<Vec<Option<f64>>>,
    pub speed: Vec<Vec<Option<f64>>>,
    pub flow: Vec<Vec<Option<f64>>>,
}

impl From<&Profile> for StoredProfile {
    fn from(profile: &Profile) -> Self {
        StoredProfile {
            frames: profile.frames,
            density: nested_rows(&profile.density),
            speed: nested_rows(&profile.speed),
            flow: nested_rows(&profile.flow),
        }
    }
}

fn nested_rows(values: &Array2<f64>) -> Vec<Vec<Option<f64>>> {
    values
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&v| if v.is_nan() { None } else { Some(v) }).collect())
        .collect()
}

/// Writes profile tables as versioned JSON
pub fn save_profile_tables<'a, I>(path: &Path, tables: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ProfileTable>,
{
    let stored = StoredProfileTables {
        format_version: PROFILE_TABLE_FORMAT_VERSION,
        tables: tables
            .into_iter()
            .map(|table| (table.source().to_string(), StoredProfileTable::from(table)))
            .collect(),
    };
    write_json(path, &stored)?;
    info!(tables = stored.tables.len(), "profile tables saved to '{}'", path.display());
    Ok(())
}

/// Writes combined and per-file averaged profiles as JSON
pub fn save_profiles<'a, I>(path: &Path, grid: &Grid, methods: &ProfileMethods, combined: &Profile, files: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a Profile)>,
{
    let origin = grid.origin();
    let stored = StoredProfiles {
        format_version: PROFILE_TABLE_FORMAT_VERSION,
        grid: StoredGrid {
            rows: grid.rows(),
            cols: grid.cols(),
            cell_size: grid.cell_size(),
            origin: [origin.x, origin.y],
        },
        density_method: methods.density.to_string(),
        speed_method: methods.speed.to_string(),
        combined: StoredProfile::from(combined),
        files: files
            .into_iter()
            .map(|(name, profile)| (name.to_string(), StoredProfile::from(profile)))
            .collect(),
    };
    write_json(path, &stored)?;
    info!("profiles saved to '{}'", path.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| AppError::io(parent, err))?;
        }
    }
    let file = File::create(path).map_err(|err| AppError::io(path, err))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(|err| AppError::io(path, err))?;
    Ok(())
}
