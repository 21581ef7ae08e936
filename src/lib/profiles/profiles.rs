use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::lib::errors::AppError;
use crate::lib::profiles::{Grid, GridIntersections, ProfileTable};
use crate::lib::spatial::distance;
use crate::lib::trajectory::FrameNumber;

/// How per-cell density is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DensityMethod {
    /// Voronoi polygons weighted by their overlap with the cell
    #[default]
    Voronoi,
    /// Pedestrians positioned in the cell divided by cell area
    Classic,
    /// Sum of Gaussian kernels centred on pedestrians
    Gaussian,
}

/// How per-cell speed is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMethod {
    /// Overlap-area weighted mean of individual speeds
    #[default]
    Voronoi,
    /// Mean speed of pedestrians positioned in the cell
    Arithmetic,
    /// Gaussian-weighted mean of speeds around the cell centre
    Gaussian,
}

impl FromStr for DensityMethod {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voronoi" => Ok(DensityMethod::Voronoi),
            "classic" => Ok(DensityMethod::Classic),
            "gaussian" => Ok(DensityMethod::Gaussian),
            _ => Err(AppError::InvalidSettings(format!("invalid density method: '{}'", s))),
        }
    }
}

impl FromStr for SpeedMethod {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voronoi" => Ok(SpeedMethod::Voronoi),
            "arithmetic" => Ok(SpeedMethod::Arithmetic),
            "gaussian" => Ok(SpeedMethod::Gaussian),
            _ => Err(AppError::InvalidSettings(format!("invalid speed method: '{}'", s))),
        }
    }
}

impl fmt::Display for DensityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DensityMethod::Voronoi => write!(f, "voronoi"),
            DensityMethod::Classic => write!(f, "classic"),
            DensityMethod::Gaussian => write!(f, "gaussian"),
        }
    }
}

impl fmt::Display for SpeedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedMethod::Voronoi => write!(f, "voronoi"),
            SpeedMethod::Arithmetic => write!(f, "arithmetic"),
            SpeedMethod::Gaussian => write!(f, "gaussian"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileMethods {
    pub density: DensityMethod,
    pub speed: SpeedMethod,
    /// Full width at half maximum of the Gaussian kernel (m)
    pub gaussian_fwhm: f64,
}

impl Default for ProfileMethods {
    fn default() -> Self {
        ProfileMethods {
            density: DensityMethod::Voronoi,
            speed: SpeedMethod::Voronoi,
            gaussian_fwhm: 0.5,
        }
    }
}

/// Density and speed profiles of a single frame, shaped (rows, cols)
#[derive(Debug, Clone)]
pub struct FrameProfile {
    pub frame: FrameNumber,
    pub density: Array2<f64>,
    /// NaN where speed is undefined in this frame
    pub speed: Array2<f64>,
}

/// Profiles averaged over a measurement period
#[derive(Debug, Clone)]
pub struct Profile {
    pub density: Array2<f64>,
    /// NaN where no frame defines a speed
    pub speed: Array2<f64>,
    /// density * speed, cell by cell
    pub flow: Array2<f64>,
    pub frames: usize,
}

/// Computes density and speed profile for every frame of the profile table
pub fn compute_frame_profiles(grid: &Grid, table: &ProfileTable, intersections: &GridIntersections, methods: &ProfileMethods) -> Vec<FrameProfile> {
    table
        .frames()
        .into_iter()
        .map(|(frame, row_indices)| FrameProfile {
            frame,
            density: frame_density(grid, table, intersections, &row_indices, methods),
            speed: frame_speed(grid, table, intersections, &row_indices, methods),
        })
        .collect()
}

fn frame_density(grid: &Grid, table: &ProfileTable, intersections: &GridIntersections, row_indices: &[usize], methods: &ProfileMethods) -> Array2<f64> {
    let mut density = Array2::<f64>::zeros((grid.rows(), grid.cols()));
    let cell_area = grid.cell_area();
    match methods.density {
        DensityMethod::Voronoi => {
            for &idx in row_indices {
                let individual_density = table.rows()[idx].density;
                for overlap in intersections.row(idx) {
                    density[grid.position(overlap.cell)] += overlap.area * individual_density / cell_area;
                }
            }
        },
        DensityMethod::Classic => {
            for &idx in row_indices {
                let row = &table.rows()[idx];
                if let Some(cell) = grid.cell_at(row.x, row.y) {
                    density[grid.position(cell)] += 1.0 / cell_area;
                }
            }
        },
        DensityMethod::Gaussian => {
            let sigma = fwhm_to_sigma(methods.gaussian_fwhm);
            let norm = 1.0 / (2.0 * std::f64::consts::PI * sigma * sigma);
            for cell in 0..grid.len() {
                let center = grid.cell_center(cell);
                let value: f64 = row_indices
                    .iter()
                    .map(|&idx| {
                        let row = &table.rows()[idx];
                        let d = distance(center, geo::Coord { x: row.x, y: row.y });
                        norm * (-(d * d) / (2.0 * sigma * sigma)).exp()
                    })
                    .sum();
                density[grid.position(cell)] = value;
            }
        },
    }
    density
}

fn frame_speed(grid: &Grid, table: &ProfileTable, intersections: &GridIntersections, row_indices: &[usize], methods: &ProfileMethods) -> Array2<f64> {
    let shape = (grid.rows(), grid.cols());
    let mut weighted = Array2::<f64>::zeros(shape);
    let mut weights = Array2::<f64>::zeros(shape);
    match methods.speed {
        SpeedMethod::Voronoi => {
            for &idx in row_indices {
                let speed = table.rows()[idx].speed;
                for overlap in intersections.row(idx) {
                    let pos = grid.position(overlap.cell);
                    weighted[pos] += overlap.area * speed;
                    weights[pos] += overlap.area;
                }
            }
        },
        SpeedMethod::Arithmetic => {
            for &idx in row_indices {
                let row = &table.rows()[idx];
                if let Some(cell) = grid.cell_at(row.x, row.y) {
                    let pos = grid.position(cell);
                    weighted[pos] += row.speed;
                    weights[pos] += 1.0;
                }
            }
        },
        SpeedMethod::Gaussian => {
            let sigma = fwhm_to_sigma(methods.gaussian_fwhm);
            for cell in 0..grid.len() {
                let center = grid.cell_center(cell);
                let pos = grid.position(cell);
                for &idx in row_indices {
                    let row = &table.rows()[idx];
                    let d = distance(center, geo::Coord { x: row.x, y: row.y });
                    let w = (-(d * d) / (2.0 * sigma * sigma)).exp();
                    weighted[pos] += w * row.speed;
                    weights[pos] += w;
                }
            }
        },
    }
    Zip::from(&mut weighted).and(&weights).for_each(|value, &weight| {
        *value = if weight > 0.0 { *value / weight } else { f64::NAN };
    });
    weighted
}

/// sigma = FWHM / (2 * sqrt(2 * ln 2))
pub fn fwhm_to_sigma(fwhm: f64) -> f64 {
    fwhm / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt())
}

/// Averages frame profiles: density over all frames, speed over frames where it is defined.
/// Flow is the product of the averaged density and speed.
pub fn mean_profile<'a, I>(frame_profiles: I, rows: usize, cols: usize) -> Profile
where
    I: IntoIterator<Item = &'a FrameProfile>,
{
    let mut density_sum = Array2::<f64>::zeros((rows, cols));
    let mut speed_sum = Array2::<f64>::zeros((rows, cols));
    let mut speed_count = Array2::<f64>::zeros((rows, cols));
    let mut frames = 0;
    for fp in frame_profiles {
        density_sum += &fp.density;
        Zip::from(&mut speed_sum)
            .and(&mut speed_count)
            .and(&fp.speed)
            .for_each(|sum, count, &speed| {
                if !speed.is_nan() {
                    *sum += speed;
                    *count += 1.0;
                }
            });
        frames += 1;
    }
    let density = if frames > 0 {
        density_sum / frames as f64
    } else {
        density_sum
    };
    let mut speed = speed_sum;
    Zip::from(&mut speed).and(&speed_count).for_each(|value, &count| {
        *value = if count > 0.0 { *value / count } else { f64::NAN };
    });
    let flow = &density * &speed;
    Profile { density, speed, flow, frames }
}
