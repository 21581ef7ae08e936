use std::fs;
use std::fmt;
use std::path::PathBuf;

use serde::{ Deserialize, Serialize };

use crate::lib::errors::{AppError, Result};
use crate::lib::kinematics::SpeedBorderMethod;
use crate::lib::profiles::{DensityMethod, ProfileMethods, SpeedMethod};
use crate::lib::spatial::WalkableArea;
use crate::lib::trajectory::TrajectoryUnit;
use crate::lib::voronoi::CutOff;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppSettings {
    pub input: InputSettings,
    pub walkable_area: WalkableAreaSettings,
    pub voronoi: Option<VoronoiSettings>,
    #[serde(default)]
    pub speed: SpeedSettings,
    #[serde(default)]
    pub profiles: ProfilesSettings,
    #[serde(default)]
    pub output: OutputSettings,
    pub debug: Option<DebugSettings>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InputSettings {
    /// Directory containing trajectory files
    pub directory: String,
    /// Glob pattern matched against file names
    #[serde(default = "default_pattern")]
    pub pattern: String,
    pub frame_rate: f64,
    #[serde(default)]
    pub unit: TrajectoryUnit,
}

fn default_pattern() -> String { "*.txt".to_string() }

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WalkableAreaSettings {
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoronoiSettings {
    /// Radius of the circle every cell is restricted to. No restriction if not set
    pub cut_off_radius: Option<f64>,
    #[serde(default = "default_quad_segments")]
    pub quad_segments: usize,
}

fn default_quad_segments() -> usize { 3 }

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpeedSettings {
    #[serde(default = "default_frame_step")]
    pub frame_step: i64,
    #[serde(default)]
    pub border_method: SpeedBorderMethod,
}

fn default_frame_step() -> i64 { 1 }

impl Default for SpeedSettings {
    fn default() -> Self {
        SpeedSettings {
            frame_step: default_frame_step(),
            border_method: SpeedBorderMethod::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProfilesSettings {
    /// Side of a square grid cell (m)
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub density_method: DensityMethod,
    #[serde(default)]
    pub speed_method: SpeedMethod,
    /// Only used by Gaussian methods
    #[serde(default = "default_gaussian_fwhm")]
    pub gaussian_fwhm: f64,
}

fn default_grid_size() -> f64 { 0.4 }
fn default_gaussian_fwhm() -> f64 { 0.5 }

impl Default for ProfilesSettings {
    fn default() -> Self {
        ProfilesSettings {
            grid_size: default_grid_size(),
            density_method: DensityMethod::default(),
            speed_method: SpeedMethod::default(),
            gaussian_fwhm: default_gaussian_fwhm(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_profile_table")]
    pub profile_table: String,
    #[serde(default = "default_profiles")]
    pub profiles: String,
    /// Combined heatmap. Per-file heatmaps are written next to it
    #[serde(default = "default_heatmap")]
    pub heatmap: String,
    #[serde(default = "default_pixels_per_cell")]
    pub pixels_per_cell: u32,
    #[serde(default = "default_density_range")]
    pub density_range: [f64; 2],
    #[serde(default = "default_speed_range")]
    pub speed_range: [f64; 2],
    #[serde(default = "default_flow_range")]
    pub flow_range: [f64; 2],
}

fn default_profile_table() -> String { "output/profile_table.json".to_string() }
fn default_profiles() -> String { "output/profiles.json".to_string() }
fn default_heatmap() -> String { "output/profiles.png".to_string() }
fn default_pixels_per_cell() -> u32 { 24 }
fn default_density_range() -> [f64; 2] { [0.0, 1.0] }
fn default_speed_range() -> [f64; 2] { [0.0, 1.6] }
fn default_flow_range() -> [f64; 2] { [0.0, 1.2] }

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            profile_table: default_profile_table(),
            profiles: default_profiles(),
            heatmap: default_heatmap(),
            pixels_per_cell: default_pixels_per_cell(),
            density_range: default_density_range(),
            speed_range: default_speed_range(),
            flow_range: default_flow_range(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DebugSettings {
    pub enable: bool
}

impl AppSettings {
    pub fn new(filename: &str) -> Result<Self> {
        let toml_contents = fs::read_to_string(filename).map_err(|err| AppError::io(filename, err))?;
        Self::from_toml_str(&toml_contents)
    }
    pub fn from_toml_str(toml_contents: &str) -> Result<Self> {
        let mut app_settings = toml::from_str::<AppSettings>(toml_contents)?;
        if app_settings.debug.is_none() {
            app_settings.debug = Some(DebugSettings{
                enable: false,
            });
        }
        app_settings.validate()?;
        Ok(app_settings)
    }
    fn validate(&self) -> Result<()> {
        if !(self.input.frame_rate > 0.0) || !self.input.frame_rate.is_finite() {
            return Err(AppError::InvalidSettings(format!("frame rate must be positive, got {}", self.input.frame_rate)));
        }
        if !(self.profiles.grid_size > 0.0) || !self.profiles.grid_size.is_finite() {
            return Err(AppError::InvalidSettings(format!("grid size must be positive, got {}", self.profiles.grid_size)));
        }
        if self.speed.frame_step < 1 {
            return Err(AppError::InvalidSettings(format!("frame step must be at least 1, got {}", self.speed.frame_step)));
        }
        let gaussian = self.profiles.density_method == DensityMethod::Gaussian || self.profiles.speed_method == SpeedMethod::Gaussian;
        if gaussian && !(self.profiles.gaussian_fwhm > 0.0) {
            return Err(AppError::InvalidSettings(format!("gaussian_fwhm must be positive, got {}", self.profiles.gaussian_fwhm)));
        }
        if let Some(cut_off) = self.cut_off() {
            if !(cut_off.radius > 0.0) || cut_off.quad_segments < 1 {
                return Err(AppError::InvalidSettings(format!(
                    "cut-off needs positive radius and at least one quad segment, got radius {} with {} segments",
                    cut_off.radius, cut_off.quad_segments
                )));
            }
        }
        for (name, range) in [
            ("density_range", self.output.density_range),
            ("speed_range", self.output.speed_range),
            ("flow_range", self.output.flow_range),
        ] {
            if !(range[0] < range[1]) {
                return Err(AppError::InvalidSettings(format!("{} must satisfy min < max, got {:?}", name, range)));
            }
        }
        if self.output.pixels_per_cell == 0 {
            return Err(AppError::InvalidSettings("pixels_per_cell must be positive".to_string()));
        }
        // Fails on degenerate polygons
        self.walkable_area()?;
        Ok(())
    }
    pub fn walkable_area(&self) -> Result<WalkableArea> {
        WalkableArea::new(&self.walkable_area.coordinates)
    }
    pub fn cut_off(&self) -> Option<CutOff> {
        let voronoi = self.voronoi.as_ref()?;
        voronoi.cut_off_radius.map(|radius| CutOff {
            radius,
            quad_segments: voronoi.quad_segments,
        })
    }
    pub fn profile_methods(&self) -> ProfileMethods {
        ProfileMethods {
            density: self.profiles.density_method,
            speed: self.profiles.speed_method,
            gaussian_fwhm: self.profiles.gaussian_fwhm,
        }
    }
    pub fn input_directory(&self) -> PathBuf {
        PathBuf::from(&self.input.directory)
    }
    pub fn debug_enabled(&self) -> bool {
        self.debug.as_ref().map(|d| d.enable).unwrap_or(false)
    }
}

impl fmt::Display for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Trajectories: {}/{}\n\tFrame rate: {}\n\tUnit: {}\n\tWalkable area points: {}\n\tCut-off radius: {:?}\n\tFrame step: {}\n\tBorder method: {}\n\tGrid size: {}\n\tDensity method: {}\n\tSpeed method: {}\n\tProfile table: {}\n\tHeatmap: {}",
            self.input.directory,
            self.input.pattern,
            self.input.frame_rate,
            self.input.unit,
            self.walkable_area.coordinates.len(),
            self.cut_off().map(|c| c.radius),
            self.speed.frame_step,
            self.speed.border_method,
            self.profiles.grid_size,
            self.profiles.density_method,
            self.profiles.speed_method,
            self.output.profile_table,
            self.output.heatmap,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[input]
directory = "data/trajectories"
frame_rate = 25.0

[walkable_area]
coordinates = [[-6.0, 5.0], [0.0, 5.0], [0.0, 7.0], [-6.0, 7.0]]
"#;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(settings.input.pattern, "*.txt");
        assert_eq!(settings.input.unit, TrajectoryUnit::Meter);
        assert_eq!(settings.speed.frame_step, 1);
        assert_eq!(settings.speed.border_method, SpeedBorderMethod::SingleSided);
        assert_eq!(settings.profiles.grid_size, 0.4);
        assert_eq!(settings.profiles.density_method, DensityMethod::Voronoi);
        assert_eq!(settings.output.pixels_per_cell, 24);
        assert!(settings.cut_off().is_none());
        assert!(!settings.debug_enabled());
        assert!((settings.walkable_area().unwrap().area() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_full() {
        let contents = format!("{}{}", MINIMAL, r#"
[voronoi]
cut_off_radius = 0.8
quad_segments = 4

[speed]
frame_step = 5
border_method = "adaptive"

[profiles]
grid_size = 0.25
density_method = "gaussian"
speed_method = "arithmetic"
gaussian_fwhm = 0.6

[debug]
enable = true
"#);
        let settings = AppSettings::from_toml_str(&contents).unwrap();
        assert_eq!(settings.cut_off(), Some(CutOff { radius: 0.8, quad_segments: 4 }));
        assert_eq!(settings.speed.border_method, SpeedBorderMethod::Adaptive);
        let methods = settings.profile_methods();
        assert_eq!(methods.density, DensityMethod::Gaussian);
        assert_eq!(methods.speed, SpeedMethod::Arithmetic);
        assert!(settings.debug_enabled());
    }

    #[test]
    fn test_validation() {
        let bad_rate = MINIMAL.replace("frame_rate = 25.0", "frame_rate = 0.0");
        assert!(matches!(AppSettings::from_toml_str(&bad_rate), Err(AppError::InvalidSettings(_))));

        let bad_grid = format!("{}\n[profiles]\ngrid_size = -1.0\n", MINIMAL);
        assert!(matches!(AppSettings::from_toml_str(&bad_grid), Err(AppError::InvalidSettings(_))));

        let bad_range = format!("{}\n[output]\nspeed_range = [1.0, 1.0]\n", MINIMAL);
        assert!(matches!(AppSettings::from_toml_str(&bad_range), Err(AppError::InvalidSettings(_))));

        let bad_area = MINIMAL.replace("[[-6.0, 5.0], [0.0, 5.0], [0.0, 7.0], [-6.0, 7.0]]", "[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]");
        assert!(AppSettings::from_toml_str(&bad_area).is_err());

        let bad_method = format!("{}\n[speed]\nborder_method = \"sideways\"\n", MINIMAL);
        assert!(matches!(AppSettings::from_toml_str(&bad_method), Err(AppError::Settings(_))));
    }
}
