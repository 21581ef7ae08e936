use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::lib::data_storage::{save_profile_tables, save_profiles};
use crate::lib::draw::{Heatmap, HeatmapStyle};
use crate::lib::errors::{AppError, Result};
use crate::lib::kinematics::compute_individual_speed;
use crate::lib::perf_stats::{PerfStats, Timer};
use crate::lib::profiles::{
    compute_frame_profiles, compute_grid_intersections, mean_profile, FrameProfile, Grid, Profile, ProfileTable,
};
use crate::lib::spatial::WalkableArea;
use crate::lib::trajectory::{load_trajectories, TrajectoryData};
use crate::lib::voronoi::compute_voronoi_cells;
use crate::settings::AppSettings;

/// Everything computed for a single trajectory file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub table: ProfileTable,
    pub frame_profiles: Vec<FrameProfile>,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub grid: Grid,
    /// Walkable fraction of every grid cell
    pub coverage: Array2<f64>,
    /// Keyed by trajectory file name
    pub files: BTreeMap<String, FileAnalysis>,
    /// Frame profiles of all files pooled together
    pub combined: Profile,
}

/// Loads trajectories, computes profiles and writes every output
pub fn run(settings: &AppSettings) -> Result<()> {
    let mut stats = PerfStats::new();
    let walkable_area = settings.walkable_area()?;

    let timer = Timer::start();
    let trajectories = load_trajectories(
        &settings.input_directory(),
        &settings.input.pattern,
        &walkable_area,
        settings.input.frame_rate,
        settings.input.unit,
    )?;
    stats.record("load", timer.elapsed());

    let analysis = analyze(&trajectories, &walkable_area, settings, &mut stats)?;
    write_outputs(&analysis, settings, &mut stats)?;
    stats.log_summary();
    Ok(())
}

/// Computes profile tables and profiles of every trajectory file
pub fn analyze(
    trajectories: &BTreeMap<String, TrajectoryData>,
    walkable_area: &WalkableArea,
    settings: &AppSettings,
    stats: &mut PerfStats,
) -> Result<Analysis> {
    let grid = Grid::new(walkable_area, settings.profiles.grid_size)?;
    let coverage = grid.walkable_coverage(walkable_area);
    let cut_off = settings.cut_off();
    let methods = settings.profile_methods();
    info!(rows = grid.rows(), cols = grid.cols(), cell_size = grid.cell_size(), walkable_area = walkable_area.area(), "grid created");

    let mut files = BTreeMap::new();
    for (name, trajectory) in trajectories.iter() {
        let timer = Timer::start();
        let cells = compute_voronoi_cells(trajectory, walkable_area, cut_off.as_ref());
        stats.record("voronoi", timer.elapsed());

        let timer = Timer::start();
        let speeds = compute_individual_speed(trajectory, settings.speed.frame_step, settings.speed.border_method);
        stats.record("speed", timer.elapsed());

        let timer = Timer::start();
        let table = ProfileTable::merge(trajectory, &speeds, &cells);
        debug_assert!(table.keys().is_subset(&trajectory.keys()));
        if table.is_empty() {
            warn!(file = %name, "profile table is empty, profiles of this file are undefined");
        }
        let intersections = compute_grid_intersections(&grid, &table);
        let frame_profiles = compute_frame_profiles(&grid, &table, &intersections, &methods);
        let profile = mean_profile(frame_profiles.iter(), grid.rows(), grid.cols());
        stats.record("profiles", timer.elapsed());
        debug!(file = %name, frames = profile.frames, "profiles computed");

        files.insert(name.clone(), FileAnalysis { table, frame_profiles, profile });
    }

    let combined = mean_profile(
        files.values().flat_map(|file| file.frame_profiles.iter()),
        grid.rows(),
        grid.cols(),
    );
    info!(files = files.len(), frames = combined.frames, "combined profiles computed");
    Ok(Analysis { grid, coverage, files, combined })
}

/// Writes profile tables, profiles summary, combined heatmap and one heatmap per file
pub fn write_outputs(analysis: &Analysis, settings: &AppSettings, stats: &mut PerfStats) -> Result<()> {
    let timer = Timer::start();
    save_profile_tables(Path::new(&settings.output.profile_table), analysis.files.values().map(|file| &file.table))?;
    save_profiles(
        Path::new(&settings.output.profiles),
        &analysis.grid,
        &settings.profile_methods(),
        &analysis.combined,
        analysis.files.iter().map(|(name, file)| (name.as_str(), &file.profile)),
    )?;
    stats.record("storage", timer.elapsed());

    let timer = Timer::start();
    let style = HeatmapStyle {
        pixels_per_cell: settings.output.pixels_per_cell,
        density_range: settings.output.density_range,
        speed_range: settings.output.speed_range,
        flow_range: settings.output.flow_range,
    };
    let heatmap_path = PathBuf::from(&settings.output.heatmap);
    let file_paths = per_file_paths(&heatmap_path, analysis.files.keys().map(String::as_str))?;
    Heatmap::render(&analysis.combined, &analysis.coverage, &style).save(&heatmap_path)?;
    for ((_, file), path) in analysis.files.iter().zip(file_paths.iter()) {
        Heatmap::render(&file.profile, &analysis.coverage, &style).save(path)?;
    }
    stats.record("heatmap", timer.elapsed());
    info!(images = analysis.files.len() + 1, "heatmaps saved next to '{}'", heatmap_path.display());
    Ok(())
}

/// `output/profiles.png` + `run_01.txt` -> `output/profiles_run_01_txt.png`
pub fn per_file_path(base: &Path, source: &str) -> PathBuf {
    let stem = base.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "profiles".to_string());
    let source_name = Path::new(source)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
        .replace('.', "_");
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, source_name, ext.to_string_lossy()),
        None => format!("{}_{}", stem, source_name),
    };
    base.with_file_name(file_name)
}

/// Per-file heatmap paths in source order. Fails if two sources map to the same path
/// or a source would overwrite the combined heatmap.
pub fn per_file_paths<'a, I>(base: &Path, sources: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: BTreeMap<PathBuf, &str> = BTreeMap::new();
    let mut paths = Vec::new();
    for source in sources {
        let path = per_file_path(base, source);
        if path == base {
            return Err(AppError::OutputCollision { path, first: "combined".to_string(), second: source.to_string() });
        }
        if let Some(first) = taken.insert(path.clone(), source) {
            return Err(AppError::OutputCollision { path, first: first.to_string(), second: source.to_string() });
        }
        paths.push(path);
    }
    Ok(paths)
}
