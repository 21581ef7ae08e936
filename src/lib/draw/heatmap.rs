use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ndarray::Array2;
use tracing::debug;

use crate::lib::draw::{ColorMap, Rgb, BACKGROUND_COLOR, NAN_COLOR};
use crate::lib::errors::{AppError, Result};
use crate::lib::profiles::Profile;

/// Minimum height of a color bar in pixels
const MIN_COLOR_BAR_HEIGHT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapStyle {
    pub pixels_per_cell: u32,
    pub density_range: [f64; 2],
    pub speed_range: [f64; 2],
    pub flow_range: [f64; 2],
}

/// RGB raster of density, speed and flow panels placed side by side, each with a color bar under it
pub struct Heatmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Heatmap {
    /// Renders profile. Cells with zero walkable coverage are drawn as undefined.
    pub fn render(profile: &Profile, coverage: &Array2<f64>, style: &HeatmapStyle) -> Self {
        let panels = [
            (&profile.density, ColorMap::from_range(style.density_range)),
            (&profile.speed, ColorMap::from_range(style.speed_range)),
            (&profile.flow, ColorMap::from_range(style.flow_range)),
        ];
        let (rows, cols) = profile.density.dim();
        let ppc = style.pixels_per_cell.max(1);
        let margin = (ppc / 2).max(1);
        let panel_width = cols as u32 * ppc;
        let panel_height = rows as u32 * ppc;
        let bar_height = ppc.max(MIN_COLOR_BAR_HEIGHT);

        let width = panels.len() as u32 * (panel_width + margin) + margin;
        let height = panel_height + bar_height + 3 * margin;
        let mut heatmap = Heatmap {
            width,
            height,
            pixels: BACKGROUND_COLOR.iter().copied().cycle().take((width * height * 3) as usize).collect(),
        };

        for (panel_idx, (values, cmap)) in panels.iter().enumerate() {
            let left = margin + panel_idx as u32 * (panel_width + margin);
            for ((row, col), &value) in values.indexed_iter() {
                let color = if coverage[[row, col]] > 0.0 { cmap.color(value) } else { NAN_COLOR };
                heatmap.fill_rect(left + col as u32 * ppc, margin + row as u32 * ppc, ppc, ppc, color);
            }
            let bar_top = 2 * margin + panel_height;
            for x in 0..panel_width {
                let t = if panel_width > 1 { x as f64 / (panel_width - 1) as f64 } else { 0.0 };
                heatmap.fill_rect(left + x, bar_top, 1, bar_height, cmap.color_at(t));
            }
        }
        heatmap
    }
    /// Writes 8-bit RGB PNG. Parent directories are created if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| AppError::io(parent, err))?;
            }
        }
        let file = File::create(path).map_err(|err| AppError::io(path, err))?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        writer.finish()?;
        debug!(width = self.width, height = self.height, "heatmap saved to '{}'", path.display());
        Ok(())
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        for yy in y..(y + h).min(self.height) {
            for xx in x..(x + w).min(self.width) {
                let offset = ((yy * self.width + xx) * 3) as usize;
                self.pixels[offset..offset + 3].copy_from_slice(&color);
            }
        }
    }
}

#[cfg(test)]
impl Heatmap {
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let offset = ((y * self.width + x) * 3) as usize;
        [self.pixels[offset], self.pixels[offset + 1], self.pixels[offset + 2]]
    }
}
