//! Color mapping for profile heatmaps.
//!
//! Values are mapped linearly onto a hue ramp in HSV color space, from blue for the lower
//! bound of a range to red for the upper bound. Values outside of the range are clamped,
//! undefined values (NaN) get a neutral light grey.

use crate::lib::constants::EPSILON;

/// RGB color, 8 bits per channel
pub type Rgb = [u8; 3];

/// Color of undefined cells and cells outside of the walkable area
pub const NAN_COLOR: Rgb = [211, 211, 211];

/// Image background
pub const BACKGROUND_COLOR: Rgb = [255, 255, 255];

/// Hue of the lower bound (blue)
const HUE_LOW: f64 = 240.0;

/// Hue of the upper bound (red)
const HUE_HIGH: f64 = 0.0;

/// A linear blue-to-red color map over a fixed value range.
///
/// # Examples
///
/// ```
/// let cmap = ColorMap::new(0.0, 1.6);
/// let slow = cmap.color(0.0);   // blue
/// let fast = cmap.color(2.0);   // red, clamped
/// let none = cmap.color(f64::NAN); // light grey
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMap {
    /// Value mapped onto blue
    pub min: f64,
    /// Value mapped onto red
    pub max: f64,
}

impl ColorMap {
    pub fn new(min: f64, max: f64) -> Self {
        ColorMap { min, max }
    }
    pub fn from_range(range: [f64; 2]) -> Self {
        ColorMap::new(range[0], range[1])
    }

    /// Returns color for the given value.
    ///
    /// # Arguments
    ///
    /// * `value` - Profile value. NaN yields [`NAN_COLOR`]
    ///
    /// # Returns
    ///
    /// RGB color of the value clamped into `[min, max]`
    pub fn color(&self, value: f64) -> Rgb {
        if value.is_nan() {
            return NAN_COLOR;
        }
        self.color_at(self.normalize(value))
    }

    /// Color at relative position `t` of the ramp, `t` in [0; 1]
    pub fn color_at(&self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let hue = HUE_LOW + (HUE_HIGH - HUE_LOW) * t;
        hsv_to_rgb(hue, 1.0, 1.0)
    }

    /// Relative position of value inside of the range, clamped to [0; 1]
    fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < EPSILON {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Converts HSV color to RGB.
///
/// # Arguments
///
/// * `h` - Hue in degrees [0; 360)
/// * `s` - Saturation [0; 1]
/// * `v` - Value (brightness) [0; 1]
///
/// # Returns
///
/// RGB components [0; 255]
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r_prime, g_prime, b_prime) = match h as i32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        300..=359 => (c, 0.0, x),
        _ => (0.0, 0.0, 0.0),
    };

    let to_u8 = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r_prime), to_u8(g_prime), to_u8(b_prime)]
}
