mod colors;
mod heatmap;

pub use self::{colors::*, heatmap::*};
