pub mod geometry;
mod clipping;
mod walkable_area;

pub use self::{geometry::*, clipping::*, walkable_area::*};
