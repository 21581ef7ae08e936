mod profile_table;
mod grid;
mod intersections;
mod profiles;

pub use self::{profile_table::*, grid::*, intersections::*, profiles::*};
