mod voronoi;

pub use self::voronoi::*;
