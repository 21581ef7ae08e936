pub mod constants;
pub mod errors;
pub mod spatial;
pub mod trajectory;
pub mod voronoi;
pub mod kinematics;
pub mod profiles;
pub mod data_storage;
pub mod draw;
pub mod perf_stats;
pub mod pipeline;
