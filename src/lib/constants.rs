/// Shared numeric constants for floating-point operations.

/// Epsilon for general floating-point comparisons.
/// Use for: coordinates in metres, grid extents, colour scale positions.
pub const EPSILON: f64 = 1e-9;

/// Epsilon for very small value checks (near-zero detection).
/// Use for: polygon areas, degenerate geometry detection.
pub const EPSILON_TINY: f64 = 1e-12;

/// Centimetres in one metre
pub const CENTIMETERS_PER_METER: f64 = 100.0;

/// Format version written into persisted profile tables
pub const PROFILE_TABLE_FORMAT_VERSION: u32 = 1;
