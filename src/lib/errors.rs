use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("can't access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse TOML configuration file: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("no trajectory files matching '{pattern}' in '{directory}'")]
    NoTrajectories { directory: PathBuf, pattern: String },

    #[error("malformed trajectory '{file}' at line {line}: {reason}")]
    MalformedTrajectory { file: String, line: usize, reason: String },

    #[error("trajectory '{file}' declares frame rate {found}, expected {expected}")]
    FrameRateMismatch { file: String, expected: f64, found: f64 },

    #[error("trajectory '{file}' declares unit '{found}', expected '{expected}'")]
    UnitMismatch { file: String, expected: String, found: String },

    #[error("trajectory '{file}' has duplicate entry for pedestrian {id} at frame {frame}")]
    DuplicateKey { file: String, id: i64, frame: i64 },

    #[error("trajectory '{file}': pedestrian {id} at frame {frame} is outside of walkable area ({x}, {y})")]
    OutsideWalkableArea { file: String, id: i64, frame: i64, x: f64, y: f64 },

    #[error("heatmaps of '{first}' and '{second}' would both be written to '{path}'")]
    OutputCollision { path: PathBuf, first: String, second: String },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("can't encode PNG: {0}")]
    Png(#[from] png::EncodingError),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io { path: path.into(), source }
    }
}
