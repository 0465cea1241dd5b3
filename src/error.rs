use thiserror::Error;

/// Errors raised by the tracking and counting core.
#[derive(Debug, Error)]
pub enum FootfallError {
    /// Box with non-positive width/height or a non-finite coordinate.
    #[error("degenerate bounding box [{x1}, {y1}, {x2}, {y2}]")]
    DegenerateBox { x1: f32, y1: f32, x2: f32, y2: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("linear assignment failed: {0}")]
    Assignment(String),

    #[error("line {line}: invalid detection list: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FootfallError>;
