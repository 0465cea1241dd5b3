pub mod assignment;
pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod kalman_filter;
pub mod pipeline;
pub mod track;
pub mod tracker;

// Re-export main types
pub use crate::config::{Config, CounterConfig, TrackerConfig};
pub use crate::counter::{Counts, LineCounter};
pub use crate::detection::{read_frames, Detection};
pub use crate::error::{FootfallError, Result};
pub use crate::geometry::BBox;
pub use crate::pipeline::{FootfallCounter, FrameReport};
pub use crate::tracker::{TrackOutput, Tracker};
