use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{FootfallError, Result};
use crate::kalman_filter::NoiseWeights;

/// Association and track lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before it is deleted.
    pub max_age: u32,
    /// Consecutive hits needed before a track is emitted.
    pub min_hits: u32,
    /// Minimum IoU for a detection/track match.
    pub iou_threshold: f32,
    pub noise: NoiseWeights,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
            noise: NoiseWeights::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_age < 1 {
            return Err(FootfallError::InvalidConfig("max_age must be at least 1".into()));
        }
        if self.min_hits < 1 {
            return Err(FootfallError::InvalidConfig("min_hits must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(FootfallError::InvalidConfig(format!(
                "iou_threshold must be in [0, 1], got {}",
                self.iou_threshold
            )));
        }
        let n = &self.noise;
        let weights = [
            n.measurement_scale_sr,
            n.initial_velocity_scale,
            n.initial_scale,
            n.process_velocity_scale,
            n.process_area_velocity_scale,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(FootfallError::InvalidConfig(
                "noise weights must be finite and positive".into(),
            ));
        }
        Ok(())
    }
}

/// Counting line placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Horizontal line y coordinate in pixels. When unset the line goes
    /// through the middle of the frame.
    pub line_y: Option<i32>,
}

impl CounterConfig {
    pub fn resolve_line_y(&self, frame_height: Option<u32>) -> Result<i32> {
        match (self.line_y, frame_height) {
            (Some(line_y), _) => Ok(line_y),
            (None, Some(height)) => Ok((height / 2) as i32),
            (None, None) => Err(FootfallError::InvalidConfig(
                "no counting line: set counter.line_y or give the frame height".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub counter: CounterConfig,
    /// Detections at or below this confidence never reach the tracker.
    pub conf_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracker: TrackerConfig::default(),
            counter: CounterConfig::default(),
            conf_threshold: 0.4,
        }
    }
}

impl Config {
    /// Load from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(FootfallError::InvalidConfig(format!(
                "conf_threshold must be in [0, 1], got {}",
                self.conf_threshold
            )));
        }
        Ok(())
    }
}
