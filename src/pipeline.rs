use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::counter::{Counts, LineCounter};
use crate::detection::Detection;
use crate::error::Result;
use crate::tracker::{TrackOutput, Tracker};

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// 1-based frame index.
    pub frame: u64,
    pub tracks: Vec<TrackOutput>,
    pub counts: Counts,
}

/// One video stream's tracker and line counter, driven frame by frame.
#[derive(Debug, Clone)]
pub struct FootfallCounter {
    tracker: Tracker,
    counter: LineCounter,
    conf_threshold: f32,
}

impl FootfallCounter {
    pub fn new(config: &Config, line_y: i32) -> Result<Self> {
        config.validate()?;
        Ok(FootfallCounter {
            tracker: Tracker::new(config.tracker.clone())?,
            counter: LineCounter::new(line_y),
            conf_threshold: config.conf_threshold,
        })
    }

    /// Build with the configured line, or the middle of a frame of
    /// `frame_height` pixels when none is configured.
    pub fn from_config(config: &Config, frame_height: Option<u32>) -> Result<Self> {
        let line_y = config.counter.resolve_line_y(frame_height)?;
        Self::new(config, line_y)
    }

    /// Run detection filtering, tracking and counting for one frame.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Result<FrameReport> {
        let kept: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence() > self.conf_threshold)
            .copied()
            .collect();
        if kept.len() < detections.len() {
            debug!(
                "dropped {} detections at or below confidence {}",
                detections.len() - kept.len(),
                self.conf_threshold
            );
        }

        let tracks = self.tracker.update(&kept)?;
        let counts = self.counter.update(&tracks);
        self.counter.retain_live(self.tracker.tracks().iter().map(|track| track.id()));
        Ok(FrameReport {
            frame: self.tracker.frame_count(),
            tracks,
            counts,
        })
    }

    pub fn counts(&self) -> Counts {
        self.counter.counts()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn counter(&self) -> &LineCounter {
        &self.counter
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.counter.reset();
    }
}
