use serde::{Deserialize, Serialize};
use std::io::BufRead;

use crate::error::{FootfallError, Result};
use crate::geometry::BBox;

/// A single detection result for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether the box can be fed to the motion model.
    pub fn is_valid(&self) -> bool {
        self.bbox.is_valid()
    }
}

/// Read per-frame detections from JSON lines, one
/// `[{"bbox": [x1, y1, x2, y2], "confidence": c}, ...]` list per frame.
/// Blank lines are skipped and do not count as frames.
pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Vec<Detection>>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(e) => Some(Err(e.into())),
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str(&line)
                    .map_err(|source| FootfallError::Parse { line: index + 1, source }),
            ),
        })
}
