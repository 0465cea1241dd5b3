use log::{debug, trace};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::assignment::linear_sum_assignment;
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::Result;
use crate::geometry::{iou, BBox};
use crate::kalman_filter::KalmanFilter;
use crate::track::{Track, TrackState};

/// A confirmed track as emitted for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackOutput {
    pub bbox: BBox,
    pub track_id: u32,
}

/// Multi-object tracker: Kalman prediction, optimal IoU association and
/// track birth/death.
///
/// One instance serves one frame stream; it is not meant to be shared
/// between streams.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    kalman: KalmanFilter,
    /// Live tracks in creation order.
    tracks: Vec<Track>,
    /// Frames processed since construction or the last reset.
    frame_count: u64,
    /// Last id handed out; ids start at 1.
    track_id_count: u32,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Tracker {
            kalman: KalmanFilter::with_noise(&config.noise),
            config,
            tracks: Vec::new(),
            frame_count: 0,
            track_id_count: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Live tracks, confirmed or not.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Drop every track and restart frame and id numbering.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.frame_count = 0;
        self.track_id_count = 0;
    }

    /// Process one frame of detections and return the confirmed tracks,
    /// sorted by ascending id.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackOutput>> {
        self.frame_count += 1;

        let dets: Vec<&Detection> = detections
            .iter()
            .filter(|d| {
                let valid = d.is_valid();
                if !valid {
                    debug!(
                        "frame {}: dropping degenerate detection {:?}",
                        self.frame_count,
                        d.bbox()
                    );
                }
                valid
            })
            .collect();

        // Predict every track, keeping each one next to its predicted box
        let mut predicted: Vec<(Track, BBox)> = Vec::with_capacity(self.tracks.len());
        for mut track in self.tracks.drain(..) {
            let bbox = track.predict(&self.kalman);
            if track.is_finite() {
                predicted.push((track, bbox));
            } else {
                debug!("track {} diverged, removing", track.id());
            }
        }

        let (matches, unmatched_dets) = match self.associate(&dets, &predicted) {
            Ok(assoc) => assoc,
            Err(e) => {
                // keep the predicted tracks so the next frame can recover
                self.tracks = predicted.into_iter().map(|(track, _)| track).collect();
                return Err(e);
            }
        };

        for (d, t) in matches {
            let (track, _) = &mut predicted[t];
            if let Err(e) = track.update(&self.kalman, dets[d].bbox()) {
                debug!("track {}: skipping update: {}", track.id(), e);
            }
        }
        self.tracks = predicted.into_iter().map(|(track, _)| track).collect();

        for d in unmatched_dets {
            self.spawn_track(dets[d].bbox());
        }

        let max_age = self.config.max_age;
        self.tracks.retain(|track| {
            let keep = track.time_since_update() <= max_age;
            if !keep {
                debug!(
                    "track {} expired after {} missed frames",
                    track.id(),
                    track.time_since_update()
                );
            }
            keep
        });

        let mut output: Vec<TrackOutput> = self
            .tracks
            .iter()
            .filter(|track| {
                track.state(self.config.min_hits, self.config.max_age) == TrackState::Confirmed
            })
            .map(|track| TrackOutput {
                bbox: track.get_state(),
                track_id: track.id(),
            })
            .collect();
        output.sort_by_key(|t| t.track_id);
        Ok(output)
    }

    /// Match detections to predicted boxes by maximum total IoU.
    /// Returns `(detection, track)` index pairs and the unmatched detections.
    fn associate(
        &self,
        dets: &[&Detection],
        predicted: &[(Track, BBox)],
    ) -> Result<(Vec<(usize, usize)>, Vec<usize>)> {
        if dets.is_empty() || predicted.is_empty() {
            return Ok((Vec::new(), (0..dets.len()).collect()));
        }

        let iou_matrix = DMatrix::from_fn(dets.len(), predicted.len(), |d, t| {
            iou(dets[d].bbox(), &predicted[t].1)
        });
        // 1 - IoU differs from -IoU by a constant over any full assignment
        let costs = iou_matrix.map(|v| 1.0 - v);

        let mut matched = vec![false; dets.len()];
        let mut matches = Vec::new();
        for (d, t) in linear_sum_assignment(&costs)? {
            let overlap = iou_matrix[(d, t)];
            if overlap < self.config.iou_threshold {
                trace!(
                    "detection {} / track {}: iou {:.3} below threshold",
                    d,
                    predicted[t].0.id(),
                    overlap
                );
                continue;
            }
            trace!("detection {} -> track {} (iou {:.3})", d, predicted[t].0.id(), overlap);
            matched[d] = true;
            matches.push((d, t));
        }

        let unmatched = (0..dets.len()).filter(|&d| !matched[d]).collect();
        Ok((matches, unmatched))
    }

    /// Start a track for an unmatched detection. The id is only consumed
    /// when the track is actually created.
    fn spawn_track(&mut self, bbox: &BBox) {
        let id = self.track_id_count + 1;
        match Track::new(&self.kalman, bbox, id, self.frame_count) {
            Ok(track) => {
                debug!("frame {}: new track {} at {:?}", self.frame_count, id, bbox);
                self.track_id_count = id;
                self.tracks.push(track);
            }
            Err(e) => debug!("frame {}: not starting track: {}", self.frame_count, e),
        }
    }
}
