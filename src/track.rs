use log::warn;

use crate::error::Result;
use crate::geometry::{bbox_to_state, state_to_bbox, BBox, Measurement};
use crate::kalman_filter::{KalmanFilter, StateCovariance, StateVector};

/// Number of predicted boxes kept between two successful updates.
pub const HISTORY_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Created but not yet backed by enough consecutive hits.
    Tentative,
    /// Eligible for emission.
    Confirmed,
    /// Missed for more than `max_age` frames; dropped by the tracker.
    Deleted,
}

/// One tracked object: motion-filter state plus lifecycle counters.
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    /// `[x, y, s, r, vx, vy, vs]`
    mean: StateVector,
    covariance: StateCovariance,
    /// Frames since creation.
    age: u32,
    /// Total successful updates, counting the creating detection.
    hits: u32,
    /// Consecutive successful updates.
    hit_streak: u32,
    time_since_update: u32,
    /// Tracker frame on which this track was created (1-based).
    created_frame: u64,
    /// Predicted boxes since the last update.
    history: Vec<BBox>,
}

impl Track {
    /// Create a track from an unmatched detection.
    pub(crate) fn new(kalman: &KalmanFilter, bbox: &BBox, id: u32, frame: u64) -> Result<Self> {
        let measurement = bbox_to_state(bbox)?;
        let (mean, covariance) = kalman.initiate(&measurement);
        Ok(Track {
            id,
            mean,
            covariance,
            age: 0,
            hits: 1,
            hit_streak: 1,
            time_since_update: 0,
            created_frame: frame,
            history: Vec::new(),
        })
    }

    /// Advance the state one frame and return the predicted box.
    pub(crate) fn predict(&mut self, kalman: &KalmanFilter) -> BBox {
        // keep the predicted area positive
        if self.mean[2] + self.mean[6] <= 0.0 {
            self.mean[6] = 0.0;
        }
        let (mean, covariance) = kalman.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;

        self.age += 1;
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;

        let predicted = self.get_state();
        if self.history.len() == HISTORY_LEN {
            self.history.remove(0);
        }
        self.history.push(predicted);
        predicted
    }

    /// Correct the state with an associated detection box.
    pub(crate) fn update(&mut self, kalman: &KalmanFilter, bbox: &BBox) -> Result<()> {
        let measurement = bbox_to_state(bbox)?;

        self.time_since_update = 0;
        self.history.clear();
        self.hits += 1;
        self.hit_streak += 1;

        match kalman.update(&self.mean, &self.covariance, &measurement) {
            Some((mean, covariance)) => {
                self.mean = mean;
                self.covariance = covariance;
            }
            None => warn!("track {}: singular innovation covariance, keeping prediction", self.id),
        }
        Ok(())
    }

    /// Current box estimate, ignoring the covariance.
    pub fn get_state(&self) -> BBox {
        let z: Measurement = self.mean.fixed_rows::<4>(0).into_owned();
        state_to_bbox(&z)
    }

    /// Lifecycle state under the given policy. Tracks created during the
    /// tracker's first `min_hits` frames skip the hit-streak requirement.
    pub fn state(&self, min_hits: u32, max_age: u32) -> TrackState {
        if self.time_since_update > max_age {
            TrackState::Deleted
        } else if self.hit_streak >= min_hits || self.created_frame <= u64::from(min_hits) {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        }
    }

    /// False once the filter has diverged.
    pub fn is_finite(&self) -> bool {
        self.mean.iter().all(|v| v.is_finite()) && self.get_state().is_finite()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn mean(&self) -> &StateVector {
        &self.mean
    }

    pub fn covariance(&self) -> &StateCovariance {
        &self.covariance
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn hit_streak(&self) -> u32 {
        self.hit_streak
    }

    pub fn time_since_update(&self) -> u32 {
        self.time_since_update
    }

    pub fn created_frame(&self) -> u64 {
        self.created_frame
    }

    pub fn history(&self) -> &[BBox] {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn mean_mut(&mut self) -> &mut StateVector {
        &mut self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FootfallError;
    use approx::assert_relative_eq;

    const MIN_HITS: u32 = 3;
    const MAX_AGE: u32 = 1;

    fn bbox() -> BBox {
        BBox::new(100.0, 100.0, 140.0, 180.0)
    }

    #[test]
    fn test_track_initialization() {
        let kf = KalmanFilter::new();
        let track = Track::new(&kf, &bbox(), 1, 10).unwrap();

        assert_eq!(track.id(), 1);
        assert_eq!(track.time_since_update(), 0);
        assert_eq!(track.hits(), 1);
        assert_eq!(track.hit_streak(), 1);
        assert_eq!(track.age(), 0);
        assert_eq!(track.created_frame(), 10);

        let state = track.get_state();
        assert_relative_eq!(state.x1, 100.0, epsilon = 1e-3);
        assert_relative_eq!(state.y2, 180.0, epsilon = 1e-3);
    }

    #[test]
    fn test_track_rejects_degenerate_box() {
        let kf = KalmanFilter::new();
        let flat = BBox::new(0.0, 10.0, 10.0, 10.0);
        assert!(matches!(
            Track::new(&kf, &flat, 1, 1),
            Err(FootfallError::DegenerateBox { .. })
        ));

        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();
        track.predict(&kf);
        assert!(track.update(&kf, &flat).is_err());
        // a rejected measurement leaves the counters alone
        assert_eq!(track.time_since_update(), 1);
        assert_eq!(track.hits(), 1);
    }

    #[test]
    fn test_track_predict() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();

        // zero initial velocity: box stays in place
        let predicted = track.predict(&kf);
        assert_relative_eq!(predicted.x1, 100.0, epsilon = 1e-3);
        assert_relative_eq!(predicted.y1, 100.0, epsilon = 1e-3);
        assert_eq!(track.age(), 1);
        assert_eq!(track.time_since_update(), 1);
        assert_eq!(track.history().len(), 1);

        // with velocity the box moves
        track.mean[4] = 10.0;
        track.mean[5] = 5.0;
        let predicted = track.predict(&kf);
        assert_relative_eq!(predicted.x1, 110.0, epsilon = 1e-3);
        assert_relative_eq!(predicted.y1, 105.0, epsilon = 1e-3);
        assert_relative_eq!(predicted.width(), 40.0, epsilon = 1e-3);
        assert_relative_eq!(predicted.height(), 80.0, epsilon = 1e-3);
    }

    #[test]
    fn test_track_update() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();
        track.predict(&kf);

        let moved = BBox::new(110.0, 105.0, 150.0, 185.0);
        track.update(&kf, &moved).unwrap();

        assert_eq!(track.time_since_update(), 0);
        assert_eq!(track.hits(), 2);
        assert_eq!(track.hit_streak(), 2);
        assert!(track.history().is_empty());

        let (cx, cy) = track.get_state().centroid();
        assert!(cx > 120.0 && cx <= 130.0);
        assert!(cy > 140.0 && cy <= 145.0);
        assert!(track.mean()[4] > 0.0);
    }

    #[test]
    fn test_track_missed_frame_resets_streak() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();
        for _ in 0..3 {
            track.predict(&kf);
            track.update(&kf, &bbox()).unwrap();
        }
        assert_eq!(track.hit_streak(), 4);

        // a frame without update keeps the streak until the next predict
        track.predict(&kf);
        assert_eq!(track.hit_streak(), 4);
        assert_eq!(track.time_since_update(), 1);

        track.predict(&kf);
        assert_eq!(track.hit_streak(), 0);
        assert_eq!(track.time_since_update(), 2);
        assert_eq!(track.hits(), 4);
    }

    #[test]
    fn test_track_state_machine() {
        let kf = KalmanFilter::new();
        // created after the startup window
        let mut track = Track::new(&kf, &bbox(), 7, 10).unwrap();
        assert_eq!(track.state(MIN_HITS, MAX_AGE), TrackState::Tentative);

        for _ in 0..MIN_HITS - 2 {
            track.predict(&kf);
            track.update(&kf, &bbox()).unwrap();
            assert_eq!(track.state(MIN_HITS, MAX_AGE), TrackState::Tentative);
        }
        track.predict(&kf);
        track.update(&kf, &bbox()).unwrap();
        assert_eq!(track.state(MIN_HITS, MAX_AGE), TrackState::Confirmed);

        for _ in 0..=MAX_AGE {
            track.predict(&kf);
        }
        assert_eq!(track.state(MIN_HITS, MAX_AGE), TrackState::Deleted);
    }

    #[test]
    fn test_startup_track_is_confirmed_immediately() {
        let kf = KalmanFilter::new();
        let track = Track::new(&kf, &bbox(), 1, MIN_HITS as u64).unwrap();
        assert_eq!(track.state(MIN_HITS, MAX_AGE), TrackState::Confirmed);
    }

    #[test]
    fn test_area_velocity_guard() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();
        track.mean[6] = -5000.0;

        let predicted = track.predict(&kf);
        assert_eq!(track.mean()[6], 0.0);
        assert_relative_eq!(track.mean()[2], 3200.0, epsilon = 1e-2);
        assert!(predicted.is_valid());
        assert!(track.is_finite());
    }

    #[test]
    fn test_history_is_capped() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(&kf, &bbox(), 1, 1).unwrap();
        for _ in 0..HISTORY_LEN + 5 {
            track.predict(&kf);
        }
        assert_eq!(track.history().len(), HISTORY_LEN);
    }
}
