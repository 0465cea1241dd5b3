use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::tracker::TrackOutput;

/// Running entry/exit totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub count_in: u64,
    pub count_out: u64,
}

impl Counts {
    /// Entries minus exits, i.e. how many are currently inside.
    pub fn net(&self) -> i64 {
        self.count_in as i64 - self.count_out as i64
    }
}

/// Counts centroid crossings of a horizontal line, per track id.
///
/// Moving down across the line (increasing y) is an entry, moving up is
/// an exit. A centroid exactly on the line is on the entry side.
#[derive(Debug, Clone)]
pub struct LineCounter {
    line_y: f32,
    counts: Counts,
    /// Last emitted centroid y of every id still alive in the tracker.
    last_centroid_y: HashMap<u32, f32>,
}

impl LineCounter {
    pub fn new(line_y: i32) -> Self {
        LineCounter {
            line_y: line_y as f32,
            counts: Counts::default(),
            last_centroid_y: HashMap::new(),
        }
    }

    pub fn line_y(&self) -> f32 {
        self.line_y
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Number of ids with a remembered centroid.
    pub fn tracked_ids(&self) -> usize {
        self.last_centroid_y.len()
    }

    /// Feed the tracker output of one frame.
    ///
    /// Ids missing from `tracks` keep their last centroid, so a track that
    /// drops out of the emitted list for a few frames is still counted when
    /// it reappears on the other side. Call [`LineCounter::retain_live`]
    /// with the tracker's live ids to forget deleted tracks.
    pub fn update(&mut self, tracks: &[TrackOutput]) -> Counts {
        for track in tracks {
            let (_, cy) = track.bbox.centroid();
            let prev_y = self
                .last_centroid_y
                .get(&track.track_id)
                .copied()
                .unwrap_or(cy);

            if prev_y < self.line_y && cy >= self.line_y {
                self.counts.count_in += 1;
                info!("track {} crossed in (y {:.1} -> {:.1})", track.track_id, prev_y, cy);
            } else if prev_y >= self.line_y && cy < self.line_y {
                self.counts.count_out += 1;
                info!("track {} crossed out (y {:.1} -> {:.1})", track.track_id, prev_y, cy);
            }

            self.last_centroid_y.insert(track.track_id, cy);
        }
        self.counts
    }

    /// Forget every id not in `live`. Track ids are never reused, so an id
    /// the tracker has deleted can be dropped for good.
    pub fn retain_live<I: IntoIterator<Item = u32>>(&mut self, live: I) {
        let live: HashSet<u32> = live.into_iter().collect();
        let before = self.last_centroid_y.len();
        self.last_centroid_y.retain(|id, _| live.contains(id));
        let dropped = before - self.last_centroid_y.len();
        if dropped > 0 {
            debug!("forgot {} deleted track(s)", dropped);
        }
    }

    pub fn reset(&mut self) {
        self.counts = Counts::default();
        self.last_centroid_y.clear();
    }
}
