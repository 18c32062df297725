/// ByteTrack-style multi-object tracker.
///
/// Detections at or above the activation threshold are associated first;
/// weaker ones (down to `LOW_SCORE_FLOOR`) may then only extend tracks that
/// are still unmatched, never start new ones. Association is greedy on IoU,
/// gated by the matching threshold expressed as a `1 - IoU` cost bound.
use std::collections::HashSet;

use crate::detection::domain::object_tracker::ObjectTracker;
use crate::shared::constants::{
    LOST_TRACK_BUFFER, MINIMUM_MATCHING_THRESHOLD, TRACKER_FRAME_RATE,
    TRACK_ACTIVATION_THRESHOLD,
};
use crate::shared::detections::Detections;

use super::math::bbox_iou;

/// Detections below this score are discarded before association.
const LOW_SCORE_FLOOR: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Minimum confidence for a detection to seed a new track.
    pub track_activation_threshold: f64,
    /// Frames a track may go unmatched before it is dropped (at 30 fps).
    pub lost_track_buffer: usize,
    /// Maximum `1 - IoU` cost for a detection to continue a track.
    pub minimum_matching_threshold: f64,
    /// Source frame rate; scales the lost-track buffer.
    pub frame_rate: u32,
}

impl TrackerConfig {
    /// Lost-track buffer rescaled from 30 fps to the configured frame rate.
    pub fn max_frames_lost(&self) -> usize {
        (self.frame_rate as f64 / 30.0 * self.lost_track_buffer as f64) as usize
    }

    fn min_iou(&self) -> f64 {
        1.0 - self.minimum_matching_threshold
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_activation_threshold: TRACK_ACTIVATION_THRESHOLD,
            lost_track_buffer: LOST_TRACK_BUFFER,
            minimum_matching_threshold: MINIMUM_MATCHING_THRESHOLD,
            frame_rate: TRACKER_FRAME_RATE,
        }
    }
}

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    frames_lost: usize,
    det_index: Option<usize>,
}

pub struct ByteTracker {
    config: TrackerConfig,
    tracks: Vec<TrackState>,
    next_id: u32,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of tracks currently held, including lost ones.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn associate(&mut self, detections: &Detections) {
        for track in &mut self.tracks {
            track.det_index = None;
        }

        let (high, low) = self.split_by_confidence(detections);
        let existing = self.tracks.len();

        let all_tracks: Vec<usize> = (0..existing).collect();
        let matched_high = self.match_into(&all_tracks, &high, detections);

        let unmatched_tracks: Vec<usize> = (0..existing)
            .filter(|&ti| self.tracks[ti].det_index.is_none())
            .collect();
        self.match_into(&unmatched_tracks, &low, detections);

        self.spawn_tracks(&high, &matched_high, detections);
        self.age_tracks(existing);
    }

    fn split_by_confidence(&self, detections: &Detections) -> (Vec<usize>, Vec<usize>) {
        let mut high = Vec::new();
        let mut low = Vec::new();
        for i in 0..detections.len() {
            let score = detections.score(i);
            if score >= self.config.track_activation_threshold {
                high.push(i);
            } else if score >= LOW_SCORE_FLOOR {
                low.push(i);
            }
        }
        (high, low)
    }

    /// Matches `candidates` detections to the tracks at `track_indices`,
    /// returning the detection indices that were consumed.
    fn match_into(
        &mut self,
        track_indices: &[usize],
        candidates: &[usize],
        detections: &Detections,
    ) -> HashSet<usize> {
        let tracks: Vec<(usize, [f64; 4])> = track_indices
            .iter()
            .map(|&ti| (ti, self.tracks[ti].bbox))
            .collect();
        let dets: Vec<(usize, [f64; 4])> = candidates
            .iter()
            .map(|&di| (di, detections.bbox(di)))
            .collect();

        let mut consumed = HashSet::new();
        for (ti, di) in greedy_match(&tracks, &dets, self.config.min_iou()) {
            let track = &mut self.tracks[ti];
            track.bbox = detections.bbox(di);
            track.frames_lost = 0;
            track.det_index = Some(di);
            consumed.insert(di);
        }
        consumed
    }

    fn spawn_tracks(&mut self, high: &[usize], matched: &HashSet<usize>, detections: &Detections) {
        for &di in high {
            if matched.contains(&di) {
                continue;
            }
            if detections.score(di) <= self.config.track_activation_threshold {
                continue;
            }
            self.tracks.push(TrackState {
                id: self.next_id,
                bbox: detections.bbox(di),
                frames_lost: 0,
                det_index: Some(di),
            });
            self.next_id += 1;
        }
    }

    fn age_tracks(&mut self, existing: usize) {
        for track in self.tracks.iter_mut().take(existing) {
            if track.det_index.is_none() {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.config.max_frames_lost();
        self.tracks.retain(|t| t.frames_lost <= max_lost);
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl ObjectTracker for ByteTracker {
    /// Only detections bound to a track this frame are returned, in track
    /// order; lost tracks stay internal so they can be re-acquired.
    fn update(&mut self, detections: &Detections) -> Detections {
        self.associate(detections);

        let (indices, ids): (Vec<usize>, Vec<u32>) = self
            .tracks
            .iter()
            .filter_map(|t| t.det_index.map(|di| (di, t.id)))
            .unzip();

        detections.select(&indices).with_tracker_id(ids)
    }
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track and
/// detection used at most once.
fn greedy_match(
    tracks: &[(usize, [f64; 4])],
    dets: &[(usize, [f64; 4])],
    min_iou: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, tb) in tracks {
        for (di, db) in dets {
            let iou = bbox_iou(tb, db);
            if iou > 0.0 && iou >= min_iou {
                pairs.push((*ti, *di, iou));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();
    for (ti, di, _) in pairs {
        if used_tracks.contains(&ti) || used_dets.contains(&di) {
            continue;
        }
        used_tracks.insert(ti);
        used_dets.insert(di);
        matches.push((ti, di));
    }
    matches
}
