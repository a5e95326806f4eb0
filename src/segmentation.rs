//! Trajectory segmentation and outlier filtering.
//!
//! Splits a time-ordered position stream for one vessel into contiguous
//! voyage segments:
//! 1. Drop fixes outside the speed window (anchored or implausibly fast)
//! 2. Start a new segment when the gap since the last retained fix is too long
//! 3. Drop fixes whose implied speed from the last retained fix exceeds the
//!    outlier ceiling (GPS jumps)
//! 4. Discard segments below the minimum sample count
//!
//! Rejected fixes that agree with each other are held back. Once
//! `reanchor_fixes` of them agree, the retained run is the one in doubt: a
//! shorter run (typically a bad first fix) is dropped as a jump, a longer one
//! is closed as its own segment and the held fixes start the next.

use std::ops::AddAssign;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::PositionSample;
use crate::geo_utils::{haversine_nm_raw, hours_between, sailed_distance_nm};

/// Implied speed above which a fix is treated as a GPS jump.
pub const DEFAULT_OUTLIER_SPEED_KNOTS: f64 = 50.0;

/// Mutually consistent rejected fixes needed to re-anchor.
pub const DEFAULT_REANCHOR_FIXES: usize = 3;

/// Configuration for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Maximum time between retained fixes before a new segment starts.
    /// Default: 6.0 hours
    pub max_gap_hours: f64,

    /// Fixes slower than this are dropped (vessel at anchor or berthed).
    /// Default: 3.0 knots
    pub min_speed_knots: f64,

    /// Fixes reporting more than this are dropped.
    /// Default: 30.0 knots
    pub max_speed_knots: f64,

    /// Absolute ceiling on implied speed between consecutive fixes.
    /// Default: 50.0 knots
    pub outlier_speed_knots: f64,

    /// Segments with fewer samples are discarded.
    /// Default: 10
    pub min_samples: usize,

    /// Consecutive fixes that agree with each other but not with the
    /// retained run before the run is abandoned.
    /// Default: 3
    pub reanchor_fixes: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_gap_hours: 6.0,
            min_speed_knots: 3.0,
            max_speed_knots: 30.0,
            outlier_speed_knots: DEFAULT_OUTLIER_SPEED_KNOTS,
            min_samples: 10,
            reanchor_fixes: DEFAULT_REANCHOR_FIXES,
        }
    }
}

/// A contiguous run of positions for one vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub vessel_id: String,
    pub samples: Vec<PositionSample>,
}

impl RouteSegment {
    pub fn new(vessel_id: &str, samples: Vec<PositionSample>) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&PositionSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.last()
    }

    /// Hours between the first and last sample.
    pub fn duration_hours(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => hours_between(a.timestamp, b.timestamp),
            _ => 0.0,
        }
    }

    /// Cumulative haversine distance along the samples (nm).
    pub fn sailed_distance_nm(&self) -> f64 {
        sailed_distance_nm(&self.samples)
    }
}

/// Counters from one segmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentationStats {
    pub input_samples: usize,
    pub speed_filtered: usize,
    pub outliers_removed: usize,
    pub segments_emitted: usize,
    pub short_segments_dropped: usize,
}

impl AddAssign for SegmentationStats {
    fn add_assign(&mut self, other: Self) {
        self.input_samples += other.input_samples;
        self.speed_filtered += other.speed_filtered;
        self.outliers_removed += other.outliers_removed;
        self.segments_emitted += other.segments_emitted;
        self.short_segments_dropped += other.short_segments_dropped;
    }
}

/// Implied speed in knots between two fixes.
///
/// Returns `None` when time does not advance.
pub fn implied_speed_knots(from: &PositionSample, to: &PositionSample) -> Option<f64> {
    let hours = hours_between(from.timestamp, to.timestamp);
    if hours <= 0.0 {
        return None;
    }
    let nm = haversine_nm_raw(from.latitude, from.longitude, to.latitude, to.longitude);
    Some(nm / hours)
}

/// Keep fixes whose reported speed lies within `[min, max]` knots.
pub fn filter_speed_window(samples: &[PositionSample], min: f64, max: f64) -> Vec<PositionSample> {
    samples
        .iter()
        .filter(|s| s.speed_knots.is_finite() && s.speed_knots >= min && s.speed_knots <= max)
        .cloned()
        .collect()
}

// ============================================================================
// Jump Filter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Offer {
    Kept,
    Held,
    Dropped,
    /// Enough held fixes agree with each other to challenge the kept run
    Diverged,
}

/// GPS jump filter over one contiguous run.
///
/// A fix that disagrees with the last kept fix is held. A later fix that
/// agrees with the kept run discards everything held; held fixes that agree
/// with each other accumulate until the caller re-anchors on them.
struct JumpFilter {
    ceiling_knots: f64,
    reanchor_fixes: usize,
    kept: Vec<PositionSample>,
    held: Vec<PositionSample>,
    removed: usize,
}

impl JumpFilter {
    fn new(ceiling_knots: f64, reanchor_fixes: usize) -> Self {
        Self {
            ceiling_knots,
            reanchor_fixes: reanchor_fixes.max(1),
            kept: Vec::new(),
            held: Vec::new(),
            removed: 0,
        }
    }

    fn last_kept(&self) -> Option<&PositionSample> {
        self.kept.last()
    }

    fn agrees(&self, from: &PositionSample, to: &PositionSample) -> bool {
        implied_speed_knots(from, to).is_some_and(|speed| speed <= self.ceiling_knots)
    }

    fn offer(&mut self, sample: PositionSample) -> Offer {
        let Some(anchor) = self.kept.last() else {
            self.kept.push(sample);
            return Offer::Kept;
        };

        match implied_speed_knots(anchor, &sample) {
            None => {
                self.removed += 1;
                Offer::Dropped
            }
            Some(speed) if speed <= self.ceiling_knots => {
                self.discard_held();
                self.kept.push(sample);
                Offer::Kept
            }
            Some(speed) => {
                debug!(
                    "[Segmentation] Fix for {} held: {:.1} knots implied",
                    sample.vessel_id, speed
                );
                let continues_held = self
                    .held
                    .last()
                    .is_some_and(|prev| self.agrees(prev, &sample));
                if !continues_held {
                    self.discard_held();
                }
                self.held.push(sample);
                if self.held.len() >= self.reanchor_fixes {
                    Offer::Diverged
                } else {
                    Offer::Held
                }
            }
        }
    }

    fn discard_held(&mut self) {
        if !self.held.is_empty() {
            debug!(
                "[Segmentation] Outlier removed: {} fixes disagree with the retained run",
                self.held.len()
            );
        }
        self.removed += self.held.len();
        self.held.clear();
    }

    /// Promote the held fixes to the kept run and return the old run.
    fn reanchor(&mut self) -> Vec<PositionSample> {
        let held = std::mem::take(&mut self.held);
        std::mem::replace(&mut self.kept, held)
    }

    /// Take the kept run; anything still held counts as removed.
    fn finish(&mut self) -> Vec<PositionSample> {
        self.discard_held();
        std::mem::take(&mut self.kept)
    }
}

/// Remove GPS jumps from an already contiguous run.
///
/// Each fix is compared with the last *retained* fix, so a single bad fix is
/// dropped without also dropping the good fix that follows it. When rejected
/// fixes agree with each other and outnumber the retained run, the retained
/// run is dropped instead, so a bad first fix costs only itself. Fixes that
/// do not advance in time are dropped as well.
pub fn remove_outliers(samples: &[PositionSample], ceiling_knots: f64) -> Vec<PositionSample> {
    let mut filter = JumpFilter::new(ceiling_knots, DEFAULT_REANCHOR_FIXES);

    for sample in samples {
        if filter.offer(sample.clone()) == Offer::Diverged && filter.kept.len() < filter.held.len() {
            let displaced = filter.reanchor();
            filter.removed += displaced.len();
        }
    }

    filter.finish()
}

/// Split a time-ordered position stream into voyage segments.
pub fn segment_positions(samples: &[PositionSample], config: &SegmentConfig) -> Vec<RouteSegment> {
    segment_positions_with_stats(samples, config).0
}

/// Split a time-ordered position stream into voyage segments, with counters.
pub fn segment_positions_with_stats(
    samples: &[PositionSample],
    config: &SegmentConfig,
) -> (Vec<RouteSegment>, SegmentationStats) {
    let mut stats = SegmentationStats {
        input_samples: samples.len(),
        ..SegmentationStats::default()
    };

    let moving = filter_speed_window(samples, config.min_speed_knots, config.max_speed_knots);
    stats.speed_filtered = samples.len() - moving.len();

    let mut segments: Vec<RouteSegment> = Vec::new();
    let mut filter = JumpFilter::new(config.outlier_speed_knots, config.reanchor_fixes);

    for sample in moving {
        let gap = filter
            .last_kept()
            .map(|prev| hours_between(prev.timestamp, sample.timestamp));
        if gap.is_some_and(|hours| hours > config.max_gap_hours) {
            close_segment(filter.finish(), &mut segments, &mut stats, config);
        }

        if filter.offer(sample) == Offer::Diverged {
            let displaced = filter.reanchor();
            if displaced.len() < config.reanchor_fixes {
                debug!(
                    "[Segmentation] Re-anchored after dropping {} leading fixes",
                    displaced.len()
                );
                filter.removed += displaced.len();
            } else {
                close_segment(displaced, &mut segments, &mut stats, config);
            }
        }
    }
    close_segment(filter.finish(), &mut segments, &mut stats, config);
    stats.outliers_removed = filter.removed;

    (segments, stats)
}

fn close_segment(
    samples: Vec<PositionSample>,
    segments: &mut Vec<RouteSegment>,
    stats: &mut SegmentationStats,
    config: &SegmentConfig,
) {
    if samples.is_empty() {
        return;
    }
    if samples.len() < config.min_samples {
        stats.short_segments_dropped += 1;
        return;
    }
    let vessel_id = samples[0].vessel_id.clone();
    segments.push(RouteSegment { vessel_id, samples });
    stats.segments_emitted += 1;
}
