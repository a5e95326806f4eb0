//! Route quality scoring.
//!
//! score = 0.4 * coverage + 0.3 * speed consistency + 0.3 * (no excessive gap)

use crate::PositionSample;
use crate::geo_utils::hours_between;

const COVERAGE_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.3;
const NO_GAP_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    /// Blended score in [0, 1]
    pub score: f64,
    /// Position coverage, 0-100
    pub coverage_percent: f64,
    /// 1 - stddev(speed) / mean(speed), floored at 0
    pub speed_consistency: f64,
    pub has_gaps: bool,
    pub max_gap_hours: f64,
}

/// Expected number of AIS reports over a voyage.
pub fn expected_positions(duration_hours: f64, report_interval_minutes: f64) -> f64 {
    if report_interval_minutes <= 0.0 {
        return 0.0;
    }
    duration_hours * 60.0 / report_interval_minutes
}

/// Consistency of reported speeds over fixes with positive speed.
///
/// Uses the population standard deviation. No positive speeds scores 0.
pub fn speed_consistency(samples: &[PositionSample]) -> f64 {
    let speeds: Vec<f64> = samples
        .iter()
        .map(|s| s.speed_knots)
        .filter(|s| *s > 0.0)
        .collect();
    if speeds.is_empty() {
        return 0.0;
    }
    let n = speeds.len() as f64;
    let mean = speeds.iter().sum::<f64>() / n;
    let variance = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / mean).max(0.0)
}

/// Score a run of positions.
pub fn assess_quality(
    samples: &[PositionSample],
    duration_hours: f64,
    report_interval_minutes: f64,
    excessive_gap_hours: f64,
) -> QualityMetrics {
    if samples.len() < 2 {
        return QualityMetrics {
            score: 0.0,
            coverage_percent: 0.0,
            speed_consistency: 0.0,
            has_gaps: true,
            max_gap_hours: f64::INFINITY,
        };
    }

    let expected = expected_positions(duration_hours, report_interval_minutes);
    let coverage = if expected > 0.0 {
        (samples.len() as f64 / expected).min(1.0)
    } else {
        1.0
    };

    let max_gap_hours = samples
        .windows(2)
        .map(|w| hours_between(w[0].timestamp, w[1].timestamp))
        .fold(0.0, f64::max);
    let has_gaps = max_gap_hours > excessive_gap_hours;

    let consistency = speed_consistency(samples);

    let score = coverage * COVERAGE_WEIGHT
        + consistency * CONSISTENCY_WEIGHT
        + if has_gaps { 0.0 } else { NO_GAP_WEIGHT };

    QualityMetrics {
        score: score.clamp(0.0, 1.0),
        coverage_percent: coverage * 100.0,
        speed_consistency: consistency,
        has_gaps,
        max_gap_hours,
    }
}
