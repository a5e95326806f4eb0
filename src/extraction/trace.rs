//! Bounded-size audit trace for extracted routes.

use geo::{Coord, LineString, SimplifyIdx};

use crate::{PositionSample, TracePoint};

/// Downsample a run of positions to at most `max_points` trace points.
///
/// An optional Douglas-Peucker pass (`tolerance_deg > 0`) removes redundant
/// fixes first; the remainder is then stride-sampled. The first and last
/// samples are always retained.
pub fn simplify_trace(
    samples: &[PositionSample],
    max_points: usize,
    tolerance_deg: f64,
) -> Vec<TracePoint> {
    if samples.is_empty() || max_points == 0 {
        return Vec::new();
    }
    if samples.len() == 1 || max_points == 1 {
        return vec![TracePoint::from(&samples[0])];
    }

    let candidates: Vec<usize> = if tolerance_deg > 0.0 {
        let line: LineString<f64> = samples
            .iter()
            .map(|s| Coord {
                x: s.longitude,
                y: s.latitude,
            })
            .collect();
        line.simplify_idx(&tolerance_deg)
    } else {
        (0..samples.len()).collect()
    };

    let picked = stride_sample(&candidates, max_points);
    picked.into_iter().map(|i| TracePoint::from(&samples[i])).collect()
}

/// Evenly pick at most `max_points` entries, keeping the first and last.
fn stride_sample(indices: &[usize], max_points: usize) -> Vec<usize> {
    if indices.len() <= max_points {
        return indices.to_vec();
    }

    let last = indices.len() - 1;
    let step = last as f64 / (max_points - 1) as f64;
    let mut picked: Vec<usize> = (0..max_points)
        .map(|i| indices[((i as f64 * step).round() as usize).min(last)])
        .collect();
    picked.dedup();
    picked
}
