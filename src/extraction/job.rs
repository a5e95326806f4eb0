//! Batch route extraction across vessels.
//!
//! Each vessel is an independent unit of work: fetch positions, segment,
//! extract, gate on quality, append to the route log. A failing vessel is
//! recorded in the report and never aborts the others. With the `parallel`
//! feature the units run on the rayon pool; workers share no mutable state
//! beyond the append-only log.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{ExtractionConfig, ExtractionOutcome, RouteExtractor};
use crate::engine::{PortDirectory, PositionFeed, RouteLogWriter, SpeedBand, TimeWindow};
use crate::segmentation::{SegmentConfig, SegmentationStats, segment_positions_with_stats};
use crate::{ExtractedRoute, SeaRouteError, VesselType};

/// One vessel and the period to extract routes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageRequest {
    pub vessel_id: String,
    pub vessel_type: VesselType,
    pub window: TimeWindow,
}

impl VoyageRequest {
    pub fn new(vessel_id: &str, vessel_type: VesselType, start: i64, end: i64) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            vessel_type,
            window: TimeWindow::new(start, end),
        }
    }
}

/// A vessel whose extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionFailure {
    pub vessel_id: String,
    pub error: String,
    /// Routes already in the log when the error stopped the vessel
    pub routes_appended: usize,
}

/// Summary of a batch extraction run.
///
/// Counts include the work a failed vessel completed before its error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Vessels that completed without error
    pub vessels_processed: usize,
    pub segments: usize,
    /// Routes appended to the log
    pub routes_extracted: usize,
    /// Extracted but below the quality threshold
    pub low_quality_skipped: usize,
    /// Rejection counts by gate
    pub rejections: BTreeMap<String, usize>,
    /// Segmentation counters summed over every vessel
    pub segmentation: SegmentationStats,
    pub failures: Vec<ExtractionFailure>,
}

/// Result of one vessel's unit of work, complete up to `error` if set.
#[derive(Debug, Default)]
struct VesselExtraction {
    segmentation: SegmentationStats,
    segments: usize,
    routes: usize,
    low_quality: usize,
    rejections: Vec<&'static str>,
    error: Option<SeaRouteError>,
}

/// Extract routes for every request and append them to the log.
pub fn extract_routes(
    requests: &[VoyageRequest],
    feed: &dyn PositionFeed,
    ports: &dyn PortDirectory,
    log: &dyn RouteLogWriter,
    segment_config: &SegmentConfig,
    extraction_config: &ExtractionConfig,
    extracted_at: i64,
) -> ExtractionReport {
    info!(
        "[Extraction] Starting route extraction for {} vessels",
        requests.len()
    );

    let extractor = RouteExtractor::new(extraction_config.clone());
    let run = |req: &VoyageRequest| {
        (
            req.vessel_id.clone(),
            extract_vessel(req, feed, ports, log, segment_config, &extractor, extracted_at),
        )
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(String, VesselExtraction)> = requests.par_iter().map(run).collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, VesselExtraction)> = requests.iter().map(run).collect();

    let mut report = ExtractionReport::default();
    for (vessel_id, unit) in results {
        report.segmentation += unit.segmentation;
        report.segments += unit.segments;
        report.routes_extracted += unit.routes;
        report.low_quality_skipped += unit.low_quality;
        for label in unit.rejections {
            *report.rejections.entry(label.to_string()).or_insert(0) += 1;
        }

        match unit.error {
            None => report.vessels_processed += 1,
            Some(e) => {
                warn!(
                    "[Extraction] Failed to extract routes for {} after {} appended: {}",
                    vessel_id, unit.routes, e
                );
                report.failures.push(ExtractionFailure {
                    vessel_id,
                    error: e.to_string(),
                    routes_appended: unit.routes,
                });
            }
        }
    }

    info!(
        "[Extraction] Complete: {} routes from {} segments ({} low quality, {} vessels failed)",
        report.routes_extracted,
        report.segments,
        report.low_quality_skipped,
        report.failures.len()
    );

    report
}

fn extract_vessel(
    req: &VoyageRequest,
    feed: &dyn PositionFeed,
    ports: &dyn PortDirectory,
    log: &dyn RouteLogWriter,
    segment_config: &SegmentConfig,
    extractor: &RouteExtractor,
    extracted_at: i64,
) -> VesselExtraction {
    let mut unit = VesselExtraction::default();

    let band = SpeedBand {
        min: segment_config.min_speed_knots,
        max: segment_config.max_speed_knots,
    };
    let positions = match feed.positions(&req.vessel_id, &req.window, Some(band)) {
        Ok(positions) => positions,
        Err(e) => {
            unit.error = Some(e);
            return unit;
        }
    };
    let (segments, stats) = segment_positions_with_stats(&positions, segment_config);
    unit.segmentation = stats;
    unit.segments = segments.len();

    let threshold = extractor.config().quality_threshold;

    for segment in &segments {
        let outcome = match extractor.extract(segment, &req.vessel_type, ports, extracted_at) {
            Ok(outcome) => outcome,
            Err(e) => {
                unit.error = Some(e);
                break;
            }
        };
        match outcome {
            ExtractionOutcome::Extracted(route) if route.quality_score >= threshold => {
                log_route(&route);
                if let Err(e) = log.append(*route) {
                    unit.error = Some(e);
                    break;
                }
                unit.routes += 1;
            }
            ExtractionOutcome::Extracted(route) => {
                warn!(
                    "[Extraction] Low quality route skipped ({:.2} < {:.2}): {} -> {}",
                    route.quality_score, threshold, route.origin_port_id, route.destination_port_id
                );
                unit.low_quality += 1;
            }
            ExtractionOutcome::Rejected(reason) => unit.rejections.push(reason.label()),
        }
    }

    unit
}

fn log_route(route: &ExtractedRoute) {
    info!(
        "[Extraction] Extracted route {} -> {}: {:.0} nm, quality {:.2}, {} positions",
        route.origin_port_id,
        route.destination_port_id,
        route.actual_sailed_nm,
        route.quality_score,
        route.total_positions
    );
}
