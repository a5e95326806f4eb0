//! # Route Extraction
//!
//! Converts a clean voyage segment into a port-to-port [`ExtractedRoute`].
//!
//! ## Quality gates
//! A candidate is dropped (reported as a [`Rejection`], never raised) when:
//! - it has fewer than `min_positions` samples
//! - either endpoint has no port within `port_radius_nm`
//! - both endpoints resolve to the same port
//! - the sailed distance is below `min_distance_nm`
//! - the distance factor falls outside the plausible band
//! - the average speed falls outside the realistic band
//!
//! Surviving routes are scored ([`quality`]), classified by chokepoint
//! proximity and distance factor ([`chokepoints`]), and carry a bounded
//! audit trace ([`trace`]).

pub mod chokepoints;
pub mod job;
pub mod quality;
pub mod trace;

pub use chokepoints::{CHOKEPOINTS, Chokepoint, ChokepointKind, classify_route, detect_chokepoints};
pub use job::{ExtractionFailure, ExtractionReport, VoyageRequest, extract_routes};
pub use quality::{QualityMetrics, assess_quality};
pub use trace::simplify_trace;

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::PortDirectory;
use crate::geo_utils::{haversine_nm, sailed_distance_nm};
use crate::segmentation::RouteSegment;
use crate::{ExtractedRoute, GpsPoint, Port, Result, VesselType};

/// Configuration for route extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Search radius when resolving the nearest port to an endpoint.
    /// Default: 75.0 nm
    pub port_radius_nm: f64,

    /// Minimum samples for a segment to be considered.
    /// Default: 10
    pub min_positions: usize,

    /// Minimum sailed distance.
    /// Default: 5.0 nm
    pub min_distance_nm: f64,

    /// Plausible distance factor band (actual / great-circle).
    /// Default: [1.0, 3.5]
    pub min_distance_factor: f64,
    pub max_distance_factor: f64,

    /// Slack below `min_distance_factor` tolerated for rounding and the
    /// offset between the first fix and the port position.
    /// Default: 0.02
    pub distance_factor_slack: f64,

    /// Realistic average speed band.
    /// Default: [3.0, 30.0] knots
    pub min_avg_speed_knots: f64,
    pub max_avg_speed_knots: f64,

    /// Typical AIS report interval used for coverage.
    /// Default: 10.0 minutes
    pub report_interval_minutes: f64,

    /// A gap longer than this forfeits the no-gap part of the quality score.
    /// Default: 3.0 hours
    pub excessive_gap_hours: f64,

    /// Routes scoring below this are skipped by the batch job.
    /// Default: 0.7
    pub quality_threshold: f64,

    /// Maximum number of points in the stored trace.
    /// Default: 50
    pub trace_points: usize,

    /// Douglas-Peucker tolerance applied before downsampling (degrees, 0 = off).
    /// Default: 0.0
    pub trace_tolerance_deg: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            port_radius_nm: 75.0,
            min_positions: 10,
            min_distance_nm: 5.0,
            min_distance_factor: 1.0,
            max_distance_factor: 3.5,
            distance_factor_slack: 0.02,
            min_avg_speed_knots: 3.0,
            max_avg_speed_knots: 30.0,
            report_interval_minutes: 10.0,
            excessive_gap_hours: 3.0,
            quality_threshold: 0.7,
            trace_points: 50,
            trace_tolerance_deg: 0.0,
        }
    }
}

/// Why a candidate segment did not become a route.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    TooFewPositions { found: usize, required: usize },
    OriginUnresolved,
    DestinationUnresolved,
    SamePort { port_id: String },
    TooShort { sailed_nm: f64 },
    ZeroDuration,
    DistanceFactor { factor: f64 },
    AverageSpeed { knots: f64 },
}

impl Rejection {
    /// Stable label for counting rejections by kind.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::TooFewPositions { .. } => "too_few_positions",
            Rejection::OriginUnresolved => "origin_unresolved",
            Rejection::DestinationUnresolved => "destination_unresolved",
            Rejection::SamePort { .. } => "same_port",
            Rejection::TooShort { .. } => "too_short",
            Rejection::ZeroDuration => "zero_duration",
            Rejection::DistanceFactor { .. } => "distance_factor",
            Rejection::AverageSpeed { .. } => "average_speed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooFewPositions { found, required } => {
                write!(f, "{} positions < {}", found, required)
            }
            Rejection::OriginUnresolved => f.write_str("no port near first position"),
            Rejection::DestinationUnresolved => f.write_str("no port near last position"),
            Rejection::SamePort { port_id } => write!(f, "starts and ends at {}", port_id),
            Rejection::TooShort { sailed_nm } => write!(f, "sailed only {:.1} nm", sailed_nm),
            Rejection::ZeroDuration => f.write_str("zero duration"),
            Rejection::DistanceFactor { factor } => write!(f, "distance factor {:.2}", factor),
            Rejection::AverageSpeed { knots } => write!(f, "average speed {:.1} knots", knots),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(Box<ExtractedRoute>),
    Rejected(Rejection),
}

impl ExtractionOutcome {
    pub fn route(&self) -> Option<&ExtractedRoute> {
        match self {
            ExtractionOutcome::Extracted(route) => Some(route),
            ExtractionOutcome::Rejected(_) => None,
        }
    }

    pub fn into_route(self) -> Option<ExtractedRoute> {
        match self {
            ExtractionOutcome::Extracted(route) => Some(*route),
            ExtractionOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ExtractionOutcome::Extracted(_) => None,
            ExtractionOutcome::Rejected(r) => Some(r),
        }
    }
}

/// Stateless route extractor.
#[derive(Debug, Clone, Default)]
pub struct RouteExtractor {
    config: ExtractionConfig,
}

impl RouteExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract a route from one segment.
    ///
    /// Only port directory failures are errors; every quality gate failure is
    /// an `Ok(ExtractionOutcome::Rejected(..))`.
    pub fn extract(
        &self,
        segment: &RouteSegment,
        vessel_type: &VesselType,
        ports: &dyn PortDirectory,
        extracted_at: i64,
    ) -> Result<ExtractionOutcome> {
        let outcome = self.extract_inner(segment, vessel_type, ports, extracted_at)?;
        if let ExtractionOutcome::Rejected(reason) = &outcome {
            debug!(
                "[Extraction] Segment of {} rejected: {}",
                segment.vessel_id, reason
            );
        }
        Ok(outcome)
    }

    fn extract_inner(
        &self,
        segment: &RouteSegment,
        vessel_type: &VesselType,
        ports: &dyn PortDirectory,
        extracted_at: i64,
    ) -> Result<ExtractionOutcome> {
        let config = &self.config;
        let samples = &segment.samples;

        if samples.len() < config.min_positions.max(2) {
            return Ok(reject(Rejection::TooFewPositions {
                found: samples.len(),
                required: config.min_positions.max(2),
            }));
        }
        let first = &samples[0];
        let last = &samples[samples.len() - 1];

        let Some((origin, origin_loc)) =
            resolve_endpoint(ports, &first.point(), config.port_radius_nm)?
        else {
            return Ok(reject(Rejection::OriginUnresolved));
        };
        let Some((destination, destination_loc)) =
            resolve_endpoint(ports, &last.point(), config.port_radius_nm)?
        else {
            return Ok(reject(Rejection::DestinationUnresolved));
        };
        if origin.id == destination.id {
            return Ok(reject(Rejection::SamePort { port_id: origin.id }));
        }

        let actual_nm = sailed_distance_nm(samples);
        if actual_nm < config.min_distance_nm {
            return Ok(reject(Rejection::TooShort {
                sailed_nm: actual_nm,
            }));
        }

        let great_circle_nm = haversine_nm(&origin_loc, &destination_loc);
        if great_circle_nm <= 0.0 {
            return Ok(reject(Rejection::SamePort { port_id: origin.id }));
        }

        let distance_factor = actual_nm / great_circle_nm;
        if distance_factor < config.min_distance_factor - config.distance_factor_slack
            || distance_factor > config.max_distance_factor
        {
            return Ok(reject(Rejection::DistanceFactor {
                factor: distance_factor,
            }));
        }

        let duration_hours = segment.duration_hours();
        if duration_hours <= 0.0 {
            return Ok(reject(Rejection::ZeroDuration));
        }
        let avg_speed = actual_nm / duration_hours;
        if avg_speed < config.min_avg_speed_knots || avg_speed > config.max_avg_speed_knots {
            return Ok(reject(Rejection::AverageSpeed { knots: avg_speed }));
        }

        let quality = assess_quality(
            samples,
            duration_hours,
            config.report_interval_minutes,
            config.excessive_gap_hours,
        );
        let hits = detect_chokepoints(samples);
        let route_type = classify_route(distance_factor, &hits);

        Ok(ExtractionOutcome::Extracted(Box::new(ExtractedRoute {
            id: format!("route_{}_{}", segment.vessel_id, first.timestamp),
            vessel_id: segment.vessel_id.clone(),
            vessel_type: vessel_type.clone(),
            origin_port_id: origin.id,
            origin: origin_loc,
            destination_port_id: destination.id,
            destination: destination_loc,
            departure_time: first.timestamp,
            arrival_time: last.timestamp,
            great_circle_nm,
            actual_sailed_nm: actual_nm,
            distance_factor,
            duration_hours,
            avg_speed_knots: avg_speed,
            quality_score: quality.score,
            coverage_percent: quality.coverage_percent,
            has_gaps: quality.has_gaps,
            max_gap_hours: quality.max_gap_hours,
            total_positions: samples.len() as u32,
            route_type,
            via_points: hits.iter().map(|cp| cp.name.to_string()).collect(),
            trace: simplify_trace(samples, config.trace_points, config.trace_tolerance_deg),
            extracted_at,
        })))
    }
}

fn reject(reason: Rejection) -> ExtractionOutcome {
    ExtractionOutcome::Rejected(reason)
}

/// Nearest port with coordinates within the radius.
fn resolve_endpoint(
    ports: &dyn PortDirectory,
    point: &GpsPoint,
    radius_nm: f64,
) -> Result<Option<(Port, GpsPoint)>> {
    Ok(ports
        .nearest_within(point, radius_nm)?
        .and_then(|port| port.coordinates.map(|loc| (port, loc))))
}
