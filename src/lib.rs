//! # Sea Route
//!
//! Maritime port-to-port route learning from AIS position telemetry.
//!
//! This library provides:
//! - Trajectory segmentation and GPS outlier rejection
//! - Port-to-port route extraction with quality scoring and classification
//! - A batch-trained regression model for sailed-distance prediction
//! - An incremental learner with confidence-weighted, tiered predictions
//! - A weighted directed graph of observed legs with A* route planning
//! - A snapshot-publishing engine that exposes the query surface
//!
//! ## Features
//!
//! - **`parallel`** - Extract routes for many vessels in parallel with rayon
//! - **`synthetic`** - Deterministic synthetic AIS voyages for tests and benchmarks
//! - **`cli`** - The `searoute-cli` debugging binary
//!
//! ## Quick Start
//!
//! ```rust
//! use searoute::{GpsPoint, geo_utils::haversine_nm};
//!
//! let rotterdam = GpsPoint::new(51.95, 4.14);
//! let felixstowe = GpsPoint::new(51.96, 1.33);
//!
//! let nm = haversine_nm(&rotterdam, &felixstowe);
//! assert!(nm > 100.0 && nm < 110.0);
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{NoPathReason, OptionExt, Result, SeaRouteError};

// Geographic utilities (haversine, bounds, search envelopes)
pub mod geo_utils;

// R-tree point index shared by the port directory and the graph
pub mod spatial;
pub use spatial::SpatialIndex;

// Configuration for every pipeline stage
pub mod config;
pub use config::EngineConfig;

// Trajectory segmentation and outlier filtering
pub mod segmentation;
pub use segmentation::{
    RouteSegment, SegmentConfig, SegmentationStats, segment_positions,
    segment_positions_with_stats,
};

// Port-to-port route extraction
pub mod extraction;
pub use extraction::{
    ExtractionConfig, ExtractionOutcome, ExtractionReport, Rejection, RouteExtractor,
    VoyageRequest, extract_routes,
};

// Batch regression distance model
pub mod trainer;
pub use trainer::{DistanceModel, DistanceTrainer, ModelDiagnostics, PredictionInput, TrainerConfig};

// Incremental per-port-pair learner
pub mod learning;
pub use learning::{
    DistancePrediction, IncrementalLearner, LearnerConfig, PortPairStatistics, PredictionSource,
    confidence,
};

// Maritime graph and A* planner
pub mod graph;
pub use graph::{
    GraphConfig, GraphEdge, GraphNode, GraphStats, MaritimeGraph, PlannerConfig, RouteLeg,
    RoutePlan, RoutePlanner, SearchControl, SearchOutcome, SearchResult,
};

// External interfaces and the snapshot-publishing query service
pub mod engine;
pub use engine::{
    EngineSnapshot, InMemoryPortDirectory, InMemoryPositionFeed, InMemoryRouteLog, PortDirectory,
    PortSummary, PositionFeed, RouteLogReader, RouteLogWriter, RouteQuery, RoutingEngine,
};

// Synthetic AIS data for tests and benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use searoute::GpsPoint;
/// let singapore = GpsPoint::new(1.26, 103.84);
/// assert!(singapore.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points. Returns `None` for an empty slice.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A single AIS position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub vessel_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Speed over ground in knots
    pub speed_knots: f64,
    /// Course over ground in degrees
    pub course: f64,
    /// Unix timestamp (seconds since epoch)
    pub timestamp: i64,
}

impl PositionSample {
    pub fn new(
        vessel_id: &str,
        latitude: f64,
        longitude: f64,
        speed_knots: f64,
        course: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            latitude,
            longitude,
            speed_knots,
            course,
            timestamp,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Port master data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    /// UN/LOCODE, e.g. "NLRTM"
    pub unlocode: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    /// Coordinates are optional in the port master data
    #[serde(default)]
    pub coordinates: Option<GpsPoint>,
}

impl Port {
    pub fn new(id: &str, unlocode: &str, name: &str, country: &str, location: GpsPoint) -> Self {
        Self {
            id: id.to_string(),
            unlocode: unlocode.to_string(),
            name: name.to_string(),
            country: country.to_string(),
            coordinates: Some(location),
        }
    }
}

/// Validated vessel type identifier.
///
/// Vessel types are upper-case ASCII identifiers (letters, digits, `_`, `-`).
/// Free text such as `"bulk carrier"` is normalised on parse, so the factor
/// lookups keyed on this type are exact.
///
/// ```
/// use searoute::VesselType;
/// let vt = VesselType::parse("bulk carrier").unwrap();
/// assert_eq!(vt, VesselType::BULK_CARRIER);
/// assert!(VesselType::parse("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VesselType(Cow<'static, str>);

impl VesselType {
    pub const TANKER: VesselType = VesselType(Cow::Borrowed("TANKER"));
    pub const BULK_CARRIER: VesselType = VesselType(Cow::Borrowed("BULK_CARRIER"));
    pub const CONTAINER: VesselType = VesselType(Cow::Borrowed("CONTAINER"));
    pub const GENERAL_CARGO: VesselType = VesselType(Cow::Borrowed("GENERAL_CARGO"));
    pub const LNG_CARRIER: VesselType = VesselType(Cow::Borrowed("LNG_CARRIER"));
    pub const RO_RO: VesselType = VesselType(Cow::Borrowed("RO_RO"));
    pub const PASSENGER: VesselType = VesselType(Cow::Borrowed("PASSENGER"));

    /// Parse and normalise a vessel type.
    ///
    /// Whitespace runs become `_` and letters are upper-cased. Anything other
    /// than ASCII alphanumerics, `_` and `-` is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalised = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_uppercase();

        if normalised.is_empty()
            || !normalised
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SeaRouteError::InvalidVesselType(raw.to_string()));
        }

        Ok(Self(Cow::Owned(normalised)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VesselType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VesselType {
    type Error = SeaRouteError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VesselType> for String {
    fn from(value: VesselType) -> Self {
        value.0.into_owned()
    }
}

/// Route classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
    Direct,
    ViaCanal,
    Coastal,
    Unknown,
}

impl RouteType {
    pub const ALL: [RouteType; 4] = [
        RouteType::Direct,
        RouteType::ViaCanal,
        RouteType::Coastal,
        RouteType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Direct => "DIRECT",
            RouteType::ViaCanal => "VIA_CANAL",
            RouteType::Coastal => "COASTAL",
            RouteType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point of the simplified audit trace stored with each route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_knots: f64,
    pub timestamp: i64,
}

impl From<&PositionSample> for TracePoint {
    fn from(sample: &PositionSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            speed_knots: sample.speed_knots,
            timestamp: sample.timestamp,
        }
    }
}

/// A port-to-port route extracted from AIS positions.
///
/// Records are append-only: never mutated after creation. The same physical
/// voyage may be extracted more than once; every consumer aggregates
/// statistically rather than deduplicating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRoute {
    pub id: String,
    pub vessel_id: String,
    pub vessel_type: VesselType,

    pub origin_port_id: String,
    /// Coordinates of the origin port at extraction time
    pub origin: GpsPoint,
    pub destination_port_id: String,
    /// Coordinates of the destination port at extraction time
    pub destination: GpsPoint,
    /// Unix timestamp of the first position
    pub departure_time: i64,
    /// Unix timestamp of the last position
    pub arrival_time: i64,

    /// Great-circle distance between the two ports (nm)
    pub great_circle_nm: f64,
    /// Cumulative distance along the positions (nm)
    pub actual_sailed_nm: f64,
    /// actual / great-circle
    pub distance_factor: f64,
    pub duration_hours: f64,
    pub avg_speed_knots: f64,

    /// Blended quality in [0, 1]
    pub quality_score: f64,
    /// Position coverage vs. expected AIS report rate, 0-100
    pub coverage_percent: f64,
    pub has_gaps: bool,
    pub max_gap_hours: f64,
    pub total_positions: u32,

    pub route_type: RouteType,
    /// Named chokepoints traversed, in table order
    pub via_points: Vec<String>,
    /// Bounded-size simplified trace, for audit and visualisation only
    pub trace: Vec<TracePoint>,

    pub extracted_at: i64,
}

impl ExtractedRoute {
    /// True if either endpoint lies at or beyond the given absolute latitude.
    pub fn touches_latitude(&self, abs_latitude: f64) -> bool {
        self.origin.latitude.abs() >= abs_latitude
            || self.destination.latitude.abs() >= abs_latitude
    }

    pub fn has_chokepoint(&self) -> bool {
        !self.via_points.is_empty()
    }
}
