//! Interfaces to the environment: position feed, port directory and route log.
//!
//! The core never does I/O itself. Implementations may block or fail
//! independently; their failures surface as [`SeaRouteError::Source`].

use serde::{Deserialize, Serialize};

use crate::{ExtractedRoute, GpsPoint, OptionExt, Port, PositionSample, Result, VesselType};

/// Inclusive Unix-seconds time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Inclusive reported-speed band in knots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    pub min: f64,
    pub max: f64,
}

impl SpeedBand {
    pub fn contains(&self, knots: f64) -> bool {
        knots >= self.min && knots <= self.max
    }
}

/// Source of AIS positions.
pub trait PositionFeed: Send + Sync {
    /// Positions for one vessel within the window, ordered by timestamp.
    fn positions(
        &self,
        vessel_id: &str,
        window: &TimeWindow,
        speed_band: Option<SpeedBand>,
    ) -> Result<Vec<PositionSample>>;
}

/// Port master data.
pub trait PortDirectory: Send + Sync {
    fn port(&self, id: &str) -> Result<Option<Port>>;

    fn port_by_unlocode(&self, unlocode: &str) -> Result<Option<Port>>;

    /// Ports with coordinates within `radius_nm`, nearest first, with distances.
    fn ports_within(&self, center: &GpsPoint, radius_nm: f64) -> Result<Vec<(Port, f64)>>;

    /// All ports that have coordinates.
    fn ports_with_coordinates(&self) -> Result<Vec<Port>>;

    /// Nearest port with coordinates within `radius_nm`.
    fn nearest_within(&self, center: &GpsPoint, radius_nm: f64) -> Result<Option<Port>> {
        Ok(self
            .ports_within(center, radius_nm)?
            .into_iter()
            .next()
            .map(|(port, _)| port))
    }
}

/// Filters for reading the route log. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteQuery {
    pub min_quality: Option<f64>,
    pub vessel_type: Option<VesselType>,
    /// Matched against the departure time
    pub window: Option<TimeWindow>,
    /// (origin port id, destination port id)
    pub port_pair: Option<(String, String)>,
}

impl RouteQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = Some(min_quality);
        self
    }

    pub fn with_vessel_type(mut self, vessel_type: VesselType) -> Self {
        self.vessel_type = Some(vessel_type);
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_port_pair(mut self, origin: &str, destination: &str) -> Self {
        self.port_pair = Some((origin.to_string(), destination.to_string()));
        self
    }

    pub fn matches(&self, route: &ExtractedRoute) -> bool {
        if let Some(q) = self.min_quality {
            if route.quality_score < q {
                return false;
            }
        }
        if let Some(vt) = &self.vessel_type {
            if &route.vessel_type != vt {
                return false;
            }
        }
        if let Some(window) = &self.window {
            if !window.contains(route.departure_time) {
                return false;
            }
        }
        if let Some((origin, destination)) = &self.port_pair {
            if &route.origin_port_id != origin || &route.destination_port_id != destination {
                return false;
            }
        }
        true
    }
}

/// Read side of the append-only route log.
pub trait RouteLogReader: Send + Sync {
    fn routes(&self, query: &RouteQuery) -> Result<Vec<ExtractedRoute>>;
}

/// Write side of the append-only route log. No deduplication is implied.
pub trait RouteLogWriter: Send + Sync {
    fn append(&self, route: ExtractedRoute) -> Result<()>;
}

/// Look a port up by id, then by UN/LOCODE.
pub fn resolve_port(ports: &dyn PortDirectory, key: &str) -> Result<Port> {
    match ports.port(key)? {
        Some(port) => Ok(port),
        None => ports.port_by_unlocode(key)?.ok_or_port_not_found(key),
    }
}

/// Look a port up and require coordinates.
///
/// Distinguishes an unknown port from a known port without coordinates.
pub fn resolve_port_location(ports: &dyn PortDirectory, key: &str) -> Result<(Port, GpsPoint)> {
    let port = resolve_port(ports, key)?;
    let location = port.coordinates.ok_or_coordinates_missing(key)?;
    Ok((port, location))
}
