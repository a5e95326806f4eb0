//! Maritime chokepoint detection and route classification.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_nm_raw;
use crate::{PositionSample, RouteType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChokepointKind {
    Canal,
    Strait,
}

/// A named passage detected by proximity to a fixed coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chokepoint {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_nm: f64,
    pub kind: ChokepointKind,
}

impl Chokepoint {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        haversine_nm_raw(latitude, longitude, self.latitude, self.longitude) < self.radius_nm
    }
}

/// Fixed chokepoint table, scanned in order.
pub const CHOKEPOINTS: [Chokepoint; 6] = [
    Chokepoint {
        name: "Suez Canal",
        latitude: 30.5,
        longitude: 32.3,
        radius_nm: 50.0,
        kind: ChokepointKind::Canal,
    },
    Chokepoint {
        name: "Panama Canal",
        latitude: 9.0,
        longitude: -79.5,
        radius_nm: 50.0,
        kind: ChokepointKind::Canal,
    },
    Chokepoint {
        name: "Malacca Strait",
        latitude: 1.3,
        longitude: 103.5,
        radius_nm: 100.0,
        kind: ChokepointKind::Strait,
    },
    Chokepoint {
        name: "Gibraltar Strait",
        latitude: 36.0,
        longitude: -5.4,
        radius_nm: 50.0,
        kind: ChokepointKind::Strait,
    },
    Chokepoint {
        name: "Bosphorus",
        latitude: 41.0,
        longitude: 29.0,
        radius_nm: 30.0,
        kind: ChokepointKind::Strait,
    },
    Chokepoint {
        name: "Singapore Strait",
        latitude: 1.2,
        longitude: 103.8,
        radius_nm: 50.0,
        kind: ChokepointKind::Strait,
    },
];

/// Chokepoints any sample passes within radius of, in table order.
pub fn detect_chokepoints(samples: &[PositionSample]) -> Vec<&'static Chokepoint> {
    CHOKEPOINTS
        .iter()
        .filter(|cp| samples.iter().any(|s| cp.contains(s.latitude, s.longitude)))
        .collect()
}

/// Classify a route from its chokepoint hits and distance factor.
///
/// Any canal forces `ViaCanal`; otherwise the distance factor decides.
pub fn classify_route(distance_factor: f64, hits: &[&Chokepoint]) -> RouteType {
    if hits.iter().any(|cp| cp.kind == ChokepointKind::Canal) {
        RouteType::ViaCanal
    } else if distance_factor < 1.1 {
        RouteType::Direct
    } else if distance_factor < 1.3 {
        RouteType::Coastal
    } else {
        RouteType::Unknown
    }
}
