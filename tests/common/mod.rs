//! Shared fixtures for integration tests.

#![allow(dead_code)]

use searoute::geo_utils::haversine_nm;
use searoute::{ExtractedRoute, GpsPoint, Port, PositionSample, RouteType, VesselType};

pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

pub const T0: i64 = 1_700_000_000;

// ============================================================================
// Ports
// ============================================================================

pub fn rotterdam() -> Port {
    Port::new("p_nlrtm", "NLRTM", "Rotterdam", "NL", GpsPoint::new(51.95, 4.14))
}

pub fn felixstowe() -> Port {
    Port::new("p_gbfxt", "GBFXT", "Felixstowe", "GB", GpsPoint::new(51.96, 1.33))
}

pub fn hamburg() -> Port {
    Port::new("p_deham", "DEHAM", "Hamburg", "DE", GpsPoint::new(53.55, 9.97))
}

pub fn antwerp() -> Port {
    Port::new("p_beanr", "BEANR", "Antwerp", "BE", GpsPoint::new(51.23, 4.40))
}

/// Known to the directory but without coordinates.
pub fn inland_depot() -> Port {
    Port {
        id: "p_depot".to_string(),
        unlocode: "XXDEP".to_string(),
        name: "Inland Depot".to_string(),
        country: "XX".to_string(),
        coordinates: None,
    }
}

pub fn test_ports() -> Vec<Port> {
    vec![rotterdam(), felixstowe(), hamburg(), antwerp(), inland_depot()]
}

// ============================================================================
// Routes
// ============================================================================

/// A route with a chosen distance factor between two ports.
pub fn route(
    id: &str,
    origin: &Port,
    destination: &Port,
    vessel_type: VesselType,
    factor: f64,
    quality: f64,
    departure: i64,
) -> ExtractedRoute {
    let origin_loc = origin.coordinates.unwrap_or(GpsPoint::new(0.0, 0.0));
    let destination_loc = destination.coordinates.unwrap_or(GpsPoint::new(0.0, 0.0));
    let great_circle_nm = haversine_nm(&origin_loc, &destination_loc);
    let actual = great_circle_nm * factor;
    let duration_hours = actual / 14.0;
    let route_type = if factor < 1.1 {
        RouteType::Direct
    } else if factor < 1.3 {
        RouteType::Coastal
    } else {
        RouteType::Unknown
    };

    ExtractedRoute {
        id: id.to_string(),
        vessel_id: format!("{}_vessel", id),
        vessel_type,
        origin_port_id: origin.id.clone(),
        origin: origin_loc,
        destination_port_id: destination.id.clone(),
        destination: destination_loc,
        departure_time: departure,
        arrival_time: departure + (duration_hours * 3600.0) as i64,
        great_circle_nm,
        actual_sailed_nm: actual,
        distance_factor: factor,
        duration_hours,
        avg_speed_knots: 14.0,
        quality_score: quality,
        coverage_percent: 95.0,
        has_gaps: false,
        max_gap_hours: 0.2,
        total_positions: 40,
        route_type,
        via_points: Vec::new(),
        trace: Vec::new(),
        extracted_at: departure,
    }
}

// ============================================================================
// Positions
// ============================================================================

/// Evenly spaced fixes along a polyline, one every `interval_secs`.
///
/// Fixes are interpolated in latitude/longitude, proportionally to the
/// haversine length of each leg. The first and last fixes sit exactly on
/// the first and last waypoint.
pub fn voyage_along(
    vessel_id: &str,
    waypoints: &[GpsPoint],
    samples: usize,
    start: i64,
    interval_secs: i64,
    speed_knots: f64,
) -> Vec<PositionSample> {
    let legs: Vec<f64> = waypoints
        .windows(2)
        .map(|w| haversine_nm(&w[0], &w[1]))
        .collect();
    let total: f64 = legs.iter().sum();

    (0..samples)
        .map(|i| {
            let target = total * i as f64 / (samples - 1) as f64;
            let mut walked = 0.0;
            let mut point = waypoints[waypoints.len() - 1];
            for (k, len) in legs.iter().enumerate() {
                if walked + len >= target && *len > 0.0 {
                    let t = (target - walked) / len;
                    let a = waypoints[k];
                    let b = waypoints[k + 1];
                    point = GpsPoint::new(
                        a.latitude + (b.latitude - a.latitude) * t,
                        a.longitude + (b.longitude - a.longitude) * t,
                    );
                    break;
                }
                walked += len;
            }
            if i == samples - 1 {
                point = waypoints[waypoints.len() - 1];
            }
            PositionSample::new(
                vessel_id,
                point.latitude,
                point.longitude,
                speed_knots,
                90.0,
                start + i as i64 * interval_secs,
            )
        })
        .collect()
}
