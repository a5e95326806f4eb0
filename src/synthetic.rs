//! Synthetic AIS data generator for tests and benchmarking.
//!
//! Generates voyages between known ports with a controlled detour, GPS noise
//! and optional position jumps, plus route logs with exact distance factors.
//! Ground truth is known, so the pipeline can be validated end to end.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use searoute::synthetic::{VoyageScenario, north_sea_ports};
//! use searoute::VesselType;
//!
//! let ports = north_sea_ports();
//! let scenario = VoyageScenario::between(&ports[0], &ports[1], "vessel-1", VesselType::CONTAINER);
//! let positions = scenario.generate();
//! assert!(positions.len() > 10);
//! ```

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::extraction::VoyageRequest;
use crate::geo_utils::{NM_PER_DEG_LAT, haversine_nm};
use crate::{
    ExtractedRoute, GpsPoint, Port, PositionSample, RouteType, TracePoint, VesselType,
};

// ============================================================================
// Ports
// ============================================================================

/// A small set of real North Sea and Baltic approach ports.
///
/// Bergen sits above 60°N for the high-latitude predicate.
pub fn north_sea_ports() -> Vec<Port> {
    vec![
        Port::new("p_nlrtm", "NLRTM", "Rotterdam", "NL", GpsPoint::new(51.95, 4.14)),
        Port::new("p_gbfxt", "GBFXT", "Felixstowe", "GB", GpsPoint::new(51.96, 1.33)),
        Port::new("p_frleh", "FRLEH", "Le Havre", "FR", GpsPoint::new(49.48, 0.11)),
        Port::new("p_debrv", "DEBRV", "Bremerhaven", "DE", GpsPoint::new(53.55, 8.58)),
        Port::new("p_dkaar", "DKAAR", "Aarhus", "DK", GpsPoint::new(56.15, 10.22)),
        Port::new("p_nobgo", "NOBGO", "Bergen", "NO", GpsPoint::new(60.39, 5.32)),
        Port::new("p_gbabd", "GBABD", "Aberdeen", "GB", GpsPoint::new(57.14, -2.08)),
    ]
}

// ============================================================================
// Voyages
// ============================================================================

/// One synthetic voyage between two positions.
#[derive(Debug, Clone)]
pub struct VoyageScenario {
    pub vessel_id: String,
    pub vessel_type: VesselType,
    pub origin: GpsPoint,
    pub destination: GpsPoint,
    /// Unix time of the first report
    pub departure: i64,
    pub speed_knots: f64,
    pub report_interval_minutes: f64,
    /// Path length over straight-line length (>= 1.0)
    pub detour_factor: f64,
    /// Position noise standard deviation in nautical miles
    pub noise_sigma_nm: f64,
    /// Reported speed noise, uniform in +/- this many knots
    pub speed_jitter_knots: f64,
    /// Index of a fix to displace by a GPS jump
    pub jump_at: Option<usize>,
    pub seed: u64,
}

impl VoyageScenario {
    /// A clean 14 knot voyage between two ports with a 10% detour.
    pub fn between(origin: &Port, destination: &Port, vessel_id: &str, vessel_type: VesselType) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            vessel_type,
            origin: origin.coordinates.unwrap_or(GpsPoint::new(0.0, 0.0)),
            destination: destination.coordinates.unwrap_or(GpsPoint::new(0.0, 0.0)),
            departure: 1_700_000_000,
            speed_knots: 14.0,
            report_interval_minutes: 10.0,
            detour_factor: 1.1,
            noise_sigma_nm: 0.02,
            speed_jitter_knots: 0.3,
            jump_at: None,
            seed: 42,
        }
    }

    /// Generate time-ordered position reports from origin to destination.
    pub fn generate(&self) -> Vec<PositionSample> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let path = detour_path(&self.origin, &self.destination, self.detour_factor);
        let total_nm = plane_length(&path);
        let step_nm = self.speed_knots * self.report_interval_minutes / 60.0;
        if total_nm <= 0.0 || step_nm <= 0.0 {
            return Vec::new();
        }
        let steps = (total_nm / step_nm).ceil() as usize;
        let step_secs = (self.report_interval_minutes * 60.0).round() as i64;

        let mut samples = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let along = (i as f64 * step_nm).min(total_nm);
            let mut point = point_along(&path, along).to_gps(&self.origin);

            if i > 0 && i < steps {
                point = add_gps_noise(&point, self.noise_sigma_nm, &mut rng);
            }
            if self.jump_at == Some(i) {
                point.latitude += 2.0;
            }

            let jitter = if self.speed_jitter_knots > 0.0 {
                rng.gen_range(-self.speed_jitter_knots..self.speed_jitter_knots)
            } else {
                0.0
            };
            let course = bearing_deg(&self.origin, &self.destination);

            samples.push(PositionSample::new(
                &self.vessel_id,
                point.latitude,
                point.longitude,
                self.speed_knots + jitter,
                course,
                self.departure + i as i64 * step_secs,
            ));
        }
        samples
    }

    /// Arrival time of the last report.
    pub fn arrival(&self) -> i64 {
        self.generate()
            .last()
            .map_or(self.departure, |s| s.timestamp)
    }
}

/// Positions and extraction requests for a small fleet.
#[derive(Debug, Clone)]
pub struct SyntheticFleet {
    pub positions: Vec<PositionSample>,
    pub requests: Vec<VoyageRequest>,
    /// Port id pairs sailed, in generation order
    pub voyages: Vec<(String, String)>,
}

/// Each vessel sails `voyages_per_vessel` consecutive port-to-port legs,
/// with a 12 hour silent port call between legs.
pub fn generate_fleet(
    ports: &[Port],
    vessel_count: usize,
    voyages_per_vessel: usize,
    seed: u64,
) -> SyntheticFleet {
    let mut rng = StdRng::seed_from_u64(seed);
    let vessel_types = [
        VesselType::CONTAINER,
        VesselType::TANKER,
        VesselType::BULK_CARRIER,
    ];

    let mut positions = Vec::new();
    let mut requests = Vec::new();
    let mut voyages = Vec::new();
    if ports.len() < 2 {
        return SyntheticFleet {
            positions,
            requests,
            voyages,
        };
    }

    for v in 0..vessel_count {
        let vessel_id = format!("vessel_{:03}", v);
        let vessel_type = vessel_types[v % vessel_types.len()].clone();
        let mut at = rng.gen_range(0..ports.len());
        let mut clock: i64 = 1_700_000_000 + v as i64 * 3_600;
        let start = clock;

        for leg in 0..voyages_per_vessel {
            let mut next = rng.gen_range(0..ports.len() - 1);
            if next >= at {
                next += 1;
            }

            let mut scenario =
                VoyageScenario::between(&ports[at], &ports[next], &vessel_id, vessel_type.clone());
            scenario.departure = clock;
            scenario.speed_knots = rng.gen_range(11.0..17.0);
            scenario.detour_factor = rng.gen_range(1.05..1.4);
            scenario.seed = seed ^ ((v as u64) << 16) ^ leg as u64;

            let leg_positions = scenario.generate();
            clock = leg_positions.last().map_or(clock, |s| s.timestamp) + 12 * 3_600;
            positions.extend(leg_positions);
            voyages.push((ports[at].id.clone(), ports[next].id.clone()));
            at = next;
        }

        requests.push(VoyageRequest::new(&vessel_id, vessel_type, start, clock));
    }

    SyntheticFleet {
        positions,
        requests,
        voyages,
    }
}

// ============================================================================
// Route Logs
// ============================================================================

/// A route whose sailed distance is exactly `factor` times the great-circle
/// distance between the two ports.
pub fn exact_route(
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
    let duration_hours = (actual / 14.0).max(0.1);
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
        avg_speed_knots: actual / duration_hours,
        quality_score: quality,
        coverage_percent: quality * 100.0,
        has_gaps: false,
        max_gap_hours: 0.17,
        total_positions: (duration_hours * 6.0) as u32 + 1,
        route_type,
        via_points: Vec::new(),
        trace: vec![
            TracePoint {
                latitude: origin_loc.latitude,
                longitude: origin_loc.longitude,
                speed_knots: 14.0,
                timestamp: departure,
            },
            TracePoint {
                latitude: destination_loc.latitude,
                longitude: destination_loc.longitude,
                speed_knots: 14.0,
                timestamp: departure + (duration_hours * 3600.0) as i64,
            },
        ],
        extracted_at: departure,
    }
}

/// `count` routes between random distinct port pairs, all with `factor`.
pub fn exact_route_log(ports: &[Port], count: usize, factor: f64, seed: u64) -> Vec<ExtractedRoute> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vessel_types = [
        VesselType::CONTAINER,
        VesselType::TANKER,
        VesselType::BULK_CARRIER,
        VesselType::GENERAL_CARGO,
    ];
    if ports.len() < 2 {
        return Vec::new();
    }

    (0..count)
        .map(|i| {
            let a = rng.gen_range(0..ports.len());
            let mut b = rng.gen_range(0..ports.len() - 1);
            if b >= a {
                b += 1;
            }
            exact_route(
                &format!("synth_route_{:05}", i),
                &ports[a],
                &ports[b],
                vessel_types[i % vessel_types.len()].clone(),
                factor,
                0.9,
                1_700_000_000 + i as i64 * 86_400,
            )
        })
        .collect()
}

/// A grid of ports around `origin`, spaced `spacing_deg` apart.
pub fn port_grid(origin: GpsPoint, rows: usize, cols: usize, spacing_deg: f64) -> Vec<Port> {
    let mut ports = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let code = format!("G{:02}{:02}", r, c);
            ports.push(Port::new(
                &format!("p_{}", code.to_ascii_lowercase()),
                &code,
                &format!("Grid {} {}", r, c),
                "XX",
                GpsPoint::new(
                    origin.latitude + r as f64 * spacing_deg,
                    origin.longitude + c as f64 * spacing_deg,
                ),
            ));
        }
    }
    ports
}

// ============================================================================
// Local Plane Helpers
// ============================================================================

/// A point in a local tangent plane, nautical miles east and north of an origin.
#[derive(Debug, Clone, Copy)]
struct PlanePoint {
    x: f64,
    y: f64,
}

impl PlanePoint {
    fn from_gps(p: &GpsPoint, origin: &GpsPoint) -> Self {
        let cos_lat = origin.latitude.to_radians().cos();
        Self {
            x: (p.longitude - origin.longitude) * NM_PER_DEG_LAT * cos_lat,
            y: (p.latitude - origin.latitude) * NM_PER_DEG_LAT,
        }
    }

    fn to_gps(self, origin: &GpsPoint) -> GpsPoint {
        let cos_lat = origin.latitude.to_radians().cos().max(1e-6);
        GpsPoint::new(
            origin.latitude + self.y / NM_PER_DEG_LAT,
            origin.longitude + self.x / (NM_PER_DEG_LAT * cos_lat),
        )
    }

    fn distance(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Origin, a perpendicular dog-leg midpoint, destination.
fn detour_path(origin: &GpsPoint, destination: &GpsPoint, detour_factor: f64) -> Vec<PlanePoint> {
    let a = PlanePoint::from_gps(origin, origin);
    let b = PlanePoint::from_gps(destination, origin);
    let base = a.distance(&b);
    if base <= 0.0 || detour_factor <= 1.0 {
        return vec![a, b];
    }

    let offset = base / 2.0 * (detour_factor * detour_factor - 1.0).sqrt();
    let (ux, uy) = ((b.x - a.x) / base, (b.y - a.y) / base);
    let mid = PlanePoint {
        x: (a.x + b.x) / 2.0 - uy * offset,
        y: (a.y + b.y) / 2.0 + ux * offset,
    };
    vec![a, mid, b]
}

fn plane_length(path: &[PlanePoint]) -> f64 {
    path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn point_along(path: &[PlanePoint], mut along: f64) -> PlanePoint {
    for w in path.windows(2) {
        let len = w[0].distance(&w[1]);
        if along <= len && len > 0.0 {
            let t = along / len;
            return PlanePoint {
                x: w[0].x + (w[1].x - w[0].x) * t,
                y: w[0].y + (w[1].y - w[0].y) * t,
            };
        }
        along -= len;
    }
    path.last().copied().unwrap_or(PlanePoint { x: 0.0, y: 0.0 })
}

/// Add Gaussian position noise (Box-Muller).
fn add_gps_noise(p: &GpsPoint, sigma_nm: f64, rng: &mut StdRng) -> GpsPoint {
    if sigma_nm <= 0.0 {
        return *p;
    }
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.r#gen();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    let z1 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();

    let cos_lat = p.latitude.to_radians().cos().max(1e-6);
    GpsPoint::new(
        p.latitude + z0 * sigma_nm / NM_PER_DEG_LAT,
        p.longitude + z1 * sigma_nm / (NM_PER_DEG_LAT * cos_lat),
    )
}

fn bearing_deg(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let (lat1, lat2) = (from.latitude.to_radians(), to.latitude.to_radians());
    let dlng = (to.longitude - from.longitude).to_radians();
    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
