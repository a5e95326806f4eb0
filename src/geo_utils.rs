//! Geographic utilities in nautical miles.

use crate::{Bounds, GpsPoint, PositionSample};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Nautical miles per degree of latitude.
pub const NM_PER_DEG_LAT: f64 = 60.0;

/// Great-circle distance between two points in nautical miles (haversine).
pub fn haversine_nm(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    haversine_nm_raw(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Haversine distance from raw coordinates.
pub fn haversine_nm_raw(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // Clamp guards asin against rounding just above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_NM * a.sqrt().min(1.0).asin()
}

/// Cumulative haversine distance along consecutive samples.
pub fn sailed_distance_nm(samples: &[PositionSample]) -> f64 {
    samples
        .windows(2)
        .map(|w| {
            haversine_nm_raw(
                w[0].latitude,
                w[0].longitude,
                w[1].latitude,
                w[1].longitude,
            )
        })
        .sum()
}

/// Total length of a polyline in nautical miles.
pub fn polyline_length_nm(points: &[GpsPoint]) -> f64 {
    points.windows(2).map(|w| haversine_nm(&w[0], &w[1])).sum()
}

/// Elapsed hours between two Unix timestamps.
pub fn hours_between(start: i64, end: i64) -> f64 {
    (end - start) as f64 / 3600.0
}

/// Convert nautical miles to degrees of longitude at a latitude.
///
/// Returns `None` near the poles where a longitude degree collapses.
pub fn nm_to_degrees_lng(nm: f64, latitude: f64) -> Option<f64> {
    let nm_per_deg = NM_PER_DEG_LAT * latitude.to_radians().cos();
    if nm_per_deg.abs() < 1e-6 {
        return None;
    }
    Some(nm / nm_per_deg)
}

/// Bounding boxes covering every point within `radius_nm` of `center`.
///
/// Returns one box, or two when the search wraps the antimeridian.
pub fn search_envelopes(center: &GpsPoint, radius_nm: f64) -> Vec<Bounds> {
    let d_lat = radius_nm / NM_PER_DEG_LAT;
    let min_lat = (center.latitude - d_lat).max(-90.0);
    let max_lat = (center.latitude + d_lat).min(90.0);

    // The widest longitude span is at the latitude closest to a pole
    let widest_lat = min_lat.abs().max(max_lat.abs());
    let d_lng = match nm_to_degrees_lng(radius_nm, widest_lat) {
        Some(d) if d < 180.0 => d,
        _ => {
            return vec![Bounds {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            }];
        }
    };

    let min_lng = center.longitude - d_lng;
    let max_lng = center.longitude + d_lng;

    if min_lng < -180.0 {
        vec![
            Bounds {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng,
            },
            Bounds {
                min_lat,
                max_lat,
                min_lng: min_lng + 360.0,
                max_lng: 180.0,
            },
        ]
    } else if max_lng > 180.0 {
        vec![
            Bounds {
                min_lat,
                max_lat,
                min_lng,
                max_lng: 180.0,
            },
            Bounds {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: max_lng - 360.0,
            },
        ]
    } else {
        vec![Bounds {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }]
    }
}

/// Compute bounds of a track. Empty tracks produce zeroed bounds.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    Bounds::from_points(points).unwrap_or(Bounds {
        min_lat: 0.0,
        max_lat: 0.0,
        min_lng: 0.0,
        max_lng: 0.0,
    })
}

/// Arithmetic mean of a slice, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wraps_antimeridian() {
        let envs = search_envelopes(&GpsPoint::new(0.0, 179.5), 60.0);
        assert_eq!(envs.len(), 2);
        assert_eq!(envs[0].max_lng, 180.0);
        assert_eq!(envs[1].min_lng, -180.0);
        assert!((envs[1].max_lng - (-179.5)).abs() < 0.01);
    }

    #[test]
    fn test_envelope_near_pole_covers_all_longitudes() {
        let envs = search_envelopes(&GpsPoint::new(89.5, 10.0), 120.0);
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].min_lng, -180.0);
        assert_eq!(envs[0].max_lat, 90.0);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[1.0]), 0.0);
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138).abs() < 0.001);
    }
}
