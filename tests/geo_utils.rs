//! Tests for geo_utils module

use searoute::geo_utils::*;
use searoute::{Bounds, GpsPoint, PositionSample};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[test]
fn test_haversine_same_point() {
    let p = GpsPoint::new(51.95, 4.14);
    assert_eq!(haversine_nm(&p, &p), 0.0);
}

#[test]
fn test_haversine_one_degree_of_longitude_at_equator() {
    let a = GpsPoint::new(0.0, 0.0);
    let b = GpsPoint::new(0.0, 1.0);
    assert!(approx_eq(haversine_nm(&a, &b), 60.04, 0.01));
}

#[test]
fn test_haversine_rotterdam_felixstowe() {
    let rotterdam = GpsPoint::new(51.95, 4.14);
    let felixstowe = GpsPoint::new(51.96, 1.33);
    let nm = haversine_nm(&rotterdam, &felixstowe);
    assert!(nm > 100.0 && nm < 110.0, "got {}", nm);
}

#[test]
fn test_haversine_symmetric() {
    let pairs = [
        (GpsPoint::new(51.95, 4.14), GpsPoint::new(60.39, 5.32)),
        (GpsPoint::new(-33.9, 18.4), GpsPoint::new(1.26, 103.84)),
        (GpsPoint::new(35.0, 179.5), GpsPoint::new(35.0, -179.5)),
    ];
    for (a, b) in pairs {
        assert_eq!(haversine_nm(&a, &b), haversine_nm(&b, &a));
    }
}

#[test]
fn test_haversine_across_antimeridian_is_short() {
    let a = GpsPoint::new(0.0, 179.5);
    let b = GpsPoint::new(0.0, -179.5);
    assert!(approx_eq(haversine_nm(&a, &b), 60.04, 0.01));
}

#[test]
fn test_sailed_distance_sums_legs() {
    let samples = vec![
        PositionSample::new("v", 0.0, 0.0, 12.0, 90.0, 0),
        PositionSample::new("v", 0.0, 1.0, 12.0, 90.0, 3600),
        PositionSample::new("v", 0.0, 2.0, 12.0, 90.0, 7200),
    ];
    assert!(approx_eq(sailed_distance_nm(&samples), 120.08, 0.02));
    assert_eq!(sailed_distance_nm(&samples[..1]), 0.0);
    assert_eq!(sailed_distance_nm(&[]), 0.0);
}

#[test]
fn test_polyline_length_matches_sailed_distance() {
    let points = vec![
        GpsPoint::new(51.95, 4.14),
        GpsPoint::new(52.5, 3.0),
        GpsPoint::new(51.96, 1.33),
    ];
    let samples: Vec<PositionSample> = points
        .iter()
        .enumerate()
        .map(|(i, p)| PositionSample::new("v", p.latitude, p.longitude, 12.0, 0.0, i as i64))
        .collect();
    assert!(approx_eq(
        polyline_length_nm(&points),
        sailed_distance_nm(&samples),
        1e-9
    ));
}

#[test]
fn test_hours_between() {
    assert_eq!(hours_between(0, 3600), 1.0);
    assert_eq!(hours_between(1_800, 0), -0.5);
}

#[test]
fn test_nm_to_degrees_lng() {
    let deg = nm_to_degrees_lng(60.0, 0.0).unwrap();
    assert!(approx_eq(deg, 1.0, 1e-9));

    // One degree of longitude is half as long at 60 degrees
    let deg = nm_to_degrees_lng(30.0, 60.0).unwrap();
    assert!(approx_eq(deg, 1.0, 1e-9));

    assert!(nm_to_degrees_lng(10.0, 90.0).is_none());
}

#[test]
fn test_search_envelope_contains_radius() {
    let center = GpsPoint::new(51.95, 4.14);
    let envs = search_envelopes(&center, 60.0);
    assert_eq!(envs.len(), 1);
    let env = envs[0];
    assert!(approx_eq(env.min_lat, 50.95, 1e-9));
    assert!(approx_eq(env.max_lat, 52.95, 1e-9));
    assert!(env.min_lng < 4.14 - 1.5 && env.max_lng > 4.14 + 1.5);
}

#[test]
fn test_search_envelope_splits_at_antimeridian() {
    let envs = search_envelopes(&GpsPoint::new(0.0, -179.8), 30.0);
    assert_eq!(envs.len(), 2);
}

#[test]
fn test_compute_bounds() {
    let track = vec![
        GpsPoint::new(51.95, 4.14),
        GpsPoint::new(51.96, 1.33),
        GpsPoint::new(53.55, 9.97),
    ];
    let bounds = compute_bounds(&track);
    assert_eq!(bounds.min_lat, 51.95);
    assert_eq!(bounds.max_lat, 53.55);
    assert_eq!(bounds.min_lng, 1.33);
    assert_eq!(bounds.max_lng, 9.97);
}

#[test]
fn test_compute_bounds_empty() {
    let bounds = compute_bounds(&[]);
    assert_eq!(
        bounds,
        Bounds {
            min_lat: 0.0,
            max_lat: 0.0,
            min_lng: 0.0,
            max_lng: 0.0
        }
    );
    assert!(Bounds::from_points(&[]).is_none());
}

#[test]
fn test_mean_and_std_dev() {
    assert_eq!(mean(&[]), None);
    assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    assert_eq!(sample_std_dev(&[1.5]), 0.0);
    assert!(approx_eq(sample_std_dev(&[1.1, 1.3]), 0.141_421, 1e-6));
}
