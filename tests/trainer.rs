//! Tests for the batch distance model trainer

mod common;

use common::*;
use searoute::{
    DistanceModel, DistanceTrainer, ExtractedRoute, PredictionInput, RouteType, SeaRouteError,
    TrainerConfig, VesselType,
};

fn legs() -> Vec<(searoute::Port, searoute::Port)> {
    vec![
        (rotterdam(), felixstowe()),
        (rotterdam(), hamburg()),
        (felixstowe(), hamburg()),
        (antwerp(), felixstowe()),
        (antwerp(), hamburg()),
        (hamburg(), rotterdam()),
    ]
}

fn exact_log(factor: f64) -> Vec<ExtractedRoute> {
    legs()
        .iter()
        .enumerate()
        .map(|(i, (a, b))| {
            route(
                &format!("r{}", i),
                a,
                b,
                VesselType::CONTAINER,
                factor,
                0.9,
                T0 + i as i64 * 86_400,
            )
        })
        .collect()
}

#[test]
fn test_exact_factor_recovers_slope() {
    let model = DistanceTrainer::default().train(&exact_log(1.2), T0).unwrap();

    assert!(approx_eq(model.slope, 1.2, 1e-6), "slope {}", model.slope);
    assert!(approx_eq(model.intercept, 0.0, 1e-6), "intercept {}", model.intercept);
    assert!(approx_eq(model.diagnostics.r_squared, 1.0, 1e-9));
    assert!(model.diagnostics.mean_absolute_error < 1e-6);
    assert!(approx_eq(model.baseline_factor, 1.2, 1e-12));
    assert_eq!(model.training_routes, 6);
    assert_eq!(model.trained_at, T0);
}

#[test]
fn test_too_few_routes_is_insufficient_data() {
    let routes: Vec<ExtractedRoute> = exact_log(1.2).into_iter().take(4).collect();
    let err = DistanceTrainer::default().train(&routes, T0).unwrap_err();

    match &err {
        SeaRouteError::InsufficientData {
            found, required, ..
        } => {
            assert_eq!(*found, 4);
            assert_eq!(*required, 5);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.is_recoverable());
}

#[test]
fn test_low_quality_routes_are_ignored() {
    let mut routes = exact_log(1.2);
    for (i, (a, b)) in legs().iter().enumerate() {
        routes.push(route(
            &format!("noisy{}", i),
            a,
            b,
            VesselType::CONTAINER,
            3.0,
            0.4,
            T0,
        ));
    }

    let trainer = DistanceTrainer::new(TrainerConfig::default());
    assert_eq!(trainer.qualifying(&routes).len(), 6);

    let model = trainer.train(&routes, T0).unwrap();
    assert!(approx_eq(model.slope, 1.2, 1e-6));
}

#[test]
fn test_vessel_type_correction() {
    let mut routes = exact_log(1.2);
    for (i, (a, b)) in legs().iter().enumerate() {
        routes.push(route(
            &format!("tanker{}", i),
            a,
            b,
            VesselType::TANKER,
            1.4,
            0.9,
            T0,
        ));
    }

    let model = DistanceTrainer::default().train(&routes, T0).unwrap();
    let container = model.vessel_type_factors[&VesselType::CONTAINER];
    let tanker = model.vessel_type_factors[&VesselType::TANKER];

    assert!(approx_eq(model.baseline_factor, 1.3, 1e-9));
    assert!(approx_eq(container, 1.2 / 1.3, 1e-9));
    assert!(approx_eq(tanker, 1.4 / 1.3, 1e-9));

    let tanker_type = VesselType::TANKER;
    let passenger_type = VesselType::PASSENGER;

    let mut input = PredictionInput::new(100.0);
    let base = model.predict(&input);
    assert!(approx_eq(base, model.base_prediction(100.0), 1e-9));

    input.vessel_type = Some(&tanker_type);
    assert!(approx_eq(model.predict(&input), base * tanker, 1e-9));

    // Unknown vessel types are not corrected
    input.vessel_type = Some(&passenger_type);
    assert!(approx_eq(model.predict(&input), base, 1e-9));
}

#[test]
fn test_route_type_replaces_vessel_correction() {
    let mut routes = exact_log(1.2);
    for (i, (a, b)) in legs().iter().enumerate() {
        routes.push(route(
            &format!("tanker{}", i),
            a,
            b,
            VesselType::TANKER,
            1.4,
            0.9,
            T0,
        ));
    }
    let model = DistanceTrainer::default().train(&routes, T0).unwrap();

    let tanker_type = VesselType::TANKER;
    let input = PredictionInput {
        great_circle_nm: 250.0,
        vessel_type: Some(&tanker_type),
        route_type: Some(RouteType::Unknown),
        high_latitude: false,
        via_chokepoint: false,
    };
    let route_factor = model.route_type_factors[&RouteType::Unknown];
    assert!(approx_eq(
        model.predict(&input),
        model.base_prediction(250.0) * route_factor,
        1e-9
    ));
}

#[test]
fn test_unseen_predicates_correct_by_one() {
    let model = DistanceTrainer::default().train(&exact_log(1.2), T0).unwrap();

    assert_eq!(model.high_latitude_factor, 1.0);
    assert_eq!(model.chokepoint_factor, 1.0);
    assert_eq!(model.coastal_factor, 1.0);

    let plain = model.predict(&PredictionInput::new(80.0));
    let flagged = model.predict(&PredictionInput {
        high_latitude: true,
        via_chokepoint: true,
        ..PredictionInput::new(80.0)
    });
    assert!(approx_eq(plain, flagged, 1e-9));
}

#[test]
fn test_chokepoint_correction() {
    let mut routes = exact_log(1.2);
    for (i, (a, b)) in legs().iter().enumerate() {
        let mut r = route(
            &format!("canal{}", i),
            a,
            b,
            VesselType::CONTAINER,
            1.5,
            0.9,
            T0,
        );
        r.via_points = vec!["Kiel Canal".to_string()];
        routes.push(r);
    }

    let model = DistanceTrainer::default().train(&routes, T0).unwrap();
    assert!(approx_eq(model.chokepoint_factor, 1.5 / 1.35, 1e-9));
    assert!(model.chokepoint_factor > 1.0);
}

#[test]
fn test_same_distance_routes_fit_through_origin() {
    let routes: Vec<ExtractedRoute> = (0..5)
        .map(|i| {
            route(
                &format!("r{}", i),
                &rotterdam(),
                &felixstowe(),
                VesselType::CONTAINER,
                1.1 + i as f64 * 0.05,
                0.9,
                T0,
            )
        })
        .collect();

    let model = DistanceTrainer::default().train(&routes, T0).unwrap();
    assert_eq!(model.intercept, 0.0);
    assert!(approx_eq(model.slope, 1.2, 1e-9));
}

#[test]
fn test_model_json_artifact() {
    let model = DistanceTrainer::default().train(&exact_log(1.2), T0).unwrap();
    let json = serde_json::to_string(&model).unwrap();
    assert!(json.contains("\"CONTAINER\""));

    let restored: DistanceModel = serde_json::from_str(&json).unwrap();
    assert!(approx_eq(restored.slope, model.slope, 1e-9));
    assert_eq!(restored.vessel_type_factors.len(), 1);
    assert_eq!(restored.training_routes, model.training_routes);
    assert!(approx_eq(
        restored.predict(&PredictionInput::new(120.0)),
        model.predict(&PredictionInput::new(120.0)),
        1e-6
    ));
}
