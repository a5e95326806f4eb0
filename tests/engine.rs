//! Tests for the routing engine and its in-memory collaborators

mod common;

use std::sync::Arc;

use common::*;
use searoute::engine::{SpeedBand, TimeWindow};
use searoute::{
    EngineConfig, ExtractedRoute, InMemoryPortDirectory, InMemoryPositionFeed, InMemoryRouteLog,
    NoPathReason, PortDirectory, PositionFeed, PositionSample, PredictionSource, RouteLogReader,
    RouteLogWriter, RouteQuery, RoutingEngine, SeaRouteError, VesselType,
};

fn route_log() -> Vec<ExtractedRoute> {
    let (r, f, h, a) = (rotterdam(), felixstowe(), hamburg(), antwerp());
    let mut routes = Vec::new();
    for i in 0..3 {
        let t = T0 + i * 86_400;
        routes.push(route(&format!("rf{}", i), &r, &f, VesselType::CONTAINER, 1.1, 0.9, t));
        routes.push(route(&format!("fh{}", i), &f, &h, VesselType::CONTAINER, 1.2, 0.85, t));
        routes.push(route(&format!("ha{}", i), &h, &a, VesselType::TANKER, 1.15, 0.9, t));
    }
    routes
}

fn engine_with(routes: Vec<ExtractedRoute>) -> (RoutingEngine, Arc<InMemoryRouteLog>) {
    let log = Arc::new(InMemoryRouteLog::with_routes(routes));
    let ports = Arc::new(InMemoryPortDirectory::new(test_ports()));
    let engine = RoutingEngine::new(ports, log.clone(), EngineConfig::default());
    (engine, log)
}

#[test]
fn test_rebuild_publishes_snapshot() {
    let (engine, _) = engine_with(route_log());
    let before = engine.snapshot();
    assert!(before.graph.is_empty());

    let after = engine.rebuild(T0).unwrap();
    assert_eq!(after.routes_read, 9);
    assert_eq!(after.built_at, T0);
    assert_eq!(after.graph.node_count(), 4);
    assert_eq!(after.graph.edge_count(), 3);
    assert_eq!(after.learner.pair_count(), 3);

    // Held snapshots never change
    assert!(before.graph.is_empty());
    assert!(Arc::ptr_eq(&engine.snapshot(), &after));
}

#[test]
fn test_find_route_multi_hop() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    let plan = engine.find_route("NLRTM", "p_beanr", None).unwrap();
    assert_eq!(plan.hops(), 3);
    assert_eq!(
        plan.waypoints,
        vec!["Rotterdam", "Felixstowe", "Hamburg", "Antwerp"]
    );
    assert!(plan.total_distance_nm > plan.total_great_circle_nm);
}

#[test]
fn test_find_route_without_path() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    let err = engine.find_route("p_beanr", "p_nlrtm", None).unwrap_err();
    match &err {
        SeaRouteError::NoPathFound {
            origin,
            destination,
            reason,
        } => {
            assert_eq!(origin, "p_beanr");
            assert_eq!(destination, "p_nlrtm");
            assert_eq!(*reason, NoPathReason::Disconnected);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.is_recoverable());
}

#[test]
fn test_find_route_before_rebuild_has_no_path() {
    let (engine, _) = engine_with(route_log());
    let err = engine.find_route("p_nlrtm", "p_gbfxt", None).unwrap_err();
    assert!(matches!(err, SeaRouteError::NoPathFound { .. }));
}

#[test]
fn test_find_route_port_errors() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    assert!(matches!(
        engine.find_route("p_nowhere", "p_gbfxt", None),
        Err(SeaRouteError::PortNotFound { .. })
    ));
    assert!(matches!(
        engine.find_route("p_nlrtm", "p_depot", None),
        Err(SeaRouteError::PortCoordinatesMissing { .. })
    ));
}

#[test]
fn test_predict_distance() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    let p = engine
        .predict_distance("p_nlrtm", "p_gbfxt", Some(&VesselType::CONTAINER))
        .unwrap();
    assert_eq!(p.source, PredictionSource::Learned);
    assert!(approx_eq(p.factor, 1.1, 1e-9));
    assert_eq!(p.observations, 3);

    // Unseen pair falls back to the vessel type mean
    let p = engine
        .predict_distance("p_gbfxt", "p_nlrtm", Some(&VesselType::TANKER))
        .unwrap();
    assert_eq!(p.source, PredictionSource::VesselType);
    assert!(approx_eq(p.factor, 1.15, 1e-9));
}

#[test]
fn test_learn_updates_learner_only() {
    let (engine, _) = engine_with(route_log());
    let built = engine.rebuild(T0).unwrap();

    let new_route = route(
        "hr0",
        &hamburg(),
        &rotterdam(),
        VesselType::BULK_CARRIER,
        1.3,
        0.9,
        T0,
    );
    assert!(engine.learn(&new_route));

    let current = engine.snapshot();
    assert_eq!(current.learner.pair_count(), 4);
    assert_eq!(built.learner.pair_count(), 3);
    assert!(Arc::ptr_eq(&current.graph, &built.graph));

    let p = engine
        .predict_distance("p_deham", "p_nlrtm", None)
        .unwrap();
    assert_eq!(p.source, PredictionSource::Learned);
    assert!(approx_eq(p.factor, 1.3, 1e-12));
}

#[test]
fn test_learn_rejects_filtered_route() {
    let log = Arc::new(InMemoryRouteLog::new());
    let ports = Arc::new(InMemoryPortDirectory::new(test_ports()));
    let mut config = EngineConfig::default();
    config.learner.min_quality = 0.8;
    let engine = RoutingEngine::new(ports, log, config);

    let poor = route("p", &rotterdam(), &felixstowe(), VesselType::TANKER, 1.2, 0.5, T0);
    let before = engine.snapshot();
    assert!(!engine.learn(&poor));
    assert!(Arc::ptr_eq(&before, &engine.snapshot()));
}

#[test]
fn test_retrain_needs_enough_routes() {
    let (engine, _) = engine_with(route_log().into_iter().take(4).collect());

    let err = engine.retrain(T0).unwrap_err();
    assert!(matches!(err, SeaRouteError::InsufficientData { found: 4, .. }));
    assert!(engine.snapshot().model.is_none());
    assert_eq!(
        engine
            .predict_distance_model("p_nlrtm", "p_gbfxt", None)
            .unwrap(),
        None
    );
}

#[test]
fn test_retrain_publishes_model() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();
    let model = engine.retrain(T0 + 60).unwrap();

    assert_eq!(model.training_routes, 9);
    assert_eq!(model.trained_at, T0 + 60);

    let snapshot = engine.snapshot();
    assert!(snapshot.model.is_some());
    // Graph and learner carried over from the rebuild
    assert_eq!(snapshot.graph.edge_count(), 3);

    let nm = engine
        .predict_distance_model("p_nlrtm", "p_gbfxt", Some(&VesselType::CONTAINER))
        .unwrap()
        .unwrap();
    assert!(nm > 100.0 && nm < 140.0, "predicted {}", nm);

    // A later rebuild keeps the model
    engine.rebuild(T0 + 120).unwrap();
    assert!(engine.snapshot().model.is_some());
}

#[test]
fn test_hubs_and_nearby_ports() {
    let (engine, _) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    let hubs = engine.find_hubs(10);
    assert_eq!(hubs.len(), 4);
    assert_eq!(hubs[3].id, "p_beanr");
    assert_eq!(hubs[3].out_degree, 0);

    let nearby = engine.find_ports_nearby(51.95, 4.14, 60.0).unwrap();
    let ids: Vec<&str> = nearby.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p_nlrtm", "p_beanr"]);
    assert_eq!(nearby[0].out_degree, 1);
    assert!(nearby[1].distance_nm.unwrap() > 40.0);

    let stats = engine.graph_stats();
    assert_eq!(stats.node_count, 4);
}

#[test]
fn test_rebuild_sees_appended_routes() {
    let (engine, log) = engine_with(route_log());
    engine.rebuild(T0).unwrap();

    log.append(route(
        "ar0",
        &antwerp(),
        &rotterdam(),
        VesselType::CONTAINER,
        1.1,
        0.9,
        T0,
    ))
    .unwrap();
    assert!(engine.find_route("p_beanr", "p_nlrtm", None).is_err());

    engine.rebuild(T0 + 1).unwrap();
    let plan = engine.find_route("p_beanr", "p_nlrtm", None).unwrap();
    assert_eq!(plan.hops(), 1);
}

// ============================================================================
// Collaborators
// ============================================================================

#[test]
fn test_route_query_filters() {
    let log = InMemoryRouteLog::with_routes(route_log());

    let tankers = log
        .routes(&RouteQuery::all().with_vessel_type(VesselType::TANKER))
        .unwrap();
    assert_eq!(tankers.len(), 3);

    let good = log.routes(&RouteQuery::all().with_min_quality(0.9)).unwrap();
    assert_eq!(good.len(), 6);

    let pair = log
        .routes(&RouteQuery::all().with_port_pair("p_nlrtm", "p_gbfxt"))
        .unwrap();
    assert_eq!(pair.len(), 3);

    let first_day = log
        .routes(&RouteQuery::all().with_window(TimeWindow::new(T0, T0 + 3_600)))
        .unwrap();
    assert_eq!(first_day.len(), 3);
}

#[test]
fn test_route_log_keeps_duplicates() {
    let log = InMemoryRouteLog::new();
    let r = route("dup", &rotterdam(), &felixstowe(), VesselType::TANKER, 1.2, 0.9, T0);
    log.append(r.clone()).unwrap();
    log.append(r).unwrap();
    assert_eq!(log.len(), 2);

    let json = log.to_json_string().unwrap();
    let restored = InMemoryRouteLog::from_json_str(&json).unwrap();
    assert_eq!(restored.len(), 2);
    assert!(restored.all().iter().all(|r| r.id == "dup"));
}

#[test]
fn test_port_directory_lookups() {
    let ports = InMemoryPortDirectory::new(test_ports());

    assert_eq!(ports.port("p_nlrtm").unwrap().unwrap().name, "Rotterdam");
    assert_eq!(ports.port_by_unlocode("gbfxt").unwrap().unwrap().id, "p_gbfxt");
    assert!(ports.port("NLRTM").unwrap().is_none());
    assert_eq!(ports.ports_with_coordinates().unwrap().len(), 4);

    let near = ports
        .nearest_within(&searoute::GpsPoint::new(51.9, 4.0), 20.0)
        .unwrap()
        .unwrap();
    assert_eq!(near.id, "p_nlrtm");
    assert!(
        ports
            .nearest_within(&searoute::GpsPoint::new(54.5, 3.0), 75.0)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_port_directory_duplicate_id_replaces() {
    let mut moved = rotterdam();
    moved.name = "Rotterdam Maasvlakte".to_string();
    let ports = InMemoryPortDirectory::new(vec![rotterdam(), moved]);

    assert_eq!(ports.len(), 1);
    assert_eq!(
        ports.port("p_nlrtm").unwrap().unwrap().name,
        "Rotterdam Maasvlakte"
    );
}

#[test]
fn test_position_feed_window_and_speed_band() {
    let samples: Vec<PositionSample> = (0..10)
        .map(|i| PositionSample::new("v1", 0.0, i as f64 * 0.01, i as f64 * 2.0, 90.0, i * 600))
        .collect();
    let feed = InMemoryPositionFeed::new(samples.into_iter().rev());

    let all = feed
        .positions("v1", &TimeWindow::new(0, 10_000), None)
        .unwrap();
    assert_eq!(all.len(), 10);
    assert!(all.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let windowed = feed
        .positions("v1", &TimeWindow::new(600, 1_800), None)
        .unwrap();
    assert_eq!(windowed.len(), 3);

    let moving = feed
        .positions(
            "v1",
            &TimeWindow::new(0, 10_000),
            Some(SpeedBand { min: 3.0, max: 12.0 }),
        )
        .unwrap();
    assert_eq!(moving.len(), 5);

    assert!(
        feed.positions("v2", &TimeWindow::new(0, 10_000), None)
            .unwrap()
            .is_empty()
    );
    assert_eq!(feed.vessel_ids(), vec!["v1"]);
    assert_eq!(feed.time_range("v1"), Some(TimeWindow::new(0, 5_400)));
}

#[test]
fn test_engine_config_from_json() {
    let config = EngineConfig::from_json_str(
        r#"{ "learner": { "min_observations": 3 }, "graph": { "min_quality": 0.6 } }"#,
    )
    .unwrap();
    assert_eq!(config.learner.min_observations, 3);
    assert_eq!(config.graph.min_quality, 0.6);
    assert_eq!(config.segment.max_gap_hours, 6.0);

    let err = EngineConfig::from_json_str(
        r#"{ "extraction": { "min_distance_factor": 4.0, "max_distance_factor": 2.0 } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, SeaRouteError::Config(_)));

    let err = EngineConfig::from_json_str(r#"{ "segment": { "reanchor_fixes": 1 } }"#).unwrap_err();
    assert!(matches!(err, SeaRouteError::Config(_)));
}
