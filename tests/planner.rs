//! Tests for A* route planning

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use searoute::{
    GpsPoint, GraphEdge, GraphNode, MaritimeGraph, NoPathReason, PlannerConfig, Port, RoutePlanner,
    RouteType, SearchControl, SearchOutcome, SeaRouteError, VesselType,
};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn edge(from: &str, to: &str, cost: f64) -> GraphEdge {
    GraphEdge {
        from: from.to_string(),
        to: to.to_string(),
        great_circle_nm: cost * 0.8,
        mean_actual_nm: cost * 0.9,
        mean_distance_factor: 1.125,
        mean_quality: 0.9,
        observations: 4,
        confidence: 0.33,
        vessel_types: vec![VesselType::CONTAINER],
        route_type: RouteType::Direct,
        chokepoints: Vec::new(),
        cost,
    }
}

fn node(id: &str, lng: f64, edges: Vec<GraphEdge>) -> GraphNode {
    let location = GpsPoint::new(0.0, lng);
    let port = Port::new(id, &id.to_ascii_uppercase(), &format!("Port {}", id), "XX", location);
    let mut node = GraphNode::new(&port, location);
    node.edges = edges;
    node
}

/// A -> B -> C costs 20, the direct A -> C leg costs 25.
///
/// Nodes sit a fraction of a mile apart so the heuristic stays small
/// against the edge costs.
fn triangle() -> MaritimeGraph {
    MaritimeGraph::from_nodes(
        vec![
            node("a", 0.0, vec![edge("a", "b", 10.0), edge("a", "c", 25.0)]),
            node("b", 0.005, vec![edge("b", "c", 10.0)]),
            node("c", 0.01, Vec::new()),
        ],
        0.8,
    )
}

#[test]
fn test_prefers_cheaper_two_hop_path() {
    let planner = RoutePlanner::default();
    let result = planner
        .find_route(&triangle(), "a", "c", None, &SearchControl::none())
        .unwrap();
    let plan = result.plan().expect("path found");

    assert_eq!(plan.hops(), 2);
    assert!(approx_eq(plan.total_cost, 20.0, 1e-9));
    assert_eq!(plan.waypoints, vec!["Port a", "Port b", "Port c"]);
    assert_eq!(plan.legs[0].from_id, "a");
    assert_eq!(plan.legs[0].to_id, "b");
    assert_eq!(plan.legs[1].to_id, "c");
    assert_eq!(plan.origin_id, "a");
    assert_eq!(plan.destination_id, "c");
}

#[test]
fn test_plan_totals() {
    let planner = RoutePlanner::default();
    let plan = planner
        .find_route(&triangle(), "a", "c", None, &SearchControl::none())
        .unwrap()
        .into_plan()
        .unwrap();

    assert!(approx_eq(plan.total_distance_nm, 18.0, 1e-9));
    assert!(approx_eq(plan.total_great_circle_nm, 16.0, 1e-9));
    assert!(approx_eq(plan.average_distance_factor, 1.125, 1e-9));
    assert!(approx_eq(plan.average_confidence, 0.33, 1e-12));
}

#[test]
fn test_single_leg() {
    let planner = RoutePlanner::default();
    let plan = planner
        .find_route(&triangle(), "b", "c", None, &SearchControl::none())
        .unwrap()
        .into_plan()
        .unwrap();
    assert_eq!(plan.hops(), 1);
    assert!(approx_eq(plan.total_cost, 10.0, 1e-9));
}

#[test]
fn test_vessel_type_is_informational() {
    let planner = RoutePlanner::default();
    let graph = triangle();
    let tanker = VesselType::TANKER;

    let plain = planner
        .find_route(&graph, "a", "c", None, &SearchControl::none())
        .unwrap()
        .into_plan()
        .unwrap();
    let typed = planner
        .find_route(&graph, "a", "c", Some(&tanker), &SearchControl::none())
        .unwrap()
        .into_plan()
        .unwrap();

    assert_eq!(typed.vessel_type, Some(VesselType::TANKER));
    assert_eq!(typed.total_cost, plain.total_cost);
    assert_eq!(typed.waypoints, plain.waypoints);
}

#[test]
fn test_origin_equals_destination() {
    let planner = RoutePlanner::default();
    let result = planner
        .find_route(&triangle(), "b", "b", None, &SearchControl::none())
        .unwrap();
    let plan = result.plan().unwrap();

    assert_eq!(plan.hops(), 0);
    assert_eq!(plan.total_cost, 0.0);
    assert_eq!(plan.average_distance_factor, 1.0);
    assert_eq!(plan.waypoints, vec!["Port b"]);
    assert_eq!(result.iterations, 0);
}

#[test]
fn test_edges_are_directed() {
    let planner = RoutePlanner::default();
    let result = planner
        .find_route(&triangle(), "c", "a", None, &SearchControl::none())
        .unwrap();
    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::Disconnected));
}

#[test]
fn test_disconnected_components() {
    let graph = MaritimeGraph::from_nodes(
        vec![
            node("a", 0.0, vec![edge("a", "b", 10.0)]),
            node("b", 0.005, Vec::new()),
            node("c", 0.01, vec![edge("c", "d", 10.0)]),
            node("d", 0.015, Vec::new()),
        ],
        0.8,
    );

    let result = RoutePlanner::default()
        .find_route(&graph, "a", "d", None, &SearchControl::none())
        .unwrap();
    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::Disconnected));
    assert!(!result.is_found());
    assert_eq!(result.expanded, 2);
}

#[test]
fn test_unknown_port_is_error() {
    let err = RoutePlanner::default()
        .find_route(&triangle(), "a", "zz", None, &SearchControl::none())
        .unwrap_err();
    assert!(matches!(err, SeaRouteError::PortNotFound { ref port } if port == "zz"));
}

#[test]
fn test_iteration_cap() {
    let planner = RoutePlanner::new(PlannerConfig {
        max_iterations: 1,
        ..PlannerConfig::default()
    });
    let result = planner
        .find_route(&triangle(), "a", "c", None, &SearchControl::none())
        .unwrap();

    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::IterationCap));
    assert_eq!(result.iterations, 1);
}

#[test]
fn test_cancel_flag() {
    let cancel = AtomicBool::new(true);
    let control = SearchControl::none().with_cancel(&cancel);
    let result = RoutePlanner::default()
        .find_route(&triangle(), "a", "c", None, &control)
        .unwrap();

    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::Cancelled));
    assert_eq!(result.iterations, 0);
}

#[test]
fn test_deadline() {
    let control = SearchControl::none().with_deadline(Instant::now());
    let result = RoutePlanner::default()
        .find_route(&triangle(), "a", "c", None, &control)
        .unwrap();
    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::Deadline));
}

#[test]
fn test_zero_timeout_from_config() {
    let planner = RoutePlanner::new(PlannerConfig {
        timeout_ms: Some(0),
        ..PlannerConfig::default()
    });
    let result = planner
        .find_route(&triangle(), "a", "c", None, &SearchControl::none())
        .unwrap();
    assert_eq!(result.outcome, SearchOutcome::NotFound(NoPathReason::Deadline));
}

#[test]
fn test_no_node_is_expanded_twice() {
    // Fully connected grid of five nodes
    let ids = ["a", "b", "c", "d", "e"];
    let nodes: Vec<GraphNode> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let edges = ids
                .iter()
                .filter(|other| *other != id)
                .map(|other| edge(id, other, 10.0 + i as f64))
                .collect();
            node(id, i as f64 * 0.005, edges)
        })
        .collect();
    let graph = MaritimeGraph::from_nodes(nodes, 0.8);

    let result = RoutePlanner::default()
        .find_route(&graph, "a", "e", None, &SearchControl::none())
        .unwrap();

    assert!(result.is_found());
    assert!(result.expanded <= graph.node_count());
    assert_eq!(result.plan().unwrap().hops(), 1);
}
