//! # Maritime Graph
//!
//! A weighted directed graph of ports and observed legs, aggregated from the
//! route log. The graph is immutable once built; a rebuild produces a new
//! value.
//!
//! ## Determinism
//! Groups are keyed in a `BTreeMap` and each group is sorted before
//! averaging, so the same multiset of routes in any order produces an
//! identical graph.
//!
//! ## Edge cost
//! `great_circle × mean_factor / mean_quality`. Lower-quality observations
//! make a leg more expensive. Legs with a non-positive cost are not emitted.

pub mod planner;

pub use planner::{
    PlannerConfig, RouteLeg, RoutePlan, RoutePlanner, SearchControl, SearchOutcome, SearchResult,
};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::PortDirectory;
use crate::geo_utils::{haversine_nm, mean};
use crate::learning::{IncrementalLearner, confidence};
use crate::spatial::SpatialIndex;
use crate::{ExtractedRoute, GpsPoint, Port, Result, RouteType, VesselType};

/// Configuration for graph construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum route quality for a route to contribute.
    /// Default: 0.5
    pub min_quality: f64,

    /// Plausible distance factor band.
    /// Default: [1.0, 3.5]
    pub min_distance_factor: f64,
    pub max_distance_factor: f64,

    /// Observations at which edge confidence reaches 1 - 1/e.
    /// Default: 10.0
    pub confidence_time_constant: f64,

    /// Edges at or above this confidence count as high confidence.
    /// Default: 0.8
    pub high_confidence: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.5,
            min_distance_factor: 1.0,
            max_distance_factor: 3.5,
            confidence_time_constant: 10.0,
            high_confidence: 0.8,
        }
    }
}

impl GraphConfig {
    pub fn accepts(&self, route: &ExtractedRoute) -> bool {
        route.quality_score >= self.min_quality
            && route.distance_factor >= self.min_distance_factor
            && route.distance_factor <= self.max_distance_factor
            && route.origin_port_id != route.destination_port_id
    }
}

/// An aggregated, directed leg between two ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub great_circle_nm: f64,
    pub mean_actual_nm: f64,
    pub mean_distance_factor: f64,
    pub mean_quality: f64,
    pub observations: usize,
    pub confidence: f64,
    /// Sorted, distinct
    pub vessel_types: Vec<VesselType>,
    /// Most frequent classification; ties go to the first in declaration order
    pub route_type: RouteType,
    /// Sorted union of chokepoints seen on this leg
    pub chokepoints: Vec<String>,
    pub cost: f64,
}

/// A port with at least one observed leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub unlocode: String,
    pub name: String,
    pub country: String,
    pub location: GpsPoint,
    /// Outgoing edges, sorted by destination id
    pub edges: Vec<GraphEdge>,
}

impl GraphNode {
    pub fn new(port: &Port, location: GpsPoint) -> Self {
        Self {
            id: port.id.clone(),
            unlocode: port.unlocode.clone(),
            name: port.name.clone(),
            country: port.country.clone(),
            location,
            edges: Vec::new(),
        }
    }

    pub fn out_degree(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_to(&self, to: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.to == to)
    }
}

/// Aggregate counters over a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_edges_per_node: f64,
    pub min_edges_per_node: usize,
    pub max_edges_per_node: usize,
    /// Fraction of nodes with at least one outgoing edge
    pub coverage: f64,
    pub avg_edge_confidence: f64,
    pub high_confidence_edges: usize,
}

/// Immutable graph snapshot.
#[derive(Debug, Clone, Default)]
pub struct MaritimeGraph {
    /// Sorted by id
    nodes: Vec<GraphNode>,
    by_id: HashMap<String, usize>,
    by_unlocode: HashMap<String, usize>,
    spatial: SpatialIndex,
    high_confidence: f64,
}

impl PartialEq for MaritimeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl MaritimeGraph {
    /// Build from the route log and port master data.
    pub fn build(
        routes: &[ExtractedRoute],
        ports: &dyn PortDirectory,
        config: &GraphConfig,
    ) -> Result<Self> {
        Self::build_inner(routes, ports, config, None)
    }

    /// Build, taking edge confidence from the learner where it knows the pair.
    pub fn build_with_learning(
        routes: &[ExtractedRoute],
        ports: &dyn PortDirectory,
        config: &GraphConfig,
        learner: &IncrementalLearner,
    ) -> Result<Self> {
        Self::build_inner(routes, ports, config, Some(learner))
    }

    fn build_inner(
        routes: &[ExtractedRoute],
        ports: &dyn PortDirectory,
        config: &GraphConfig,
        learner: Option<&IncrementalLearner>,
    ) -> Result<Self> {
        let mut groups: BTreeMap<(&str, &str), Vec<&ExtractedRoute>> = BTreeMap::new();
        for route in routes.iter().filter(|r| config.accepts(r)) {
            groups
                .entry((route.origin_port_id.as_str(), route.destination_port_id.as_str()))
                .or_default()
                .push(route);
        }

        let port_ids: BTreeSet<&str> = groups.keys().flat_map(|(o, d)| [*o, *d]).collect();
        let mut nodes: Vec<GraphNode> = Vec::with_capacity(port_ids.len());
        for id in port_ids {
            match ports.port(id)? {
                Some(port) => match port.coordinates {
                    Some(location) => nodes.push(GraphNode::new(&port, location)),
                    None => debug!("[Graph] Port {} has no coordinates, not a node", id),
                },
                None => debug!("[Graph] Port {} not in directory, not a node", id),
            }
        }
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut skipped = 0usize;
        let mut pending: Vec<(usize, GraphEdge)> = Vec::with_capacity(groups.len());
        for ((origin, destination), mut group) in groups {
            let (Some(&oi), Some(&di)) = (index.get(origin), index.get(destination)) else {
                skipped += 1;
                continue;
            };
            group.sort_by(|a, b| {
                a.departure_time
                    .cmp(&b.departure_time)
                    .then_with(|| a.id.cmp(&b.id))
                    .then_with(|| a.vessel_id.cmp(&b.vessel_id))
                    .then_with(|| a.distance_factor.total_cmp(&b.distance_factor))
                    .then_with(|| a.quality_score.total_cmp(&b.quality_score))
            });

            match aggregate_edge(&nodes[oi], &nodes[di], &group, config, learner) {
                Some(edge) => pending.push((oi, edge)),
                None => skipped += 1,
            }
        }
        for (oi, edge) in pending {
            nodes[oi].edges.push(edge);
        }

        let graph = Self::from_nodes(nodes, config.high_confidence);
        info!(
            "[Graph] Built {} nodes and {} edges from {} routes ({} legs skipped)",
            graph.node_count(),
            graph.edge_count(),
            routes.len(),
            skipped
        );
        Ok(graph)
    }

    /// Assemble a graph from prepared nodes.
    ///
    /// Nodes are sorted by id and each node's edges by destination id.
    pub fn from_nodes(mut nodes: Vec<GraphNode>, high_confidence: f64) -> Self {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        for node in &mut nodes {
            node.edges.sort_by(|a, b| a.to.cmp(&b.to));
        }

        let by_id = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let by_unlocode = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.unlocode.to_ascii_uppercase(), i))
            .collect();
        let spatial = SpatialIndex::build(nodes.iter().enumerate().map(|(i, n)| (i, n.location)));

        Self {
            nodes,
            by_id,
            by_unlocode,
            spatial,
            high_confidence,
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn node_by_unlocode(&self, unlocode: &str) -> Option<&GraphNode> {
        self.by_unlocode
            .get(&unlocode.to_ascii_uppercase())
            .map(|&i| &self.nodes[i])
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(GraphNode::out_degree).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes within `radius_nm`, nearest first, with distances.
    pub fn nodes_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_nm: f64,
    ) -> Vec<(&GraphNode, f64)> {
        self.spatial
            .within_radius(&GpsPoint::new(latitude, longitude), radius_nm)
            .into_iter()
            .map(|(i, d)| (&self.nodes[i], d))
            .collect()
    }

    /// Nodes ranked by outgoing edge count, descending; ties by id.
    pub fn hubs(&self, limit: usize) -> Vec<&GraphNode> {
        let mut ranked: Vec<&GraphNode> = self.nodes.iter().collect();
        ranked.sort_by(|a, b| b.out_degree().cmp(&a.out_degree()).then(a.id.cmp(&b.id)));
        ranked.truncate(limit);
        ranked
    }

    pub fn stats(&self) -> GraphStats {
        if self.nodes.is_empty() {
            return GraphStats::default();
        }

        let degrees: Vec<usize> = self.nodes.iter().map(GraphNode::out_degree).collect();
        let edge_count: usize = degrees.iter().sum();
        let confidences: Vec<f64> = self
            .nodes
            .iter()
            .flat_map(|n| n.edges.iter().map(|e| e.confidence))
            .collect();

        GraphStats {
            node_count: self.nodes.len(),
            edge_count,
            avg_edges_per_node: edge_count as f64 / self.nodes.len() as f64,
            min_edges_per_node: degrees.iter().copied().min().unwrap_or(0),
            max_edges_per_node: degrees.iter().copied().max().unwrap_or(0),
            coverage: degrees.iter().filter(|&&d| d > 0).count() as f64 / self.nodes.len() as f64,
            avg_edge_confidence: mean(&confidences).unwrap_or(0.0),
            high_confidence_edges: confidences
                .iter()
                .filter(|&&c| c >= self.high_confidence)
                .count(),
        }
    }
}

/// Aggregate one sorted group of routes into an edge.
fn aggregate_edge(
    from: &GraphNode,
    to: &GraphNode,
    group: &[&ExtractedRoute],
    config: &GraphConfig,
    learner: Option<&IncrementalLearner>,
) -> Option<GraphEdge> {
    let factors: Vec<f64> = group.iter().map(|r| r.distance_factor).collect();
    let actuals: Vec<f64> = group.iter().map(|r| r.actual_sailed_nm).collect();
    let qualities: Vec<f64> = group.iter().map(|r| r.quality_score).collect();

    let mean_distance_factor = mean(&factors)?;
    let mean_actual_nm = mean(&actuals)?;
    let mean_quality = mean(&qualities)?;

    let great_circle_nm = haversine_nm(&from.location, &to.location);
    if mean_quality <= 0.0 {
        debug!("[Graph] Leg {} -> {} has zero quality", from.id, to.id);
        return None;
    }
    let cost = great_circle_nm * mean_distance_factor / mean_quality;
    if !cost.is_finite() || cost <= 0.0 {
        debug!(
            "[Graph] Leg {} -> {} has non-positive cost {:.3}",
            from.id, to.id, cost
        );
        return None;
    }

    let vessel_types: BTreeSet<&VesselType> = group.iter().map(|r| &r.vessel_type).collect();
    let chokepoints: BTreeSet<&str> = group
        .iter()
        .flat_map(|r| r.via_points.iter().map(String::as_str))
        .collect();

    let observations = group.len();
    let edge_confidence = learner
        .and_then(|l| l.pair(&from.id, &to.id))
        .map(|p| p.confidence)
        .unwrap_or_else(|| confidence(observations, config.confidence_time_constant));

    Some(GraphEdge {
        from: from.id.clone(),
        to: to.id.clone(),
        great_circle_nm,
        mean_actual_nm,
        mean_distance_factor,
        mean_quality,
        observations,
        confidence: edge_confidence,
        vessel_types: vessel_types.into_iter().cloned().collect(),
        route_type: representative_route_type(group),
        chokepoints: chokepoints.into_iter().map(str::to_string).collect(),
        cost,
    })
}

fn representative_route_type(group: &[&ExtractedRoute]) -> RouteType {
    let mut counts: BTreeMap<RouteType, usize> = BTreeMap::new();
    for r in group {
        *counts.entry(r.route_type).or_insert(0) += 1;
    }

    let mut best = (RouteType::Unknown, 0usize);
    for (route_type, count) in counts {
        if count > best.1 {
            best = (route_type, count);
        }
    }
    best.0
}
