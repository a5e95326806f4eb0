//! # Routing Engine
//!
//! The query surface over the learned models, and the interfaces to the
//! environment they are built from.
//!
//! ## Architecture
//!
//! - [`sources`] - traits for the position feed, port directory and route log
//! - [`InMemoryPortDirectory`], [`InMemoryRouteLog`], [`InMemoryPositionFeed`] -
//!   in-memory collaborators for tests, the CLI and embedding
//! - [`RoutingEngine`] - publishes immutable [`EngineSnapshot`]s
//!
//! ## Snapshots
//! Readers call [`RoutingEngine::snapshot`] and keep the returned `Arc` for as
//! long as they need a consistent view. [`RoutingEngine::rebuild`],
//! [`RoutingEngine::retrain`] and [`RoutingEngine::learn`] build a new
//! snapshot off to the side and swap it in; a published snapshot is never
//! mutated. Writers are serialised among themselves.

pub mod port_directory;
pub mod position_feed;
pub mod route_log;
pub mod sources;

pub use port_directory::InMemoryPortDirectory;
pub use position_feed::InMemoryPositionFeed;
pub use route_log::InMemoryRouteLog;
pub use sources::{
    PortDirectory, PositionFeed, RouteLogReader, RouteLogWriter, RouteQuery, SpeedBand,
    TimeWindow, resolve_port, resolve_port_location,
};

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::info;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::geo_utils::haversine_nm;
use crate::graph::{
    GraphNode, GraphStats, MaritimeGraph, RoutePlan, RoutePlanner, SearchControl, SearchOutcome,
};
use crate::learning::{DistancePrediction, IncrementalLearner};
use crate::trainer::{DistanceModel, DistanceTrainer, PredictionInput};
use crate::{ExtractedRoute, GpsPoint, NoPathReason, Port, Result, SeaRouteError, VesselType};

/// One consistent view of the learned state.
#[derive(Debug, Clone, Default)]
pub struct EngineSnapshot {
    pub graph: Arc<MaritimeGraph>,
    pub learner: Arc<IncrementalLearner>,
    pub model: Option<Arc<DistanceModel>>,
    /// Unix time the graph and learner were last rebuilt
    pub built_at: i64,
    /// Routes read at the last rebuild
    pub routes_read: usize,
}

/// A port as returned by the hub and nearby queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSummary {
    pub id: String,
    pub unlocode: String,
    pub name: String,
    pub country: String,
    pub location: GpsPoint,
    /// Outgoing legs in the current graph
    pub out_degree: usize,
    /// Distance from the query point, for nearby queries
    pub distance_nm: Option<f64>,
}

impl PortSummary {
    fn from_node(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            unlocode: node.unlocode.clone(),
            name: node.name.clone(),
            country: node.country.clone(),
            location: node.location,
            out_degree: node.out_degree(),
            distance_nm: None,
        }
    }

    fn from_port(port: Port, location: GpsPoint, out_degree: usize, distance_nm: f64) -> Self {
        Self {
            id: port.id,
            unlocode: port.unlocode,
            name: port.name,
            country: port.country,
            location,
            out_degree,
            distance_nm: Some(distance_nm),
        }
    }
}

/// Dependency-injected routing service.
pub struct RoutingEngine {
    ports: Arc<dyn PortDirectory>,
    route_log: Arc<dyn RouteLogReader>,
    config: EngineConfig,
    current: RwLock<Arc<EngineSnapshot>>,
    writer: Mutex<()>,
}

impl RoutingEngine {
    /// Create an engine with an empty snapshot. Call [`Self::rebuild`] to
    /// learn from the route log.
    pub fn new(
        ports: Arc<dyn PortDirectory>,
        route_log: Arc<dyn RouteLogReader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ports,
            route_log,
            config,
            current: RwLock::new(Arc::new(EngineSnapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ports(&self) -> &dyn PortDirectory {
        self.ports.as_ref()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: EngineSnapshot) -> Arc<EngineSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        snapshot
    }

    // ========================================================================
    // Writers
    // ========================================================================

    /// Rebuild the learner and graph from the full route log.
    ///
    /// The trained distance model, if any, is carried over.
    pub fn rebuild(&self, now: i64) -> Result<Arc<EngineSnapshot>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let routes = self.route_log.routes(&RouteQuery::all())?;
        let learner = IncrementalLearner::build(&routes, self.config.learner.clone());
        let graph = MaritimeGraph::build(&routes, self.ports.as_ref(), &self.config.graph)?;

        let previous = self.snapshot();
        let snapshot = self.publish(EngineSnapshot {
            graph: Arc::new(graph),
            learner: Arc::new(learner),
            model: previous.model.clone(),
            built_at: now,
            routes_read: routes.len(),
        });

        info!(
            "[Engine] Published snapshot: {} routes, {} nodes, {} edges, {} port pairs",
            snapshot.routes_read,
            snapshot.graph.node_count(),
            snapshot.graph.edge_count(),
            snapshot.learner.pair_count()
        );
        Ok(snapshot)
    }

    /// Train a new distance model from the route log and publish it.
    ///
    /// Too little training data is a hard error; the previous model stays
    /// published.
    pub fn retrain(&self, now: i64) -> Result<Arc<DistanceModel>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let query = RouteQuery::all().with_min_quality(self.config.trainer.min_quality);
        let routes = self.route_log.routes(&query)?;
        let model = Arc::new(DistanceTrainer::new(self.config.trainer.clone()).train(&routes, now)?);

        let previous = self.snapshot();
        self.publish(EngineSnapshot {
            model: Some(Arc::clone(&model)),
            ..(*previous).clone()
        });
        Ok(model)
    }

    /// Fold one new route into the learner and publish the result.
    ///
    /// The graph is left untouched until the next rebuild. Returns `false` if
    /// the learner filtered the route out.
    pub fn learn(&self, route: &ExtractedRoute) -> bool {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.snapshot();
        let mut learner = previous.learner.snapshot();
        if !learner.enhance(route) {
            return false;
        }
        self.publish(EngineSnapshot {
            learner: Arc::new(learner),
            ..(*previous).clone()
        });
        true
    }

    // ========================================================================
    // Query surface
    // ========================================================================

    /// Lowest-cost chain of observed legs between two ports.
    ///
    /// Ports are resolved by id or UN/LOCODE. No path is reported as
    /// [`SeaRouteError::NoPathFound`].
    pub fn find_route(
        &self,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
    ) -> Result<RoutePlan> {
        self.find_route_with_control(origin, destination, vessel_type, &SearchControl::none())
    }

    pub fn find_route_with_control(
        &self,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
        control: &SearchControl<'_>,
    ) -> Result<RoutePlan> {
        let (origin_port, _) = resolve_port_location(self.ports.as_ref(), origin)?;
        let (destination_port, _) = resolve_port_location(self.ports.as_ref(), destination)?;

        let no_path = |reason: NoPathReason| SeaRouteError::NoPathFound {
            origin: origin_port.id.clone(),
            destination: destination_port.id.clone(),
            reason,
        };

        let snapshot = self.snapshot();
        let graph = snapshot.graph.as_ref();
        if graph.node(&origin_port.id).is_none() || graph.node(&destination_port.id).is_none() {
            return Err(no_path(NoPathReason::Disconnected));
        }

        let planner = RoutePlanner::new(self.config.planner.clone());
        let result = planner.find_route(
            graph,
            &origin_port.id,
            &destination_port.id,
            vessel_type,
            control,
        )?;
        match result.outcome {
            SearchOutcome::Found(plan) => Ok(plan),
            SearchOutcome::NotFound(reason) => Err(no_path(reason)),
        }
    }

    /// Tiered distance prediction from the incremental learner.
    pub fn predict_distance(
        &self,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
    ) -> Result<DistancePrediction> {
        self.snapshot()
            .learner
            .predict(origin, destination, vessel_type, self.ports.as_ref())
    }

    /// Distance prediction from the trained regression model.
    ///
    /// `Ok(None)` when no model has been trained yet.
    pub fn predict_distance_model(
        &self,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
    ) -> Result<Option<f64>> {
        let (_, origin_loc) = resolve_port_location(self.ports.as_ref(), origin)?;
        let (_, destination_loc) = resolve_port_location(self.ports.as_ref(), destination)?;

        let snapshot = self.snapshot();
        let Some(model) = snapshot.model.as_ref() else {
            return Ok(None);
        };

        let input = PredictionInput {
            great_circle_nm: haversine_nm(&origin_loc, &destination_loc),
            vessel_type,
            route_type: None,
            high_latitude: origin_loc.latitude.abs() >= model.high_latitude_deg
                || destination_loc.latitude.abs() >= model.high_latitude_deg,
            via_chokepoint: false,
        };
        Ok(Some(model.predict(&input)))
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.snapshot().graph.stats()
    }

    /// Ports ranked by outgoing leg count.
    pub fn find_hubs(&self, limit: usize) -> Vec<PortSummary> {
        self.snapshot()
            .graph
            .hubs(limit)
            .into_iter()
            .map(PortSummary::from_node)
            .collect()
    }

    /// Ports with coordinates within the radius, nearest first.
    pub fn find_ports_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_nm: f64,
    ) -> Result<Vec<PortSummary>> {
        let snapshot = self.snapshot();
        let center = GpsPoint::new(latitude, longitude);
        Ok(self
            .ports
            .ports_within(&center, radius_nm)?
            .into_iter()
            .filter_map(|(port, distance)| {
                let location = port.coordinates?;
                let out_degree = snapshot.graph.node(&port.id).map_or(0, GraphNode::out_degree);
                Some(PortSummary::from_port(port, location, out_degree, distance))
            })
            .collect())
    }
}
