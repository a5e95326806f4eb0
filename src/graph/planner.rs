//! A* route planning over a [`MaritimeGraph`] snapshot.
//!
//! The heuristic is `haversine(node, destination) × multiplier` with a
//! default multiplier of 1.5. Edge costs are sailed distance divided by mean
//! quality, so the scaled heuristic is an empirical estimate and is NOT a
//! proven lower bound: plans are good, not guaranteed optimal.
//!
//! The open set is a flat vector scanned for the minimum f-cost; ties go to
//! the entry inserted first. A closed node is never re-expanded.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{GraphEdge, MaritimeGraph};
use crate::geo_utils::haversine_nm;
use crate::{NoPathReason, OptionExt, Result, VesselType};

/// Heuristic scale on the great-circle distance to the destination.
pub const DEFAULT_HEURISTIC_MULTIPLIER: f64 = 1.5;

/// Configuration for the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Node selections before the search gives up.
    /// Default: 1000
    pub max_iterations: usize,

    /// Default: 1.5
    pub heuristic_multiplier: f64,

    /// Wall-clock budget per search, used when the caller sets no deadline.
    /// Default: None
    pub timeout_ms: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            heuristic_multiplier: DEFAULT_HEURISTIC_MULTIPLIER,
            timeout_ms: None,
        }
    }
}

/// Caller-side limits checked once per iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchControl<'a> {
    pub deadline: Option<Instant>,
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> SearchControl<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn interrupted(&self) -> Option<NoPathReason> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Some(NoPathReason::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(NoPathReason::Deadline);
        }
        None
    }
}

/// One hop of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    pub edge: GraphEdge,
    pub from_id: String,
    pub from_name: String,
    pub to_id: String,
    pub to_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub origin_id: String,
    pub destination_id: String,
    /// Informational; does not affect edge costs
    pub vessel_type: Option<VesselType>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_nm: f64,
    pub total_great_circle_nm: f64,
    /// total distance / total great circle
    pub average_distance_factor: f64,
    pub average_confidence: f64,
    pub total_cost: f64,
    /// Origin name followed by each leg's destination name
    pub waypoints: Vec<String>,
}

impl RoutePlan {
    fn from_legs(
        origin_id: &str,
        origin_name: &str,
        destination_id: &str,
        vessel_type: Option<&VesselType>,
        legs: Vec<RouteLeg>,
    ) -> Self {
        let total_distance_nm: f64 = legs.iter().map(|l| l.edge.mean_actual_nm).sum();
        let total_great_circle_nm: f64 = legs.iter().map(|l| l.edge.great_circle_nm).sum();
        let total_cost: f64 = legs.iter().map(|l| l.edge.cost).sum();

        let average_distance_factor = if total_great_circle_nm > 0.0 {
            total_distance_nm / total_great_circle_nm
        } else {
            1.0
        };
        let average_confidence = if legs.is_empty() {
            1.0
        } else {
            legs.iter().map(|l| l.edge.confidence).sum::<f64>() / legs.len() as f64
        };

        let mut waypoints = Vec::with_capacity(legs.len() + 1);
        waypoints.push(origin_name.to_string());
        waypoints.extend(legs.iter().map(|l| l.to_name.clone()));

        Self {
            origin_id: origin_id.to_string(),
            destination_id: destination_id.to_string(),
            vessel_type: vessel_type.cloned(),
            legs,
            total_distance_nm,
            total_great_circle_nm,
            average_distance_factor,
            average_confidence,
            total_cost,
            waypoints,
        }
    }

    pub fn hops(&self) -> usize {
        self.legs.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(RoutePlan),
    NotFound(NoPathReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub outcome: SearchOutcome,
    /// Open-set selections performed
    pub iterations: usize,
    /// Nodes moved to the closed set
    pub expanded: usize,
}

impl SearchResult {
    pub fn plan(&self) -> Option<&RoutePlan> {
        match &self.outcome {
            SearchOutcome::Found(plan) => Some(plan),
            SearchOutcome::NotFound(_) => None,
        }
    }

    pub fn into_plan(self) -> Option<RoutePlan> {
        match self.outcome {
            SearchOutcome::Found(plan) => Some(plan),
            SearchOutcome::NotFound(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }
}

struct OpenEntry {
    node: usize,
    g: f64,
    h: f64,
    f: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RoutePlanner {
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Search for the lowest-cost chain of observed legs.
    ///
    /// Returns an error only when `origin` or `destination` is not a node of
    /// the graph. Running out of legs, iterations, or time is a
    /// [`SearchOutcome::NotFound`].
    pub fn find_route(
        &self,
        graph: &MaritimeGraph,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
        control: &SearchControl<'_>,
    ) -> Result<SearchResult> {
        let start = graph.index_of(origin).ok_or_port_not_found(origin)?;
        let goal = graph.index_of(destination).ok_or_port_not_found(destination)?;
        let nodes = graph.nodes();

        if start == goal {
            let node = &nodes[start];
            return Ok(SearchResult {
                outcome: SearchOutcome::Found(RoutePlan::from_legs(
                    &node.id,
                    &node.name,
                    &node.id,
                    vessel_type,
                    Vec::new(),
                )),
                iterations: 0,
                expanded: 0,
            });
        }

        let mut control = *control;
        if control.deadline.is_none() {
            control.deadline = self
                .config
                .timeout_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms));
        }

        let goal_location = nodes[goal].location;
        let heuristic =
            |i: usize| haversine_nm(&nodes[i].location, &goal_location) * self.config.heuristic_multiplier;

        let start_h = heuristic(start);
        let mut open: Vec<OpenEntry> = vec![OpenEntry {
            node: start,
            g: 0.0,
            h: start_h,
            f: start_h,
        }];
        // node -> (parent node, edge index on the parent)
        let mut came_from: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut closed: HashSet<usize> = HashSet::new();
        let mut iterations = 0usize;

        let reason = loop {
            if open.is_empty() {
                break NoPathReason::Disconnected;
            }
            if iterations >= self.config.max_iterations {
                break NoPathReason::IterationCap;
            }
            if let Some(reason) = control.interrupted() {
                break reason;
            }
            iterations += 1;

            let mut best = 0;
            for (i, entry) in open.iter().enumerate().skip(1) {
                if entry.f < open[best].f {
                    best = i;
                }
            }
            let current = open.remove(best);

            if current.node == goal {
                let legs = reconstruct(graph, &came_from, start, goal);
                debug!(
                    "[Planner] {} -> {}: {} legs, cost {:.1}, {} iterations",
                    origin,
                    destination,
                    legs.len(),
                    current.g,
                    iterations
                );
                return Ok(SearchResult {
                    outcome: SearchOutcome::Found(RoutePlan::from_legs(
                        &nodes[start].id,
                        &nodes[start].name,
                        &nodes[goal].id,
                        vessel_type,
                        legs,
                    )),
                    iterations,
                    expanded: closed.len(),
                });
            }

            closed.insert(current.node);

            for (edge_idx, edge) in nodes[current.node].edges.iter().enumerate() {
                let Some(next) = graph.index_of(&edge.to) else {
                    continue;
                };
                if closed.contains(&next) {
                    continue;
                }

                let tentative = current.g + edge.cost;
                match open.iter_mut().find(|e| e.node == next) {
                    Some(entry) => {
                        if tentative < entry.g {
                            entry.g = tentative;
                            entry.f = tentative + entry.h;
                            came_from.insert(next, (current.node, edge_idx));
                        }
                    }
                    None => {
                        let h = heuristic(next);
                        open.push(OpenEntry {
                            node: next,
                            g: tentative,
                            h,
                            f: tentative + h,
                        });
                        came_from.insert(next, (current.node, edge_idx));
                    }
                }
            }
        };

        debug!(
            "[Planner] No path {} -> {}: {} after {} iterations",
            origin, destination, reason, iterations
        );
        Ok(SearchResult {
            outcome: SearchOutcome::NotFound(reason),
            iterations,
            expanded: closed.len(),
        })
    }
}

/// Walk parent pointers back from the goal.
fn reconstruct(
    graph: &MaritimeGraph,
    came_from: &HashMap<usize, (usize, usize)>,
    start: usize,
    goal: usize,
) -> Vec<RouteLeg> {
    let nodes = graph.nodes();
    let mut legs = Vec::new();
    let mut at = goal;
    while at != start {
        let Some(&(parent, edge_idx)) = came_from.get(&at) else {
            break;
        };
        let from = &nodes[parent];
        let to = &nodes[at];
        legs.push(RouteLeg {
            edge: from.edges[edge_idx].clone(),
            from_id: from.id.clone(),
            from_name: from.name.clone(),
            to_id: to.id.clone(),
            to_name: to.name.clone(),
        });
        at = parent;
    }
    legs.reverse();
    legs
}
