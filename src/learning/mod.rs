//! # Incremental Learning
//!
//! Per-port-pair distance factor statistics that grow one route at a time,
//! with a tiered, confidence-weighted distance prediction.
//!
//! ## Prediction tiers
//! The first tier with data wins:
//! 1. Port pair with a vessel-type sub-mean backed by enough observations
//!    (`learned`, boosted confidence)
//! 2. Port pair, all vessel types (`learned`)
//! 3. Mean factor of the vessel type across all pairs (`vessel_type`)
//! 4. Mean factor across everything (`global_avg`)
//! 5. A fixed conservative factor (`fallback`)
//!
//! ## Concurrency
//! A learner has a single writer. Readers take a [`IncrementalLearner::snapshot`]
//! (a frozen clone) and never observe a partial update. Pair entries are
//! shared between snapshots until written, so a snapshot costs one pointer
//! per pair.

pub mod stats;
pub mod store;

pub use stats::{FactorAggregate, PortPairStatistics, confidence};
pub use store::{PairKey, PortPairStore};

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{PortDirectory, resolve_port_location};
use crate::geo_utils::haversine_nm;
use crate::{ExtractedRoute, Result, VesselType};

/// Fixed factor when nothing has been learned.
pub const FALLBACK_DISTANCE_FACTOR: f64 = 1.2;

/// Confidence multiplier for a vessel-specific pair match.
pub const VESSEL_TYPE_BOOST: f64 = 1.2;

/// Configuration for the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Only learn from these vessel types.
    /// Default: None (all)
    pub vessel_types: Option<Vec<VesselType>>,

    /// Pairs with fewer observations are not served by the pair tiers.
    /// Default: 1
    pub min_observations: usize,

    /// Only learn from routes departing at or after this Unix time.
    /// Default: None
    pub since: Option<i64>,

    /// Only learn from routes at or above this quality.
    /// Default: 0.0
    pub min_quality: f64,

    /// Observations at which confidence reaches 1 - 1/e.
    /// Default: 10.0
    pub confidence_time_constant: f64,

    /// Confidence multiplier for a vessel-specific pair match.
    /// Default: 1.2
    pub vessel_type_boost: f64,

    /// Sub-mean observations needed for a vessel-specific pair match.
    /// Default: 2
    pub min_vessel_observations: usize,

    /// Vessel-type tier confidence is `min(count / divisor, cap)`.
    /// Default: 20.0 and 0.7
    pub vessel_type_confidence_divisor: f64,
    pub vessel_type_confidence_cap: f64,

    /// Confidence of the global-average tier.
    /// Default: 0.3
    pub global_confidence: f64,

    /// Factor and confidence when nothing has been learned.
    /// Default: 1.2 and 0.1
    pub fallback_factor: f64,
    pub fallback_confidence: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            vessel_types: None,
            min_observations: 1,
            since: None,
            min_quality: 0.0,
            confidence_time_constant: 10.0,
            vessel_type_boost: VESSEL_TYPE_BOOST,
            min_vessel_observations: 2,
            vessel_type_confidence_divisor: 20.0,
            vessel_type_confidence_cap: 0.7,
            global_confidence: 0.3,
            fallback_factor: FALLBACK_DISTANCE_FACTOR,
            fallback_confidence: 0.1,
        }
    }
}

/// Which tier produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Learned,
    VesselType,
    #[serde(rename = "global_avg")]
    GlobalAverage,
    Fallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Learned => "learned",
            PredictionSource::VesselType => "vessel_type",
            PredictionSource::GlobalAverage => "global_avg",
            PredictionSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistancePrediction {
    pub predicted_nm: f64,
    pub great_circle_nm: f64,
    pub factor: f64,
    pub confidence: f64,
    /// Observations backing the tier that answered
    pub observations: usize,
    pub source: PredictionSource,
}

/// Port-pair statistics plus vessel-type and global fallback aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncrementalLearner {
    config: LearnerConfig,
    pairs: PortPairStore,
    vessel_types: BTreeMap<VesselType, FactorAggregate>,
    global: FactorAggregate,
}

impl IncrementalLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Learn from a route log in scan order.
    pub fn build(routes: &[ExtractedRoute], config: LearnerConfig) -> Self {
        let mut learner = Self::new(config);
        let accepted = routes.iter().filter(|r| learner.enhance(r)).count();

        info!(
            "[Learner] Learned {} port pairs from {} of {} routes",
            learner.pairs.len(),
            accepted,
            routes.len()
        );
        learner
    }

    /// Whether a route passes the learning filters.
    pub fn accepts(&self, route: &ExtractedRoute) -> bool {
        if route.quality_score < self.config.min_quality {
            return false;
        }
        if let Some(since) = self.config.since {
            if route.departure_time < since {
                return false;
            }
        }
        if let Some(types) = &self.config.vessel_types {
            if !types.contains(&route.vessel_type) {
                return false;
            }
        }
        route.distance_factor.is_finite()
    }

    /// Fold one new route into the statistics. Returns `false` if the route
    /// was filtered out.
    pub fn enhance(&mut self, route: &ExtractedRoute) -> bool {
        if !self.accepts(route) {
            return false;
        }

        let is_new = self
            .pairs
            .key(&route.origin_port_id, &route.destination_port_id)
            .is_none();
        let key = self
            .pairs
            .intern(&route.origin_port_id, &route.destination_port_id);
        if let Some(entry) = self.pairs.get_mut(key) {
            entry.observe(route, self.config.confidence_time_constant);
            if is_new {
                debug!(
                    "[Learner] New port pair {} -> {}",
                    route.origin_port_id, route.destination_port_id
                );
            }
        }

        self.vessel_types
            .entry(route.vessel_type.clone())
            .or_default()
            .push(route.distance_factor);
        self.global.push(route.distance_factor);
        true
    }

    /// Predict the sailed distance between two ports.
    ///
    /// Ports are resolved by id or UN/LOCODE; an unknown port or one without
    /// coordinates is an error.
    pub fn predict(
        &self,
        origin: &str,
        destination: &str,
        vessel_type: Option<&VesselType>,
        ports: &dyn PortDirectory,
    ) -> Result<DistancePrediction> {
        let (origin_port, origin_loc) = resolve_port_location(ports, origin)?;
        let (destination_port, destination_loc) = resolve_port_location(ports, destination)?;
        let great_circle_nm = haversine_nm(&origin_loc, &destination_loc);

        Ok(self.predict_with_great_circle(
            &origin_port.id,
            &destination_port.id,
            vessel_type,
            great_circle_nm,
        ))
    }

    /// Tiered prediction for an already known great-circle distance.
    pub fn predict_with_great_circle(
        &self,
        origin_port_id: &str,
        destination_port_id: &str,
        vessel_type: Option<&VesselType>,
        great_circle_nm: f64,
    ) -> DistancePrediction {
        let config = &self.config;
        let predict = |factor: f64, confidence: f64, observations: usize, source| {
            DistancePrediction {
                predicted_nm: great_circle_nm * factor,
                great_circle_nm,
                factor,
                confidence,
                observations,
                source,
            }
        };

        if let Some(pair) = self.served_pair(origin_port_id, destination_port_id) {
            let vessel_match = vessel_type
                .and_then(|vt| pair.vessel_type(vt))
                .filter(|agg| agg.count >= config.min_vessel_observations);

            return match vessel_match {
                Some(agg) => predict(
                    agg.mean_factor,
                    (pair.confidence * config.vessel_type_boost).min(1.0),
                    agg.count,
                    PredictionSource::Learned,
                ),
                None => predict(
                    pair.mean_distance_factor,
                    pair.confidence,
                    pair.observations,
                    PredictionSource::Learned,
                ),
            };
        }

        if let Some(agg) = vessel_type
            .and_then(|vt| self.vessel_types.get(vt))
            .filter(|agg| !agg.is_empty())
        {
            let confidence = (agg.count as f64 / config.vessel_type_confidence_divisor)
                .min(config.vessel_type_confidence_cap);
            return predict(
                agg.mean_factor,
                confidence,
                agg.count,
                PredictionSource::VesselType,
            );
        }

        if !self.global.is_empty() {
            return predict(
                self.global.mean_factor,
                config.global_confidence,
                self.global.count,
                PredictionSource::GlobalAverage,
            );
        }

        predict(
            config.fallback_factor,
            config.fallback_confidence,
            0,
            PredictionSource::Fallback,
        )
    }

    /// Pair statistics if they meet `min_observations`.
    fn served_pair(&self, origin: &str, destination: &str) -> Option<&PortPairStatistics> {
        self.pairs
            .lookup(origin, destination)
            .filter(|p| p.observations > 0 && p.observations >= self.config.min_observations)
    }

    /// Statistics for a pair, regardless of `min_observations`.
    pub fn pair(&self, origin: &str, destination: &str) -> Option<&PortPairStatistics> {
        self.pairs.lookup(origin, destination)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &PortPairStatistics> {
        self.pairs.iter()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn vessel_type_aggregate(&self, vessel_type: &VesselType) -> Option<&FactorAggregate> {
        self.vessel_types.get(vessel_type)
    }

    pub fn global_aggregate(&self) -> &FactorAggregate {
        &self.global
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Frozen copy for concurrent readers.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}
