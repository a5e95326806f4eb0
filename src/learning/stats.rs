//! Running statistics for port pairs and fallback aggregates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ExtractedRoute, VesselType};

/// Saturating trust in a statistic backed by `observations` samples.
///
/// `1 - exp(-n / tau)`: strictly increasing in `n` and always below 1.
///
/// ```
/// use searoute::confidence;
/// assert!((confidence(10, 10.0) - 0.632).abs() < 0.001);
/// assert!(confidence(20, 10.0) > confidence(10, 10.0));
/// assert!(confidence(30, 10.0) < 1.0);
/// ```
pub fn confidence(observations: usize, time_constant: f64) -> f64 {
    1.0 - (-(observations as f64) / time_constant).exp()
}

/// Count and incrementally averaged distance factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorAggregate {
    pub count: usize,
    pub mean_factor: f64,
}

impl FactorAggregate {
    pub fn push(&mut self, factor: f64) {
        self.count += 1;
        self.mean_factor = running_mean(self.mean_factor, factor, self.count);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Learned statistics for one directed port pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortPairStatistics {
    pub origin_port_id: String,
    pub destination_port_id: String,
    pub observations: usize,
    pub mean_distance_factor: f64,
    pub mean_actual_nm: f64,
    pub std_dev_factor: f64,
    pub confidence: f64,
    /// Sub-means per vessel type
    pub vessel_types: BTreeMap<VesselType, FactorAggregate>,
    pub first_departure: i64,
    pub last_departure: i64,
    /// Sum of squared deviations from the running mean factor (Welford M2)
    #[serde(skip)]
    m2: f64,
}

impl PortPairStatistics {
    pub fn new(origin_port_id: &str, destination_port_id: &str) -> Self {
        Self {
            origin_port_id: origin_port_id.to_string(),
            destination_port_id: destination_port_id.to_string(),
            observations: 0,
            mean_distance_factor: 0.0,
            mean_actual_nm: 0.0,
            std_dev_factor: 0.0,
            confidence: 0.0,
            vessel_types: BTreeMap::new(),
            first_departure: i64::MAX,
            last_departure: i64::MIN,
            m2: 0.0,
        }
    }

    /// Fold one route into the running means, then refresh the spread and
    /// confidence. Constant time per route.
    pub fn observe(&mut self, route: &ExtractedRoute, time_constant: f64) {
        self.observations += 1;
        let n = self.observations;
        let factor = route.distance_factor;
        let previous_mean = self.mean_distance_factor;
        self.mean_distance_factor = running_mean(previous_mean, factor, n);
        self.m2 += (factor - previous_mean) * (factor - self.mean_distance_factor);
        self.mean_actual_nm = running_mean(self.mean_actual_nm, route.actual_sailed_nm, n);

        self.vessel_types
            .entry(route.vessel_type.clone())
            .or_default()
            .push(factor);

        self.std_dev_factor = if n > 1 {
            (self.m2.max(0.0) / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        self.confidence = confidence(n, time_constant);

        self.first_departure = self.first_departure.min(route.departure_time);
        self.last_departure = self.last_departure.max(route.departure_time);
    }

    pub fn vessel_type(&self, vessel_type: &VesselType) -> Option<&FactorAggregate> {
        self.vessel_types.get(vessel_type)
    }
}

/// `old + (x - old) / n`
fn running_mean(old: f64, x: f64, n: usize) -> f64 {
    old + (x - old) / n as f64
}
