//! Batch distance model training.
//!
//! Fits `actual ≈ intercept + slope · great_circle` by ordinary least squares
//! over good-quality routes, then derives multiplicative corrections per
//! vessel type, per route type, and for three geographic predicates
//! (high latitude, coastal, via chokepoint).
//!
//! Corrections are mean distance factors normalised by the fleet-wide mean
//! factor of the training set. The linear fit already carries the average
//! detour, so a correction of 1.0 means "sails like the average route".
//!
//! Retraining replaces the model wholesale; there is no incremental path.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{ExtractedRoute, Result, RouteType, SeaRouteError, VesselType};

/// Configuration for training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Minimum route quality to train on.
    /// Default: 0.7
    pub min_quality: f64,

    /// Minimum sailed distance to train on.
    /// Default: 5.0 nm
    pub min_sailed_nm: f64,

    /// Training fails below this many qualifying routes.
    /// Default: 5
    pub min_routes: usize,

    /// Absolute latitude at which a leg counts as high latitude.
    /// Default: 60.0
    pub high_latitude_deg: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.7,
            min_sailed_nm: 5.0,
            min_routes: 5,
            high_latitude_deg: 60.0,
        }
    }
}

/// Fit diagnostics over the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub mean_absolute_error: f64,
    pub max_absolute_error: f64,
    pub r_squared: f64,
}

/// Trained distance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceModel {
    pub intercept: f64,
    pub slope: f64,
    /// Mean distance factor of the training set
    pub baseline_factor: f64,
    pub vessel_type_factors: BTreeMap<VesselType, f64>,
    pub route_type_factors: BTreeMap<RouteType, f64>,
    pub high_latitude_factor: f64,
    pub coastal_factor: f64,
    pub chokepoint_factor: f64,
    pub high_latitude_deg: f64,
    pub diagnostics: ModelDiagnostics,
    pub training_routes: usize,
    pub trained_at: i64,
}

/// Inputs describing a leg to predict.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInput<'a> {
    pub great_circle_nm: f64,
    pub vessel_type: Option<&'a VesselType>,
    pub route_type: Option<RouteType>,
    pub high_latitude: bool,
    pub via_chokepoint: bool,
}

impl<'a> PredictionInput<'a> {
    pub fn new(great_circle_nm: f64) -> Self {
        Self {
            great_circle_nm,
            vessel_type: None,
            route_type: None,
            high_latitude: false,
            via_chokepoint: false,
        }
    }

    /// Describe a known route, as used for diagnostics.
    pub fn from_route(route: &'a ExtractedRoute, high_latitude_deg: f64) -> Self {
        Self {
            great_circle_nm: route.great_circle_nm,
            vessel_type: Some(&route.vessel_type),
            route_type: Some(route.route_type),
            high_latitude: route.touches_latitude(high_latitude_deg),
            via_chokepoint: route.has_chokepoint(),
        }
    }
}

impl DistanceModel {
    /// Predict the sailed distance in nautical miles.
    ///
    /// `base · vf · (rf / vf) · geo`: the vessel correction applies alone
    /// when the route type is unknown and is replaced by the route-type
    /// correction when it is known. Unknown keys correct by 1.0.
    pub fn predict(&self, input: &PredictionInput<'_>) -> f64 {
        let mut predicted = self.base_prediction(input.great_circle_nm);

        let vessel_factor = input
            .vessel_type
            .and_then(|vt| self.vessel_type_factors.get(vt))
            .copied()
            .unwrap_or(1.0);
        predicted *= vessel_factor;

        if let Some(route_type) = input.route_type {
            let route_factor = self
                .route_type_factors
                .get(&route_type)
                .copied()
                .unwrap_or(1.0);
            predicted *= route_factor / vessel_factor;
        }

        if input.high_latitude {
            predicted *= self.high_latitude_factor;
        }
        if input.route_type == Some(RouteType::Coastal) {
            predicted *= self.coastal_factor;
        }
        if input.via_chokepoint {
            predicted *= self.chokepoint_factor;
        }

        predicted
    }

    /// The linear fit alone.
    pub fn base_prediction(&self, great_circle_nm: f64) -> f64 {
        self.intercept + self.slope * great_circle_nm
    }
}

/// Trains [`DistanceModel`]s.
#[derive(Debug, Clone, Default)]
pub struct DistanceTrainer {
    config: TrainerConfig,
}

impl DistanceTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Routes eligible for training.
    pub fn qualifying<'a>(&self, routes: &'a [ExtractedRoute]) -> Vec<&'a ExtractedRoute> {
        routes
            .iter()
            .filter(|r| {
                r.quality_score >= self.config.min_quality
                    && r.actual_sailed_nm > self.config.min_sailed_nm
                    && r.great_circle_nm > 0.0
                    && r.distance_factor.is_finite()
            })
            .collect()
    }

    /// Train a model. Fails with `InsufficientData` below `min_routes`.
    pub fn train(&self, routes: &[ExtractedRoute], trained_at: i64) -> Result<DistanceModel> {
        let rows = self.qualifying(routes);
        if rows.len() < self.config.min_routes {
            return Err(SeaRouteError::InsufficientData {
                context: "distance model training".to_string(),
                found: rows.len(),
                required: self.config.min_routes,
            });
        }

        let (intercept, slope) = least_squares(&rows);
        let baseline = mean_factor(rows.iter().copied()).unwrap_or(1.0);

        let mut by_vessel: BTreeMap<VesselType, Vec<&ExtractedRoute>> = BTreeMap::new();
        let mut by_route: BTreeMap<RouteType, Vec<&ExtractedRoute>> = BTreeMap::new();
        for r in &rows {
            by_vessel.entry(r.vessel_type.clone()).or_default().push(r);
            by_route.entry(r.route_type).or_default().push(r);
        }

        let correction = |group: &[&ExtractedRoute]| {
            mean_factor(group.iter().copied()).map_or(1.0, |m| m / baseline)
        };
        let predicate_correction = |pred: &dyn Fn(&ExtractedRoute) -> bool| {
            mean_factor(rows.iter().copied().filter(|r| pred(r))).map_or(1.0, |m| m / baseline)
        };

        let high_lat = self.config.high_latitude_deg;
        let mut model = DistanceModel {
            intercept,
            slope,
            baseline_factor: baseline,
            vessel_type_factors: by_vessel
                .iter()
                .map(|(vt, group)| (vt.clone(), correction(group)))
                .collect(),
            route_type_factors: by_route
                .iter()
                .map(|(rt, group)| (*rt, correction(group)))
                .collect(),
            high_latitude_factor: predicate_correction(&|r| r.touches_latitude(high_lat)),
            coastal_factor: predicate_correction(&|r| r.route_type == RouteType::Coastal),
            chokepoint_factor: predicate_correction(&|r| r.has_chokepoint()),
            high_latitude_deg: high_lat,
            diagnostics: ModelDiagnostics {
                mean_absolute_error: 0.0,
                max_absolute_error: 0.0,
                r_squared: 0.0,
            },
            training_routes: rows.len(),
            trained_at,
        };
        model.diagnostics = diagnostics(&model, &rows);

        info!(
            "[Trainer] Trained on {} routes: actual = {:.3} + {:.4} * gc, R² = {:.4}, MAE = {:.1} nm",
            rows.len(),
            model.intercept,
            model.slope,
            model.diagnostics.r_squared,
            model.diagnostics.mean_absolute_error
        );

        Ok(model)
    }
}

/// OLS fit of actual against great-circle distance.
///
/// With no spread in great-circle distance the slope is undetermined; the
/// fit then goes through the origin with the mean ratio as slope.
fn least_squares(rows: &[&ExtractedRoute]) -> (f64, f64) {
    let n = rows.len() as f64;
    let mean_x = rows.iter().map(|r| r.great_circle_nm).sum::<f64>() / n;
    let mean_y = rows.iter().map(|r| r.actual_sailed_nm).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for r in rows {
        let dx = r.great_circle_nm - mean_x;
        sxx += dx * dx;
        sxy += dx * (r.actual_sailed_nm - mean_y);
    }

    if sxx <= f64::EPSILON * n * mean_x.max(1.0) {
        return (0.0, mean_y / mean_x);
    }

    let slope = sxy / sxx;
    (mean_y - slope * mean_x, slope)
}

fn mean_factor<'a>(rows: impl Iterator<Item = &'a ExtractedRoute>) -> Option<f64> {
    let (sum, count) = rows.fold((0.0, 0usize), |(s, c), r| (s + r.distance_factor, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn diagnostics(model: &DistanceModel, rows: &[&ExtractedRoute]) -> ModelDiagnostics {
    let n = rows.len() as f64;
    let mean_actual = rows.iter().map(|r| r.actual_sailed_nm).sum::<f64>() / n;

    let mut abs_sum = 0.0;
    let mut abs_max: f64 = 0.0;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for r in rows {
        let predicted = model.predict(&PredictionInput::from_route(r, model.high_latitude_deg));
        let err = r.actual_sailed_nm - predicted;
        abs_sum += err.abs();
        abs_max = abs_max.max(err.abs());
        ss_res += err * err;
        ss_tot += (r.actual_sailed_nm - mean_actual).powi(2);
    }

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res <= f64::EPSILON {
        1.0
    } else {
        0.0
    };

    ModelDiagnostics {
        mean_absolute_error: abs_sum / n,
        max_absolute_error: abs_max,
        r_squared,
    }
}
