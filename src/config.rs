//! Aggregate configuration for every pipeline stage.
//!
//! Each stage owns its config struct with documented defaults; `EngineConfig`
//! bundles them so one JSON document can tune the whole engine. Missing
//! sections and fields fall back to their defaults.
//!
//! ```
//! use searoute::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "planner": { "max_iterations": 50 } }"#).unwrap();
//! assert_eq!(config.planner.max_iterations, 50);
//! assert_eq!(config.planner.heuristic_multiplier, 1.5);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extraction::ExtractionConfig;
use crate::graph::{GraphConfig, PlannerConfig};
use crate::learning::LearnerConfig;
use crate::segmentation::SegmentConfig;
use crate::trainer::TrainerConfig;
use crate::{Result, SeaRouteError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub segment: SegmentConfig,
    pub extraction: ExtractionConfig,
    pub trainer: TrainerConfig,
    pub learner: LearnerConfig,
    pub graph: GraphConfig,
    pub planner: PlannerConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject settings no stage can run with.
    pub fn validate(&self) -> Result<()> {
        let e = &self.extraction;
        if e.min_distance_factor > e.max_distance_factor {
            return Err(SeaRouteError::Config(format!(
                "extraction distance factor band is empty: [{}, {}]",
                e.min_distance_factor, e.max_distance_factor
            )));
        }
        if e.min_avg_speed_knots > e.max_avg_speed_knots {
            return Err(SeaRouteError::Config(format!(
                "extraction speed band is empty: [{}, {}]",
                e.min_avg_speed_knots, e.max_avg_speed_knots
            )));
        }
        if e.report_interval_minutes <= 0.0 {
            return Err(SeaRouteError::Config(
                "report_interval_minutes must be positive".to_string(),
            ));
        }
        let s = &self.segment;
        if s.min_speed_knots > s.max_speed_knots {
            return Err(SeaRouteError::Config(format!(
                "segment speed window is empty: [{}, {}]",
                s.min_speed_knots, s.max_speed_knots
            )));
        }
        if s.reanchor_fixes < 2 {
            return Err(SeaRouteError::Config(
                "reanchor_fixes must be at least 2".to_string(),
            ));
        }
        if self.learner.confidence_time_constant <= 0.0
            || self.graph.confidence_time_constant <= 0.0
        {
            return Err(SeaRouteError::Config(
                "confidence_time_constant must be positive".to_string(),
            ));
        }
        if self.graph.min_distance_factor > self.graph.max_distance_factor {
            return Err(SeaRouteError::Config(format!(
                "graph distance factor band is empty: [{}, {}]",
                self.graph.min_distance_factor, self.graph.max_distance_factor
            )));
        }
        Ok(())
    }
}
