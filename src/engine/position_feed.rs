//! In-memory position feed.

use std::collections::HashMap;

use super::sources::{PositionFeed, SpeedBand, TimeWindow};
use crate::{PositionSample, Result};

/// Positions grouped by vessel and kept sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPositionFeed {
    by_vessel: HashMap<String, Vec<PositionSample>>,
}

impl InMemoryPositionFeed {
    pub fn new(samples: impl IntoIterator<Item = PositionSample>) -> Self {
        let mut by_vessel: HashMap<String, Vec<PositionSample>> = HashMap::new();
        for sample in samples {
            by_vessel
                .entry(sample.vessel_id.clone())
                .or_default()
                .push(sample);
        }
        for samples in by_vessel.values_mut() {
            samples.sort_by_key(|s| s.timestamp);
        }
        Self { by_vessel }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let samples: Vec<PositionSample> = serde_json::from_str(json)?;
        Ok(Self::new(samples))
    }

    /// Vessel ids, sorted.
    pub fn vessel_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_vessel.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Earliest and latest timestamp for a vessel.
    pub fn time_range(&self, vessel_id: &str) -> Option<TimeWindow> {
        let samples = self.by_vessel.get(vessel_id)?;
        Some(TimeWindow::new(
            samples.first()?.timestamp,
            samples.last()?.timestamp,
        ))
    }
}

impl PositionFeed for InMemoryPositionFeed {
    fn positions(
        &self,
        vessel_id: &str,
        window: &TimeWindow,
        speed_band: Option<SpeedBand>,
    ) -> Result<Vec<PositionSample>> {
        Ok(self
            .by_vessel
            .get(vessel_id)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| window.contains(s.timestamp))
                    .filter(|s| speed_band.is_none_or(|band| band.contains(s.speed_knots)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
