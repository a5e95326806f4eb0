//! In-memory port directory backed by the R-tree index.

use std::collections::HashMap;

use super::sources::PortDirectory;
use crate::spatial::SpatialIndex;
use crate::{GpsPoint, Port, Result};

/// Port master data held in memory.
///
/// Ports without coordinates can be looked up by id or UN/LOCODE but never
/// appear in radius queries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPortDirectory {
    ports: Vec<Port>,
    by_id: HashMap<String, usize>,
    by_unlocode: HashMap<String, usize>,
    spatial: SpatialIndex,
}

impl InMemoryPortDirectory {
    /// Build the directory. A later port with a duplicate id replaces the
    /// earlier one.
    pub fn new(ports: impl IntoIterator<Item = Port>) -> Self {
        let mut deduped: Vec<Port> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for port in ports {
            match by_id.get(&port.id) {
                Some(&slot) => deduped[slot] = port,
                None => {
                    by_id.insert(port.id.clone(), deduped.len());
                    deduped.push(port);
                }
            }
        }

        let by_unlocode = deduped
            .iter()
            .enumerate()
            .map(|(i, p)| (p.unlocode.to_ascii_uppercase(), i))
            .collect();
        let spatial = SpatialIndex::build(
            deduped
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.coordinates.map(|c| (i, c))),
        );

        Self {
            ports: deduped,
            by_id,
            by_unlocode,
            spatial,
        }
    }

    /// Load from a JSON array of ports.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let ports: Vec<Port> = serde_json::from_str(json)?;
        Ok(Self::new(ports))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }
}

impl PortDirectory for InMemoryPortDirectory {
    fn port(&self, id: &str) -> Result<Option<Port>> {
        Ok(self.by_id.get(id).map(|&i| self.ports[i].clone()))
    }

    fn port_by_unlocode(&self, unlocode: &str) -> Result<Option<Port>> {
        Ok(self
            .by_unlocode
            .get(&unlocode.to_ascii_uppercase())
            .map(|&i| self.ports[i].clone()))
    }

    fn ports_within(&self, center: &GpsPoint, radius_nm: f64) -> Result<Vec<(Port, f64)>> {
        Ok(self
            .spatial
            .within_radius(center, radius_nm)
            .into_iter()
            .map(|(i, d)| (self.ports[i].clone(), d))
            .collect())
    }

    fn ports_with_coordinates(&self) -> Result<Vec<Port>> {
        Ok(self
            .ports
            .iter()
            .filter(|p| p.coordinates.is_some())
            .cloned()
            .collect())
    }
}
