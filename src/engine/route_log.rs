//! In-memory append-only route log.

use std::sync::{PoisonError, RwLock};

use super::sources::{RouteLogReader, RouteLogWriter, RouteQuery};
use crate::{ExtractedRoute, Result};

/// Append-only route log shared between extraction workers and readers.
///
/// Duplicates are stored as given.
#[derive(Debug, Default)]
pub struct InMemoryRouteLog {
    routes: RwLock<Vec<ExtractedRoute>>,
}

impl InMemoryRouteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(routes: Vec<ExtractedRoute>) -> Self {
        Self {
            routes: RwLock::new(routes),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let routes: Vec<ExtractedRoute> = serde_json::from_str(json)?;
        Ok(Self::with_routes(routes))
    }

    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored route, in append order.
    pub fn all(&self) -> Vec<ExtractedRoute> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn to_json_string(&self) -> Result<String> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(serde_json::to_string_pretty(&*routes)?)
    }
}

impl RouteLogReader for InMemoryRouteLog {
    fn routes(&self, query: &RouteQuery) -> Result<Vec<ExtractedRoute>> {
        Ok(self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }
}

impl RouteLogWriter for InMemoryRouteLog {
    fn append(&self, route: ExtractedRoute) -> Result<()> {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
        Ok(())
    }
}
