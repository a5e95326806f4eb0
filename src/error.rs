//! Unified error type for the crate.
//!
//! Only outcomes a caller must act on are errors. Routine filtering
//! (short segments, failed quality gates, same-port voyages) is reported as
//! data, not raised.

use std::fmt;

use thiserror::Error;

/// Why a route search ended without reaching the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoPathReason {
    /// The open set was exhausted: no chain of observed legs connects the ports.
    Disconnected,
    /// The iteration cap was reached first.
    IterationCap,
    /// The search deadline passed.
    Deadline,
    /// The caller raised the cancel flag.
    Cancelled,
}

impl fmt::Display for NoPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoPathReason::Disconnected => "no connecting legs",
            NoPathReason::IterationCap => "iteration cap reached",
            NoPathReason::Deadline => "deadline exceeded",
            NoPathReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SeaRouteError {
    #[error("insufficient data for {context}: {found} available, {required} required")]
    InsufficientData {
        context: String,
        found: usize,
        required: usize,
    },

    #[error("port not found: {port}")]
    PortNotFound { port: String },

    #[error("port {port} has no coordinates")]
    PortCoordinatesMissing { port: String },

    #[error("no path found from {origin} to {destination}: {reason}")]
    NoPathFound {
        origin: String,
        destination: String,
        reason: NoPathReason,
    },

    #[error("invalid vessel type: {0:?}")]
    InvalidVesselType(String),

    #[error("data source error: {0}")]
    Source(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SeaRouteError {
    /// Expected outcomes that a caller can retry or report, as opposed to faults.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SeaRouteError::InsufficientData { .. } | SeaRouteError::NoPathFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SeaRouteError>;

/// Conversions from `Option` into the typed lookup errors.
pub trait OptionExt<T> {
    fn ok_or_port_not_found(self, port: &str) -> Result<T>;
    fn ok_or_coordinates_missing(self, port: &str) -> Result<T>;
    fn ok_or_insufficient_data(self, context: &str, found: usize, required: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_port_not_found(self, port: &str) -> Result<T> {
        self.ok_or_else(|| SeaRouteError::PortNotFound {
            port: port.to_string(),
        })
    }

    fn ok_or_coordinates_missing(self, port: &str) -> Result<T> {
        self.ok_or_else(|| SeaRouteError::PortCoordinatesMissing {
            port: port.to_string(),
        })
    }

    fn ok_or_insufficient_data(self, context: &str, found: usize, required: usize) -> Result<T> {
        self.ok_or_else(|| SeaRouteError::InsufficientData {
            context: context.to_string(),
            found,
            required,
        })
    }
}
