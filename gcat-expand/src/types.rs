//! Shared types for the discovery and expansion core
//!
//! Nothing inside the core fails hard. Every soft failure or anomaly becomes a
//! [`Warning`] tied to the dataset (and layer) it concerns.

use std::fmt;
use tracing::warn;

/// Category of a soft failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Root service listing could not be fetched after all retries
    ServiceUnavailable,
    /// Root service lists no layers or tables
    NoLayers,
    /// Every listed layer is a group layer
    AllGroupLayers,
    /// Per-layer metadata could not be fetched; listing data used instead
    LayerMetadataUnavailable,
    /// Record dropped because an earlier record already uses its id
    DuplicateId,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::ServiceUnavailable => "service_unavailable",
            WarningKind::NoLayers => "no_layers",
            WarningKind::AllGroupLayers => "all_group_layers",
            WarningKind::LayerMetadataUnavailable => "layer_metadata_unavailable",
            WarningKind::DuplicateId => "duplicate_id",
        }
    }
}

/// Line-item warning for one dataset record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub dataset_id: String,
    pub layer_id: Option<i64>,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Build a warning and emit it to the log
    pub fn emit(
        dataset_id: impl Into<String>,
        layer_id: Option<i64>,
        kind: WarningKind,
        message: impl Into<String>,
    ) -> Self {
        let warning = Self {
            dataset_id: dataset_id.into(),
            layer_id,
            kind,
            message: message.into(),
        };
        warn!(
            dataset_id = %warning.dataset_id,
            layer_id = ?warning.layer_id,
            kind = warning.kind.as_str(),
            "{}",
            warning.message
        );
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layer_id {
            Some(layer_id) => write!(
                f,
                "[{}] {} (layer {}): {}",
                self.kind.as_str(),
                self.dataset_id,
                layer_id,
                self.message
            ),
            None => write!(f, "[{}] {}: {}", self.kind.as_str(), self.dataset_id, self.message),
        }
    }
}
