//! Expansion Engine
//!
//! Turns one catalog record that points at a root service into zero or more
//! output records:
//! - **Unchanged**: no URL, not a root URL, service unreachable, no layers,
//!   or only group layers. The original record is returned as-is.
//! - **Pinned**: exactly one listed layer. The URL is rewritten to
//!   `<base>/<layerId>` and an undetermined geometry is filled in.
//! - **Expanded**: several listed layers. One derived child per non-group
//!   layer, in listing order, each carrying provenance back to the parent.
//!
//! The output is never empty.

use crate::classifier::{classify, ServiceUrl};
use crate::client::{LayerDescriptor, LayerMetadata, LayerSource};
use crate::geometry::{normalize, GeometryType};
use crate::types::{Warning, WarningKind};
use gcat_common::catalog::{
    FIELD_DESCRIPTION, FIELD_GEOMETRY_TYPE, FIELD_ID, FIELD_LAYER_ID, FIELD_LAYER_NAME,
    FIELD_PARENT_DATASET_ID, FIELD_PARENT_SERVICE_URL, FIELD_PUBLIC_WEB_SERVICE, FIELD_TITLE,
    GEOMETRY_NOTE_FIELD,
};
use gcat_common::DatasetRecord;
use std::sync::Arc;
use tracing::debug;

/// How a record was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    Unchanged,
    Pinned,
    Expanded,
}

/// Result of expanding one record
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Output records, in discovery order (never empty)
    pub records: Vec<DatasetRecord>,
    pub outcome: ExpansionOutcome,
    pub warnings: Vec<Warning>,
}

impl Expansion {
    fn unchanged(record: &DatasetRecord, warnings: Vec<Warning>) -> Self {
        Self {
            records: vec![record.clone()],
            outcome: ExpansionOutcome::Unchanged,
            warnings,
        }
    }
}

/// Expands root-service records using a [`LayerSource`]
pub struct Expander {
    source: Arc<dyn LayerSource>,
}

impl Expander {
    pub fn new(source: Arc<dyn LayerSource>) -> Self {
        Self { source }
    }

    /// Expand one record
    pub async fn expand(&self, record: &DatasetRecord) -> Expansion {
        let Some(url) = record.public_web_service() else {
            return Expansion::unchanged(record, Vec::new());
        };

        let base = match classify(url) {
            ServiceUrl::Root { base } => base,
            other => {
                debug!(dataset_id = %record.id(), url = ?other, "Not a root service, passing through");
                return Expansion::unchanged(record, Vec::new());
            }
        };

        let Some(info) = self.source.fetch_service_info(&base).await else {
            let warning = Warning::emit(
                record.id(),
                None,
                WarningKind::ServiceUnavailable,
                format!("could not fetch service listing from {}; keeping record unchanged", base),
            );
            return Expansion::unchanged(record, vec![warning]);
        };

        match info.layers.as_slice() {
            [] => {
                let warning = Warning::emit(
                    record.id(),
                    None,
                    WarningKind::NoLayers,
                    format!("service {} lists no layers; keeping record unchanged", base),
                );
                Expansion::unchanged(record, vec![warning])
            }
            [layer] => self.pin(record, &base, layer).await,
            layers => self.expand_layers(record, &base, layers).await,
        }
    }

    /// Single-layer service: point the record at that layer
    async fn pin(&self, record: &DatasetRecord, base: &str, layer: &LayerDescriptor) -> Expansion {
        let layer_id = layer.layer_id();
        let mut warnings = Vec::new();

        let metadata = self.source.fetch_layer_metadata(base, layer_id).await;
        if metadata.is_none() {
            warnings.push(Warning::emit(
                record.id(),
                Some(layer_id),
                WarningKind::LayerMetadataUnavailable,
                "layer metadata unavailable; using listing geometry",
            ));
        }

        let mut pinned = record.clone();
        pinned.set(FIELD_PUBLIC_WEB_SERVICE, format!("{}/{}", base, layer_id));
        if record.has_undetermined_geometry() {
            let geometry = resolve_geometry(metadata.as_ref(), layer);
            pinned.set(FIELD_GEOMETRY_TYPE, geometry.as_str());
        }

        debug!(
            dataset_id = %record.id(),
            layer_id,
            geometry = ?pinned.geometry_type(),
            "Pinned single-layer service"
        );

        Expansion {
            records: vec![pinned],
            outcome: ExpansionOutcome::Pinned,
            warnings,
        }
    }

    /// Multi-layer service: one child per non-group layer
    async fn expand_layers(
        &self,
        record: &DatasetRecord,
        base: &str,
        layers: &[LayerDescriptor],
    ) -> Expansion {
        let mut children = Vec::with_capacity(layers.len());
        let mut warnings = Vec::new();

        for layer in layers {
            let layer_id = layer.layer_id();
            if layer.is_group() {
                debug!(dataset_id = %record.id(), layer_id, name = %layer.name, "Skipping group layer");
                continue;
            }

            let metadata = self.source.fetch_layer_metadata(base, layer_id).await;
            if metadata.is_none() {
                warnings.push(Warning::emit(
                    record.id(),
                    Some(layer_id),
                    WarningKind::LayerMetadataUnavailable,
                    format!("metadata for layer {:?} unavailable; using listing geometry", layer.name),
                ));
            }

            children.push(derive_child(record, base, layer, metadata.as_ref()));
        }

        if children.is_empty() {
            warnings.push(Warning::emit(
                record.id(),
                None,
                WarningKind::AllGroupLayers,
                format!("every layer of {} is a group layer; keeping record unchanged", base),
            ));
            return Expansion::unchanged(record, warnings);
        }

        debug!(dataset_id = %record.id(), children = children.len(), "Expanded multi-layer service");

        Expansion {
            records: children,
            outcome: ExpansionOutcome::Expanded,
            warnings,
        }
    }
}

/// Pick the best known geometry for a layer
///
/// Fetched metadata wins; otherwise the listing decides. Tables map to TABLE,
/// and a layer that reports no geometry anywhere maps to UNKNOWN.
pub fn resolve_geometry(metadata: Option<&LayerMetadata>, layer: &LayerDescriptor) -> GeometryType {
    if let Some(metadata) = metadata {
        if let Some(raw) = metadata.geometry_type.as_deref() {
            return normalize(raw);
        }
        if metadata
            .layer_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("table"))
        {
            return GeometryType::Table;
        }
    }

    match layer.geometry_type.as_deref() {
        Some(raw) => normalize(raw),
        None if layer.is_table => GeometryType::Table,
        None => GeometryType::Unknown,
    }
}

/// Lowercase, collapse non-alphanumeric runs to `_`, trim `_`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Build the child record for one concrete layer
fn derive_child(
    parent: &DatasetRecord,
    base: &str,
    layer: &LayerDescriptor,
    metadata: Option<&LayerMetadata>,
) -> DatasetRecord {
    let layer_id = layer.layer_id();

    let slug = slugify(&layer.name);
    let suffix = if slug.is_empty() {
        format!("layer_{}", layer_id)
    } else {
        slug
    };

    let parent_id = parent.id();
    let parent_title = parent.title().unwrap_or(parent_id);
    let description = metadata
        .and_then(|m| m.description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{} (sublayer: {})",
                parent.description().unwrap_or(""),
                layer.name
            )
            .trim()
            .to_string()
        });

    // Known fields are rewritten in place; provenance is appended when new
    let mut child = parent.clone();
    child.set(FIELD_ID, format!("{}_{}", parent_id, suffix));
    child.set(FIELD_TITLE, format!("{} – {}", parent_title, layer.name));
    child.set(FIELD_DESCRIPTION, description);
    child.set(FIELD_GEOMETRY_TYPE, resolve_geometry(metadata, layer).as_str());
    child.set(FIELD_PUBLIC_WEB_SERVICE, format!("{}/{}", base, layer_id));
    child.set(FIELD_PARENT_SERVICE_URL, base);
    child.set(FIELD_PARENT_DATASET_ID, parent_id);
    child.set(FIELD_LAYER_ID, layer_id);
    child.set(FIELD_LAYER_NAME, layer.name.as_str());
    child.remove(GEOMETRY_NOTE_FIELD);
    child
}
