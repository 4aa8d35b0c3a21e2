//! gcat-expand library interface
//!
//! Reconciles a catalog of dataset records against live ArcGIS REST
//! services, expanding root service references into one record per
//! concrete sublayer.
//!
//! Flow: [`classifier`] partitions records, [`scheduler`] drives the
//! [`expander`] (backed by a [`client::LayerSource`]) over root records in
//! paced batches, and [`reconciler`] splices the results back into the
//! original order and drops duplicate ids. [`pipeline`] ties it together.

pub mod classifier;
pub mod client;
pub mod config;
pub mod expander;
pub mod geometry;
pub mod pipeline;
pub mod reconciler;
pub mod scheduler;
pub mod types;

pub use crate::client::{ArcGisClient, LayerSource};
pub use crate::config::ExpandConfig;
pub use crate::expander::{Expander, Expansion, ExpansionOutcome};
pub use crate::pipeline::{run, RunReport, Summary};
pub use crate::types::{Warning, WarningKind};
