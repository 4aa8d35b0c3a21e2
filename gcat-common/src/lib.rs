//! # gcat common library
//!
//! Shared code for the geospatial catalog tools:
//! - Dataset record and catalog document model
//! - Catalog loading and atomic persistence
//! - TOML configuration loading
//! - Common error types

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{Catalog, DatasetRecord};
pub use error::{Error, Result};
