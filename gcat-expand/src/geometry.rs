//! Geometry type normalization
//!
//! Maps provider geometry strings (`esriGeometryPolygon`, ...) onto a small
//! closed vocabulary. Matching is case-insensitive substring matching in
//! priority order: polygon, line, point, multipatch, table/empty. Unmatched
//! non-empty strings pass through uppercased.

use std::fmt;

/// Normalized geometry type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    Polyline,
    Polygon,
    MultiPatch,
    Table,
    /// Nothing is known about the layer's geometry
    Unknown,
    /// Unmatched provider string, uppercased
    Other(String),
}

impl GeometryType {
    pub fn as_str(&self) -> &str {
        match self {
            GeometryType::Point => "POINT",
            GeometryType::Polyline => "POLYLINE",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPatch => "MULTIPATCH",
            GeometryType::Table => "TABLE",
            GeometryType::Unknown => "UNKNOWN",
            GeometryType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a provider geometry type string
pub fn normalize(raw: &str) -> GeometryType {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();

    if lower.contains("polygon") {
        GeometryType::Polygon
    } else if lower.contains("line") {
        GeometryType::Polyline
    } else if lower.contains("point") {
        GeometryType::Point
    } else if lower.contains("multipatch") {
        GeometryType::MultiPatch
    } else if lower.is_empty() || lower.contains("table") {
        GeometryType::Table
    } else {
        GeometryType::Other(trimmed.to_uppercase())
    }
}
