//! Catalog document model and file I/O
//!
//! A catalog is a JSON document with a top-level `datasets` array. Each
//! record is held as its ordered JSON object: known fields are read through
//! typed accessors and edited in place, so untouched keys (including explicit
//! `null`s) keep their value and position when the catalog is written back.

use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Record-level geometry sentinel for services that mix geometry types
pub const GEOMETRY_MULTIPLE: &str = "multiple";

/// Free-text field flagging ambiguous multi-geometry services
pub const GEOMETRY_NOTE_FIELD: &str = "geometry_type_note";

pub const FIELD_ID: &str = "id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_GEOMETRY_TYPE: &str = "geometry_type";
pub const FIELD_PUBLIC_WEB_SERVICE: &str = "public_web_service";
pub const FIELD_PARENT_SERVICE_URL: &str = "parent_service_url";
pub const FIELD_PARENT_DATASET_ID: &str = "parent_dataset_id";
pub const FIELD_LAYER_ID: &str = "layer_id";
pub const FIELD_LAYER_NAME: &str = "layer_name";

const DATASETS_KEY: &str = "datasets";

/// One dataset entry of the catalog
///
/// Invariant: `fields["id"]` is always a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct DatasetRecord {
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for DatasetRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        match fields.get(FIELD_ID) {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(format!("dataset `id` must be a string, got {}", other)),
            None => Err("dataset record has no `id`".to_string()),
        }
    }
}

impl Serialize for DatasetRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl DatasetRecord {
    /// Create a record carrying only an id
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_ID.to_string(), Value::String(id.into()));
        Self { fields }
    }

    /// Unique catalog key
    pub fn id(&self) -> &str {
        self.str_field(FIELD_ID).unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field(FIELD_TITLE)
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field(FIELD_DESCRIPTION)
    }

    /// POINT, POLYLINE, POLYGON, MULTIPATCH, TABLE, UNKNOWN or `multiple`
    pub fn geometry_type(&self) -> Option<&str> {
        self.str_field(FIELD_GEOMETRY_TYPE)
    }

    /// ArcGIS REST service URL (root service or pinned sublayer)
    pub fn public_web_service(&self) -> Option<&str> {
        self.str_field(FIELD_PUBLIC_WEB_SERVICE)
    }

    /// Base URL of the root service this record was derived from
    pub fn parent_service_url(&self) -> Option<&str> {
        self.str_field(FIELD_PARENT_SERVICE_URL)
    }

    /// Id of the root record this record was derived from
    pub fn parent_dataset_id(&self) -> Option<&str> {
        self.str_field(FIELD_PARENT_DATASET_ID)
    }

    /// Numeric sublayer id within the parent service
    pub fn layer_id(&self) -> Option<i64> {
        self.fields.get(FIELD_LAYER_ID).and_then(Value::as_i64)
    }

    /// Raw sublayer name as reported by the service
    pub fn layer_name(&self) -> Option<&str> {
        self.str_field(FIELD_LAYER_NAME)
    }

    /// Raw value of any field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields in document order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Set a field: existing keys keep their position, new keys are appended
    ///
    /// Setting `id` to a non-string value is ignored.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if key == FIELD_ID && !value.is_string() {
            return;
        }
        self.fields.insert(key.to_string(), value);
    }

    /// Remove a field, keeping the order of the rest
    ///
    /// The `id` field cannot be removed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if key == FIELD_ID {
            return None;
        }
        self.fields.shift_remove(key)
    }

    /// True when the declared geometry is absent, null or the `multiple` sentinel
    pub fn has_undetermined_geometry(&self) -> bool {
        match self.geometry_type() {
            None => true,
            Some(value) => value.eq_ignore_ascii_case(GEOMETRY_MULTIPLE),
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// The whole catalog document
///
/// Other top-level keys are kept verbatim, and `datasets` is written back at
/// the position it was read from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Catalog {
    pub datasets: Vec<DatasetRecord>,

    /// Other top-level keys, preserved verbatim
    pub extra: Map<String, Value>,

    datasets_position: usize,
}

impl TryFrom<Map<String, Value>> for Catalog {
    type Error = String;

    fn try_from(mut document: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let position = document.keys().position(|key| key == DATASETS_KEY);
        let (Some(position), Some(datasets)) = (position, document.shift_remove(DATASETS_KEY))
        else {
            return Err("catalog has no `datasets` array".to_string());
        };
        let datasets: Vec<DatasetRecord> =
            serde_json::from_value(datasets).map_err(|e| format!("invalid `datasets`: {}", e))?;

        Ok(Self {
            datasets,
            extra: document,
            datasets_position: position,
        })
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let position = self.datasets_position.min(self.extra.len());
        let mut map = serializer.serialize_map(Some(self.extra.len() + 1))?;

        for (index, (key, value)) in self.extra.iter().enumerate() {
            if index == position {
                map.serialize_entry(DATASETS_KEY, &self.datasets)?;
            }
            map.serialize_entry(key, value)?;
        }
        if position == self.extra.len() {
            map.serialize_entry(DATASETS_KEY, &self.datasets)?;
        }

        map.end()
    }
}

impl Catalog {
    pub fn new(datasets: Vec<DatasetRecord>) -> Self {
        Self {
            datasets,
            extra: Map::new(),
            datasets_position: 0,
        }
    }

    /// Parse a catalog document
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Catalog(format!("Parse catalog failed: {}", e)))
    }

    /// Render as 2-space indented JSON with a trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// Load the catalog document at `path`
///
/// Any read or parse failure is fatal to the run and reported as
/// [`Error::Catalog`].
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Catalog(format!("Read {} failed: {}", path.display(), e)))?;
    let catalog: Catalog = serde_json::from_str(&content)
        .map_err(|e| Error::Catalog(format!("Parse {} failed: {}", path.display(), e)))?;

    debug!(
        path = %path.display(),
        datasets = catalog.datasets.len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Write the catalog atomically (temp file + rename)
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let rendered = catalog.to_json_string()?;
    let temp_path = temp_path_for(path);

    std::fs::write(&temp_path, rendered.as_bytes())?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    info!(
        path = %path.display(),
        datasets = catalog.datasets.len(),
        "Catalog written"
    );
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
