//! Schema loading from various sources.
//!
//! Handles loading schema documents from files, strings, and HTTP URLs, and
//! the [`SchemaSource`] seam a session fetches named schemas through.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;
use crate::types::RawSchema;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_schema_str(&content)
}

/// Load a schema document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default). No retry.
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the
/// response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(url).send().map_err(network_error)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network_error)?;

    response.json().map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema document from a file path or URL.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}

/// Check the mandatory form template and decode a raw document.
///
/// # Errors
///
/// Returns `LoadError::MissingFormTemplate` / `LoadError::MissingFormId`
/// when the document has no usable form template, or
/// `LoadError::InvalidDocument` when the definitions have the wrong shape.
pub fn parse_schema(document: Value) -> Result<RawSchema, LoadError> {
    let form = match document.get("FormTemplate") {
        Some(form @ Value::Object(_)) => form,
        _ => return Err(LoadError::MissingFormTemplate),
    };

    match form.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => return Err(LoadError::MissingFormId),
    }

    serde_json::from_value(document).map_err(|source| LoadError::InvalidDocument { source })
}

/// Where named schema documents come from.
///
/// Transport and parse failures surface as `LoadError`; callers decide
/// whether to retry.
pub trait SchemaSource {
    fn fetch(&self, schema_name: &str) -> Result<Value, LoadError>;
}

/// Schemas stored as `<base_dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct DirSource {
    base_dir: PathBuf,
}

impl DirSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, schema_name: &str) -> PathBuf {
        self.base_dir.join(format!("{schema_name}.json"))
    }
}

impl SchemaSource for DirSource {
    fn fetch(&self, schema_name: &str) -> Result<Value, LoadError> {
        load_schema(&self.path_for(schema_name))
    }
}

/// Schemas fetched from `<base_url>/<name>.json`.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct UrlSource {
    base_url: String,
}

#[cfg(feature = "remote")]
impl UrlSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, schema_name: &str) -> String {
        format!("{}/{schema_name}.json", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(feature = "remote")]
impl SchemaSource for UrlSource {
    fn fetch(&self, schema_name: &str) -> Result<Value, LoadError> {
        load_schema_url(&self.url_for(schema_name))
    }
}

/// In-memory schemas keyed by name, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<String, Value>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema_name: impl Into<String>, document: Value) -> Self {
        self.insert(schema_name, document);
        self
    }

    pub fn insert(&mut self, schema_name: impl Into<String>, document: Value) {
        self.documents.insert(schema_name.into(), document);
    }
}

impl SchemaSource for MemorySource {
    fn fetch(&self, schema_name: &str) -> Result<Value, LoadError> {
        self.documents
            .get(schema_name)
            .cloned()
            .ok_or_else(|| LoadError::SchemaNotFound {
                name: schema_name.to_string(),
            })
    }
}
