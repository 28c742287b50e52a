//! Error types for schema loading, value editing and submission.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while fetching or parsing a schema document.
///
/// A failed load never replaces the schema a session already holds.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no schema named '{name}'")]
    SchemaNotFound { name: String },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema document: {source}")]
    InvalidDocument {
        #[source]
        source: serde_json::Error,
    },

    // Format errors (exit code 2)
    #[error("invalid schema format: missing FormTemplate")]
    MissingFormTemplate,

    #[error("invalid schema format: FormTemplate has no id")]
    MissingFormId,
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. }
            | LoadError::ReadError { .. }
            | LoadError::SchemaNotFound { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }

    /// True when the document parsed but lacks the mandatory form template or its id.
    pub fn is_format_error(&self) -> bool {
        matches!(self, LoadError::MissingFormTemplate | LoadError::MissingFormId)
    }
}

/// Errors turning raw user input into a stored value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("no schema loaded")]
    NoSchema,

    #[error("path {path} does not address a field of the current schema")]
    UnknownPath { path: String },

    #[error("field definition not found for ID: {field_id} (path: {path})")]
    DefinitionNotFound { field_id: String, path: String },

    #[error("unsupported field type: {data_type} (path: {path})")]
    UnsupportedDataType { data_type: String, path: String },

    #[error("invalid {data_type} input: {input:?}")]
    InvalidInput { data_type: String, input: String },
}

/// Errors rejecting a submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no schema loaded")]
    NoSchema,

    #[error("form has {errors} invalid field(s)")]
    Invalid { errors: usize },
}

impl SubmitError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SubmitError::NoSchema => 2,
            SubmitError::Invalid { .. } => 1,
        }
    }
}
