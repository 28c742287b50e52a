//! A form session: one active schema and one value store.
//!
//! All mutations go through the session's methods and run to completion.
//! A schema is only swapped in once it is fully normalized, and a failed
//! load leaves the previous schema in place.

use serde_json::Value;

use crate::error::{EditError, LoadError, SubmitError};
use crate::loader::{parse_schema, SchemaSource};
use crate::normalizer::normalize_with_diagnostics;
use crate::paths::{default_values, find_slot};
use crate::store::FormStore;
use crate::types::{Diagnostic, FormErrors, FormValues, ProcessedSchema};
use crate::visibility::{outline, FormOutline};

/// Progress of the most recent load request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading { schema_name: String },
    Ready { schema_name: String },
    Failed { schema_name: String, message: String },
}

#[derive(Debug, Default)]
pub struct FormSession {
    schema: Option<ProcessedSchema>,
    schema_name: Option<String>,
    diagnostics: Vec<Diagnostic>,
    load_state: LoadState,
    store: FormStore,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> Option<&ProcessedSchema> {
        self.schema.as_ref()
    }

    /// Name of the schema currently adopted.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Dangling-reference warnings from the adopted schema's normalization.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, LoadState::Loading { .. })
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    /// Direct store access for callers that supply their own field definitions.
    pub fn store_mut(&mut self) -> &mut FormStore {
        &mut self.store
    }

    pub fn values(&self) -> &FormValues {
        self.store.values()
    }

    pub fn errors(&self) -> &FormErrors {
        self.store.errors()
    }

    /// Fetch, normalize and adopt a named schema.
    ///
    /// An empty name clears the session instead.
    ///
    /// # Errors
    ///
    /// Returns the fetch, parse or format error; the previously adopted
    /// schema stays active.
    pub fn load(&mut self, source: &dyn SchemaSource, schema_name: &str) -> Result<(), LoadError> {
        if schema_name.is_empty() {
            self.clear();
            return Ok(());
        }

        self.begin_load(schema_name);
        let fetched = source.fetch(schema_name);
        self.finish_load(schema_name, fetched)
    }

    /// Mark a load as in flight. The current schema stays readable.
    pub fn begin_load(&mut self, schema_name: &str) {
        tracing::info!(schema = %schema_name, "loading form schema");
        self.load_state = LoadState::Loading {
            schema_name: schema_name.to_string(),
        };
    }

    /// Settle a load with the fetched document.
    ///
    /// Loads are not cancellable: whichever settles last wins.
    pub fn finish_load(
        &mut self,
        schema_name: &str,
        fetched: Result<Value, LoadError>,
    ) -> Result<(), LoadError> {
        let result = fetched
            .and_then(parse_schema)
            .and_then(|raw| normalize_with_diagnostics(&raw));

        match result {
            Ok((schema, diagnostics)) => {
                self.adopt(schema_name, schema, diagnostics);
                Ok(())
            }
            Err(err) => {
                tracing::error!(schema = %schema_name, error = %err, "failed to load form schema");
                self.load_state = LoadState::Failed {
                    schema_name: schema_name.to_string(),
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Replace the active schema and reseed values from field defaults.
    ///
    /// Values and errors of the previous schema are discarded.
    pub fn adopt(
        &mut self,
        schema_name: &str,
        schema: ProcessedSchema,
        diagnostics: Vec<Diagnostic>,
    ) {
        tracing::info!(
            schema = %schema_name,
            form = %schema.form_template.id,
            sections = schema.section_templates.len(),
            fields = schema.field_definitions.len(),
            warnings = diagnostics.len(),
            "adopted form schema"
        );
        self.store.initialize(default_values(&schema));
        self.schema = Some(schema);
        self.schema_name = Some(schema_name.to_string());
        self.diagnostics = diagnostics;
        self.load_state = LoadState::Ready {
            schema_name: schema_name.to_string(),
        };
    }

    /// Drop the schema, its values and errors.
    pub fn clear(&mut self) {
        tracing::debug!("clearing form session");
        *self = Self::default();
    }

    /// The value a renderer should show: the stored value, or the field default.
    pub fn current_value(&self, path: &str) -> Option<&Value> {
        self.store.value(path).or_else(|| {
            let schema = self.schema.as_ref()?;
            find_slot(schema, path)?.definition?.default_value.as_ref()
        })
    }

    /// Store a value for a path the active schema addresses, validating it
    /// when the field has a definition.
    ///
    /// Paths outside the schema's traversal are logged and ignored; use
    /// [`FormSession::store_mut`] to write arbitrary keys.
    pub fn set_value(&mut self, path: &str, value: Value) {
        let Some(slot) = self.schema.as_ref().and_then(|schema| find_slot(schema, path)) else {
            tracing::warn!(%path, "ignoring value for a path the form does not address");
            return;
        };
        if slot.definition.is_none() {
            tracing::debug!(%path, "value set without a field definition");
        }
        self.store.set_value(path, value, slot.definition);
    }

    /// Parse widget text for the field at `path`, then store and validate it.
    ///
    /// # Errors
    ///
    /// Returns `EditError` when no schema is loaded, the path is unknown,
    /// the field definition is missing, or the input cannot be parsed.
    pub fn edit(&mut self, path: &str, raw: &str) -> Result<(), EditError> {
        let schema = self.schema.as_ref().ok_or(EditError::NoSchema)?;
        let slot = find_slot(schema, path).ok_or_else(|| EditError::UnknownPath {
            path: path.to_string(),
        })?;
        let field = slot.definition.ok_or_else(|| EditError::DefinitionNotFound {
            field_id: slot.field_id.to_string(),
            path: path.to_string(),
        })?;

        let value = field.data_type.parse_input(raw).map_err(|err| match err {
            EditError::UnsupportedDataType { data_type, .. } => EditError::UnsupportedDataType {
                data_type,
                path: path.to_string(),
            },
            other => other,
        })?;

        self.store.set_value(path, value, Some(field));
        Ok(())
    }

    /// Re-validate every reachable field. True when nothing is invalid.
    ///
    /// With no schema adopted there is nothing to validate.
    pub fn validate_all(&mut self) -> bool {
        match &self.schema {
            Some(schema) => self.store.validate_all(schema),
            None => true,
        }
    }

    /// Gate a submission on a full validation pass.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Invalid` with the number of invalid paths,
    /// leaving every message in the error map.
    pub fn submit(&mut self) -> Result<FormValues, SubmitError> {
        if self.schema.is_none() {
            return Err(SubmitError::NoSchema);
        }
        if self.validate_all() {
            tracing::info!(values = self.values().len(), "form submitted");
            Ok(self.values().clone())
        } else {
            Err(SubmitError::Invalid {
                errors: self.errors().len(),
            })
        }
    }

    /// Render outline for the current values and errors.
    pub fn outline(&self) -> Option<FormOutline> {
        self.schema
            .as_ref()
            .map(|schema| outline(schema, self.store.values(), self.store.errors()))
    }
}
