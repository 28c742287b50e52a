//! Live form values and their derived errors.
//!
//! The store is the only place values and errors change. Per-path error
//! entries are always replaced, never appended to.

use serde_json::Value;

use crate::paths::field_slots;
use crate::types::{FieldDefinition, FormErrors, FormValues, ProcessedSchema};
use crate::validator::validate_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreState {
    /// No schema adopted yet.
    #[default]
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Default)]
pub struct FormStore {
    state: StoreState,
    values: FormValues,
    errors: FormErrors,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn field_errors(&self, path: &str) -> &[String] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when no path currently carries errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Replace values wholesale and clear all errors.
    pub fn initialize(&mut self, initial_values: FormValues) {
        self.values = initial_values;
        self.errors.clear();
        self.state = StoreState::Ready;
    }

    /// Store a value; with a field definition, re-validate that one path.
    pub fn set_value(
        &mut self,
        path: impl Into<String>,
        value: Value,
        field: Option<&FieldDefinition>,
    ) {
        let path = path.into();
        if let Some(field) = field {
            let messages = validate_field(field, Some(&value));
            self.replace_errors(&path, messages);
        }
        self.values.insert(path, value);
    }

    /// Replace one path's errors. An empty list clears the entry.
    pub fn set_field_errors(&mut self, path: impl Into<String>, errors: Vec<String>) {
        self.replace_errors(&path.into(), errors);
    }

    pub fn clear_field_errors(&mut self, path: &str) {
        self.errors.remove(path);
    }

    /// Replace the whole error map.
    pub fn set_form_errors(&mut self, errors: FormErrors) {
        self.errors = errors;
        self.errors.retain(|_, messages| !messages.is_empty());
    }

    /// Re-validate every reachable slot and replace the error map.
    ///
    /// Returns whether the form is free of errors. Dangling field
    /// references have nothing to validate and are skipped.
    pub fn validate_all(&mut self, schema: &ProcessedSchema) -> bool {
        let mut errors = FormErrors::new();

        for slot in field_slots(schema) {
            let Some(definition) = slot.definition else {
                continue;
            };
            let messages = validate_field(definition, self.values.get(&slot.path));
            if !messages.is_empty() {
                errors.insert(slot.path, messages);
            }
        }

        let valid = errors.is_empty();
        tracing::debug!(valid, invalid_paths = errors.len(), "validated all fields");
        self.errors = errors;
        valid
    }

    /// Drop values and errors and return to `Uninitialized`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn replace_errors(&mut self, path: &str, messages: Vec<String>) {
        if messages.is_empty() {
            self.errors.remove(path);
        } else {
            self.errors.insert(path.to_string(), messages);
        }
    }
}
