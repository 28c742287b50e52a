//! Schema Form
//!
//! Runtime engine for declarative form schemas.
//!
//! A schema document describes a form as a tree: a form template references
//! sections, sections reference field groups and fields, and groups reference
//! fields. This library resolves that tree into id-indexed tables, decides
//! which elements are visible for the current values, validates field values
//! and keeps the live value and error maps.
//!
//! # Example
//!
//! ```
//! use schema_form::{normalize, parse_schema, FormStore};
//! use serde_json::json;
//!
//! let raw = parse_schema(json!({
//!     "FieldDefinition": {
//!         "id": "age",
//!         "label": "Age",
//!         "dataType": "integer",
//!         "validationRules": [
//!             { "id": "r1", "type": "range", "min": 18, "max": 99, "message": "Age must be 18-99" }
//!         ]
//!     },
//!     "SectionTemplate": { "id": "s1", "fieldGroups": [], "individualFields": ["age"] },
//!     "FormTemplate": { "id": "screening", "sections": [{ "sectionId": "s1" }] }
//! }))
//! .unwrap();
//! let schema = normalize(&raw).unwrap();
//!
//! let mut store = FormStore::new();
//! store.initialize(Default::default());
//! store.set_value("s1.age", json!(12), schema.field_definition("age"));
//!
//! assert_eq!(store.field_errors("s1.age"), ["Age must be 18-99"]);
//! ```
//!
//! # Paths
//!
//! | Slot | Path |
//! |------|------|
//! | field directly in a section | `section.field` |
//! | field in a group | `section.group.field` |
//! | field in a repeatable group | `section.group[0].field` |
//!
//! # Conditions
//!
//! Display rules compare a field's value with `equals`/`notEquals` (loose
//! equality), `exists`, and the numeric `>=`, `<=`, `>`, `<`. The first matching
//! rule decides visibility; no match means visible.

mod error;
mod input;
mod linter;
mod loader;
mod normalizer;
mod paths;
mod rules;
mod session;
mod store;
mod types;
mod validator;
mod visibility;

pub use error::{EditError, LoadError, SubmitError};
pub use linter::{lint, lint_document, lint_file, FileResult, FileStatus, LintResult};
pub use loader::{
    is_url, load_schema, load_schema_auto, load_schema_str, parse_schema, DirSource,
    MemorySource, SchemaSource,
};
pub use normalizer::{
    normalize, normalize_with_diagnostics, DANGLING_FIELD, DANGLING_GROUP, DANGLING_SECTION,
};
pub use paths::{default_values, field_slots, find_slot, group_path, FieldPath, FieldSlot};
pub use rules::{evaluate_condition, is_visible};
pub use session::{FormSession, LoadState};
pub use store::{FormStore, StoreState};
pub use types::{
    json_type_name, AttachmentsConfig, CalculationRule, CodedValue, Condition, DataType,
    Diagnostic, DisplayRule, FieldDefinition, FieldGroupTemplate, FieldOption, FieldTable,
    FormCompletionRules, FormErrors, FormSectionLink, FormTemplate, FormValues, NavigationRules,
    Operator, ProcessedSchema, RawSchema, RuleKind, RuleSeverity, SectionCompletionRules,
    SectionTemplate, Severity, SkipLogic, ValidationRule,
};
pub use validator::validate_field;
pub use visibility::{
    field_visibility, group_visibility, outline, section_visibility, ElementKind,
    ElementVisibility, FormOutline, OutlineNode,
};

#[cfg(feature = "remote")]
pub use loader::{load_schema_url, UrlSource};
