//! Core types for form schema documents and their normalized form.
//!
//! Field names follow the camelCase keys of the JSON schema documents.
//! Every optional list in the document format may be given as `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current form values keyed by structural path.
pub type FormValues = BTreeMap<String, Value>;

/// Violation messages keyed by structural path. Absent path = valid.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Field definitions keyed by field id.
pub type FieldTable = BTreeMap<String, FieldDefinition>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep an explicit `null` distinct from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

/// Data type of a leaf field.
///
/// Unknown type names are kept as [`DataType::Unsupported`] instead of
/// failing the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Decimal,
    Select,
    Date,
    Boolean,
    Textarea,
    Unsupported(String),
}

impl DataType {
    /// Parse a known data type name.
    ///
    /// Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(DataType::String),
            "integer" => Some(DataType::Integer),
            "decimal" => Some(DataType::Decimal),
            "select" => Some(DataType::Select),
            "date" => Some(DataType::Date),
            "boolean" => Some(DataType::Boolean),
            "textarea" => Some(DataType::Textarea),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Select => "select",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
            DataType::Textarea => "textarea",
            DataType::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DataType::Unsupported(_))
    }
}

impl From<String> for DataType {
    fn from(s: String) -> Self {
        DataType::parse(&s).unwrap_or(DataType::Unsupported(s))
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.as_str().to_string()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a `select` field's option list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: Value,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedValue {
    #[serde(default, deserialize_with = "nullable")]
    pub system: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// Severity attached to validation rules and completion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    #[default]
    Error,
    Warning,
}

/// Validation rule kinds the validator evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Required,
    Range,
    Pattern,
}

impl RuleKind {
    /// Parse a rule type name.
    ///
    /// Returns `None` for rule types the validator does not evaluate.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "required" => Some(RuleKind::Required),
            "range" => Some(RuleKind::Range),
            "pattern" => Some(RuleKind::Pattern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub severity: RuleSeverity,
    /// Cross-field expression; carried but not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ValidationRule {
    pub fn new(rule_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            rule_type: rule_type.into(),
            min: None,
            max: None,
            pattern: None,
            message: String::new(),
            severity: RuleSeverity::Error,
            condition: None,
        }
    }

    pub fn required() -> Self {
        Self::new("required")
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            ..Self::new("range")
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::new("pattern")
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> Option<RuleKind> {
        RuleKind::parse(&self.rule_type)
    }
}

/// Comparison operators of the condition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    Exists,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
}

impl Operator {
    /// Parse an operator token.
    ///
    /// Returns `None` for unknown operators (caller degrades to `false`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "equals" => Some(Operator::Equals),
            "notEquals" => Some(Operator::NotEquals),
            "exists" => Some(Operator::Exists),
            ">=" => Some(Operator::GreaterOrEqual),
            "<=" => Some(Operator::LessOrEqual),
            ">" => Some(Operator::Greater),
            "<" => Some(Operator::Less),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Exists => "exists",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
        }
    }
}

/// A declarative condition over one field's current value.
///
/// Conditions without a `field` (patient age, study event) are part of the
/// document format but always evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_event: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub operator: String,
    /// `None` when the key is absent; an explicit `null` is `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: Some(field.into()),
            study_event: None,
            operator: operator.as_str().to_string(),
            value: Some(value.into()),
            patient_age: None,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals, value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRule {
    pub condition: Condition,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl DisplayRule {
    pub fn new(condition: Condition, visible: bool) -> Self {
        Self { condition, visible }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRule {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub target_field: String,
    #[serde(default, deserialize_with = "nullable")]
    pub formula: String,
    #[serde(default, deserialize_with = "nullable")]
    pub dependencies: Vec<String>,
}

/// Metadata of a leaf input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coded_value: Option<CodedValue>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub calculation_rules: Vec<CalculationRule>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub display_rules: Vec<DisplayRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_metadata: Option<Value>,
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    /// Label shown next to the input; falls back to the field name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// A named, orderable collection of field ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroupTemplate {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub fields: Vec<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub display_rules: Vec<DisplayRule>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub calculation_rules: Vec<CalculationRule>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCompletionRules {
    #[serde(default, deserialize_with = "nullable")]
    pub required_field_groups: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub required_fields: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub validation_level: RuleSeverity,
}

/// A named collection of field groups and direct fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTemplate {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_order: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub collapsible: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub default_expanded: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub field_groups: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub individual_fields: Vec<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub display_rules: Vec<DisplayRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_rules: Option<SectionCompletionRules>,
}

/// A section reference inside the form template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSectionLink {
    #[serde(default, deserialize_with = "nullable")]
    pub section_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_order: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub required: bool,
}

impl FormSectionLink {
    pub fn new(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCompletionRules {
    #[serde(default, deserialize_with = "nullable")]
    pub required_sections: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub allow_partial_save: bool,
    /// Seconds between automatic saves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipLogic {
    pub condition: Condition,
    #[serde(default, deserialize_with = "nullable")]
    pub skip_section: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRules {
    #[serde(default, deserialize_with = "nullable")]
    pub allow_back_navigation: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub show_progress_indicator: bool,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub skip_logic: Vec<SkipLogic>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentsConfig {
    #[serde(default, deserialize_with = "nullable")]
    pub allowed_types: Vec<String>,
    /// Human-readable size limit, e.g. "5MB".
    #[serde(default, deserialize_with = "nullable")]
    pub max_file_size: String,
    #[serde(default, deserialize_with = "nullable")]
    pub max_total_size: String,
}

/// Top-level form structure. One per schema document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub sections: Vec<FormSectionLink>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub display_rules: Vec<DisplayRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_rules: Option<FormCompletionRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_rules: Option<NavigationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<AttachmentsConfig>,
}

/// A schema document as it arrives from a schema source.
///
/// The format carries at most one definition per type; the form template
/// may reference many ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    #[serde(default, deserialize_with = "nullable")]
    pub schema_version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "FieldDefinition", default, skip_serializing_if = "Option::is_none")]
    pub field_definition: Option<FieldDefinition>,
    #[serde(rename = "FieldGroupTemplate", default, skip_serializing_if = "Option::is_none")]
    pub field_group_template: Option<FieldGroupTemplate>,
    #[serde(rename = "SectionTemplate", default, skip_serializing_if = "Option::is_none")]
    pub section_template: Option<SectionTemplate>,
    #[serde(rename = "FormTemplate", default, skip_serializing_if = "Option::is_none")]
    pub form_template: Option<FormTemplate>,
}

/// The resolved aggregate: form template plus id-indexed lookup tables.
///
/// Every table entry is reachable from the form template; references that
/// could not be resolved are simply absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSchema {
    pub form_template: FormTemplate,
    pub section_templates: BTreeMap<String, SectionTemplate>,
    pub field_group_templates: BTreeMap<String, FieldGroupTemplate>,
    pub field_definitions: FieldTable,
    pub schema_version: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProcessedSchema {
    pub fn field_definition(&self, id: &str) -> Option<&FieldDefinition> {
        self.field_definitions.get(id)
    }

    pub fn section_template(&self, id: &str) -> Option<&SectionTemplate> {
        self.section_templates.get(id)
    }

    pub fn field_group_template(&self, id: &str) -> Option<&FieldGroupTemplate> {
        self.field_group_templates.get(id)
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A non-fatal finding about a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// JSON Pointer into the raw document (e.g., "/SectionTemplate/fieldGroups/0")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn error(code: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}
