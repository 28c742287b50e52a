//! Schema linting - static analysis of form schema documents.
//!
//! Checks schema files for:
//! - JSON syntax errors
//! - A missing form template or form id
//! - Document shape (types of every known key)
//! - Pattern rules that do not compile
//! - Dangling section, group and field references
//! - Operators, rule types and data types the engine ignores

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::LoadError;
use crate::loader::{load_schema, parse_schema};
use crate::normalizer::normalize_with_diagnostics;
use crate::types::{
    Condition, Diagnostic, DisplayRule, Operator, RawSchema, RuleKind, Severity, ValidationRule,
};

pub const SYNTAX_ERROR: &str = "E001";
pub const MISSING_FORM: &str = "E002";
pub const SHAPE_ERROR: &str = "E003";
pub const INVALID_PATTERN: &str = "E004";
pub const UNSUPPORTED_OPERATOR: &str = "W201";
pub const CONDITION_WITHOUT_FIELD: &str = "W202";
pub const UNSUPPORTED_RULE: &str = "W203";
pub const UNSUPPORTED_DATA_TYPE: &str = "W204";

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, files with warnings count as failed.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    tracing::debug!(
        files = files.len(),
        failed,
        errors = total_errors,
        warnings = total_warnings,
        "lint finished"
    );

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file. Reported paths are relative to `base_path`.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let display_path = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();
    let display_path = if display_path.as_os_str().is_empty() {
        file.to_path_buf()
    } else {
        display_path
    };

    let diagnostics = match load_schema(file) {
        Ok(document) => lint_document(&document),
        Err(e) => vec![Diagnostic::error(
            SYNTAX_ERROR,
            "/",
            format!("syntax error: {}", e),
        )],
    };

    FileResult {
        file: display_path,
        status: status_of(&diagnostics),
        diagnostics,
    }
}

/// Lint an already parsed document.
pub fn lint_document(document: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = check_shape(document);

    let raw = match parse_schema(document.clone()) {
        Ok(raw) => raw,
        Err(e @ (LoadError::MissingFormTemplate | LoadError::MissingFormId)) => {
            diagnostics.push(Diagnostic::error(MISSING_FORM, "/FormTemplate", e.to_string()));
            return diagnostics;
        }
        Err(e) => {
            // The shape check normally explains this already
            if diagnostics.is_empty() {
                diagnostics.push(Diagnostic::error(SHAPE_ERROR, "/", e.to_string()));
            }
            return diagnostics;
        }
    };

    check_rules(&raw, &mut diagnostics);

    match normalize_with_diagnostics(&raw) {
        Ok((_, warnings)) => diagnostics.extend(warnings),
        Err(e) => diagnostics.push(Diagnostic::error(MISSING_FORM, "/FormTemplate", e.to_string())),
    }

    diagnostics
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn status_of(diagnostics: &[Diagnostic]) -> FileStatus {
    if count(diagnostics, Severity::Error) > 0 {
        FileStatus::Error
    } else if count(diagnostics, Severity::Warning) > 0 {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    }
}

/// Check the document against the form document JSON Schema.
fn check_shape(document: &Value) -> Vec<Diagnostic> {
    let validator = match jsonschema::validator_for(&document_schema()) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "form document schema failed to compile");
            return Vec::new();
        }
    };

    validator
        .iter_errors(document)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            Diagnostic::error(SHAPE_ERROR, path, e.to_string())
        })
        .collect()
}

fn check_rules(raw: &RawSchema, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(field) = &raw.field_definition {
        if !field.data_type.is_supported() {
            diagnostics.push(Diagnostic::warning(
                UNSUPPORTED_DATA_TYPE,
                "/FieldDefinition/dataType",
                format!(
                    "unsupported data type \"{}\": field '{}' cannot be edited",
                    field.data_type, field.id
                ),
            ));
        }
        check_validation_rules(&field.validation_rules, "/FieldDefinition", diagnostics);
        check_display_rules(&field.display_rules, "/FieldDefinition", diagnostics);
    }
    if let Some(group) = &raw.field_group_template {
        check_validation_rules(&group.validation_rules, "/FieldGroupTemplate", diagnostics);
        check_display_rules(&group.display_rules, "/FieldGroupTemplate", diagnostics);
    }
    if let Some(section) = &raw.section_template {
        check_display_rules(&section.display_rules, "/SectionTemplate", diagnostics);
    }
    if let Some(form) = &raw.form_template {
        check_display_rules(&form.display_rules, "/FormTemplate", diagnostics);
        if let Some(navigation) = &form.navigation_rules {
            for (i, skip) in navigation.skip_logic.iter().enumerate() {
                check_condition(
                    &skip.condition,
                    &format!("/FormTemplate/navigationRules/skipLogic/{i}/condition"),
                    diagnostics,
                );
            }
        }
    }
}

fn check_validation_rules(rules: &[ValidationRule], owner: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (i, rule) in rules.iter().enumerate() {
        let path = format!("{owner}/validationRules/{i}");
        match rule.kind() {
            Some(RuleKind::Pattern) => {
                let Some(pattern) = rule.pattern.as_deref().filter(|p| !p.is_empty()) else {
                    continue;
                };
                if let Err(e) = Regex::new(pattern) {
                    diagnostics.push(Diagnostic::error(
                        INVALID_PATTERN,
                        format!("{path}/pattern"),
                        format!("invalid pattern \"{}\": {}", pattern, e),
                    ));
                }
            }
            Some(RuleKind::Required | RuleKind::Range) => {}
            None => diagnostics.push(Diagnostic::warning(
                UNSUPPORTED_RULE,
                format!("{path}/type"),
                format!(
                    "unsupported rule type \"{}\": expected required, range, or pattern",
                    rule.rule_type
                ),
            )),
        }
    }
}

fn check_display_rules(rules: &[DisplayRule], owner: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (i, rule) in rules.iter().enumerate() {
        check_condition(
            &rule.condition,
            &format!("{owner}/displayRules/{i}/condition"),
            diagnostics,
        );
    }
}

fn check_condition(condition: &Condition, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if condition.field.as_deref().map_or(true, str::is_empty) {
        diagnostics.push(Diagnostic::warning(
            CONDITION_WITHOUT_FIELD,
            path,
            "condition has no field and always evaluates to false",
        ));
    }
    if Operator::parse(&condition.operator).is_none() {
        diagnostics.push(Diagnostic::warning(
            UNSUPPORTED_OPERATOR,
            format!("{path}/operator"),
            format!(
                "unsupported operator \"{}\": the condition always evaluates to false",
                condition.operator
            ),
        ));
    }
}

/// JSON Schema describing the shape of a form schema document.
fn document_schema() -> Value {
    json!({
        "type": "object",
        "required": ["FormTemplate"],
        "properties": {
            "schemaVersion": { "type": ["string", "null"] },
            "description": { "type": ["string", "null"] },
            "note": { "type": ["string", "null"] },
            "FieldDefinition": { "$ref": "#/$defs/field" },
            "FieldGroupTemplate": { "$ref": "#/$defs/group" },
            "SectionTemplate": { "$ref": "#/$defs/section" },
            "FormTemplate": { "$ref": "#/$defs/form" }
        },
        "$defs": {
            "text": { "type": ["string", "null"] },
            "flag": { "type": ["boolean", "null"] },
            "count": { "type": ["integer", "null"], "minimum": 0 },
            "order": { "type": ["integer", "null"] },
            "ids": { "type": ["array", "null"], "items": { "type": "string" } },
            "condition": {
                "type": "object",
                "properties": {
                    "field": { "$ref": "#/$defs/text" },
                    "studyEvent": { "$ref": "#/$defs/text" },
                    "operator": { "$ref": "#/$defs/text" }
                }
            },
            "displayRules": {
                "type": ["array", "null"],
                "items": {
                    "type": "object",
                    "required": ["condition"],
                    "properties": {
                        "condition": { "$ref": "#/$defs/condition" },
                        "visible": { "type": "boolean" }
                    }
                }
            },
            "validationRules": {
                "type": ["array", "null"],
                "items": {
                    "type": "object",
                    "required": ["type"],
                    "properties": {
                        "id": { "$ref": "#/$defs/text" },
                        "type": { "type": "string" },
                        "min": { "type": ["number", "null"] },
                        "max": { "type": ["number", "null"] },
                        "pattern": { "$ref": "#/$defs/text" },
                        "message": { "$ref": "#/$defs/text" },
                        "severity": { "enum": ["error", "warning", null] },
                        "condition": { "$ref": "#/$defs/text" }
                    }
                }
            },
            "field": {
                "type": "object",
                "properties": {
                    "id": { "$ref": "#/$defs/text" },
                    "name": { "$ref": "#/$defs/text" },
                    "label": { "$ref": "#/$defs/text" },
                    "dataType": { "$ref": "#/$defs/text" },
                    "precision": { "$ref": "#/$defs/count" },
                    "required": { "$ref": "#/$defs/flag" },
                    "options": {
                        "type": ["array", "null"],
                        "items": {
                            "type": "object",
                            "required": ["value"],
                            "properties": {
                                "value": { "type": ["string", "number", "boolean"] },
                                "label": { "$ref": "#/$defs/text" }
                            }
                        }
                    },
                    "validationRules": { "$ref": "#/$defs/validationRules" },
                    "displayRules": { "$ref": "#/$defs/displayRules" }
                }
            },
            "group": {
                "type": "object",
                "properties": {
                    "id": { "$ref": "#/$defs/text" },
                    "name": { "$ref": "#/$defs/text" },
                    "repeatable": { "$ref": "#/$defs/flag" },
                    "minInstances": { "$ref": "#/$defs/count" },
                    "maxInstances": { "$ref": "#/$defs/count" },
                    "fields": { "$ref": "#/$defs/ids" },
                    "displayRules": { "$ref": "#/$defs/displayRules" },
                    "validationRules": { "$ref": "#/$defs/validationRules" }
                }
            },
            "section": {
                "type": "object",
                "properties": {
                    "id": { "$ref": "#/$defs/text" },
                    "name": { "$ref": "#/$defs/text" },
                    "displayOrder": { "$ref": "#/$defs/order" },
                    "collapsible": { "$ref": "#/$defs/flag" },
                    "defaultExpanded": { "$ref": "#/$defs/flag" },
                    "fieldGroups": { "$ref": "#/$defs/ids" },
                    "individualFields": { "$ref": "#/$defs/ids" },
                    "displayRules": { "$ref": "#/$defs/displayRules" }
                }
            },
            "form": {
                "type": "object",
                "properties": {
                    "id": { "$ref": "#/$defs/text" },
                    "name": { "$ref": "#/$defs/text" },
                    "estimatedDuration": { "type": ["number", "null"] },
                    "sections": {
                        "type": ["array", "null"],
                        "items": {
                            "type": "object",
                            "required": ["sectionId"],
                            "properties": {
                                "sectionId": { "type": "string" },
                                "displayOrder": { "$ref": "#/$defs/order" },
                                "required": { "$ref": "#/$defs/flag" }
                            }
                        }
                    },
                    "displayRules": { "$ref": "#/$defs/displayRules" }
                }
            }
        }
    })
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
