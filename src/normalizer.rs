//! Schema normalization - resolves a raw document into id-indexed tables.
//!
//! The document format carries a single definition per type. Each singleton
//! is a candidate for every reference whose id matches it; all other
//! references stay dangling and are reported, never synthesized.

use std::collections::BTreeSet;

use crate::error::LoadError;
use crate::types::{Diagnostic, ProcessedSchema, RawSchema};

/// Diagnostic code for a section referenced by the form but not resolvable.
pub const DANGLING_SECTION: &str = "W101";
/// Diagnostic code for a field group referenced by a section but not resolvable.
pub const DANGLING_GROUP: &str = "W102";
/// Diagnostic code for a field referenced by a group or section but not resolvable.
pub const DANGLING_FIELD: &str = "W103";

/// Normalize a raw schema into lookup tables.
///
/// Unresolved references are logged and otherwise ignored.
///
/// # Errors
///
/// Returns `LoadError::MissingFormTemplate` or `LoadError::MissingFormId`
/// if the document has no usable form template.
pub fn normalize(raw: &RawSchema) -> Result<ProcessedSchema, LoadError> {
    normalize_with_diagnostics(raw).map(|(schema, _)| schema)
}

/// Normalize a raw schema and return the dangling-reference warnings.
///
/// Deterministic: the same input always yields the same tables and
/// diagnostics in the same order.
pub fn normalize_with_diagnostics(
    raw: &RawSchema,
) -> Result<(ProcessedSchema, Vec<Diagnostic>), LoadError> {
    let form = raw
        .form_template
        .as_ref()
        .ok_or(LoadError::MissingFormTemplate)?;
    if form.id.is_empty() {
        return Err(LoadError::MissingFormId);
    }

    let mut schema = ProcessedSchema {
        form_template: form.clone(),
        schema_version: raw.schema_version.clone(),
        description: raw.description.clone(),
        note: raw.note.clone(),
        ..ProcessedSchema::default()
    };
    let mut diagnostics = Vec::new();

    // Seed each table with the supplied singleton
    if let Some(field) = raw.field_definition.as_ref().filter(|f| !f.id.is_empty()) {
        schema.field_definitions.insert(field.id.clone(), field.clone());
    }
    if let Some(group) = raw
        .field_group_template
        .as_ref()
        .filter(|g| !g.id.is_empty())
    {
        schema
            .field_group_templates
            .insert(group.id.clone(), group.clone());
    }
    if let Some(section) = raw.section_template.as_ref().filter(|s| !s.id.is_empty()) {
        schema
            .section_templates
            .insert(section.id.clone(), section.clone());
    }

    // Sections reachable from the form
    for (i, link) in form.sections.iter().enumerate() {
        if schema.section_templates.contains_key(&link.section_id) {
            continue;
        }
        match raw
            .section_template
            .as_ref()
            .filter(|s| s.id == link.section_id)
        {
            Some(section) => {
                schema
                    .section_templates
                    .insert(link.section_id.clone(), section.clone());
            }
            None => {
                let message = format!(
                    "section '{}' is referenced by FormTemplate '{}' but no matching SectionTemplate exists",
                    link.section_id, form.id
                );
                tracing::warn!(section = %link.section_id, form = %form.id, "unresolved section reference");
                diagnostics.push(Diagnostic::warning(
                    DANGLING_SECTION,
                    format!("/FormTemplate/sections/{i}/sectionId"),
                    message,
                ));
            }
        }
    }

    // Groups reachable from resolved sections
    for section in schema.section_templates.values() {
        for (i, group_id) in section.field_groups.iter().enumerate() {
            if schema.field_group_templates.contains_key(group_id) {
                continue;
            }
            match raw.field_group_template.as_ref().filter(|g| &g.id == group_id) {
                Some(group) => {
                    schema
                        .field_group_templates
                        .insert(group_id.clone(), group.clone());
                }
                None => {
                    tracing::warn!(group = %group_id, section = %section.id, "unresolved field group reference");
                    diagnostics.push(Diagnostic::warning(
                        DANGLING_GROUP,
                        format!("/SectionTemplate/fieldGroups/{i}"),
                        format!(
                            "field group '{group_id}' is referenced by SectionTemplate '{}' but no matching FieldGroupTemplate exists",
                            section.id
                        ),
                    ));
                }
            }
        }
    }

    // Fields reachable from resolved groups and sections, first reference wins
    let mut field_refs: Vec<(&str, String)> = Vec::new();
    let mut seen = BTreeSet::new();
    for group in schema.field_group_templates.values() {
        for (i, field_id) in group.fields.iter().enumerate() {
            if seen.insert(field_id.clone()) {
                field_refs.push((field_id, format!("/FieldGroupTemplate/fields/{i}")));
            }
        }
    }
    for section in schema.section_templates.values() {
        for (i, field_id) in section.individual_fields.iter().enumerate() {
            if seen.insert(field_id.clone()) {
                field_refs.push((field_id, format!("/SectionTemplate/individualFields/{i}")));
            }
        }
    }

    let mut resolved_fields = Vec::new();
    for (field_id, path) in field_refs {
        if schema.field_definitions.contains_key(field_id) {
            continue;
        }
        match raw.field_definition.as_ref().filter(|f| f.id == field_id) {
            Some(field) => resolved_fields.push((field_id.to_string(), field.clone())),
            None => {
                tracing::warn!(field = %field_id, "unresolved field reference");
                diagnostics.push(Diagnostic::warning(
                    DANGLING_FIELD,
                    path,
                    format!(
                        "field '{field_id}' is used in the form structure but no matching FieldDefinition exists"
                    ),
                ));
            }
        }
    }
    schema.field_definitions.extend(resolved_fields);

    Ok((schema, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_schema;
    use serde_json::json;

    fn raw(document: serde_json::Value) -> RawSchema {
        parse_schema(document).unwrap()
    }

    fn vitals() -> RawSchema {
        raw(json!({
            "schemaVersion": "2.1",
            "description": "Vital signs",
            "FieldDefinition": { "id": "weight", "label": "Weight", "dataType": "decimal" },
            "FieldGroupTemplate": { "id": "measurements", "name": "Measurements", "fields": ["weight", "height"] },
            "SectionTemplate": {
                "id": "vitals",
                "fieldGroups": ["measurements", "bloodPressure"],
                "individualFields": ["weight", "pulse"]
            },
            "FormTemplate": {
                "id": "vitals-form",
                "sections": [
                    { "sectionId": "vitals", "displayOrder": 1, "required": true },
                    { "sectionId": "history", "displayOrder": 2, "required": false }
                ]
            }
        }))
    }

    #[test]
    fn resolves_matching_singletons() {
        let (schema, _) = normalize_with_diagnostics(&vitals()).unwrap();

        assert_eq!(schema.form_template.id, "vitals-form");
        assert_eq!(schema.schema_version, "2.1");
        assert!(schema.section_template("vitals").is_some());
        assert!(schema.field_group_template("measurements").is_some());
        assert_eq!(schema.field_definition("weight").unwrap().label, "Weight");
    }

    #[test]
    fn dangling_references_stay_absent() {
        let (schema, diagnostics) = normalize_with_diagnostics(&vitals()).unwrap();

        assert!(schema.section_template("history").is_none());
        assert!(schema.field_group_template("bloodPressure").is_none());
        assert!(schema.field_definition("height").is_none());
        assert!(schema.field_definition("pulse").is_none());

        let codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["W101", "W102", "W103", "W103"]);
        assert_eq!(diagnostics[0].path, "/FormTemplate/sections/1/sectionId");
        assert_eq!(diagnostics[1].path, "/SectionTemplate/fieldGroups/1");
        assert_eq!(diagnostics[2].path, "/FieldGroupTemplate/fields/1");
        assert_eq!(diagnostics[3].path, "/SectionTemplate/individualFields/1");
    }

    #[test]
    fn field_referenced_twice_is_reported_once() {
        let schema = raw(json!({
            "FieldGroupTemplate": { "id": "g", "fields": ["x"] },
            "SectionTemplate": { "id": "s", "fieldGroups": ["g"], "individualFields": ["x"] },
            "FormTemplate": { "id": "form", "sections": [{ "sectionId": "s" }] }
        }));
        let (_, diagnostics) = normalize_with_diagnostics(&schema).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DANGLING_FIELD);
    }

    #[test]
    fn normalize_is_idempotent() {
        let input = vitals();
        let first = normalize_with_diagnostics(&input).unwrap();
        let second = normalize_with_diagnostics(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_form_template_is_fatal() {
        let result = normalize(&RawSchema::default());
        assert!(matches!(result, Err(LoadError::MissingFormTemplate)));
    }

    #[test]
    fn empty_form_id_is_fatal() {
        let mut input = vitals();
        input.form_template.as_mut().unwrap().id.clear();
        assert!(matches!(normalize(&input), Err(LoadError::MissingFormId)));
    }

    #[test]
    fn singleton_without_id_is_ignored() {
        let schema = raw(json!({
            "FieldDefinition": { "label": "Anonymous" },
            "FormTemplate": { "id": "form", "sections": [] }
        }));
        let processed = normalize(&schema).unwrap();
        assert!(processed.field_definitions.is_empty());
    }
}
