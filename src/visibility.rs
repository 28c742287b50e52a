//! Visibility resolution for sections, groups and fields.
//!
//! Combines display-rule evaluation with the current values and the
//! normalized tables. Dangling references resolve to
//! [`ElementVisibility::NotFound`] so a renderer can show a placeholder.

use serde::Serialize;
use serde_json::Value;

use crate::paths::{group_path, FieldPath};
use crate::rules::is_visible;
use crate::types::{FieldGroupTemplate, FormErrors, FormValues, ProcessedSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementVisibility {
    Visible,
    Hidden,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Section,
    Group,
    Field,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ElementKind::Section => "section",
            ElementKind::Group => "field group",
            ElementKind::Field => "field",
        })
    }
}

pub fn section_visibility(
    schema: &ProcessedSchema,
    values: &FormValues,
    section_id: &str,
) -> ElementVisibility {
    match schema.section_template(section_id) {
        Some(section) => resolve(is_visible(
            &section.display_rules,
            values,
            &schema.field_definitions,
        )),
        None => ElementVisibility::NotFound,
    }
}

pub fn group_visibility(
    schema: &ProcessedSchema,
    values: &FormValues,
    group_id: &str,
) -> ElementVisibility {
    match schema.field_group_template(group_id) {
        Some(group) => resolve(is_visible(
            &group.display_rules,
            values,
            &schema.field_definitions,
        )),
        None => ElementVisibility::NotFound,
    }
}

pub fn field_visibility(
    schema: &ProcessedSchema,
    values: &FormValues,
    field_id: &str,
) -> ElementVisibility {
    match schema.field_definition(field_id) {
        Some(field) => resolve(is_visible(
            &field.display_rules,
            values,
            &schema.field_definitions,
        )),
        None => ElementVisibility::NotFound,
    }
}

fn resolve(visible: bool) -> ElementVisibility {
    if visible {
        ElementVisibility::Visible
    } else {
        ElementVisibility::Hidden
    }
}

/// What a renderer should draw, in order, for the current values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormOutline {
    pub form_id: String,
    pub name: String,
    pub sections: Vec<OutlineNode>,
}

impl FormOutline {
    /// Visible field nodes, depth first.
    pub fn visible_fields(&self) -> Vec<&OutlineNode> {
        fn walk<'a>(nodes: &'a [OutlineNode], out: &mut Vec<&'a OutlineNode>) {
            for node in nodes {
                match node {
                    OutlineNode::Field { .. } => out.push(node),
                    OutlineNode::Section { children, .. } | OutlineNode::Group { children, .. } => {
                        walk(children, out);
                    }
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.sections, &mut out);
        out
    }

    /// Placeholders for dangling references, depth first.
    pub fn missing(&self) -> Vec<&OutlineNode> {
        fn walk<'a>(nodes: &'a [OutlineNode], out: &mut Vec<&'a OutlineNode>) {
            for node in nodes {
                match node {
                    OutlineNode::NotFound { .. } => out.push(node),
                    OutlineNode::Section { children, .. } | OutlineNode::Group { children, .. } => {
                        walk(children, out);
                    }
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.sections, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlineNode {
    Section {
        id: String,
        name: String,
        required: bool,
        children: Vec<OutlineNode>,
    },
    Group {
        id: String,
        name: String,
        path: String,
        repeatable: bool,
        /// Always 1: only the implicit first instance exists.
        instances: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_instances: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_instances: Option<u32>,
        children: Vec<OutlineNode>,
    },
    Field {
        id: String,
        label: String,
        path: String,
        data_type: String,
        required: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        errors: Vec<String>,
    },
    Hidden {
        element: ElementKind,
        id: String,
    },
    NotFound {
        element: ElementKind,
        id: String,
        path: String,
    },
}

/// Build the render outline: sections in declaration order, each with its
/// groups before its direct fields. Hidden elements are pruned to a marker.
pub fn outline(schema: &ProcessedSchema, values: &FormValues, errors: &FormErrors) -> FormOutline {
    let form = &schema.form_template;
    let sections = form
        .sections
        .iter()
        .map(|link| {
            let id = link.section_id.clone();
            let Some(section) = schema.section_template(&link.section_id) else {
                return OutlineNode::NotFound {
                    element: ElementKind::Section,
                    path: id.clone(),
                    id,
                };
            };
            if section_visibility(schema, values, &section.id) == ElementVisibility::Hidden {
                return OutlineNode::Hidden {
                    element: ElementKind::Section,
                    id,
                };
            }

            let mut children: Vec<_> = section
                .field_groups
                .iter()
                .map(|group_id| group_node(schema, values, errors, &section.id, group_id))
                .collect();
            children.extend(section.individual_fields.iter().map(|field_id| {
                let path = FieldPath::Section {
                    section: &section.id,
                    field: field_id,
                }
                .to_string();
                field_node(schema, values, errors, field_id, path)
            }));

            OutlineNode::Section {
                id,
                name: section.name.clone(),
                required: link.required,
                children,
            }
        })
        .collect();

    FormOutline {
        form_id: form.id.clone(),
        name: form.name.clone(),
        sections,
    }
}

fn group_node(
    schema: &ProcessedSchema,
    values: &FormValues,
    errors: &FormErrors,
    section_id: &str,
    group_id: &str,
) -> OutlineNode {
    let path = group_path(section_id, group_id);
    let Some(group) = schema.field_group_template(group_id) else {
        return OutlineNode::NotFound {
            element: ElementKind::Group,
            id: group_id.to_string(),
            path,
        };
    };
    if group_visibility(schema, values, group_id) == ElementVisibility::Hidden {
        return OutlineNode::Hidden {
            element: ElementKind::Group,
            id: group_id.to_string(),
        };
    }

    OutlineNode::Group {
        id: group.id.clone(),
        name: group.name.clone(),
        path,
        repeatable: group.repeatable,
        instances: 1,
        min_instances: group.min_instances,
        max_instances: group.max_instances,
        children: group_fields(schema, values, errors, section_id, group),
    }
}

fn group_fields(
    schema: &ProcessedSchema,
    values: &FormValues,
    errors: &FormErrors,
    section_id: &str,
    group: &FieldGroupTemplate,
) -> Vec<OutlineNode> {
    group
        .fields
        .iter()
        .map(|field_id| {
            let path = FieldPath::in_group(section_id, group, field_id).to_string();
            field_node(schema, values, errors, field_id, path)
        })
        .collect()
}

fn field_node(
    schema: &ProcessedSchema,
    values: &FormValues,
    errors: &FormErrors,
    field_id: &str,
    path: String,
) -> OutlineNode {
    let Some(field) = schema.field_definition(field_id) else {
        return OutlineNode::NotFound {
            element: ElementKind::Field,
            id: field_id.to_string(),
            path,
        };
    };
    if field_visibility(schema, values, field_id) == ElementVisibility::Hidden {
        return OutlineNode::Hidden {
            element: ElementKind::Field,
            id: field_id.to_string(),
        };
    }

    let value = values
        .get(&path)
        .or(field.default_value.as_ref())
        .cloned();

    OutlineNode::Field {
        id: field.id.clone(),
        label: field.display_label().to_string(),
        data_type: field.data_type.to_string(),
        required: field.required,
        value,
        errors: errors.get(&path).cloned().unwrap_or_default(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_schema;
    use crate::normalizer::normalize;
    use serde_json::json;

    fn schema() -> ProcessedSchema {
        let raw = parse_schema(json!({
            "FieldDefinition": {
                "id": "pregnant",
                "label": "Pregnant",
                "dataType": "select",
                "displayRules": [
                    { "condition": { "field": "sex", "operator": "equals", "value": "male" }, "visible": false }
                ]
            },
            "FieldGroupTemplate": {
                "id": "reproductive",
                "name": "Reproductive",
                "repeatable": true,
                "minInstances": 1,
                "maxInstances": 3,
                "fields": ["pregnant", "lmp"]
            },
            "SectionTemplate": {
                "id": "history",
                "name": "History",
                "fieldGroups": ["reproductive", "surgical"],
                "individualFields": ["pregnant"],
                "displayRules": [
                    { "condition": { "field": "consent", "operator": "equals", "value": false }, "visible": false }
                ]
            },
            "FormTemplate": {
                "id": "intake",
                "name": "Intake",
                "sections": [
                    { "sectionId": "history", "displayOrder": 1, "required": true },
                    { "sectionId": "labs", "displayOrder": 2, "required": false }
                ]
            }
        }))
        .unwrap();
        normalize(&raw).unwrap()
    }

    fn values(pairs: &[(&str, Value)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn element_visibility_lookups() {
        let schema = schema();
        let male = values(&[("sex", json!("male"))]);

        assert_eq!(
            field_visibility(&schema, &male, "pregnant"),
            ElementVisibility::Hidden
        );
        assert_eq!(
            field_visibility(&schema, &FormValues::new(), "pregnant"),
            ElementVisibility::Visible
        );
        assert_eq!(
            field_visibility(&schema, &male, "lmp"),
            ElementVisibility::NotFound
        );
        assert_eq!(
            group_visibility(&schema, &male, "surgical"),
            ElementVisibility::NotFound
        );
        assert_eq!(
            section_visibility(&schema, &male, "labs"),
            ElementVisibility::NotFound
        );
    }

    #[test]
    fn outline_marks_dangling_references() {
        let schema = schema();
        let outline = outline(&schema, &FormValues::new(), &FormErrors::new());

        assert_eq!(outline.form_id, "intake");
        let missing: Vec<_> = outline
            .missing()
            .into_iter()
            .map(|node| match node {
                OutlineNode::NotFound { element, path, .. } => (*element, path.as_str()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            missing,
            vec![
                (ElementKind::Field, "history.reproductive[0].lmp"),
                (ElementKind::Group, "history.surgical"),
                (ElementKind::Section, "labs"),
            ]
        );
    }

    #[test]
    fn outline_orders_groups_before_direct_fields() {
        let schema = schema();
        let outline = outline(&schema, &FormValues::new(), &FormErrors::new());

        let paths: Vec<_> = outline
            .visible_fields()
            .into_iter()
            .map(|node| match node {
                OutlineNode::Field { path, .. } => path.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(paths, vec!["history.reproductive[0].pregnant", "history.pregnant"]);
    }

    #[test]
    fn outline_prunes_hidden_elements() {
        let schema = schema();
        let no_consent = values(&[("consent", json!(false))]);
        let outline = outline(&schema, &no_consent, &FormErrors::new());

        assert_eq!(
            outline.sections[0],
            OutlineNode::Hidden {
                element: ElementKind::Section,
                id: "history".into()
            }
        );
        assert!(outline.visible_fields().is_empty());
    }

    #[test]
    fn outline_reports_repeatable_group_bounds() {
        let schema = schema();
        let outline = outline(&schema, &FormValues::new(), &FormErrors::new());
        let OutlineNode::Section { children, .. } = &outline.sections[0] else {
            panic!("expected visible section");
        };
        match &children[0] {
            OutlineNode::Group {
                repeatable,
                instances,
                min_instances,
                max_instances,
                ..
            } => {
                assert!(*repeatable);
                assert_eq!(*instances, 1);
                assert_eq!(*min_instances, Some(1));
                assert_eq!(*max_instances, Some(3));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn outline_fields_carry_values_and_errors() {
        let schema = schema();
        let vals = values(&[("history.pregnant", json!("no"))]);
        let mut errors = FormErrors::new();
        errors.insert("history.pregnant".into(), vec!["Pick one".into()]);

        let outline = outline(&schema, &vals, &errors);
        let fields = outline.visible_fields();
        match fields[1] {
            OutlineNode::Field { value, errors, .. } => {
                assert_eq!(value, &Some(json!("no")));
                assert_eq!(errors, &vec!["Pick one".to_string()]);
            }
            _ => unreachable!(),
        }
    }
}
