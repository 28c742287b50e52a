//! Structural paths and schema traversal.
//!
//! A path addresses one value slot:
//!
//! | Slot | Path |
//! |------|------|
//! | field directly in a section | `section.field` |
//! | field in a group | `section.group.field` |
//! | field in a repeatable group | `section.group[0].field` |
//!
//! Repeatable groups only ever expose their first instance.

use std::fmt;

use crate::types::{FieldDefinition, FieldGroupTemplate, FormValues, ProcessedSchema};

/// The one instance index repeatable groups are addressed at.
pub const IMPLICIT_INSTANCE: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath<'a> {
    Section {
        section: &'a str,
        field: &'a str,
    },
    Group {
        section: &'a str,
        group: &'a str,
        field: &'a str,
    },
    Instance {
        section: &'a str,
        group: &'a str,
        index: usize,
        field: &'a str,
    },
}

impl<'a> FieldPath<'a> {
    /// Path of a field inside a group, honoring the group's repeatable flag.
    pub fn in_group(section: &'a str, group: &'a FieldGroupTemplate, field: &'a str) -> Self {
        if group.repeatable {
            FieldPath::Instance {
                section,
                group: &group.id,
                index: IMPLICIT_INSTANCE,
                field,
            }
        } else {
            FieldPath::Group {
                section,
                group: &group.id,
                field,
            }
        }
    }
}

impl fmt::Display for FieldPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Section { section, field } => write!(f, "{section}.{field}"),
            FieldPath::Group {
                section,
                group,
                field,
            } => write!(f, "{section}.{group}.{field}"),
            FieldPath::Instance {
                section,
                group,
                index,
                field,
            } => write!(f, "{section}.{group}[{index}].{field}"),
        }
    }
}

/// Path prefix of a group's fields.
pub fn group_path(section: &str, group: &str) -> String {
    format!("{section}.{group}")
}

/// A value slot reachable from the form template.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot<'a> {
    pub path: String,
    pub section_id: &'a str,
    pub group_id: Option<&'a str>,
    pub field_id: &'a str,
    /// `None` when the field reference is dangling.
    pub definition: Option<&'a FieldDefinition>,
}

/// Every slot reachable from the form template: for each resolved section,
/// its direct fields, then the fields of its resolved groups.
pub fn field_slots(schema: &ProcessedSchema) -> Vec<FieldSlot<'_>> {
    let mut slots = Vec::new();

    for link in &schema.form_template.sections {
        let Some(section) = schema.section_template(&link.section_id) else {
            continue;
        };

        for field_id in &section.individual_fields {
            slots.push(FieldSlot {
                path: FieldPath::Section {
                    section: &section.id,
                    field: field_id,
                }
                .to_string(),
                section_id: &section.id,
                group_id: None,
                field_id,
                definition: schema.field_definition(field_id),
            });
        }

        for group_id in &section.field_groups {
            let Some(group) = schema.field_group_template(group_id) else {
                continue;
            };
            for field_id in &group.fields {
                slots.push(FieldSlot {
                    path: FieldPath::in_group(&section.id, group, field_id).to_string(),
                    section_id: &section.id,
                    group_id: Some(&group.id),
                    field_id,
                    definition: schema.field_definition(field_id),
                });
            }
        }
    }

    slots
}

/// Look up the slot a path addresses.
pub fn find_slot<'a>(schema: &'a ProcessedSchema, path: &str) -> Option<FieldSlot<'a>> {
    field_slots(schema).into_iter().find(|slot| slot.path == path)
}

/// Initial values from field defaults, keyed by slot path.
pub fn default_values(schema: &ProcessedSchema) -> FormValues {
    field_slots(schema)
        .into_iter()
        .filter_map(|slot| {
            let default = slot.definition?.default_value.as_ref()?;
            (!default.is_null()).then(|| (slot.path, default.clone()))
        })
        .collect()
}
