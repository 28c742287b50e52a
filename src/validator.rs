//! Field validation against declarative rules.

use regex::Regex;
use serde_json::Value;

use crate::rules::{is_blank, parse_float};
use crate::types::{FieldDefinition, RuleKind, ValidationRule};

/// Validate a candidate value against a field's validation rules.
///
/// Returns one message per violated rule, in declaration order; an empty
/// list means the value is valid. Unknown rule types are logged and skipped.
///
/// `pattern` rules only apply to text: non-string values are exempt.
pub fn validate_field(field: &FieldDefinition, value: Option<&Value>) -> Vec<String> {
    let mut errors = Vec::new();

    for rule in &field.validation_rules {
        let violated = match rule.kind() {
            Some(RuleKind::Required) => is_blank(value),
            Some(RuleKind::Range) => match parse_float(value) {
                Some(number) => {
                    rule.min.is_some_and(|min| number < min)
                        || rule.max.is_some_and(|max| number > max)
                }
                None => {
                    if !is_blank(value) {
                        errors.push(non_numeric_message(field, rule));
                    }
                    false
                }
            },
            Some(RuleKind::Pattern) => violates_pattern(field, rule, value),
            None => {
                tracing::warn!(
                    rule_type = %rule.rule_type,
                    field = %field.id,
                    "unsupported validation rule type"
                );
                false
            }
        };

        if violated {
            errors.push(violation_message(field, rule));
        }
    }

    errors
}

fn violates_pattern(field: &FieldDefinition, rule: &ValidationRule, value: Option<&Value>) -> bool {
    let (Some(text), Some(pattern)) = (
        value.and_then(Value::as_str),
        rule.pattern.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return false;
    };

    match Regex::new(pattern) {
        Ok(regex) => !regex.is_match(text),
        Err(err) => {
            tracing::warn!(field = %field.id, %pattern, error = %err, "invalid validation pattern");
            false
        }
    }
}

fn non_numeric_message(field: &FieldDefinition, rule: &ValidationRule) -> String {
    if rule.message.is_empty() {
        format!(
            "{} is not a valid number for range check.",
            field.display_label()
        )
    } else {
        rule.message.clone()
    }
}

fn violation_message(field: &FieldDefinition, rule: &ValidationRule) -> String {
    if rule.message.is_empty() {
        format!(
            "Validation failed for {} ({})",
            field.display_label(),
            rule.rule_type
        )
    } else {
        rule.message.clone()
    }
}
