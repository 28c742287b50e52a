//! Display-rule evaluation against a flat value snapshot.
//!
//! Conditions compare permissively: equality coerces mixed scalar types and
//! the relational operators compare numerically. Anything the evaluator does
//! not understand evaluates to `false` and is logged.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::{Condition, DisplayRule, FieldTable, FormValues, Operator};

/// Leading float literal, as accepted by lenient number parsing.
static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("float prefix pattern is valid")
});

/// Evaluate a single condition.
///
/// The condition's `field` is used as a bare key into `values`; it is not
/// resolved relative to the element being evaluated.
pub fn evaluate_condition(condition: &Condition, values: &FormValues, fields: &FieldTable) -> bool {
    let Some(target) = condition.field.as_deref().filter(|f| !f.is_empty()) else {
        if condition.patient_age.is_some() {
            tracing::warn!("patient age conditions are not supported");
        } else if condition.study_event.is_some() {
            tracing::warn!("study event conditions are not supported");
        } else {
            tracing::warn!(?condition, "condition has no target field");
        }
        return false;
    };

    let Some(operator) = Operator::parse(&condition.operator) else {
        tracing::warn!(operator = %condition.operator, field = %target, "unsupported condition operator");
        return false;
    };

    if !fields.contains_key(target) && !values.contains_key(target) {
        tracing::trace!(field = %target, "condition target has no definition or value");
    }

    compare(operator, values.get(target), condition.value.as_ref())
}

/// Decide whether an element with these display rules is shown.
///
/// The first rule whose condition holds decides; with no match (or no
/// rules) the element is visible.
pub fn is_visible(rules: &[DisplayRule], values: &FormValues, fields: &FieldTable) -> bool {
    rules
        .iter()
        .find(|rule| evaluate_condition(&rule.condition, values, fields))
        .map_or(true, |rule| rule.visible)
}

/// A missing `expected` behaves like an undefined operand: it equals only an
/// absent or null value and is NaN for the relational operators.
fn compare(operator: Operator, actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match operator {
        Operator::Equals => loose_eq(actual, expected),
        Operator::NotEquals => !loose_eq(actual, expected),
        Operator::Exists => !is_blank(actual),
        Operator::GreaterOrEqual => to_number(actual) >= to_number(expected),
        Operator::LessOrEqual => to_number(actual) <= to_number(expected),
        Operator::Greater => to_number(actual) > to_number(expected),
        Operator::Less => to_number(actual) < to_number(expected),
    }
}

/// True for an absent value, `null`, or the empty string.
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Coercing equality. Absent and `null` only equal each other; mixed scalar
/// types are compared as numbers.
pub(crate) fn loose_eq(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    let expected = expected.unwrap_or(&Value::Null);
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (
            Value::String(_) | Value::Number(_) | Value::Bool(_),
            Value::String(_) | Value::Number(_) | Value::Bool(_),
        ) => to_number(Some(actual)) == to_number(Some(expected)),
        _ => false,
    }
}

/// Numeric coercion of a whole value. NaN when the value is not numeric.
pub(crate) fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => string_to_number(s),
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }

    // Rust's float grammar also accepts "inf" and "nan"; reject letters up front
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return f64::NAN;
    }

    s.parse().unwrap_or(f64::NAN)
}

/// Lenient float parsing: the longest numeric prefix of the text.
///
/// Numbers pass through; booleans, `null` and non-numeric text yield `None`.
pub(crate) fn parse_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

pub(crate) fn parse_float_prefix(s: &str) -> Option<f64> {
    let literal = FLOAT_PREFIX.find(s.trim_start())?.as_str();
    match literal.trim_start_matches(['+', '-']) {
        "Infinity" if literal.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ => literal.parse().ok(),
    }
}
