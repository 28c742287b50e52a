//! Per-type input handling: raw text from an input widget to a stored
//! value, and a stored value back to widget text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

use crate::error::EditError;
use crate::rules::parse_float_prefix;
use crate::types::DataType;

static INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+").expect("integer prefix pattern is valid"));

impl DataType {
    /// Turn widget text into the value stored for this type.
    ///
    /// Numeric types keep the leading number of the text; text with no
    /// leading number is stored as `""` so a `required` rule still fires.
    ///
    /// # Errors
    ///
    /// Returns `EditError::UnsupportedDataType` for unknown types and
    /// `EditError::InvalidInput` for unrecognized boolean text.
    pub fn parse_input(&self, raw: &str) -> Result<Value, EditError> {
        match self {
            DataType::String | DataType::Textarea | DataType::Select | DataType::Date => {
                Ok(Value::String(raw.to_string()))
            }
            DataType::Integer => Ok(parse_integer(raw).unwrap_or_else(blank)),
            DataType::Decimal => Ok(parse_float_prefix(raw)
                .and_then(Number::from_f64)
                .map_or_else(blank, Value::Number)),
            DataType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "" => Ok(blank()),
                "true" | "on" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(EditError::InvalidInput {
                    data_type: self.to_string(),
                    input: raw.to_string(),
                }),
            },
            DataType::Unsupported(name) => Err(EditError::UnsupportedDataType {
                data_type: name.clone(),
                path: String::new(),
            }),
        }
    }

    /// Widget text for a stored value; absent and `null` show as empty.
    pub fn format_value(&self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            // Date inputs take YYYY-MM-DD; drop the time of an ISO timestamp
            Some(Value::String(s)) if *self == DataType::Date => {
                s.split_once('T').map_or(s.as_str(), |(date, _)| date).to_string()
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn blank() -> Value {
    Value::String(String::new())
}

fn parse_integer(raw: &str) -> Option<Value> {
    let digits = INTEGER_PREFIX.find(raw.trim_start())?.as_str();
    match digits.parse::<i64>() {
        Ok(n) => Some(Value::from(n)),
        // Too large for i64; keep the magnitude as a float
        Err(_) => digits.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number),
    }
}
