//! Literal values carried by `NonNullLiteral` nodes

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{DataType, IrError};

/// A literal value. Always paired with an explicit [`DataType`] when it enters the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(#[serde(with = "float_repr")] OrderedFloat<f64>),
    Decimal(String), // Canonical decimal text, e.g. "-12.50"
    String(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Json(String), // Compact serialized JSON
    Array(Vec<Value>),
}

impl Value {
    pub fn float(value: f64) -> Self {
        Value::Float(OrderedFloat(value))
    }

    /// Store a JSON document in its compact serialized form.
    pub fn json(document: &serde_json::Value) -> Self {
        Value::Json(document.to_string())
    }

    /// Parse and normalize JSON text.
    pub fn json_str(text: &str) -> Result<Self, IrError> {
        let document: serde_json::Value =
            serde_json::from_str(text).map_err(|_| IrError::InvalidLiteral {
                value: Value::String(text.to_string()),
                dtype: DataType::Json,
            })?;
        Ok(Self::json(&document))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value can be represented as `dtype`.
    pub fn conforms_to(&self, dtype: &DataType) -> bool {
        match (self, dtype) {
            (Value::Null, _) => true,
            (Value::Boolean(_), DataType::Boolean) => true,
            (Value::Int(v), t) if t.is_integer() => in_bounds(i128::from(*v), t),
            (Value::UInt(v), t) if t.is_integer() => in_bounds(i128::from(*v), t),
            (Value::Int(_) | Value::UInt(_), t) if t.is_floating() || t.is_decimal() => true,
            (Value::Int(_), DataType::Interval { .. }) => true,
            (Value::Float(_), t) if t.is_floating() || t.is_decimal() => true,
            (Value::Decimal(text), DataType::Decimal { precision, scale }) => {
                decimal_fits(text, *precision, *scale)
            }
            (Value::String(_), DataType::String | DataType::Uuid) => true,
            (Value::Binary(_), DataType::Binary) => true,
            (Value::Date(_), DataType::Date) => true,
            (Value::Time(_), DataType::Time) => true,
            (Value::Timestamp(_), DataType::Timestamp { .. }) => true,
            (Value::Json(text), DataType::Json) => is_canonical_json(text),
            (Value::Array(items), DataType::Array(inner)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            _ => false,
        }
    }
}

/// JSON numbers cannot carry non-finite floats, so those travel as their names.
mod float_repr {
    use super::*;
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Name(String),
    }

    pub fn serialize<S>(value: &OrderedFloat<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = value.0;
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value == f64::INFINITY {
            serializer.serialize_str("Infinity")
        } else if value == f64::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(value)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OrderedFloat<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(OrderedFloat(value)),
            Repr::Name(name) => match name.as_str() {
                "NaN" => Ok(OrderedFloat(f64::NAN)),
                "Infinity" => Ok(OrderedFloat(f64::INFINITY)),
                "-Infinity" => Ok(OrderedFloat(f64::NEG_INFINITY)),
                other => Err(D::Error::custom(format!("invalid float literal: {}", other))),
            },
        }
    }
}

/// Valid JSON already in its compact serialized form.
fn is_canonical_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|document| document.to_string() == text)
        .unwrap_or(false)
}

fn in_bounds(value: i128, dtype: &DataType) -> bool {
    dtype
        .integer_bounds()
        .map(|(min, max)| (min..=max).contains(&value))
        .unwrap_or(false)
}

fn decimal_fits(text: &str, precision: u8, scale: u8) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (integral, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let well_formed = !integral.is_empty()
        && integral.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return false;
    }

    let integral_digits = integral.trim_start_matches('0').len();
    fraction.len() <= usize::from(scale)
        && integral_digits <= usize::from(precision.saturating_sub(scale))
}
