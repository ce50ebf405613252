//! Type system for Quarry IR

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::IrError;

/// Widest decimal precision any dialect accepts.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Primitives
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },

    // Text
    String,

    // Binary
    Binary,

    // Temporal
    Date,
    Time,
    Timestamp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },
    Interval { unit: TemporalUnit },

    // Semi-structured
    Json,
    Uuid,

    // Complex
    Array(Box<DataType>),
    Struct(Vec<FieldType>),
    Map { key: Box<DataType>, value: Box<DataType> },

    // Special
    Null,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldType>,
}

impl Schema {
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    /// Build a schema from `(name, type)` pairs, all nullable.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, dtype)| FieldType::new(name, dtype))
                .collect(),
        }
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Calendar and clock units shared by truncation and interval construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TemporalUnit {
    pub const ALL: [TemporalUnit; 11] = [
        TemporalUnit::Year,
        TemporalUnit::Quarter,
        TemporalUnit::Month,
        TemporalUnit::Week,
        TemporalUnit::Day,
        TemporalUnit::Hour,
        TemporalUnit::Minute,
        TemporalUnit::Second,
        TemporalUnit::Millisecond,
        TemporalUnit::Microsecond,
        TemporalUnit::Nanosecond,
    ];

    /// Short code (`Y`, `Q`, `M`, `W`, `D`, `h`, `m`, `s`, `ms`, `us`, `ns`).
    pub fn short(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "Y",
            TemporalUnit::Quarter => "Q",
            TemporalUnit::Month => "M",
            TemporalUnit::Week => "W",
            TemporalUnit::Day => "D",
            TemporalUnit::Hour => "h",
            TemporalUnit::Minute => "m",
            TemporalUnit::Second => "s",
            TemporalUnit::Millisecond => "ms",
            TemporalUnit::Microsecond => "us",
            TemporalUnit::Nanosecond => "ns",
        }
    }

    pub fn from_short(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.short() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Quarter => "quarter",
            TemporalUnit::Month => "month",
            TemporalUnit::Week => "week",
            TemporalUnit::Day => "day",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second => "second",
            TemporalUnit::Millisecond => "millisecond",
            TemporalUnit::Microsecond => "microsecond",
            TemporalUnit::Nanosecond => "nanosecond",
        }
    }

    /// Units that make sense for a calendar date.
    pub fn is_date_unit(&self) -> bool {
        matches!(
            self,
            TemporalUnit::Year
                | TemporalUnit::Quarter
                | TemporalUnit::Month
                | TemporalUnit::Week
                | TemporalUnit::Day
        )
    }

    /// Units that make sense for a time of day.
    pub fn is_time_unit(&self) -> bool {
        !self.is_date_unit()
    }
}

impl fmt::Display for TemporalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DataType {
    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Boolean)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, DataType::Decimal { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || self.is_decimal()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, DataType::Binary)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, DataType::Date)
    }

    pub fn is_time(&self) -> bool {
        matches!(self, DataType::Time)
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self, DataType::Timestamp { .. })
    }

    pub fn is_temporal(&self) -> bool {
        self.is_date() || self.is_time() || self.is_timestamp()
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, DataType::Interval { .. })
    }

    pub fn is_json(&self) -> bool {
        matches!(self, DataType::Json)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    /// Bit width of an integer type.
    pub fn integer_width(&self) -> Option<u8> {
        match self {
            DataType::Int8 | DataType::UInt8 => Some(8),
            DataType::Int16 | DataType::UInt16 => Some(16),
            DataType::Int32 | DataType::UInt32 => Some(32),
            DataType::Int64 | DataType::UInt64 => Some(64),
            _ => None,
        }
    }

    /// Inclusive value range of an integer type.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        let width = self.integer_width()?;
        if self.is_signed_integer() {
            let max = (1i128 << (width - 1)) - 1;
            Some((-max - 1, max))
        } else {
            Some((0, (1i128 << width) - 1))
        }
    }

    /// Decimal digits needed to hold every value of an integer type.
    fn integer_digits(&self) -> Option<u8> {
        match self {
            DataType::Int8 | DataType::UInt8 => Some(3),
            DataType::Int16 | DataType::UInt16 => Some(5),
            DataType::Int32 | DataType::UInt32 => Some(10),
            DataType::Int64 => Some(19),
            DataType::UInt64 => Some(20),
            _ => None,
        }
    }

    fn integer_of(signed: bool, width: u8) -> Option<DataType> {
        match (signed, width) {
            (true, 8) => Some(DataType::Int8),
            (true, 16) => Some(DataType::Int16),
            (true, 32) => Some(DataType::Int32),
            (true, 64) => Some(DataType::Int64),
            (false, 8) => Some(DataType::UInt8),
            (false, 16) => Some(DataType::UInt16),
            (false, 32) => Some(DataType::UInt32),
            (false, 64) => Some(DataType::UInt64),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => f.write_str("boolean"),
            DataType::Int8 => f.write_str("int8"),
            DataType::Int16 => f.write_str("int16"),
            DataType::Int32 => f.write_str("int32"),
            DataType::Int64 => f.write_str("int64"),
            DataType::UInt8 => f.write_str("uint8"),
            DataType::UInt16 => f.write_str("uint16"),
            DataType::UInt32 => f.write_str("uint32"),
            DataType::UInt64 => f.write_str("uint64"),
            DataType::Float32 => f.write_str("float32"),
            DataType::Float64 => f.write_str("float64"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({}, {})", precision, scale),
            DataType::String => f.write_str("string"),
            DataType::Binary => f.write_str("binary"),
            DataType::Date => f.write_str("date"),
            DataType::Time => f.write_str("time"),
            DataType::Timestamp { timezone: None } => f.write_str("timestamp"),
            DataType::Timestamp { timezone: Some(tz) } => write!(f, "timestamp('{}')", tz),
            DataType::Interval { unit } => write!(f, "interval('{}')", unit.short()),
            DataType::Json => f.write_str("json"),
            DataType::Uuid => f.write_str("uuid"),
            DataType::Array(inner) => write!(f, "array<{}>", inner),
            DataType::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
            DataType::Map { key, value } => write!(f, "map<{}, {}>", key, value),
            DataType::Null => f.write_str("null"),
            DataType::Unknown => f.write_str("unknown"),
        }
    }
}

/// Least upper bound of two types.
///
/// Fails with [`IrError::TypeMismatch`] when no common supertype exists; a string and an
/// integer never unify without an explicit cast.
pub fn promote(left: &DataType, right: &DataType) -> Result<DataType, IrError> {
    use DataType::*;

    if left == right {
        return Ok(left.clone());
    }

    let mismatch = || IrError::TypeMismatch {
        context: "promotion".to_string(),
        left: left.clone(),
        right: right.clone(),
    };

    match (left, right) {
        (Null, other) | (other, Null) => Ok(other.clone()),

        (a, b) if a.is_integer() && b.is_integer() => Ok(promote_integers(a, b)),

        (int, float) | (float, int) if int.is_integer() && float.is_floating() => {
            let wide_int = int.integer_width().unwrap_or(64) >= 32;
            if wide_int || *float == Float64 {
                Ok(Float64)
            } else {
                Ok(Float32)
            }
        }

        (Float32, Float64) | (Float64, Float32) => Ok(Float64),

        (Decimal { precision, scale }, int) | (int, Decimal { precision, scale })
            if int.is_integer() =>
        {
            let digits = int.integer_digits().unwrap_or(MAX_DECIMAL_PRECISION);
            let integral = precision.saturating_sub(*scale).max(digits);
            Ok(Decimal {
                precision: integral.saturating_add(*scale).min(MAX_DECIMAL_PRECISION),
                scale: *scale,
            })
        }

        (Decimal { .. }, float) | (float, Decimal { .. }) if float.is_floating() => Ok(Float64),

        (
            Decimal {
                precision: p1,
                scale: s1,
            },
            Decimal {
                precision: p2,
                scale: s2,
            },
        ) => {
            let scale = *s1.max(s2);
            let integral = p1.saturating_sub(*s1).max(p2.saturating_sub(*s2));
            Ok(Decimal {
                precision: integral.saturating_add(scale).min(MAX_DECIMAL_PRECISION),
                scale,
            })
        }

        (Date, Timestamp { timezone }) | (Timestamp { timezone }, Date) => Ok(Timestamp {
            timezone: timezone.clone(),
        }),

        (Array(a), Array(b)) => Ok(Array(Box::new(promote(a, b)?))),

        (
            Map {
                key: k1,
                value: v1,
            },
            Map {
                key: k2,
                value: v2,
            },
        ) => Ok(Map {
            key: Box::new(promote(k1, k2)?),
            value: Box::new(promote(v1, v2)?),
        }),

        (Struct(a), Struct(b)) if a.len() == b.len() => {
            let fields = a
                .iter()
                .zip(b)
                .map(|(fa, fb)| {
                    if fa.name != fb.name {
                        return Err(mismatch());
                    }
                    Ok(FieldType {
                        name: fa.name.clone(),
                        data_type: promote(&fa.data_type, &fb.data_type)?,
                        nullable: fa.nullable || fb.nullable,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Struct(fields))
        }

        _ => Err(mismatch()),
    }
}

fn promote_integers(a: &DataType, b: &DataType) -> DataType {
    let (wa, wb) = (a.integer_width().unwrap_or(64), b.integer_width().unwrap_or(64));

    if a.is_signed_integer() == b.is_signed_integer() {
        return if wa >= wb { a.clone() } else { b.clone() };
    }

    let (signed_width, unsigned_width) = if a.is_signed_integer() {
        (wa, wb)
    } else {
        (wb, wa)
    };

    // A signed type must be strictly wider than the unsigned one to hold all its values.
    let needed = signed_width.max(unsigned_width.saturating_mul(2));
    DataType::integer_of(true, needed).unwrap_or(DataType::Float64)
}

/// Whether an explicit cast from `from` to `to` is allowed.
pub fn castable(from: &DataType, to: &DataType) -> bool {
    use DataType::*;

    if from == to {
        return true;
    }

    match (from, to) {
        (Null, _) => true,
        (_, String) => !matches!(from, Unknown),
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (Boolean, b) if b.is_integer() => true,
        (a, Boolean) if a.is_integer() || a.is_string() => true,
        (String, b) => {
            b.is_numeric() || b.is_temporal() || matches!(b, Json | Uuid | Binary | Interval { .. })
        }
        (Binary, String) => true,
        (Date, Timestamp { .. }) | (Timestamp { .. }, Date) | (Timestamp { .. }, Time) => true,
        (Timestamp { .. }, Timestamp { .. }) => true,
        (Interval { .. }, Interval { .. }) => true,
        (a, Interval { .. }) if a.is_integer() => true,
        (Json, b) if b.is_numeric() || b.is_boolean() => true,
        (Array(a), Array(b)) => castable(a, b),
        (
            Map {
                key: k1,
                value: v1,
            },
            Map {
                key: k2,
                value: v2,
            },
        ) => castable(k1, k2) && castable(v1, v2),
        (Struct(a), Struct(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(fa, fb)| castable(&fa.data_type, &fb.data_type))
        }
        _ => false,
    }
}

/// Two types are comparable when they promote to a common supertype.
pub fn comparable(left: &DataType, right: &DataType) -> bool {
    promote(left, right).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_identity_and_null() {
        assert_eq!(promote(&DataType::String, &DataType::String).unwrap(), DataType::String);
        assert_eq!(promote(&DataType::Null, &DataType::Int32).unwrap(), DataType::Int32);
        assert_eq!(promote(&DataType::Date, &DataType::Null).unwrap(), DataType::Date);
    }

    #[test]
    fn test_promote_integers() {
        assert_eq!(promote(&DataType::Int8, &DataType::Int32).unwrap(), DataType::Int32);
        assert_eq!(promote(&DataType::UInt8, &DataType::UInt16).unwrap(), DataType::UInt16);
        assert_eq!(promote(&DataType::Int8, &DataType::UInt8).unwrap(), DataType::Int16);
        assert_eq!(promote(&DataType::UInt32, &DataType::Int64).unwrap(), DataType::Int64);
        assert_eq!(promote(&DataType::Int64, &DataType::UInt64).unwrap(), DataType::Float64);
    }

    #[test]
    fn test_promote_mixed_numeric() {
        assert_eq!(promote(&DataType::Int8, &DataType::Float32).unwrap(), DataType::Float32);
        assert_eq!(promote(&DataType::Int32, &DataType::Float32).unwrap(), DataType::Float64);
        assert_eq!(
            promote(
                &DataType::Decimal { precision: 5, scale: 2 },
                &DataType::Int32
            )
            .unwrap(),
            DataType::Decimal { precision: 12, scale: 2 }
        );
        assert_eq!(
            promote(
                &DataType::Decimal { precision: 10, scale: 2 },
                &DataType::Decimal { precision: 6, scale: 4 }
            )
            .unwrap(),
            DataType::Decimal { precision: 12, scale: 4 }
        );
    }

    #[test]
    fn test_promote_rejects_string_and_integer() {
        let err = promote(&DataType::String, &DataType::Int32).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_promote_temporal_and_containers() {
        assert_eq!(
            promote(&DataType::Date, &DataType::Timestamp { timezone: None }).unwrap(),
            DataType::Timestamp { timezone: None }
        );
        assert_eq!(
            promote(
                &DataType::Array(Box::new(DataType::Int8)),
                &DataType::Array(Box::new(DataType::Int64))
            )
            .unwrap(),
            DataType::Array(Box::new(DataType::Int64))
        );
        assert!(promote(
            &DataType::Timestamp { timezone: Some("UTC".into()) },
            &DataType::Timestamp { timezone: None }
        )
        .is_err());
    }

    #[test]
    fn test_castable() {
        assert!(castable(&DataType::Null, &DataType::String));
        assert!(castable(&DataType::Int64, &DataType::Boolean));
        assert!(castable(&DataType::String, &DataType::Date));
        assert!(castable(&DataType::Timestamp { timezone: None }, &DataType::Date));
        assert!(!castable(&DataType::Date, &DataType::Int32));
        assert!(!castable(&DataType::Binary, &DataType::Json));
    }

    #[test]
    fn test_temporal_unit_codes() {
        for unit in TemporalUnit::ALL {
            assert_eq!(TemporalUnit::from_short(unit.short()), Some(unit));
        }
        assert!(TemporalUnit::Week.is_date_unit());
        assert!(TemporalUnit::Millisecond.is_time_unit());
    }
}
