//! Literal encoding
//!
//! A literal is first offered to the dialect's [`SqlCompiler::encode_literal`]; when that
//! returns `None` the generic renderer below spells it.

use chrono::NaiveDate;
use quarry_ir::{DataType, OpKind, Value};

use crate::compiler::SqlCompiler;
use crate::sql::{quote_string, SqlExpr};
use crate::CompileError;

/// Render `value` of type `dtype` as literal SQL text for `compiler`'s dialect.
pub fn encode<C: SqlCompiler + ?Sized>(
    value: &Value,
    dtype: &DataType,
    compiler: &C,
) -> Result<String, CompileError> {
    Ok(lower_literal(compiler, value, dtype)?.to_string())
}

pub(crate) fn lower_literal<C: SqlCompiler + ?Sized>(
    compiler: &C,
    value: &Value,
    dtype: &DataType,
) -> Result<SqlExpr, CompileError> {
    if value.is_null() {
        return null_literal(compiler, dtype);
    }
    match compiler.encode_literal(value, dtype)? {
        Some(expr) => Ok(expr),
        None => render_literal(compiler, value, dtype),
    }
}

/// `NULL`, cast to `dtype` unless the type is itself null.
pub(crate) fn null_literal<C: SqlCompiler + ?Sized>(
    compiler: &C,
    dtype: &DataType,
) -> Result<SqlExpr, CompileError> {
    let null = SqlExpr::Literal("NULL".to_string());
    if dtype.is_null() {
        return Ok(null);
    }
    Ok(cast(null, compiler.type_name(dtype)?))
}

/// Each byte as a `\xNN` escape.
pub fn hex_escaped(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("\\x{:02x}", byte)).collect()
}

/// Hex-escaped string cast to the dialect's binary type.
pub fn binary_literal(bytes: &[u8], type_name: String) -> SqlExpr {
    cast(SqlExpr::Literal(quote_string(&hex_escaped(bytes))), type_name)
}

/// ISO-8601 date string cast to the dialect's date type.
pub fn date_literal(date: &NaiveDate, type_name: String) -> SqlExpr {
    cast(
        SqlExpr::Literal(quote_string(&date.format("%Y-%m-%d").to_string())),
        type_name,
    )
}

fn cast(expr: SqlExpr, to: String) -> SqlExpr {
    SqlExpr::Cast {
        expr: Box::new(expr),
        to,
    }
}

fn literal(text: impl Into<String>) -> SqlExpr {
    SqlExpr::Literal(text.into())
}

/// Dialect-neutral literal spelling.
pub fn render_literal<C: SqlCompiler + ?Sized>(
    compiler: &C,
    value: &Value,
    dtype: &DataType,
) -> Result<SqlExpr, CompileError> {
    match (value, dtype) {
        (Value::Null, _) => null_literal(compiler, dtype),

        (Value::Boolean(b), _) => Ok(literal(if *b { "TRUE" } else { "FALSE" })),

        (Value::Int(n), DataType::Interval { unit }) => {
            let keyword = compiler.spec().interval_unit(*unit).ok_or_else(|| {
                CompileError::unsupported(
                    compiler.name(),
                    OpKind::NonNullLiteral,
                    format!("Unsupported interval unit {}", unit),
                )
            })?;
            Ok(SqlExpr::Interval {
                value: Box::new(literal(n.to_string())),
                unit: keyword.to_string(),
            })
        }

        (Value::Int(n), t) if t.is_floating() || t.is_decimal() => {
            Ok(cast(literal(n.to_string()), compiler.type_name(dtype)?))
        }
        (Value::UInt(n), t) if t.is_floating() || t.is_decimal() => {
            Ok(cast(literal(n.to_string()), compiler.type_name(dtype)?))
        }

        (Value::Int(n), _) => Ok(literal(n.to_string())),
        (Value::UInt(n), _) => Ok(literal(n.to_string())),

        (Value::Float(n), _) => {
            let n = n.into_inner();
            if n.is_nan() {
                Ok(cast(literal("'NaN'"), compiler.type_name(dtype)?))
            } else if n.is_infinite() {
                let text = if n > 0.0 { "'Infinity'" } else { "'-Infinity'" };
                Ok(cast(literal(text), compiler.type_name(dtype)?))
            } else if dtype.is_decimal() {
                Ok(cast(literal(format!("{:?}", n)), compiler.type_name(dtype)?))
            } else {
                Ok(literal(format!("{:?}", n)))
            }
        }

        (Value::Decimal(text), _) => Ok(cast(
            literal(quote_string(text)),
            compiler.type_name(dtype)?,
        )),

        (Value::String(s), DataType::Uuid) => {
            Ok(cast(literal(quote_string(s)), compiler.type_name(dtype)?))
        }

        (Value::String(s), _) => Ok(literal(quote_string(s))),

        (Value::Binary(bytes), _) => {
            let hex: String = bytes.iter().map(|byte| format!("{:02X}", byte)).collect();
            Ok(literal(format!("X'{}'", hex)))
        }

        (Value::Date(date), _) => Ok(date_literal(date, compiler.type_name(dtype)?)),

        (Value::Time(time), _) => Ok(literal(format!("TIME '{}'", time.format("%H:%M:%S%.f")))),

        (Value::Timestamp(ts), DataType::Timestamp { timezone: Some(_) }) => Ok(cast(
            literal(quote_string(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
            compiler.type_name(dtype)?,
        )),

        (Value::Timestamp(ts), _) => Ok(literal(format!(
            "TIMESTAMP '{}'",
            ts.format("%Y-%m-%d %H:%M:%S%.f")
        ))),

        (Value::Json(text), _) => Ok(cast(literal(quote_string(text)), compiler.type_name(dtype)?)),

        (Value::Array(items), DataType::Array(inner)) => {
            if items.is_empty() {
                return Ok(cast(literal("ARRAY[]"), compiler.type_name(dtype)?));
            }
            let elements = items
                .iter()
                .map(|item| Ok(lower_literal(compiler, item, inner)?.to_string()))
                .collect::<Result<Vec<_>, CompileError>>()?;
            Ok(literal(format!("ARRAY[{}]", elements.join(", "))))
        }

        (Value::Array(_), _) => Err(CompileError::UnsupportedType {
            dialect: compiler.name().to_string(),
            dtype: dtype.clone(),
        }),
    }
}
