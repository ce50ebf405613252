//! DuckDB

use quarry_ir::{DataType, Value};
use quarry_registry::DialectSpec;

use crate::compiler::SqlCompiler;
use crate::dialects::base;
use crate::literal::binary_literal;
use crate::sql::SqlExpr;
use crate::CompileError;

#[derive(Debug, Clone)]
pub struct DuckDbCompiler {
    spec: DialectSpec,
}

impl DuckDbCompiler {
    pub fn new() -> Self {
        Self {
            spec: DialectSpec::duckdb(),
        }
    }
}

impl Default for DuckDbCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler for DuckDbCompiler {
    fn spec(&self) -> &DialectSpec {
        &self.spec
    }

    fn encode_literal(
        &self,
        value: &Value,
        dtype: &DataType,
    ) -> Result<Option<SqlExpr>, CompileError> {
        match value {
            Value::Binary(bytes) => Ok(Some(binary_literal(bytes, self.type_name(dtype)?))),
            _ => Ok(None),
        }
    }

    fn type_name(&self, dtype: &DataType) -> Result<String, CompileError> {
        let name = match dtype {
            DataType::UInt8 => "UTINYINT".to_string(),
            DataType::UInt16 => "USMALLINT".to_string(),
            DataType::UInt32 => "UINTEGER".to_string(),
            DataType::UInt64 => "UBIGINT".to_string(),
            DataType::Float32 => "FLOAT".to_string(),
            DataType::Float64 => "DOUBLE".to_string(),
            DataType::Binary => "BLOB".to_string(),
            DataType::Timestamp { timezone: Some(_) } => "TIMESTAMPTZ".to_string(),
            DataType::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| {
                        Ok(format!(
                            "{} {}",
                            crate::sql::quote_ident(&field.name),
                            self.type_name(&field.data_type)?
                        ))
                    })
                    .collect::<Result<Vec<_>, CompileError>>()?;
                format!("STRUCT({})", fields.join(", "))
            }
            DataType::Map { key, value } => {
                format!("MAP({}, {})", self.type_name(key)?, self.type_name(value)?)
            }
            _ => base::type_name(self, dtype)?,
        };
        Ok(name)
    }

    fn visit_random_uuid(&self) -> Result<SqlExpr, CompileError> {
        Ok(base::call("UUID", vec![]))
    }

    fn visit_string_length(&self, arg: SqlExpr) -> Result<SqlExpr, CompileError> {
        Ok(base::call("LENGTH", vec![arg]))
    }
}
