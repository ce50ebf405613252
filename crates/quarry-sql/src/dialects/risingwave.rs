//! RisingWave
//!
//! Speaks the PostgreSQL dialect with a narrower function set. Most differences are data in
//! [`DialectSpec::risingwave`]; the code here covers literals and ordered aggregates.

use quarry_ir::{DataType, OrderedFunc, ReductionFunc, Value};
use quarry_registry::DialectSpec;

use crate::compiler::{aggregate, SqlCompiler};
use crate::dialects::postgres;
use crate::sql::{quote_string, OrderByExpr, SqlExpr};
use crate::CompileError;

#[derive(Debug, Clone)]
pub struct RisingWaveCompiler {
    spec: DialectSpec,
}

impl RisingWaveCompiler {
    pub fn new() -> Self {
        Self {
            spec: DialectSpec::risingwave(),
        }
    }
}

impl Default for RisingWaveCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler for RisingWaveCompiler {
    fn spec(&self) -> &DialectSpec {
        &self.spec
    }

    /// Binary and date as in PostgreSQL; JSON as a plain string literal.
    fn encode_literal(
        &self,
        value: &Value,
        dtype: &DataType,
    ) -> Result<Option<SqlExpr>, CompileError> {
        match value {
            Value::Json(text) => Ok(Some(SqlExpr::Literal(quote_string(text)))),
            _ => postgres::encode_literal(self, value, dtype),
        }
    }

    fn type_name(&self, dtype: &DataType) -> Result<String, CompileError> {
        postgres::type_name(self, dtype)
    }

    fn visit_reduction(
        &self,
        func: ReductionFunc,
        arg: SqlExpr,
        arg_dtype: &DataType,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        postgres::reduction(self, func, arg, arg_dtype, where_)
    }

    fn visit_ordered_reduction(
        &self,
        func: OrderedFunc,
        arg: SqlExpr,
        where_: Option<SqlExpr>,
        order_by: Vec<OrderByExpr>,
    ) -> Result<SqlExpr, CompileError> {
        let name = match func {
            OrderedFunc::First => "FIRST_VALUE",
            OrderedFunc::Last => "LAST_VALUE",
        };
        Ok(SqlExpr::Function(
            aggregate(&self.spec, name, vec![arg], where_).order_by(order_by),
        ))
    }
}
