//! PostgreSQL

use quarry_ir::{DataType, OrderedFunc, ReductionFunc, Value};
use quarry_registry::DialectSpec;

use crate::compiler::{aggregate, SqlCompiler};
use crate::dialects::base;
use crate::literal::{binary_literal, date_literal};
use crate::sql::{Function, OrderByExpr, SqlExpr};
use crate::CompileError;

#[derive(Debug, Clone)]
pub struct PostgresCompiler {
    spec: DialectSpec,
}

impl PostgresCompiler {
    pub fn new() -> Self {
        Self {
            spec: DialectSpec::postgres(),
        }
    }
}

impl Default for PostgresCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler for PostgresCompiler {
    fn spec(&self) -> &DialectSpec {
        &self.spec
    }

    fn encode_literal(
        &self,
        value: &Value,
        dtype: &DataType,
    ) -> Result<Option<SqlExpr>, CompileError> {
        encode_literal(self, value, dtype)
    }

    fn type_name(&self, dtype: &DataType) -> Result<String, CompileError> {
        type_name(self, dtype)
    }

    fn visit_reduction(
        &self,
        func: ReductionFunc,
        arg: SqlExpr,
        arg_dtype: &DataType,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        reduction(self, func, arg, arg_dtype, where_)
    }

    fn visit_ordered_reduction(
        &self,
        func: OrderedFunc,
        arg: SqlExpr,
        where_: Option<SqlExpr>,
        order_by: Vec<OrderByExpr>,
    ) -> Result<SqlExpr, CompileError> {
        ordered_reduction(self, func, arg, where_, order_by)
    }
}

/// Binary as hex escapes cast to `BYTEA`; dates as ISO strings cast to `DATE`.
pub fn encode_literal<C: SqlCompiler + ?Sized>(
    compiler: &C,
    value: &Value,
    dtype: &DataType,
) -> Result<Option<SqlExpr>, CompileError> {
    match value {
        Value::Binary(bytes) => Ok(Some(binary_literal(bytes, compiler.type_name(dtype)?))),
        Value::Date(date) => Ok(Some(date_literal(date, compiler.type_name(dtype)?))),
        _ => Ok(None),
    }
}

pub fn type_name<C: SqlCompiler + ?Sized>(
    compiler: &C,
    dtype: &DataType,
) -> Result<String, CompileError> {
    let name = match dtype {
        DataType::Int8 => "SMALLINT",
        DataType::UInt64 => "NUMERIC(20, 0)",
        DataType::String => "TEXT",
        DataType::Binary => "BYTEA",
        DataType::Timestamp { timezone: Some(_) } => "TIMESTAMPTZ",
        DataType::Struct(_) => {
            return Err(CompileError::UnsupportedType {
                dialect: compiler.name().to_string(),
                dtype: dtype.clone(),
            })
        }
        _ => return base::type_name(compiler, dtype),
    };
    Ok(name.to_string())
}

/// `MODE() WITHIN GROUP (ORDER BY arg)`; everything else as in the base dialect.
pub fn reduction<C: SqlCompiler + ?Sized>(
    compiler: &C,
    func: ReductionFunc,
    arg: SqlExpr,
    arg_dtype: &DataType,
    where_: Option<SqlExpr>,
) -> Result<SqlExpr, CompileError> {
    match func {
        ReductionFunc::Mode => {
            let call = aggregate(compiler.spec(), "MODE", vec![arg], where_);
            let within_group = call
                .args
                .into_iter()
                .map(|expr| OrderByExpr {
                    expr,
                    ascending: true,
                })
                .collect();
            Ok(SqlExpr::Function(Function {
                args: Vec::new(),
                within_group,
                ..call
            }))
        }
        _ => base::reduction(compiler, func, arg, arg_dtype, where_),
    }
}

/// First or last element of an ordered `ARRAY_AGG`.
pub fn ordered_reduction<C: SqlCompiler + ?Sized>(
    compiler: &C,
    func: OrderedFunc,
    arg: SqlExpr,
    where_: Option<SqlExpr>,
    order_by: Vec<OrderByExpr>,
) -> Result<SqlExpr, CompileError> {
    let order_by = match func {
        OrderedFunc::First => order_by,
        OrderedFunc::Last => order_by
            .into_iter()
            .map(|key| OrderByExpr {
                ascending: !key.ascending,
                ..key
            })
            .collect(),
    };
    let call = aggregate(compiler.spec(), "ARRAY_AGG", vec![arg], where_).order_by(order_by);
    Ok(SqlExpr::Subscript {
        expr: Box::new(SqlExpr::Function(call)),
        index: 1,
    })
}
