//! ANSI-flavoured defaults shared by every dialect

use quarry_ir::{CorrelationMode, DataType, OpKind, OrderedFunc, ReductionFunc, TemporalUnit};
use quarry_registry::DialectSpec;

use crate::compiler::{aggregate, SqlCompiler};
use crate::sql::{quote_ident, quote_string, OrderByExpr, SqlExpr};
use crate::CompileError;

/// Compiler that uses only the default handlers.
///
/// With [`DialectSpec::base`] it targets generic SQL; with any other spec it provides a
/// working compiler for a dialect described purely by data (for example one loaded from
/// YAML).
#[derive(Debug, Clone)]
pub struct BaseCompiler {
    spec: DialectSpec,
}

impl BaseCompiler {
    pub fn new() -> Self {
        Self::with_spec(DialectSpec::base())
    }

    pub fn with_spec(spec: DialectSpec) -> Self {
        Self { spec }
    }
}

impl Default for BaseCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler for BaseCompiler {
    fn spec(&self) -> &DialectSpec {
        &self.spec
    }
}

pub fn call(name: &str, args: Vec<SqlExpr>) -> SqlExpr {
    SqlExpr::Function(crate::sql::Function::new(name, args))
}

fn unsupported_type<C: SqlCompiler + ?Sized>(compiler: &C, dtype: &DataType) -> CompileError {
    CompileError::UnsupportedType {
        dialect: compiler.name().to_string(),
        dtype: dtype.clone(),
    }
}

pub fn type_name<C: SqlCompiler + ?Sized>(
    compiler: &C,
    dtype: &DataType,
) -> Result<String, CompileError> {
    let name = match dtype {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 | DataType::UInt8 => "SMALLINT".to_string(),
        DataType::Int32 | DataType::UInt16 => "INTEGER".to_string(),
        DataType::Int64 | DataType::UInt32 => "BIGINT".to_string(),
        DataType::UInt64 => "DECIMAL(20, 0)".to_string(),
        DataType::Float32 => "REAL".to_string(),
        DataType::Float64 => "DOUBLE PRECISION".to_string(),
        DataType::Decimal { precision, scale } => format!("DECIMAL({}, {})", precision, scale),
        DataType::String => "VARCHAR".to_string(),
        DataType::Binary => "VARBINARY".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Time => "TIME".to_string(),
        DataType::Timestamp { timezone: None } => "TIMESTAMP".to_string(),
        DataType::Timestamp { timezone: Some(_) } => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Interval { .. } => "INTERVAL".to_string(),
        DataType::Json => "JSON".to_string(),
        DataType::Uuid => "UUID".to_string(),
        DataType::Array(inner) => format!("{}[]", compiler.type_name(inner)?),
        DataType::Struct(fields) => {
            let fields = fields
                .iter()
                .map(|field| {
                    Ok(format!(
                        "{} {}",
                        quote_ident(&field.name),
                        compiler.type_name(&field.data_type)?
                    ))
                })
                .collect::<Result<Vec<_>, CompileError>>()?;
            format!("ROW({})", fields.join(", "))
        }
        DataType::Map { .. } | DataType::Null | DataType::Unknown => {
            return Err(unsupported_type(compiler, dtype))
        }
    };
    Ok(name)
}

/// `DATE_TRUNC('<unit>', arg)` using the dialect's unit vocabulary.
pub fn truncate<C: SqlCompiler + ?Sized>(
    compiler: &C,
    kind: OpKind,
    arg: SqlExpr,
    unit: TemporalUnit,
) -> Result<SqlExpr, CompileError> {
    let keyword = compiler.spec().truncate_unit(unit).ok_or_else(|| {
        CompileError::unsupported(
            compiler.name(),
            kind,
            format!("Unsupported truncate unit {}", unit),
        )
    })?;
    Ok(call(
        "DATE_TRUNC",
        vec![SqlExpr::Literal(quote_string(keyword)), arg],
    ))
}

/// `CURRENT_DATE`, or `CAST(CURRENT_TIMESTAMP AS DATE)` where there is no such keyword.
pub fn date_now<C: SqlCompiler + ?Sized>(compiler: &C) -> Result<SqlExpr, CompileError> {
    if compiler.spec().native_current_date {
        return Ok(SqlExpr::Keyword("CURRENT_DATE".to_string()));
    }
    Ok(SqlExpr::Cast {
        expr: Box::new(SqlExpr::Keyword("CURRENT_TIMESTAMP".to_string())),
        to: compiler.type_name(&DataType::Date)?,
    })
}

pub fn reduction_name(func: ReductionFunc) -> &'static str {
    match func {
        ReductionFunc::Count => "COUNT",
        ReductionFunc::Sum => "SUM",
        ReductionFunc::Mean => "AVG",
        ReductionFunc::Min => "MIN",
        ReductionFunc::Max => "MAX",
        ReductionFunc::Arbitrary => "ANY_VALUE",
        ReductionFunc::Mode => "MODE",
    }
}

pub fn reduction<C: SqlCompiler + ?Sized>(
    compiler: &C,
    func: ReductionFunc,
    arg: SqlExpr,
    arg_dtype: &DataType,
    where_: Option<SqlExpr>,
) -> Result<SqlExpr, CompileError> {
    // Booleans are summed and averaged as 0/1
    let arg = if arg_dtype.is_boolean() && matches!(func, ReductionFunc::Sum | ReductionFunc::Mean)
    {
        SqlExpr::Cast {
            expr: Box::new(arg),
            to: compiler.type_name(&DataType::Int32)?,
        }
    } else {
        arg
    };
    Ok(SqlExpr::Function(aggregate(
        compiler.spec(),
        reduction_name(func),
        vec![arg],
        where_,
    )))
}

/// `FIRST(arg ORDER BY ...)` / `LAST(arg ORDER BY ...)`.
pub fn ordered_reduction<C: SqlCompiler + ?Sized>(
    compiler: &C,
    func: OrderedFunc,
    arg: SqlExpr,
    where_: Option<SqlExpr>,
    order_by: Vec<OrderByExpr>,
) -> Result<SqlExpr, CompileError> {
    let name = match func {
        OrderedFunc::First => "FIRST",
        OrderedFunc::Last => "LAST",
    };
    Ok(SqlExpr::Function(
        aggregate(compiler.spec(), name, vec![arg], where_).order_by(order_by),
    ))
}

/// `CORR(left, right)`.
///
/// Pearson's coefficient is the same whether computed with sample or population moments,
/// so both modes share one function where the dialect allows them.
pub fn correlation<C: SqlCompiler + ?Sized>(
    compiler: &C,
    left: SqlExpr,
    right: SqlExpr,
    _how: CorrelationMode,
    where_: Option<SqlExpr>,
) -> Result<SqlExpr, CompileError> {
    Ok(SqlExpr::Function(aggregate(
        compiler.spec(),
        "CORR",
        vec![left, right],
        where_,
    )))
}
