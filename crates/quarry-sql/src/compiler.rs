//! Dialect compiler trait and the IR to SQL dispatch
//!
//! [`SqlCompiler::lower`] walks a value expression bottom-up: the node's kind is checked
//! against the dialect's unsupported set, its children are lowered, and then the handler for
//! its kind builds the SQL. Handlers for dialect-sensitive kinds are trait methods whose
//! defaults live in [`crate::dialects::base`], so a dialect overrides only what differs.

use quarry_ir::{
    BinaryOp, CorrelationMode, DataType, NodeRef, Op, OpKind, OrderedFunc, ReductionFunc, Shape,
    SortKey, TemporalUnit, UnaryOp, Value,
};
use quarry_registry::DialectSpec;
use tracing::{debug, trace};

use crate::dialects::base;
use crate::sql::{CaseBranch, Function, OrderByExpr, Select, SqlExpr, SqlFragment};
use crate::{literal, relation, CompileError};

/// Lowers IR trees into SQL for one dialect.
///
/// Implementations hold no per-compilation state and are shared across threads.
pub trait SqlCompiler: Send + Sync {
    fn spec(&self) -> &DialectSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Compile a root node: relations become a `SELECT`, everything else an expression.
    fn compile(&self, node: &NodeRef) -> Result<SqlFragment, CompileError> {
        debug!(dialect = %self.name(), kind = %node.kind(), shape = %node.shape(), "Compiling");
        if node.shape().is_tabular() {
            Ok(SqlFragment::Query(self.lower_relation(node)?))
        } else {
            Ok(SqlFragment::Expr(self.lower(node)?))
        }
    }

    fn lower(&self, node: &NodeRef) -> Result<SqlExpr, CompileError> {
        lower_value(self, node)
    }

    fn lower_relation(&self, node: &NodeRef) -> Result<Select, CompileError> {
        relation::lower_relation(self, node)
    }

    /// Dialect-specific literal spelling. `None` falls through to the generic renderer.
    fn encode_literal(
        &self,
        _value: &Value,
        _dtype: &DataType,
    ) -> Result<Option<SqlExpr>, CompileError> {
        Ok(None)
    }

    fn type_name(&self, dtype: &DataType) -> Result<String, CompileError> {
        base::type_name(self, dtype)
    }

    fn visit_truncate(
        &self,
        kind: OpKind,
        arg: SqlExpr,
        unit: TemporalUnit,
    ) -> Result<SqlExpr, CompileError> {
        base::truncate(self, kind, arg, unit)
    }

    fn visit_interval_from_integer(
        &self,
        arg: SqlExpr,
        shape: Shape,
        unit: TemporalUnit,
    ) -> Result<SqlExpr, CompileError> {
        interval_from_integer(self, arg, shape, unit)
    }

    fn visit_date_now(&self) -> Result<SqlExpr, CompileError> {
        base::date_now(self)
    }

    fn visit_date_from_ymd(
        &self,
        year: SqlExpr,
        month: SqlExpr,
        day: SqlExpr,
    ) -> Result<SqlExpr, CompileError> {
        Ok(base::call("MAKE_DATE", vec![year, month, day]))
    }

    fn visit_random_uuid(&self) -> Result<SqlExpr, CompileError> {
        Ok(base::call("GEN_RANDOM_UUID", vec![]))
    }

    fn visit_string_length(&self, arg: SqlExpr) -> Result<SqlExpr, CompileError> {
        Ok(base::call("CHAR_LENGTH", vec![arg]))
    }

    fn visit_reduction(
        &self,
        func: ReductionFunc,
        arg: SqlExpr,
        arg_dtype: &DataType,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        base::reduction(self, func, arg, arg_dtype, where_)
    }

    fn visit_ordered_reduction(
        &self,
        func: OrderedFunc,
        arg: SqlExpr,
        where_: Option<SqlExpr>,
        order_by: Vec<OrderByExpr>,
    ) -> Result<SqlExpr, CompileError> {
        base::ordered_reduction(self, func, arg, where_, order_by)
    }

    fn visit_correlation(
        &self,
        left: SqlExpr,
        right: SqlExpr,
        how: CorrelationMode,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        base::correlation(self, left, right, how, where_)
    }
}

/// Turn an integer into an interval of `unit`.
///
/// Scalar arguments become an interval literal; columnar arguments multiply a unit
/// interval. Any other shape has no SQL counterpart.
pub fn interval_from_integer<C: SqlCompiler + ?Sized>(
    compiler: &C,
    arg: SqlExpr,
    shape: Shape,
    unit: TemporalUnit,
) -> Result<SqlExpr, CompileError> {
    let keyword = compiler.spec().interval_unit(unit).ok_or_else(|| {
        CompileError::unsupported(
            compiler.name(),
            OpKind::IntervalFromInteger,
            format!("Unsupported interval unit {}", unit),
        )
    })?;

    match shape {
        Shape::Scalar => Ok(SqlExpr::Interval {
            value: Box::new(arg),
            unit: keyword.to_string(),
        }),
        Shape::Columnar => Ok(SqlExpr::Binary {
            left: Box::new(arg),
            op: "*".to_string(),
            right: Box::new(SqlExpr::Interval {
                value: Box::new(SqlExpr::Literal("1".to_string())),
                unit: keyword.to_string(),
            }),
        }),
        Shape::Tabular => Err(CompileError::InvalidShape(format!(
            "cannot convert a {} argument to an interval",
            shape
        ))),
    }
}

pub(crate) fn ensure_supported<C: SqlCompiler + ?Sized>(
    compiler: &C,
    kind: OpKind,
) -> Result<(), CompileError> {
    if compiler.spec().supports(kind) {
        Ok(())
    } else {
        Err(CompileError::unsupported(
            compiler.name(),
            kind,
            format!("{} is not available in {}", kind, compiler.name()),
        ))
    }
}

pub(crate) fn lower_order_by<C: SqlCompiler + ?Sized>(
    compiler: &C,
    keys: &[SortKey],
) -> Result<Vec<OrderByExpr>, CompileError> {
    keys.iter()
        .map(|key| {
            Ok(OrderByExpr {
                expr: compiler.lower(&key.expr)?,
                ascending: key.ascending,
            })
        })
        .collect()
}

fn lower_optional<C: SqlCompiler + ?Sized>(
    compiler: &C,
    node: Option<&NodeRef>,
) -> Result<Option<SqlExpr>, CompileError> {
    node.map(|node| compiler.lower(node)).transpose()
}

fn binary_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Modulus => "%",
        BinaryOp::Equals => "=",
        BinaryOp::NotEquals => "<>",
        BinaryOp::Less => "<",
        BinaryOp::LessEqual => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEqual => ">=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
    }
}

fn case_branches<C: SqlCompiler + ?Sized>(
    compiler: &C,
    cases: &[NodeRef],
    results: &[NodeRef],
) -> Result<Vec<CaseBranch>, CompileError> {
    cases
        .iter()
        .zip(results)
        .map(|(case, result)| {
            Ok(CaseBranch {
                when: compiler.lower(case)?,
                then: compiler.lower(result)?,
            })
        })
        .collect()
}

/// Default value-expression dispatch behind [`SqlCompiler::lower`].
pub fn lower_value<C: SqlCompiler + ?Sized>(
    compiler: &C,
    node: &NodeRef,
) -> Result<SqlExpr, CompileError> {
    let kind = node.kind();
    ensure_supported(compiler, kind)?;
    trace!(dialect = %compiler.name(), kind = %kind, "Lowering node");

    match node.op() {
        Op::NonNullLiteral { value, dtype } => literal::lower_literal(compiler, value, dtype),

        Op::NullLiteral { dtype } => literal::null_literal(compiler, dtype),

        Op::Field { name, .. } => Ok(SqlExpr::Column(name.clone())),

        Op::Cast { arg, to } => {
            let expr = compiler.lower(arg)?;
            if to.is_null() {
                return Ok(expr);
            }
            Ok(SqlExpr::Cast {
                expr: Box::new(expr),
                to: compiler.type_name(to)?,
            })
        }

        Op::Binary { op, left, right } => {
            let mut lhs = compiler.lower(left)?;
            let rhs = compiler.lower(right)?;
            // Integer operands would otherwise divide with truncation
            if *op == BinaryOp::Divide
                && left.dtype().is_integer()
                && right.dtype().is_integer()
            {
                lhs = SqlExpr::Cast {
                    expr: Box::new(lhs),
                    to: compiler.type_name(node.dtype())?,
                };
            }
            Ok(SqlExpr::Binary {
                left: Box::new(lhs),
                op: binary_operator(*op).to_string(),
                right: Box::new(rhs),
            })
        }

        Op::Unary { op, arg } => {
            let expr = compiler.lower(arg)?;
            match op {
                UnaryOp::Not => Ok(SqlExpr::Not(Box::new(expr))),
                UnaryOp::Negate => Ok(SqlExpr::Negate(Box::new(expr))),
                UnaryOp::IsNull => Ok(SqlExpr::IsNull {
                    expr: Box::new(expr),
                    negated: false,
                }),
                UnaryOp::NotNull => Ok(SqlExpr::IsNull {
                    expr: Box::new(expr),
                    negated: true,
                }),
                UnaryOp::Lowercase => Ok(base::call("LOWER", vec![expr])),
                UnaryOp::Uppercase => Ok(base::call("UPPER", vec![expr])),
                UnaryOp::StringLength => compiler.visit_string_length(expr),
            }
        }

        Op::SimpleCase {
            base,
            cases,
            results,
            default,
        } => {
            let operand = compiler.lower(base)?;
            let branches = case_branches(compiler, cases, results)?;
            let default = compiler.lower(default)?;
            Ok(SqlExpr::Case {
                operand: Some(Box::new(operand)),
                branches,
                default: Some(Box::new(default)),
            })
        }

        Op::SearchedCase {
            cases,
            results,
            default,
        } => {
            let branches = case_branches(compiler, cases, results)?;
            let default = compiler.lower(default)?;
            Ok(SqlExpr::Case {
                operand: None,
                branches,
                default: Some(Box::new(default)),
            })
        }

        Op::DateTruncate { arg, unit }
        | Op::TimestampTruncate { arg, unit }
        | Op::TimeTruncate { arg, unit } => {
            let expr = compiler.lower(arg)?;
            compiler.visit_truncate(kind, expr, *unit)
        }

        Op::DateFromYMD { year, month, day } => {
            let year = compiler.lower(year)?;
            let month = compiler.lower(month)?;
            let day = compiler.lower(day)?;
            compiler.visit_date_from_ymd(year, month, day)
        }

        Op::DateNow => compiler.visit_date_now(),

        Op::TimestampNow => Ok(SqlExpr::Keyword("CURRENT_TIMESTAMP".to_string())),

        Op::RandomUUID => compiler.visit_random_uuid(),

        Op::IntervalFromInteger { arg, unit } => {
            let expr = compiler.lower(arg)?;
            compiler.visit_interval_from_integer(expr, arg.shape(), *unit)
        }

        Op::Reduction { func, arg, where_ } => {
            let expr = compiler.lower(arg)?;
            let where_ = lower_optional(compiler, where_.as_ref())?;
            compiler.visit_reduction(*func, expr, arg.dtype(), where_)
        }

        Op::OrderedReduction {
            func,
            arg,
            where_,
            order_by,
        } => {
            if order_by.is_empty() && compiler.spec().ordered_aggregates_require_order_by {
                return Err(CompileError::unsupported(
                    compiler.name(),
                    kind,
                    format!(
                        "{} requires an `order_by` be specified in `{}`",
                        compiler.name(),
                        func.name()
                    ),
                ));
            }
            let expr = compiler.lower(arg)?;
            let where_ = lower_optional(compiler, where_.as_ref())?;
            let order_by = lower_order_by(compiler, order_by)?;
            compiler.visit_ordered_reduction(*func, expr, where_, order_by)
        }

        Op::Correlation {
            left,
            right,
            how,
            where_,
        } => {
            if !compiler.spec().supports_correlation(*how) {
                let modes = compiler
                    .spec()
                    .correlation_modes
                    .iter()
                    .map(|mode| format!("`{}`", mode))
                    .collect::<Vec<_>>()
                    .join(" and ");
                return Err(CompileError::unsupported(
                    compiler.name(),
                    kind,
                    format!(
                        "{} only implements {} correlation coefficient",
                        compiler.name(),
                        modes
                    ),
                ));
            }
            let lhs = compiler.lower(left)?;
            let rhs = compiler.lower(right)?;
            let where_ = lower_optional(compiler, where_.as_ref())?;
            compiler.visit_correlation(lhs, rhs, *how, where_)
        }

        Op::UnboundTable { .. }
        | Op::Project { .. }
        | Op::Filter { .. }
        | Op::Aggregate { .. }
        | Op::Sort { .. }
        | Op::Limit { .. } => Err(CompileError::InvalidShape(format!(
            "{} is a relation and cannot be used as a value expression",
            kind
        ))),
    }
}

/// `name(args)` with an optional aggregate filter.
///
/// Dialects without `FILTER (WHERE ...)` get each argument wrapped in a
/// `CASE WHEN <predicate> THEN <arg> END` instead, which aggregates skip as `NULL`.
pub fn aggregate(
    spec: &DialectSpec,
    name: &str,
    args: Vec<SqlExpr>,
    where_: Option<SqlExpr>,
) -> Function {
    match where_ {
        None => Function::new(name, args),
        Some(predicate) if spec.aggregate_filter => {
            Function::new(name, args).filter(Some(predicate))
        }
        Some(predicate) => {
            let args = args
                .into_iter()
                .map(|arg| SqlExpr::Case {
                    operand: None,
                    branches: vec![CaseBranch {
                        when: predicate.clone(),
                        then: arg,
                    }],
                    default: None,
                })
                .collect();
            Function::new(name, args)
        }
    }
}
