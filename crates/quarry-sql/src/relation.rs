//! Relation lowering
//!
//! Each relational operation is merged into its parent's `SELECT` when the clause it needs
//! is still free and merging cannot change the result; otherwise the parent is nested as
//! an aliased subquery.
//!
//! Reductions used in a row-level position (a predicate, or next to columnar values in a
//! projection) are evaluated over the parent relation as scalar subqueries.

use quarry_ir::{
    CorrelationMode, DataType, NamedNode, NodeRef, Op, OpKind, OrderedFunc, ReductionFunc,
    Shape, TemporalUnit, Value,
};
use quarry_registry::DialectSpec;
use tracing::trace;

use crate::compiler::{ensure_supported, lower_order_by, lower_value, SqlCompiler};
use crate::sql::{OrderByExpr, Select, SelectItem, SqlExpr};
use crate::CompileError;

/// Default relation dispatch behind [`SqlCompiler::lower_relation`].
pub fn lower_relation<C: SqlCompiler + ?Sized>(
    compiler: &C,
    node: &NodeRef,
) -> Result<Select, CompileError> {
    let kind = node.kind();
    ensure_supported(compiler, kind)?;
    trace!(dialect = %compiler.name(), kind = %kind, "Lowering relation");

    match node.op() {
        Op::UnboundTable { name, .. } => Ok(Select::from_table(name)),

        Op::Project { parent, values } => {
            let select = compiler.lower_relation(parent)?;
            let reduces = values.iter().any(|named| has_reduction(&named.value));
            let broadcast =
                reduces && values.iter().any(|named| !named.value.shape().is_scalar());

            let projection = if broadcast {
                let scoped = ScalarSubqueries::new(compiler, &select);
                lower_named(&scoped, values)?
            } else {
                lower_named(compiler, values)?
            };

            // A fully reduced projection aggregates every row the parent yields
            let aggregates_rows =
                reduces && !broadcast && (select.is_limited() || !select.order_by.is_empty());
            let mut select = if select.is_star() && !select.is_grouped() && !aggregates_rows {
                select
            } else {
                Select::wrap(select)
            };
            select.projection = projection;
            Ok(select)
        }

        Op::Filter { parent, predicates } => {
            let select = compiler.lower_relation(parent)?;
            let predicates = if predicates.iter().any(has_reduction) {
                let scoped = ScalarSubqueries::new(compiler, &select);
                lower_all(&scoped, predicates)?
            } else {
                lower_all(compiler, predicates)?
            };
            if predicates.is_empty() {
                return Ok(select);
            }

            let mut select = if select.is_star() && !select.is_grouped() && !select.is_limited()
            {
                select
            } else {
                Select::wrap(select)
            };
            select.selection = conjunction(select.selection.take().into_iter().chain(predicates));
            Ok(select)
        }

        Op::Aggregate {
            parent,
            groups,
            metrics,
        } => {
            let select = compiler.lower_relation(parent)?;
            let group_items = lower_named(compiler, groups)?;
            let metric_items = lower_named(compiler, metrics)?;

            let mergeable = select.is_star()
                && !select.is_grouped()
                && !select.is_limited()
                && select.order_by.is_empty();
            let mut select = if mergeable {
                select
            } else {
                Select::wrap(select)
            };
            select.group_by = group_items.iter().map(|item| item.expr.clone()).collect();
            select.projection = group_items.into_iter().chain(metric_items).collect();
            Ok(select)
        }

        Op::Sort { parent, keys } => {
            let select = compiler.lower_relation(parent)?;
            let order_by = lower_order_by(compiler, keys)?;

            // Keys that are not plain columns may reference computed aliases
            let plain_keys = order_by
                .iter()
                .all(|key| matches!(key.expr, SqlExpr::Column(_)));
            let mut select = if !select.is_limited() && (select.is_star() || plain_keys) {
                select
            } else {
                Select::wrap(select)
            };
            select.order_by = order_by;
            Ok(select)
        }

        Op::Limit { parent, n, offset } => {
            let select = compiler.lower_relation(parent)?;
            let mut select = if select.is_limited() {
                Select::wrap(select)
            } else {
                select
            };
            select.limit = *n;
            select.offset = (*offset > 0).then_some(*offset);
            Ok(select)
        }

        _ => Err(CompileError::InvalidShape(format!(
            "{} is a {} value, not a relation",
            kind,
            node.shape()
        ))),
    }
}

/// Whether a value expression reduces rows anywhere below it.
fn has_reduction(node: &NodeRef) -> bool {
    node.kind().is_reduction()
        || node
            .children()
            .into_iter()
            .filter(|child| !child.shape().is_tabular())
            .any(|child| has_reduction(child))
}

/// Statement a scalar subquery reads from: the parent itself when it can take a new
/// projection unchanged, otherwise the parent nested.
fn scalar_source(parent: &Select) -> Select {
    if parent.is_star() && !parent.is_grouped() && !parent.is_limited() {
        let mut source = parent.clone();
        source.order_by.clear();
        source
    } else {
        Select::wrap(parent.clone())
    }
}

/// Lowers every reduction as `(SELECT <reduction> FROM <source>)` and defers everything
/// else to the wrapped compiler.
struct ScalarSubqueries<'a, C: ?Sized> {
    inner: &'a C,
    source: Select,
}

impl<'a, C: SqlCompiler + ?Sized> ScalarSubqueries<'a, C> {
    fn new(inner: &'a C, parent: &Select) -> Self {
        Self {
            inner,
            source: scalar_source(parent),
        }
    }
}

impl<C: SqlCompiler + ?Sized> SqlCompiler for ScalarSubqueries<'_, C> {
    fn spec(&self) -> &DialectSpec {
        self.inner.spec()
    }

    fn lower(&self, node: &NodeRef) -> Result<SqlExpr, CompileError> {
        if !node.kind().is_reduction() {
            return lower_value(self, node);
        }
        let mut query = self.source.clone();
        query.projection = vec![SelectItem {
            expr: self.inner.lower(node)?,
            alias: None,
        }];
        Ok(SqlExpr::Subquery(Box::new(query)))
    }

    fn lower_relation(&self, node: &NodeRef) -> Result<Select, CompileError> {
        self.inner.lower_relation(node)
    }

    fn encode_literal(
        &self,
        value: &Value,
        dtype: &DataType,
    ) -> Result<Option<SqlExpr>, CompileError> {
        self.inner.encode_literal(value, dtype)
    }

    fn type_name(&self, dtype: &DataType) -> Result<String, CompileError> {
        self.inner.type_name(dtype)
    }

    fn visit_truncate(
        &self,
        kind: OpKind,
        arg: SqlExpr,
        unit: TemporalUnit,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_truncate(kind, arg, unit)
    }

    fn visit_interval_from_integer(
        &self,
        arg: SqlExpr,
        shape: Shape,
        unit: TemporalUnit,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_interval_from_integer(arg, shape, unit)
    }

    fn visit_date_now(&self) -> Result<SqlExpr, CompileError> {
        self.inner.visit_date_now()
    }

    fn visit_date_from_ymd(
        &self,
        year: SqlExpr,
        month: SqlExpr,
        day: SqlExpr,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_date_from_ymd(year, month, day)
    }

    fn visit_random_uuid(&self) -> Result<SqlExpr, CompileError> {
        self.inner.visit_random_uuid()
    }

    fn visit_string_length(&self, arg: SqlExpr) -> Result<SqlExpr, CompileError> {
        self.inner.visit_string_length(arg)
    }

    fn visit_reduction(
        &self,
        func: ReductionFunc,
        arg: SqlExpr,
        arg_dtype: &DataType,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_reduction(func, arg, arg_dtype, where_)
    }

    fn visit_ordered_reduction(
        &self,
        func: OrderedFunc,
        arg: SqlExpr,
        where_: Option<SqlExpr>,
        order_by: Vec<OrderByExpr>,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_ordered_reduction(func, arg, where_, order_by)
    }

    fn visit_correlation(
        &self,
        left: SqlExpr,
        right: SqlExpr,
        how: CorrelationMode,
        where_: Option<SqlExpr>,
    ) -> Result<SqlExpr, CompileError> {
        self.inner.visit_correlation(left, right, how, where_)
    }
}

fn lower_all<C: SqlCompiler + ?Sized>(
    compiler: &C,
    nodes: &[NodeRef],
) -> Result<Vec<SqlExpr>, CompileError> {
    nodes.iter().map(|node| compiler.lower(node)).collect()
}

fn lower_named<C: SqlCompiler + ?Sized>(
    compiler: &C,
    values: &[NamedNode],
) -> Result<Vec<SelectItem>, CompileError> {
    values
        .iter()
        .map(|named| {
            Ok(SelectItem {
                expr: compiler.lower(&named.value)?,
                alias: Some(named.name.clone()),
            })
        })
        .collect()
}

fn conjunction<I>(predicates: I) -> Option<SqlExpr>
where
    I: IntoIterator<Item = SqlExpr>,
{
    predicates.into_iter().reduce(|left, right| SqlExpr::Binary {
        left: Box::new(left),
        op: "AND".to_string(),
        right: Box::new(right),
    })
}
