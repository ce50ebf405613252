//! Immutable IR nodes and their type rules

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    castable, promote, shape_of, BinaryOp, DataType, FieldType, IrError, NamedNode, Op, OpKind,
    OrderedFunc, ReductionFunc, Shape, SortKey, TemporalUnit, UnaryOp,
};

/// Shared handle to an immutable node.
pub type NodeRef = Arc<Node>;

/// An operation together with its derived type and shape.
///
/// The only way to obtain a `Node` is through [`Node::new`] (or deserialization, which goes
/// through the same checks), so every node in a tree is well-typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Op", into = "Op")]
pub struct Node {
    op: Op,
    dtype: DataType,
    shape: Shape,
}

impl Node {
    /// Validate `op` and wrap it in a shared node.
    pub fn new(op: Op) -> Result<NodeRef, IrError> {
        Node::try_from(op).map(Arc::new)
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn children(&self) -> Vec<&NodeRef> {
        self.op.children()
    }

    /// Output columns of a relation node.
    pub fn schema(&self) -> Option<&[FieldType]> {
        match (&self.dtype, self.shape) {
            (DataType::Struct(fields), Shape::Tabular) => Some(fields),
            _ => None,
        }
    }

    /// SHA-256 of the canonical JSON form, usable as a cache key.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.op).expect("IR should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl TryFrom<Op> for Node {
    type Error = IrError;

    fn try_from(op: Op) -> Result<Self, Self::Error> {
        let dtype = derive_dtype(&op)?;
        let kind = op.kind();
        let shape = shape_of(kind, op.children().into_iter().map(|child| child.shape()));
        Ok(Node { op, dtype, shape })
    }
}

impl From<Node> for Op {
    fn from(node: Node) -> Self {
        node.op
    }
}

/// Promote the dtypes of all `nodes` into one.
pub(crate) fn unify<'a, I>(nodes: I) -> Result<DataType, IrError>
where
    I: IntoIterator<Item = &'a NodeRef>,
{
    nodes
        .into_iter()
        .try_fold(DataType::Null, |acc, node| promote(&acc, node.dtype()))
}

fn expect_value(operation: OpKind, node: &NodeRef) -> Result<(), IrError> {
    if node.shape().is_tabular() {
        return Err(IrError::signature(
            operation.to_string(),
            format!("expected a value expression, got a {} relation", node.kind()),
        ));
    }
    Ok(())
}

fn expect_relation(operation: OpKind, node: &NodeRef) -> Result<(), IrError> {
    if !node.shape().is_tabular() {
        return Err(IrError::signature(
            operation.to_string(),
            format!("expected a relation, got a {} value", node.dtype()),
        ));
    }
    Ok(())
}

fn expect_boolean(operation: OpKind, node: &NodeRef) -> Result<(), IrError> {
    expect_value(operation, node)?;
    if !node.dtype().is_boolean() {
        return Err(IrError::signature(
            operation.to_string(),
            format!("expected a boolean expression, got {}", node.dtype()),
        ));
    }
    Ok(())
}

fn expect<F>(operation: OpKind, node: &NodeRef, what: &str, accepts: F) -> Result<(), IrError>
where
    F: Fn(&DataType) -> bool,
{
    expect_value(operation, node)?;
    let dtype = node.dtype();
    if !(accepts(dtype) || dtype.is_null()) {
        return Err(IrError::signature(
            operation.to_string(),
            format!("expected {} input, got {}", what, dtype),
        ));
    }
    Ok(())
}

fn expect_unit(operation: OpKind, unit: TemporalUnit, valid: bool) -> Result<(), IrError> {
    if !valid {
        return Err(IrError::signature(
            operation.to_string(),
            format!("unit '{}' is not valid here", unit.short()),
        ));
    }
    Ok(())
}

fn derive_dtype(op: &Op) -> Result<DataType, IrError> {
    let kind = op.kind();

    match op {
        Op::NonNullLiteral { value, dtype } => {
            if value.is_null() || !value.conforms_to(dtype) {
                return Err(IrError::InvalidLiteral {
                    value: value.clone(),
                    dtype: dtype.clone(),
                });
            }
            Ok(dtype.clone())
        }

        Op::NullLiteral { dtype } => Ok(dtype.clone()),

        Op::Field { rel, name } => {
            expect_relation(kind, rel)?;
            rel.schema()
                .and_then(|fields| fields.iter().find(|f| &f.name == name))
                .map(|field| field.data_type.clone())
                .ok_or_else(|| IrError::ColumnNotFound(name.clone()))
        }

        Op::Cast { arg, to } => {
            expect_value(kind, arg)?;
            if !castable(arg.dtype(), to) {
                return Err(IrError::mismatch("cast", arg.dtype(), to));
            }
            Ok(to.clone())
        }

        Op::Binary { op, left, right } => {
            expect_value(kind, left)?;
            expect_value(kind, right)?;
            binary_dtype(*op, left.dtype(), right.dtype())
        }

        Op::Unary { op, arg } => match op {
            UnaryOp::Not => {
                expect_boolean(kind, arg)?;
                Ok(DataType::Boolean)
            }
            UnaryOp::Negate => {
                expect(kind, arg, "numeric or interval", |t| {
                    t.is_numeric() || t.is_interval()
                })?;
                Ok(arg.dtype().clone())
            }
            UnaryOp::IsNull | UnaryOp::NotNull => {
                expect_value(kind, arg)?;
                Ok(DataType::Boolean)
            }
            UnaryOp::Lowercase | UnaryOp::Uppercase => {
                expect(kind, arg, "string", DataType::is_string)?;
                Ok(DataType::String)
            }
            UnaryOp::StringLength => {
                expect(kind, arg, "string", DataType::is_string)?;
                Ok(DataType::Int32)
            }
        },

        Op::SimpleCase {
            base,
            cases,
            results,
            default,
        } => {
            check_branches(kind, cases, results)?;
            expect_value(kind, base)?;
            for case in cases {
                expect_value(kind, case)?;
                if promote(base.dtype(), case.dtype()).is_err() {
                    return Err(IrError::mismatch("simple case", base.dtype(), case.dtype()));
                }
            }
            case_result_dtype(kind, results, default)
        }

        Op::SearchedCase {
            cases,
            results,
            default,
        } => {
            check_branches(kind, cases, results)?;
            for case in cases {
                expect_boolean(kind, case)?;
            }
            case_result_dtype(kind, results, default)
        }

        Op::DateTruncate { arg, unit } => {
            expect(kind, arg, "date", DataType::is_date)?;
            expect_unit(kind, *unit, unit.is_date_unit())?;
            Ok(DataType::Date)
        }

        Op::TimestampTruncate { arg, unit: _ } => {
            expect(kind, arg, "timestamp", DataType::is_timestamp)?;
            Ok(arg.dtype().clone())
        }

        Op::TimeTruncate { arg, unit } => {
            expect(kind, arg, "time", DataType::is_time)?;
            expect_unit(kind, *unit, unit.is_time_unit())?;
            Ok(DataType::Time)
        }

        Op::DateFromYMD { year, month, day } => {
            for part in [year, month, day] {
                expect(kind, part, "integer", DataType::is_integer)?;
            }
            Ok(DataType::Date)
        }

        Op::DateNow => Ok(DataType::Date),
        Op::TimestampNow => Ok(DataType::Timestamp { timezone: None }),
        Op::RandomUUID => Ok(DataType::Uuid),

        Op::IntervalFromInteger { arg, unit } => {
            expect(kind, arg, "integer", DataType::is_integer)?;
            Ok(DataType::Interval { unit: *unit })
        }

        Op::Reduction { func, arg, where_ } => {
            expect_value(kind, arg)?;
            check_filter(kind, where_.as_ref())?;
            reduction_dtype(kind, *func, arg)
        }

        Op::OrderedReduction {
            func,
            arg,
            where_,
            order_by,
        } => {
            expect_value(kind, arg)?;
            check_filter(kind, where_.as_ref())?;
            check_sort_keys(kind, order_by)?;
            match func {
                OrderedFunc::First | OrderedFunc::Last => Ok(arg.dtype().clone()),
            }
        }

        Op::Correlation {
            left,
            right,
            how: _,
            where_,
        } => {
            expect(kind, left, "numeric", DataType::is_numeric)?;
            expect(kind, right, "numeric", DataType::is_numeric)?;
            check_filter(kind, where_.as_ref())?;
            Ok(DataType::Float64)
        }

        Op::UnboundTable { name: _, schema } => {
            check_unique_names(kind, schema.fields.iter().map(|f| f.name.as_str()))?;
            Ok(DataType::Struct(schema.fields.clone()))
        }

        Op::Project { parent, values } => {
            expect_relation(kind, parent)?;
            if values.is_empty() {
                return Err(IrError::signature(kind.to_string(), "projection is empty"));
            }
            named_struct(kind, values.iter())
        }

        Op::Filter { parent, predicates } => {
            expect_relation(kind, parent)?;
            for predicate in predicates {
                expect_boolean(kind, predicate)?;
            }
            Ok(parent.dtype().clone())
        }

        Op::Aggregate {
            parent,
            groups,
            metrics,
        } => {
            expect_relation(kind, parent)?;
            if groups.is_empty() && metrics.is_empty() {
                return Err(IrError::signature(
                    kind.to_string(),
                    "aggregate has no groups and no metrics",
                ));
            }
            if let Some(bad) = metrics.iter().find(|m| !m.value.kind().is_reduction()) {
                return Err(IrError::signature(
                    kind.to_string(),
                    format!("metric '{}' is not a reduction", bad.name),
                ));
            }
            named_struct(kind, groups.iter().chain(metrics))
        }

        Op::Sort { parent, keys } => {
            expect_relation(kind, parent)?;
            check_sort_keys(kind, keys)?;
            Ok(parent.dtype().clone())
        }

        Op::Limit { parent, .. } => {
            expect_relation(kind, parent)?;
            Ok(parent.dtype().clone())
        }
    }
}

fn binary_dtype(op: BinaryOp, left: &DataType, right: &DataType) -> Result<DataType, IrError> {
    use DataType::*;

    let kind = op.kind();
    let context = kind.to_string();

    if op.is_logical() {
        for side in [left, right] {
            if !(side.is_boolean() || side.is_null()) {
                return Err(IrError::signature(
                    context,
                    format!("expected boolean operands, got {}", side),
                ));
            }
        }
        return Ok(Boolean);
    }

    if op.is_comparison() {
        promote(left, right).map_err(|_| IrError::mismatch(context, left, right))?;
        return Ok(Boolean);
    }

    let numeric = |t: &DataType| t.is_numeric() || t.is_null();

    match (left, right) {
        (l, r) if numeric(l) && numeric(r) => {
            let promoted = promote(l, r)?;
            match op {
                BinaryOp::Divide if !promoted.is_decimal() => Ok(Float64),
                _ if promoted.is_null() => Ok(Null),
                _ => Ok(promoted),
            }
        }
        (Date | Timestamp { .. }, Interval { .. }) if matches!(op, BinaryOp::Add | BinaryOp::Subtract) => {
            Ok(left.clone())
        }
        (Interval { .. }, Date | Timestamp { .. }) if op == BinaryOp::Add => Ok(right.clone()),
        (Interval { unit: a }, Interval { unit: b })
            if a == b && matches!(op, BinaryOp::Add | BinaryOp::Subtract) =>
        {
            Ok(left.clone())
        }
        (Interval { .. }, n) if n.is_integer() && op == BinaryOp::Multiply => Ok(left.clone()),
        (n, Interval { .. }) if n.is_integer() && op == BinaryOp::Multiply => Ok(right.clone()),
        _ => Err(IrError::mismatch(context, left, right)),
    }
}

fn check_branches(kind: OpKind, cases: &[NodeRef], results: &[NodeRef]) -> Result<(), IrError> {
    if cases.is_empty() {
        return Err(IrError::signature(
            kind.to_string(),
            "at least one `when` clause is required",
        ));
    }
    if cases.len() != results.len() {
        return Err(IrError::signature(
            kind.to_string(),
            format!(
                "{} conditions but {} results",
                cases.len(),
                results.len()
            ),
        ));
    }
    Ok(())
}

fn case_result_dtype(
    kind: OpKind,
    results: &[NodeRef],
    default: &NodeRef,
) -> Result<DataType, IrError> {
    for result in results.iter().chain(std::iter::once(default)) {
        expect_value(kind, result)?;
    }
    unify(results.iter().chain(std::iter::once(default)))
}

fn check_filter(kind: OpKind, where_: Option<&NodeRef>) -> Result<(), IrError> {
    match where_ {
        Some(predicate) => expect_boolean(kind, predicate),
        None => Ok(()),
    }
}

fn check_sort_keys(kind: OpKind, keys: &[SortKey]) -> Result<(), IrError> {
    keys.iter().try_for_each(|key| expect_value(kind, &key.expr))
}

fn check_unique_names<'a, I>(kind: OpKind, names: I) -> Result<(), IrError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(IrError::signature(
                kind.to_string(),
                format!("duplicate column name '{}'", name),
            ));
        }
    }
    Ok(())
}

fn named_struct<'a, I>(kind: OpKind, values: I) -> Result<DataType, IrError>
where
    I: Iterator<Item = &'a NamedNode> + Clone,
{
    check_unique_names(kind, values.clone().map(|named| named.name.as_str()))?;
    let fields = values
        .map(|named| {
            expect_value(kind, &named.value)?;
            Ok(FieldType::new(named.name.clone(), named.value.dtype().clone()))
        })
        .collect::<Result<Vec<_>, IrError>>()?;
    Ok(DataType::Struct(fields))
}

fn reduction_dtype(kind: OpKind, func: ReductionFunc, arg: &NodeRef) -> Result<DataType, IrError> {
    let dtype = arg.dtype();
    match func {
        ReductionFunc::Count => Ok(DataType::Int64),
        ReductionFunc::Sum => match dtype {
            DataType::Boolean => Ok(DataType::Int64),
            t if t.is_signed_integer() => Ok(DataType::Int64),
            t if t.is_unsigned_integer() => Ok(DataType::UInt64),
            t if t.is_floating() => Ok(DataType::Float64),
            DataType::Decimal { scale, .. } => Ok(DataType::Decimal {
                precision: crate::MAX_DECIMAL_PRECISION,
                scale: *scale,
            }),
            t => Err(IrError::signature(
                kind.to_string(),
                format!("expected numeric input, got {}", t),
            )),
        },
        ReductionFunc::Mean => match dtype {
            DataType::Decimal { .. } => Ok(dtype.clone()),
            t if t.is_numeric() || t.is_boolean() => Ok(DataType::Float64),
            t => Err(IrError::signature(
                kind.to_string(),
                format!("expected numeric input, got {}", t),
            )),
        },
        ReductionFunc::Min
        | ReductionFunc::Max
        | ReductionFunc::Arbitrary
        | ReductionFunc::Mode => Ok(dtype.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Schema, Value};

    fn int_column() -> NodeRef {
        let table = Node::new(Op::UnboundTable {
            name: "t".to_string(),
            schema: Schema::from_pairs([("a", DataType::Int64), ("g", DataType::String)]),
        })
        .unwrap();
        Node::new(Op::Field {
            rel: table,
            name: "a".to_string(),
        })
        .unwrap()
    }

    fn literal(value: Value, dtype: DataType) -> NodeRef {
        Node::new(Op::NonNullLiteral { value, dtype }).unwrap()
    }

    #[test]
    fn test_field_lookup() {
        let column = int_column();
        assert_eq!(column.dtype(), &DataType::Int64);
        assert_eq!(column.shape(), Shape::Columnar);

        let table = column.children()[0].clone();
        let missing = Node::new(Op::Field {
            rel: table,
            name: "nope".to_string(),
        });
        assert!(matches!(missing, Err(IrError::ColumnNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_literal_must_conform() {
        let result = Node::new(Op::NonNullLiteral {
            value: Value::String("x".into()),
            dtype: DataType::Int32,
        });
        assert!(matches!(result, Err(IrError::InvalidLiteral { .. })));

        let result = Node::new(Op::NonNullLiteral {
            value: Value::Null,
            dtype: DataType::Int32,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_arithmetic_types() {
        let sum = Node::new(Op::Binary {
            op: BinaryOp::Add,
            left: int_column(),
            right: literal(Value::Int(1), DataType::Int8),
        })
        .unwrap();
        assert_eq!(sum.dtype(), &DataType::Int64);
        assert_eq!(sum.shape(), Shape::Columnar);

        let ratio = Node::new(Op::Binary {
            op: BinaryOp::Divide,
            left: literal(Value::Int(1), DataType::Int8),
            right: literal(Value::Int(2), DataType::Int8),
        })
        .unwrap();
        assert_eq!(ratio.dtype(), &DataType::Float64);
        assert_eq!(ratio.shape(), Shape::Scalar);

        let bad = Node::new(Op::Binary {
            op: BinaryOp::Add,
            left: int_column(),
            right: literal(Value::String("x".into()), DataType::String),
        });
        assert!(matches!(bad, Err(IrError::TypeMismatch { .. })));
    }

    #[test]
    fn test_comparison_requires_comparable_operands() {
        let eq = Node::new(Op::Binary {
            op: BinaryOp::Equals,
            left: int_column(),
            right: literal(Value::Int(5), DataType::Int8),
        })
        .unwrap();
        assert_eq!(eq.dtype(), &DataType::Boolean);

        let bad = Node::new(Op::Binary {
            op: BinaryOp::Equals,
            left: int_column(),
            right: literal(Value::String("5".into()), DataType::String),
        });
        assert!(matches!(bad, Err(IrError::TypeMismatch { .. })));
    }

    #[test]
    fn test_date_truncate_units() {
        let date = literal(
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()),
            DataType::Date,
        );
        assert!(Node::new(Op::DateTruncate {
            arg: date.clone(),
            unit: TemporalUnit::Month,
        })
        .is_ok());
        let bad = Node::new(Op::DateTruncate {
            arg: date,
            unit: TemporalUnit::Hour,
        });
        assert!(matches!(bad, Err(IrError::SignatureValidation { .. })));
    }

    #[test]
    fn test_reductions_are_scalar() {
        let total = Node::new(Op::Reduction {
            func: ReductionFunc::Sum,
            arg: int_column(),
            where_: None,
        })
        .unwrap();
        assert_eq!(total.dtype(), &DataType::Int64);
        assert_eq!(total.shape(), Shape::Scalar);
    }

    #[test]
    fn test_aggregate_rejects_non_reduction_metric() {
        let column = int_column();
        let table = column.children()[0].clone();
        let result = Node::new(Op::Aggregate {
            parent: table,
            groups: vec![],
            metrics: vec![NamedNode::new("a", column)],
        });
        assert!(matches!(result, Err(IrError::SignatureValidation { .. })));
    }

    #[test]
    fn test_aggregate_requires_output() {
        let table = int_column().children()[0].clone();
        let result = Node::new(Op::Aggregate {
            parent: table,
            groups: vec![],
            metrics: vec![],
        });
        assert!(matches!(result, Err(IrError::SignatureValidation { .. })));
    }

    #[test]
    fn test_json_literal_must_be_canonical() {
        let result = Node::new(Op::NonNullLiteral {
            value: Value::Json("{ \"a\" : 1 }".to_string()),
            dtype: DataType::Json,
        });
        assert!(matches!(result, Err(IrError::InvalidLiteral { .. })));

        let canonical = literal(Value::json_str("{ \"a\" : 1 }").unwrap(), DataType::Json);
        assert_eq!(
            canonical,
            literal(Value::Json("{\"a\":1}".to_string()), DataType::Json)
        );
    }

    #[test]
    fn test_non_finite_fingerprints_differ() {
        let nan = literal(Value::float(f64::NAN), DataType::Float64);
        let inf = literal(Value::float(f64::INFINITY), DataType::Float64);
        let neg = literal(Value::float(f64::NEG_INFINITY), DataType::Float64);
        assert_ne!(nan.fingerprint(), inf.fingerprint());
        assert_ne!(inf.fingerprint(), neg.fingerprint());
        assert_ne!(nan.fingerprint(), neg.fingerprint());
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let first = int_column();
        let second = int_column();
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first, second);
    }
}
