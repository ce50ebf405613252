//! The closed operation set

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DataType, NodeRef, Schema, TemporalUnit, Value};

/// Operation tag. One entry per distinct operation a dialect may support or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpKind {
    // Leaves
    NonNullLiteral,
    NullLiteral,
    Field,

    // Scalar
    Cast,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Not,
    Negate,
    IsNull,
    NotNull,
    Lowercase,
    Uppercase,
    StringLength,

    // Conditional
    SimpleCase,
    SearchedCase,

    // Temporal
    DateTruncate,
    TimestampTruncate,
    TimeTruncate,
    DateFromYMD,
    DateNow,
    TimestampNow,
    IntervalFromInteger,

    // Misc
    RandomUUID,

    // Reductions
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Arbitrary,
    Mode,
    First,
    Last,
    Correlation,

    // Relations
    UnboundTable,
    Project,
    Filter,
    Aggregate,
    Sort,
    Limit,
}

impl OpKind {
    pub fn is_reduction(&self) -> bool {
        matches!(
            self,
            OpKind::Count
                | OpKind::Sum
                | OpKind::Mean
                | OpKind::Min
                | OpKind::Max
                | OpKind::Arbitrary
                | OpKind::Mode
                | OpKind::First
                | OpKind::Last
                | OpKind::Correlation
        )
    }

    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            OpKind::UnboundTable
                | OpKind::Project
                | OpKind::Filter
                | OpKind::Aggregate
                | OpKind::Sort
                | OpKind::Limit
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    // Comparison
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn kind(&self) -> OpKind {
        match self {
            BinaryOp::Add => OpKind::Add,
            BinaryOp::Subtract => OpKind::Subtract,
            BinaryOp::Multiply => OpKind::Multiply,
            BinaryOp::Divide => OpKind::Divide,
            BinaryOp::Modulus => OpKind::Modulus,
            BinaryOp::Equals => OpKind::Equals,
            BinaryOp::NotEquals => OpKind::NotEquals,
            BinaryOp::Less => OpKind::Less,
            BinaryOp::LessEqual => OpKind::LessEqual,
            BinaryOp::Greater => OpKind::Greater,
            BinaryOp::GreaterEqual => OpKind::GreaterEqual,
            BinaryOp::And => OpKind::And,
            BinaryOp::Or => OpKind::Or,
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulus
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    NotNull,
    Lowercase,
    Uppercase,
    StringLength,
}

impl UnaryOp {
    pub fn kind(&self) -> OpKind {
        match self {
            UnaryOp::Not => OpKind::Not,
            UnaryOp::Negate => OpKind::Negate,
            UnaryOp::IsNull => OpKind::IsNull,
            UnaryOp::NotNull => OpKind::NotNull,
            UnaryOp::Lowercase => OpKind::Lowercase,
            UnaryOp::Uppercase => OpKind::Uppercase,
            UnaryOp::StringLength => OpKind::StringLength,
        }
    }
}

/// Reductions without ordering semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReductionFunc {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Arbitrary,
    Mode,
}

impl ReductionFunc {
    pub fn kind(&self) -> OpKind {
        match self {
            ReductionFunc::Count => OpKind::Count,
            ReductionFunc::Sum => OpKind::Sum,
            ReductionFunc::Mean => OpKind::Mean,
            ReductionFunc::Min => OpKind::Min,
            ReductionFunc::Max => OpKind::Max,
            ReductionFunc::Arbitrary => OpKind::Arbitrary,
            ReductionFunc::Mode => OpKind::Mode,
        }
    }
}

/// `First` and `Last`, whose result depends on row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderedFunc {
    First,
    Last,
}

impl OrderedFunc {
    pub fn kind(&self) -> OpKind {
        match self {
            OrderedFunc::First => OpKind::First,
            OrderedFunc::Last => OpKind::Last,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderedFunc::First => "first",
            OrderedFunc::Last => "last",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMode {
    Sample,
    #[serde(alias = "pop")]
    Population,
}

impl fmt::Display for CorrelationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMode::Sample => f.write_str("sample"),
            CorrelationMode::Population => f.write_str("pop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: NodeRef,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

impl SortKey {
    pub fn asc(expr: NodeRef) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    pub fn desc(expr: NodeRef) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

/// A value bound to an output column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedNode {
    pub name: String,
    pub value: NodeRef,
}

impl NamedNode {
    pub fn new(name: impl Into<String>, value: NodeRef) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Operation payload of a node: the kind plus its ordered inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Op {
    NonNullLiteral {
        value: Value,
        dtype: DataType,
    },
    NullLiteral {
        dtype: DataType,
    },
    Field {
        rel: NodeRef,
        name: String,
    },
    Cast {
        arg: NodeRef,
        to: DataType,
    },
    Binary {
        op: BinaryOp,
        left: NodeRef,
        right: NodeRef,
    },
    Unary {
        op: UnaryOp,
        arg: NodeRef,
    },
    SimpleCase {
        base: NodeRef,
        cases: Vec<NodeRef>,
        results: Vec<NodeRef>,
        default: NodeRef,
    },
    SearchedCase {
        cases: Vec<NodeRef>,
        results: Vec<NodeRef>,
        default: NodeRef,
    },
    DateTruncate {
        arg: NodeRef,
        unit: TemporalUnit,
    },
    TimestampTruncate {
        arg: NodeRef,
        unit: TemporalUnit,
    },
    TimeTruncate {
        arg: NodeRef,
        unit: TemporalUnit,
    },
    DateFromYMD {
        year: NodeRef,
        month: NodeRef,
        day: NodeRef,
    },
    DateNow,
    TimestampNow,
    RandomUUID,
    IntervalFromInteger {
        arg: NodeRef,
        unit: TemporalUnit,
    },
    Reduction {
        func: ReductionFunc,
        arg: NodeRef,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        where_: Option<NodeRef>,
    },
    OrderedReduction {
        func: OrderedFunc,
        arg: NodeRef,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        where_: Option<NodeRef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        order_by: Vec<SortKey>,
    },
    Correlation {
        left: NodeRef,
        right: NodeRef,
        how: CorrelationMode,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        where_: Option<NodeRef>,
    },
    UnboundTable {
        name: String,
        schema: Schema,
    },
    Project {
        parent: NodeRef,
        values: Vec<NamedNode>,
    },
    Filter {
        parent: NodeRef,
        predicates: Vec<NodeRef>,
    },
    Aggregate {
        parent: NodeRef,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        groups: Vec<NamedNode>,
        metrics: Vec<NamedNode>,
    },
    Sort {
        parent: NodeRef,
        keys: Vec<SortKey>,
    },
    Limit {
        parent: NodeRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        n: Option<u64>,
        #[serde(default)]
        offset: u64,
    },
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::NonNullLiteral { .. } => OpKind::NonNullLiteral,
            Op::NullLiteral { .. } => OpKind::NullLiteral,
            Op::Field { .. } => OpKind::Field,
            Op::Cast { .. } => OpKind::Cast,
            Op::Binary { op, .. } => op.kind(),
            Op::Unary { op, .. } => op.kind(),
            Op::SimpleCase { .. } => OpKind::SimpleCase,
            Op::SearchedCase { .. } => OpKind::SearchedCase,
            Op::DateTruncate { .. } => OpKind::DateTruncate,
            Op::TimestampTruncate { .. } => OpKind::TimestampTruncate,
            Op::TimeTruncate { .. } => OpKind::TimeTruncate,
            Op::DateFromYMD { .. } => OpKind::DateFromYMD,
            Op::DateNow => OpKind::DateNow,
            Op::TimestampNow => OpKind::TimestampNow,
            Op::RandomUUID => OpKind::RandomUUID,
            Op::IntervalFromInteger { .. } => OpKind::IntervalFromInteger,
            Op::Reduction { func, .. } => func.kind(),
            Op::OrderedReduction { func, .. } => func.kind(),
            Op::Correlation { .. } => OpKind::Correlation,
            Op::UnboundTable { .. } => OpKind::UnboundTable,
            Op::Project { .. } => OpKind::Project,
            Op::Filter { .. } => OpKind::Filter,
            Op::Aggregate { .. } => OpKind::Aggregate,
            Op::Sort { .. } => OpKind::Sort,
            Op::Limit { .. } => OpKind::Limit,
        }
    }

    /// Direct child nodes in input order.
    pub fn children(&self) -> Vec<&NodeRef> {
        match self {
            Op::NonNullLiteral { .. }
            | Op::NullLiteral { .. }
            | Op::DateNow
            | Op::TimestampNow
            | Op::RandomUUID
            | Op::UnboundTable { .. } => Vec::new(),
            Op::Field { rel, .. } => vec![rel],
            Op::Cast { arg, .. }
            | Op::Unary { arg, .. }
            | Op::DateTruncate { arg, .. }
            | Op::TimestampTruncate { arg, .. }
            | Op::TimeTruncate { arg, .. }
            | Op::IntervalFromInteger { arg, .. } => vec![arg],
            Op::Binary { left, right, .. } => vec![left, right],
            Op::SimpleCase {
                base,
                cases,
                results,
                default,
            } => std::iter::once(base)
                .chain(cases)
                .chain(results)
                .chain(std::iter::once(default))
                .collect(),
            Op::SearchedCase {
                cases,
                results,
                default,
            } => cases
                .iter()
                .chain(results)
                .chain(std::iter::once(default))
                .collect(),
            Op::DateFromYMD { year, month, day } => vec![year, month, day],
            Op::Reduction { arg, where_, .. } => std::iter::once(arg).chain(where_).collect(),
            Op::OrderedReduction {
                arg,
                where_,
                order_by,
                ..
            } => std::iter::once(arg)
                .chain(where_)
                .chain(order_by.iter().map(|key| &key.expr))
                .collect(),
            Op::Correlation {
                left,
                right,
                where_,
                ..
            } => vec![left, right].into_iter().chain(where_).collect(),
            Op::Project { parent, values } => std::iter::once(parent)
                .chain(values.iter().map(|named| &named.value))
                .collect(),
            Op::Filter { parent, predicates } => {
                std::iter::once(parent).chain(predicates).collect()
            }
            Op::Aggregate {
                parent,
                groups,
                metrics,
            } => std::iter::once(parent)
                .chain(groups.iter().chain(metrics).map(|named| &named.value))
                .collect(),
            Op::Sort { parent, keys } => std::iter::once(parent)
                .chain(keys.iter().map(|key| &key.expr))
                .collect(),
            Op::Limit { parent, .. } => vec![parent],
        }
    }
}
