//! Typed constructors for common nodes
//!
//! Thin helpers over [`Node::new`]; every call still goes through full validation.

use chrono::NaiveDate;

use crate::{
    BinaryOp, CaseBuilder, CorrelationMode, DataType, IrError, NamedNode, Node, NodeRef, Op,
    OrderedFunc, ReductionFunc, Schema, SortKey, TemporalUnit, UnaryOp, Value,
};

pub fn literal(value: Value, dtype: DataType) -> Result<NodeRef, IrError> {
    if value.is_null() {
        return null(dtype);
    }
    Node::new(Op::NonNullLiteral { value, dtype })
}

pub fn null(dtype: DataType) -> Result<NodeRef, IrError> {
    Node::new(Op::NullLiteral { dtype })
}

pub fn string(value: &str) -> Result<NodeRef, IrError> {
    literal(Value::String(value.to_string()), DataType::String)
}

pub fn boolean(value: bool) -> Result<NodeRef, IrError> {
    literal(Value::Boolean(value), DataType::Boolean)
}

/// Integer literal typed as the narrowest signed type that holds it.
pub fn integer(value: i64) -> Result<NodeRef, IrError> {
    let dtype = [DataType::Int8, DataType::Int16, DataType::Int32]
        .into_iter()
        .find(|dtype| Value::Int(value).conforms_to(dtype))
        .unwrap_or(DataType::Int64);
    literal(Value::Int(value), dtype)
}

pub fn float64(value: f64) -> Result<NodeRef, IrError> {
    literal(Value::float(value), DataType::Float64)
}

pub fn date(value: NaiveDate) -> Result<NodeRef, IrError> {
    literal(Value::Date(value), DataType::Date)
}

pub fn table(name: &str, schema: Schema) -> Result<NodeRef, IrError> {
    Node::new(Op::UnboundTable {
        name: name.to_string(),
        schema,
    })
}

pub fn date_from_ymd(year: NodeRef, month: NodeRef, day: NodeRef) -> Result<NodeRef, IrError> {
    Node::new(Op::DateFromYMD { year, month, day })
}

/// Method-style construction on node handles.
pub trait NodeExt {
    fn field(&self, name: &str) -> Result<NodeRef, IrError>;
    fn cast(&self, to: DataType) -> Result<NodeRef, IrError>;
    fn binary(&self, op: BinaryOp, other: &NodeRef) -> Result<NodeRef, IrError>;
    fn unary(&self, op: UnaryOp) -> Result<NodeRef, IrError>;
    fn case(&self) -> CaseBuilder;
    fn if_else(&self, if_true: NodeRef, if_false: NodeRef) -> Result<NodeRef, IrError>;
    fn truncate(&self, unit: TemporalUnit) -> Result<NodeRef, IrError>;
    fn as_interval(&self, unit: TemporalUnit) -> Result<NodeRef, IrError>;
    fn reduce(&self, func: ReductionFunc) -> Result<NodeRef, IrError>;
    fn first(&self, order_by: Vec<SortKey>) -> Result<NodeRef, IrError>;
    fn last(&self, order_by: Vec<SortKey>) -> Result<NodeRef, IrError>;
    fn corr(&self, other: &NodeRef, how: CorrelationMode) -> Result<NodeRef, IrError>;

    fn equals(&self, other: &NodeRef) -> Result<NodeRef, IrError> {
        self.binary(BinaryOp::Equals, other)
    }

    fn is_null(&self) -> Result<NodeRef, IrError> {
        self.unary(UnaryOp::IsNull)
    }

    fn lower(&self) -> Result<NodeRef, IrError> {
        self.unary(UnaryOp::Lowercase)
    }

    fn select(&self, values: Vec<NamedNode>) -> Result<NodeRef, IrError>;
    fn filter(&self, predicates: Vec<NodeRef>) -> Result<NodeRef, IrError>;
}

impl NodeExt for NodeRef {
    fn field(&self, name: &str) -> Result<NodeRef, IrError> {
        Node::new(Op::Field {
            rel: self.clone(),
            name: name.to_string(),
        })
    }

    fn cast(&self, to: DataType) -> Result<NodeRef, IrError> {
        Node::new(Op::Cast {
            arg: self.clone(),
            to,
        })
    }

    fn binary(&self, op: BinaryOp, other: &NodeRef) -> Result<NodeRef, IrError> {
        Node::new(Op::Binary {
            op,
            left: self.clone(),
            right: other.clone(),
        })
    }

    fn unary(&self, op: UnaryOp) -> Result<NodeRef, IrError> {
        Node::new(Op::Unary {
            op,
            arg: self.clone(),
        })
    }

    fn case(&self) -> CaseBuilder {
        CaseBuilder::simple(self.clone())
    }

    fn if_else(&self, if_true: NodeRef, if_false: NodeRef) -> Result<NodeRef, IrError> {
        crate::case()
            .when(self.clone(), if_true)?
            .else_(if_false)
            .end()
    }

    fn truncate(&self, unit: TemporalUnit) -> Result<NodeRef, IrError> {
        let arg = self.clone();
        let op = match self.dtype() {
            DataType::Date => Op::DateTruncate { arg, unit },
            DataType::Time => Op::TimeTruncate { arg, unit },
            _ => Op::TimestampTruncate { arg, unit },
        };
        Node::new(op)
    }

    fn as_interval(&self, unit: TemporalUnit) -> Result<NodeRef, IrError> {
        Node::new(Op::IntervalFromInteger {
            arg: self.clone(),
            unit,
        })
    }

    fn reduce(&self, func: ReductionFunc) -> Result<NodeRef, IrError> {
        Node::new(Op::Reduction {
            func,
            arg: self.clone(),
            where_: None,
        })
    }

    fn first(&self, order_by: Vec<SortKey>) -> Result<NodeRef, IrError> {
        Node::new(Op::OrderedReduction {
            func: OrderedFunc::First,
            arg: self.clone(),
            where_: None,
            order_by,
        })
    }

    fn last(&self, order_by: Vec<SortKey>) -> Result<NodeRef, IrError> {
        Node::new(Op::OrderedReduction {
            func: OrderedFunc::Last,
            arg: self.clone(),
            where_: None,
            order_by,
        })
    }

    fn corr(&self, other: &NodeRef, how: CorrelationMode) -> Result<NodeRef, IrError> {
        Node::new(Op::Correlation {
            left: self.clone(),
            right: other.clone(),
            how,
            where_: None,
        })
    }

    fn select(&self, values: Vec<NamedNode>) -> Result<NodeRef, IrError> {
        Node::new(Op::Project {
            parent: self.clone(),
            values,
        })
    }

    fn filter(&self, predicates: Vec<NodeRef>) -> Result<NodeRef, IrError> {
        Node::new(Op::Filter {
            parent: self.clone(),
            predicates,
        })
    }
}
