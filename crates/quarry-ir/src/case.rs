//! Conditional expression builder
//!
//! ```text
//! case().when(cond, result)?.when(cond, result)?.else_(default).end()?   // SearchedCase
//! key.case().when(value, result)?.end()?                                 // SimpleCase
//! ```
//!
//! A builder starts [`CaseState::Empty`], moves to [`CaseState::Accumulating`] after the
//! first `when`, and is consumed by [`CaseBuilder::end`], which returns the finished node.

use crate::node::unify;
use crate::{castable, promote, DataType, IrError, Node, NodeRef, Op, OpKind};

/// Observable states of a live builder. Finalization consumes the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Empty,
    Accumulating,
}

/// Accumulates `(condition, result)` pairs for a case expression.
#[derive(Debug, Clone)]
#[must_use = "a case expression does nothing until `end()` is called"]
pub struct CaseBuilder {
    base: Option<NodeRef>,
    cases: Vec<NodeRef>,
    results: Vec<NodeRef>,
    default: Option<NodeRef>,
}

/// Start a searched case: each branch has its own boolean predicate.
pub fn case() -> CaseBuilder {
    CaseBuilder {
        base: None,
        cases: Vec::new(),
        results: Vec::new(),
        default: None,
    }
}

impl CaseBuilder {
    /// Start a simple case: each branch is an equality test against `base`.
    pub fn simple(base: NodeRef) -> Self {
        CaseBuilder {
            base: Some(base),
            ..case()
        }
    }

    pub fn state(&self) -> CaseState {
        if self.cases.is_empty() {
            CaseState::Empty
        } else {
            CaseState::Accumulating
        }
    }

    fn operation(&self) -> OpKind {
        if self.base.is_some() {
            OpKind::SimpleCase
        } else {
            OpKind::SearchedCase
        }
    }

    /// Append a branch.
    ///
    /// Searched cases require a boolean `case`; simple cases require a `case` comparable
    /// with the key.
    pub fn when(mut self, case: NodeRef, result: NodeRef) -> Result<Self, IrError> {
        let operation = self.operation();

        for node in [&case, &result] {
            if node.shape().is_tabular() {
                return Err(IrError::signature(
                    operation.to_string(),
                    "branches must be value expressions",
                ));
            }
        }

        match &self.base {
            Some(base) => {
                if promote(base.dtype(), case.dtype()).is_err() {
                    return Err(IrError::mismatch("simple case", base.dtype(), case.dtype()));
                }
            }
            None => {
                if !case.dtype().is_boolean() {
                    return Err(IrError::signature(
                        operation.to_string(),
                        format!("condition must be boolean, got {}", case.dtype()),
                    ));
                }
            }
        }

        self.cases.push(case);
        self.results.push(result);
        Ok(self)
    }

    /// Set the result used when no branch matches.
    pub fn else_(mut self, result: NodeRef) -> Self {
        self.default = Some(result);
        self
    }

    /// Finish the expression.
    ///
    /// Taking `self` by value is the finalized state: once `end()` runs the builder no longer
    /// exists, so no branch can be added to a finished expression.
    ///
    /// Without an explicit default, a `NULL` cast to the unified result type is used so the
    /// expression always has a value of that type.
    pub fn end(self) -> Result<NodeRef, IrError> {
        let operation = self.operation();

        if self.cases.is_empty() {
            return Err(IrError::signature(
                operation.to_string(),
                "at least one `when` clause is required",
            ));
        }

        let default = match self.default {
            Some(default) => default,
            None => {
                let unified = unify(&self.results)?;
                let null = Node::new(Op::NullLiteral {
                    dtype: DataType::Null,
                })?;
                Node::new(Op::Cast {
                    arg: null,
                    to: unified,
                })?
            }
        };

        let op = match self.base {
            Some(base) => Op::SimpleCase {
                base,
                cases: self.cases,
                results: self.results,
                default,
            },
            None => Op::SearchedCase {
                cases: self.cases,
                results: self.results,
                default,
            },
        };
        Node::new(op)
    }
}

/// Simple case from a list of `(match value, result)` pairs.
pub fn cases<I>(base: NodeRef, branches: I, default: Option<NodeRef>) -> Result<NodeRef, IrError>
where
    I: IntoIterator<Item = (NodeRef, NodeRef)>,
{
    let mut builder = CaseBuilder::simple(base);
    for (case, result) in branches {
        builder = builder.when(case, result)?;
    }
    if let Some(default) = default {
        builder = builder.else_(default);
    }
    builder.end()
}

/// `cond ? if_true : if_false`, casting a non-boolean condition to boolean first.
///
/// The cast is explicit in the resulting tree; conditions that cannot be cast are
/// rejected.
pub fn ifelse(cond: NodeRef, if_true: NodeRef, if_false: NodeRef) -> Result<NodeRef, IrError> {
    let cond = if cond.dtype().is_boolean() {
        cond
    } else if castable(cond.dtype(), &DataType::Boolean) && !cond.shape().is_tabular() {
        Node::new(Op::Cast {
            arg: cond,
            to: DataType::Boolean,
        })?
    } else {
        return Err(IrError::signature(
            "ifelse",
            format!("condition of type {} cannot be used as boolean", cond.dtype()),
        ));
    };

    case().when(cond, if_true)?.else_(if_false).end()
}
