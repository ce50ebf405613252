//! Construction-time errors for IR nodes

use thiserror::Error;

use crate::{DataType, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    #[error("Type mismatch in {context}: {left} is not compatible with {right}")]
    TypeMismatch {
        context: String,
        left: DataType,
        right: DataType,
    },

    #[error("Signature validation failed for {operation}: {reason}")]
    SignatureValidation { operation: String, reason: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid literal: {value:?} is not a valid {dtype}")]
    InvalidLiteral { value: Value, dtype: DataType },
}

impl IrError {
    pub(crate) fn signature(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        IrError::SignatureValidation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(context: impl Into<String>, left: &DataType, right: &DataType) -> Self {
        IrError::TypeMismatch {
            context: context.into(),
            left: left.clone(),
            right: right.clone(),
        }
    }
}
