use quarry_ir::DataType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Operation {operation} is not supported by the {dialect} dialect: {reason}")]
    UnsupportedOperation {
        dialect: String,
        operation: String,
        reason: String,
    },

    #[error("Type {dtype} cannot be expressed in the {dialect} dialect")]
    UnsupportedType { dialect: String, dtype: DataType },

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),
}

impl CompileError {
    pub(crate) fn unsupported(
        dialect: impl Into<String>,
        operation: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        CompileError::UnsupportedOperation {
            dialect: dialect.into(),
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}
