//! Error types for transaction construction and submission

use thiserror::Error;

/// Failures while parsing a function signature or coercing call parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("bad signature: {0}")]
    BadSignature(String),

    #[error("parameter count mismatch: signature expects {expected}, got {got}")]
    ParamCountMismatch { expected: usize, got: usize },

    #[error("invalid parameter #{index} {value:?} for type {kind}: {reason}")]
    InvalidParam {
        index: usize,
        value: String,
        kind: String,
        reason: String,
    },

    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("selector mismatch: expected 0x{expected}, got 0x{got}")]
    SelectorMismatch { expected: String, got: String },

    #[error("cannot decode call data: {0}")]
    Decode(String),

    #[error("invalid ABI: {0}")]
    BadAbi(String),
}

/// Main error type for the transaction pipeline
#[derive(Error, Debug)]
pub enum TxError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Chain communication error during {operation}: {message}")]
    ChainCommunication { operation: String, message: String },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TxError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TxError::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn chain(operation: &str, message: impl ToString) -> Self {
        TxError::ChainCommunication {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Check if the caller may re-fetch inputs and retry the whole sequence
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TxError::ChainCommunication { .. } | TxError::Timeout { .. }
        )
    }

    /// Check if the error comes from user input rather than the network
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TxError::InvalidKey(_)
                | TxError::Encoding(_)
                | TxError::Build(_)
                | TxError::Validation { .. }
        )
    }
}

/// Result type for pipeline operations
pub type TxResult<T> = Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(TxError::chain("broadcast", "connection reset").is_retryable());
        assert!(TxError::Timeout {
            operation: "gas price".into()
        }
        .is_retryable());
        assert!(!TxError::Build("gas limit required".into()).is_retryable());
        assert!(TxError::InvalidKey("too short".into()).is_input_error());
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = TxError::from(EncodingError::ParamCountMismatch {
            expected: 2,
            got: 1,
        });
        assert_eq!(
            err.to_string(),
            "Encoding error: parameter count mismatch: signature expects 2, got 1"
        );
        assert_eq!(
            TxError::Build("nonce required".into()).to_string(),
            "Build error: nonce required"
        );
    }
}
