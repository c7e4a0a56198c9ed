// ABOUTME: Error types for reader and evaluation failures

use crate::value::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Reader-level failure with the source position of the offending token
    #[error("parse error at {line}:{col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("unbound symbol: {0}")]
    Unbound(String),

    /// Operator applied to the wrong kind of value
    #[error("{op}: expected {expected}, got {actual}")]
    TypeMismatch {
        op: String,
        expected: String,
        actual: String,
    },

    /// Wrong number of arguments to a closure or primitive
    #[error("{op}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    Arity {
        op: String,
        expected: String, // "2", "at least 1", "2-3"
        actual: usize,
    },

    /// Library, symbol, or marshalling failure in the foreign bridge
    #[error("ffi: {0}")]
    Ffi(String),

    /// Host-level failure with operator context (I/O, overflow, division by zero)
    #[error("{op}: {message}")]
    Runtime { op: String, message: String },

    /// Value raised with `throw`, carried verbatim
    #[error("uncaught throw: {0}")]
    User(Value),
}

impl EvalError {
    /// Create a type mismatch error from the offending value
    pub fn type_error(op: &str, expected: &str, actual: &Value) -> Self {
        EvalError::TypeMismatch {
            op: op.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }

    pub fn arity_error(op: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::Arity {
            op: op.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime(op: &str, message: impl Into<String>) -> Self {
        EvalError::Runtime {
            op: op.to_string(),
            message: message.into(),
        }
    }
}
