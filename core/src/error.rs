//! Evaluation errors.
//!
//! Every failure in environment access or evaluation is an [`EvalError`].
//! Errors abort the evaluation in progress and are returned to the caller
//! unchanged; nothing here is retried.

use thiserror::Error;

use crate::interner::Name;
use crate::numeric::NumericError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A name had no binding in the environment it was looked up in
    #[error("UnboundName: `{name}` is not defined")]
    UnboundName { name: Name },

    /// An assignment or merge was attempted against a locked environment
    #[error("Cannot assign {value} to {name}: environment is locked")]
    LockedEnvironmentWrite { name: Name, value: String },

    /// The evaluator does not handle this expression form
    #[error("UnsupportedExpressionForm: {form}")]
    UnsupportedExpressionForm { form: String },

    /// `ENVIRONMENT` and `PARENT` are maintained by the environment itself
    #[error("`{name}` is reserved and cannot be rebound")]
    ReservedName { name: &'static str },

    #[error("Cannot apply non-function: {value}")]
    NotCallable { value: String },

    #[error("{callee}: expected {expected} arguments, got {got}")]
    Arity {
        callee: String,
        expected: String,
        got: usize,
    },

    #[error("{callee}: unsupported keyword argument `{keyword}`")]
    UnknownKeyword { callee: String, keyword: Name },

    #[error("{context}: expected {expected}, got {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: String,
    },

    /// The value cannot be turned into `(name, value)` pairs
    #[error("Cannot merge {found} into an environment")]
    NotMergeable { found: String },

    #[error("key {key} not found")]
    KeyNotFound { key: String },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("recursion limit of {limit} exceeded")]
    RecursionLimit { limit: usize },

    #[error(transparent)]
    Numeric(#[from] NumericError),
}

impl EvalError {
    pub fn unbound(name: Name) -> Self {
        EvalError::UnboundName { name }
    }

    pub fn unsupported(form: impl Into<String>) -> Self {
        EvalError::UnsupportedExpressionForm { form: form.into() }
    }

    pub fn type_mismatch(
        context: impl Into<String>,
        expected: &'static str,
        found: impl std::fmt::Display,
    ) -> Self {
        EvalError::TypeMismatch {
            context: context.into(),
            expected,
            found: found.to_string(),
        }
    }

    pub fn arity(callee: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        EvalError::Arity {
            callee: callee.into(),
            expected: expected.into(),
            got,
        }
    }
}
