//! Helpers for writing native functions.
//!
//! Each `extract_*` takes the name of the calling function so type errors
//! read `+: expected number, got "a"`.

use lazyctx::{EvalError, ExpressionContext, Name, NumericType, Value};

// ============================================================================
// Value Extraction Helpers
// ============================================================================

/// Extract a number
pub fn extract_number(callee: &str, value: &Value) -> Result<NumericType, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::type_mismatch(callee, "number", other)),
    }
}

/// Extract an integer
pub fn extract_int(callee: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Number(NumericType::Int(n)) => Ok(*n),
        other => Err(EvalError::type_mismatch(callee, "integer", other)),
    }
}

/// Extract a boolean. `nothing` counts as false.
pub fn extract_bool(callee: &str, value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Nil => Ok(false),
        other => Err(EvalError::type_mismatch(callee, "boolean", other)),
    }
}

/// Extract a name from a symbol or a string
pub fn extract_name(callee: &str, value: &Value) -> Result<Name, EvalError> {
    match value {
        Value::Symbol(name) => Ok(*name),
        Value::String(s) => Ok(Name::new(s)),
        other => Err(EvalError::type_mismatch(callee, "symbol", other)),
    }
}

/// Extract a deferred expression
pub fn extract_context<'a>(
    callee: &str,
    value: &'a Value,
) -> Result<&'a ExpressionContext, EvalError> {
    match value {
        Value::Context(ctx) => Ok(ctx),
        other => Err(EvalError::type_mismatch(callee, "expression context", other)),
    }
}

// ============================================================================
// Argument Helpers
// ============================================================================

/// Fail unless at least `n` positional arguments were passed
pub fn expect_at_least(callee: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() < n {
        return Err(EvalError::arity(callee, format!("at least {n}"), args.len()));
    }
    Ok(())
}

/// Fail if any keyword argument was passed
pub fn reject_keywords(callee: &str, keywords: &[(Name, Value)]) -> Result<(), EvalError> {
    match keywords.first() {
        Some((keyword, _)) => Err(EvalError::UnknownKeyword {
            callee: callee.to_string(),
            keyword: *keyword,
        }),
        None => Ok(()),
    }
}

/// Convert a key into a position in a sequence of `len` elements.
/// Positions start at 0.
pub fn position(index: i64, len: usize) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(EvalError::IndexOutOfBounds { index, len })
}
