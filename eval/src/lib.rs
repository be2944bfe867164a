//! lazyctx runtime - evaluation of deferred expressions
//!
//! This crate provides the evaluator for the data model in `lazyctx-core`:
//! - Tree-walking interpreter with dynamic and locked modes
//! - Base library of native functions (`Base`)
//! - Configuration and tracing setup

pub mod config;
pub mod interpreter;
pub mod logging;
pub mod native;
pub mod stdlib;

use lazyctx::{Environment, EvalError, EvalMode, Expr, ExpressionContext, Value};

pub use config::Config;
pub use interpreter::Interpreter;
pub use logging::init_tracing;
pub use stdlib::{base_namespace, register_stdlib};

/// A fresh root environment with the base library loaded
pub fn base_environment() -> Result<Environment, EvalError> {
    let env = Environment::new_root();
    register_stdlib(&env)?;
    Ok(env)
}

/// Evaluate a context with a default interpreter
pub fn evaluate(ctx: &ExpressionContext, mode: EvalMode) -> Result<Value, EvalError> {
    Interpreter::new().evaluate(ctx, mode)
}

/// Evaluate `expr` against `env` in dynamic mode
pub fn evaluate_in(env: &Environment, expr: Expr) -> Result<Value, EvalError> {
    evaluate(&ExpressionContext::new(expr, env), EvalMode::Dynamic)
}
