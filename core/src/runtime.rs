//! The seam between core values and the evaluator.
//!
//! Native functions live in values, but some of them (`evaluate!`, `with`)
//! need to evaluate contexts or call closures. They do that through
//! [`Runtime`], which the evaluator crate implements.

use std::fmt;

use crate::context::ExpressionContext;
use crate::error::EvalError;
use crate::interner::Name;
use crate::language::Value;

/// How an evaluation resolves and writes names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalMode {
    /// Reads and writes go straight to the live environment.
    #[default]
    Dynamic,
    /// The environment chain is frozen first; writes fail.
    Locked,
}

/// Evaluated arguments of a call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(Name, Value)>,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        CallArgs {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, name: &str, value: Value) -> Self {
        self.keywords.push((Name::new(name), value));
        self
    }

    /// The last keyword argument passed under `name`
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .rev()
            .find(|(k, _)| k.is(name))
            .map(|(_, v)| v)
    }

    /// Fail unless exactly `n` positional arguments were passed and no
    /// keyword outside `allowed_keywords` was used.
    pub fn require(
        &self,
        callee: &str,
        n: usize,
        allowed_keywords: &[&str],
    ) -> Result<(), EvalError> {
        if self.positional.len() != n {
            return Err(EvalError::arity(
                callee,
                n.to_string(),
                self.positional.len(),
            ));
        }
        match self
            .keywords
            .iter()
            .find(|(k, _)| !allowed_keywords.iter().any(|allowed| k.is(allowed)))
        {
            Some((keyword, _)) => Err(EvalError::UnknownKeyword {
                callee: callee.to_string(),
                keyword: *keyword,
            }),
            None => Ok(()),
        }
    }
}

/// Callback interface native functions use to reach the evaluator.
pub trait Runtime {
    /// Evaluate a deferred expression in the given mode
    fn evaluate(&mut self, ctx: &ExpressionContext, mode: EvalMode) -> Result<Value, EvalError>;

    /// Call a closure or native function with already evaluated arguments
    fn apply(&mut self, callee: &Value, args: CallArgs) -> Result<Value, EvalError>;

    /// Mode of the evaluation currently running
    fn mode(&self) -> EvalMode;
}

/// Native function type - Rust functions callable from expressions
pub type NativeFn = fn(&mut dyn Runtime, CallArgs) -> Result<Value, EvalError>;

/// A named native function.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

impl NativeFunction {
    pub const fn new(name: &'static str, func: NativeFn) -> Self {
        NativeFunction { name, func }
    }

    pub fn call(&self, runtime: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
        (self.func)(runtime, args)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && std::ptr::fn_addr_eq(self.func, other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}
