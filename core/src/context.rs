//! Deferred expressions.
//!
//! An [`ExpressionContext`] is an unevaluated expression tree together with
//! the scope its free names resolve against. Both halves are shared: the
//! tree is immutable and the scope is a handle, so cloning a context is
//! cheap and many contexts may point at one environment.

use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::expr::Expr;
use crate::scope::Scope;

#[derive(Clone)]
pub struct ExpressionContext {
    expression: Rc<Expr>,
    scope: Scope,
}

impl ExpressionContext {
    pub fn new(expression: impl Into<Rc<Expr>>, scope: impl Into<Scope>) -> Self {
        ExpressionContext {
            expression: expression.into(),
            scope: scope.into(),
        }
    }

    pub fn expression(&self) -> &Rc<Expr> {
        &self.expression
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The live environment, unless this context was captured during a
    /// locked evaluation
    pub fn environment(&self) -> Option<&Environment> {
        self.scope.environment()
    }

    /// Same tree, freshly branched scope. Writes through the duplicate's
    /// environment do not reach the original's.
    pub fn duplicate(&self) -> Self {
        ExpressionContext {
            expression: Rc::clone(&self.expression),
            scope: self.scope.branch(),
        }
    }

    /// True if both contexts share the same tree and the same scope
    pub fn ptr_eq(&self, other: &ExpressionContext) -> bool {
        Rc::ptr_eq(&self.expression, &other.expression) && self.scope.ptr_eq(&other.scope)
    }
}

impl fmt::Debug for ExpressionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WithContext({})", self.expression)
    }
}
