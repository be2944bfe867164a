//! The evaluator.
//!
//! [`Interpreter::evaluate`] walks an expression tree against a [`Scope`].
//! In dynamic mode the scope is the context's live environment and writes
//! land there. In locked mode the environment chain is frozen first, every
//! write fails, and the same context evaluates to the same value no matter
//! what happens to the live environment afterwards.

use std::rc::Rc;

use lazyctx::{
    Arg, CallArgs, Closure, EvalError, EvalMode, Expr, ExpressionContext, Name, Runtime, Scope,
    Value,
};
use tracing::{debug, trace};

use crate::config::Config;
use crate::logging::init_tracing;
use crate::stdlib;

pub struct Interpreter {
    config: Config,
    depth: usize,
    mode: EvalMode,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter configured from the process environment
    /// (see [`Config::from_env`])
    pub fn new() -> Self {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Interpreter {
            config,
            depth: 0,
            mode: config.default_mode,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate in the configured default mode
    pub fn run(&mut self, ctx: &ExpressionContext) -> Result<Value, EvalError> {
        let mode = self.config.default_mode;
        self.evaluate(ctx, mode)
    }

    /// Evaluate a context.
    ///
    /// Locked mode freezes the context's scope before the first lookup.
    #[tracing::instrument(level = "debug", skip_all, fields(mode = ?mode, expr = %ctx.expression()))]
    pub fn evaluate(&mut self, ctx: &ExpressionContext, mode: EvalMode) -> Result<Value, EvalError> {
        let scope = match mode {
            EvalMode::Dynamic => ctx.scope().clone(),
            EvalMode::Locked => Scope::Locked(ctx.scope().lock()),
        };
        let outer = std::mem::replace(&mut self.mode, mode);
        let result = self.eval(ctx.expression(), &scope);
        self.mode = outer;
        if let Err(err) = &result {
            debug!(error = %err, "evaluation failed");
        }
        result
    }

    /// Call a closure or native function with evaluated arguments
    pub fn apply(&mut self, callee: &Value, args: CallArgs) -> Result<Value, EvalError> {
        match callee {
            Value::Closure(closure) => self.apply_closure(closure, args),
            Value::NativeFn(native) => {
                trace!(name = native.name, "calling native function");
                native.call(self, args)
            }
            other => Err(EvalError::NotCallable {
                value: other.to_string(),
            }),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
        if self.depth >= self.config.max_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.eval_form(expr, scope));
        self.depth -= 1;
        result
    }

    fn eval_form(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Name(name) => scope.get(*name),

            Expr::Assign { name, value } => {
                let value = self.eval(value, scope)?;
                scope.assign(*name, value.clone())?;
                Ok(value)
            }

            Expr::Call { callee, args } => {
                let callee = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.apply(&callee, args)
            }

            Expr::MacroCall { name, args } => {
                // Arguments go in unevaluated, closed over the caller's scope
                let function = scope.get(*name)?;
                let wrapped = args
                    .iter()
                    .map(|arg| Value::Context(ExpressionContext::new(Rc::clone(arg), scope.clone())))
                    .collect();
                self.apply(&function, CallArgs::new(wrapped))
            }

            Expr::Lambda { params, body } => Ok(Value::Closure(Rc::new(Closure {
                params: Rc::clone(params),
                body: Rc::clone(body),
                scope: scope.clone(),
            }))),

            Expr::Block(statements) => {
                let mut last = Value::Nil;
                for statement in statements {
                    last = self.eval(statement, scope)?;
                }
                Ok(last)
            }

            Expr::Tuple(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::tuple(values))
            }

            Expr::Index { target, key } => {
                let target = self.eval(target, scope)?;
                let key = self.eval(key, scope)?;
                stdlib::index(&target, &key)
            }

            Expr::Field { target, name } => {
                let target = self.eval(target, scope)?;
                field(&target, *name)
            }

            Expr::Deferred(inner) => Ok(Value::Context(ExpressionContext::new(
                Rc::clone(inner),
                scope.clone(),
            ))),

            Expr::Nested(ctx) => {
                let mode = self.mode;
                self.evaluate(ctx, mode)
            }

            Expr::Unsupported { form } => Err(EvalError::unsupported(form.clone())),
        }
    }

    fn eval_args(&mut self, args: &[Arg], scope: &Scope) -> Result<CallArgs, EvalError> {
        let mut call_args = CallArgs::default();
        for arg in args {
            match arg {
                Arg::Positional(expr) => {
                    let value = self.eval(expr, scope)?;
                    call_args.positional.push(value);
                }
                Arg::Splat(expr) => match self.eval(expr, scope)? {
                    Value::Tuple(items) => call_args.positional.extend(items.iter().cloned()),
                    other => return Err(EvalError::type_mismatch("splat", "tuple", other)),
                },
                Arg::Keyword(name, expr) => {
                    let value = self.eval(expr, scope)?;
                    call_args.keywords.push((*name, value));
                }
            }
        }
        Ok(call_args)
    }

    /// Bind parameters in a fresh frame and evaluate the body there.
    ///
    /// The frame's parent is the closure's defining scope. A live defining
    /// environment is branched at call time, so the body sees the
    /// environment as it is now. In locked mode, or when the closure was
    /// created during a locked evaluation, the frame is a frozen snapshot
    /// with the parameters bound at construction.
    #[tracing::instrument(level = "debug", skip_all, fields(params = %closure.params.arity()))]
    fn apply_closure(&mut self, closure: &Closure, args: CallArgs) -> Result<Value, EvalError> {
        const CALLEE: &str = "anonymous function";
        let params = &closure.params;
        let CallArgs {
            positional,
            keywords,
        } = args;

        let too_few = positional.len() < params.positional.len();
        let too_many = params.variadic.is_none() && positional.len() > params.positional.len();
        if too_few || too_many {
            return Err(EvalError::arity(CALLEE, params.arity(), positional.len()));
        }
        if let Some((keyword, _)) = keywords
            .iter()
            .find(|(k, _)| !params.keywords.iter().any(|p| p.name == *k))
        {
            return Err(EvalError::UnknownKeyword {
                callee: CALLEE.to_string(),
                keyword: *keyword,
            });
        }

        let mut surplus = positional.into_iter();
        let mut bindings: Vec<(Name, Value)> = params
            .positional
            .iter()
            .copied()
            .zip(surplus.by_ref())
            .collect();
        if let Some(rest) = params.variadic {
            bindings.push((rest, Value::tuple(surplus.collect())));
        }

        let frame = match (&closure.scope, self.mode) {
            (Scope::Live(env), EvalMode::Dynamic) => {
                let frame = env.branch();
                for (name, value) in bindings {
                    frame.set(name, value)?;
                }
                let frame = Scope::Live(frame);
                for param in &params.keywords {
                    let value = match passed_keyword(&keywords, param.name) {
                        Some(value) => value,
                        None => self.eval(&param.default, &frame)?,
                    };
                    frame.assign(param.name, value)?;
                }
                frame
            }
            (defining, _) => {
                let base = defining.lock();
                for param in &params.keywords {
                    let value = match passed_keyword(&keywords, param.name) {
                        Some(value) => value,
                        None => {
                            let staging = Scope::Locked(base.branch(bindings.clone()));
                            self.eval(&param.default, &staging)?
                        }
                    };
                    bindings.push((param.name, value));
                }
                Scope::Locked(base.branch(bindings))
            }
        };

        self.eval(&closure.body, &frame)
    }
}

impl Runtime for Interpreter {
    fn evaluate(&mut self, ctx: &ExpressionContext, mode: EvalMode) -> Result<Value, EvalError> {
        Interpreter::evaluate(self, ctx, mode)
    }

    fn apply(&mut self, callee: &Value, args: CallArgs) -> Result<Value, EvalError> {
        Interpreter::apply(self, callee, args)
    }

    fn mode(&self) -> EvalMode {
        self.mode
    }
}

/// The last value passed for `name`
/// Space left on the stack below which it is grown before recursing
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than [`RED_ZONE`] remains.
/// Evaluation recurses once per nesting level, and callers should hit
/// `RecursionLimit` rather than overflow a small thread stack.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

fn passed_keyword(keywords: &[(Name, Value)], name: Name) -> Option<Value> {
    keywords
        .iter()
        .rev()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.clone())
}

/// `target.name`
fn field(target: &Value, name: Name) -> Result<Value, EvalError> {
    match target {
        Value::Namespace(namespace) => namespace.get(&name).cloned().ok_or(EvalError::KeyNotFound {
            key: format!("{}.{name}", namespace.name()),
        }),
        other => Err(EvalError::type_mismatch(
            format!("field access .{name}"),
            "namespace",
            other,
        )),
    }
}
