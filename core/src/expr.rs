//! Expression trees.
//!
//! A front end turns written code into an [`Expr`] and pairs it with an
//! environment. The set of forms is closed: anything the front end cannot
//! map onto one of these variants is handed over as [`Expr::Unsupported`]
//! and fails when evaluated.

use std::fmt;
use std::rc::Rc;

use crate::context::ExpressionContext;
use crate::interner::Name;
use crate::language::Value;

#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant value
    Literal(Value),
    /// A free name, resolved in the current scope
    Name(Name),
    /// `name = value`
    Assign { name: Name, value: Box<Expr> },
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Arg> },
    /// `@name args...`: arguments are wrapped unevaluated and handed to the
    /// function bound to `name`
    MacroCall { name: Name, args: Vec<Rc<Expr>> },
    /// `(params) -> body`
    Lambda { params: Rc<Params>, body: Rc<Expr> },
    /// Statements evaluated in order; the last value is the result
    Block(Vec<Expr>),
    /// `(a, b, ...)`
    Tuple(Vec<Expr>),
    /// `target[key]`
    Index { target: Box<Expr>, key: Box<Expr> },
    /// `target.name`, qualified access into a namespace
    Field { target: Box<Expr>, name: Name },
    /// A sub-tree passed on unevaluated; evaluates to a context over the
    /// current scope
    Deferred(Rc<Expr>),
    /// A sub-tree that carries its own environment
    Nested(ExpressionContext),
    /// A form the evaluator does not support
    Unsupported { form: String },
}

/// One argument at a call site.
#[derive(Debug, Clone)]
pub enum Arg {
    Positional(Expr),
    /// `xs...`: the tuple's elements become positional arguments
    Splat(Expr),
    /// `; name = value`
    Keyword(Name, Expr),
}

/// Parameter list of an anonymous function.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub positional: Vec<Name>,
    /// Trailing `rest...` collecting surplus positional arguments
    pub variadic: Option<Name>,
    pub keywords: Vec<KeywordParam>,
}

#[derive(Debug, Clone)]
pub struct KeywordParam {
    pub name: Name,
    /// Evaluated in the call scope when the keyword is not passed
    pub default: Expr,
}

impl Params {
    pub fn new<'a>(positional: impl IntoIterator<Item = &'a str>) -> Self {
        Params {
            positional: positional.into_iter().map(Name::new).collect(),
            variadic: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_variadic(mut self, name: &str) -> Self {
        self.variadic = Some(Name::new(name));
        self
    }

    pub fn with_keyword(mut self, name: &str, default: Expr) -> Self {
        self.keywords.push(KeywordParam {
            name: Name::new(name),
            default,
        });
        self
    }

    /// Human readable arity, e.g. `2` or `at least 1`
    pub fn arity(&self) -> String {
        match self.variadic {
            Some(_) => format!("at least {}", self.positional.len()),
            None => self.positional.len().to_string(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal(Value::int(n))
    }

    /// A quoted symbol literal such as `:a`
    pub fn symbol(name: &str) -> Self {
        Expr::Literal(Value::symbol(name))
    }

    pub fn name(name: &str) -> Self {
        Expr::Name(Name::new(name))
    }

    pub fn assign(name: &str, value: Expr) -> Self {
        Expr::Assign {
            name: Name::new(name),
            value: Box::new(value),
        }
    }

    pub fn call(callee: Expr, args: Vec<Arg>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Call the function bound to `name` with positional arguments
    pub fn call_named(name: &str, args: Vec<Expr>) -> Self {
        Expr::call(
            Expr::name(name),
            args.into_iter().map(Arg::Positional).collect(),
        )
    }

    /// Infix operators are ordinary calls: `a + b` is `+(a, b)`
    pub fn binary(op: &str, lhs: Expr, rhs: Expr) -> Self {
        Expr::call_named(op, vec![lhs, rhs])
    }

    pub fn macro_call(name: &str, args: Vec<Expr>) -> Self {
        Expr::MacroCall {
            name: Name::new(name),
            args: args.into_iter().map(Rc::new).collect(),
        }
    }

    pub fn lambda(params: Params, body: Expr) -> Self {
        Expr::Lambda {
            params: Rc::new(params),
            body: Rc::new(body),
        }
    }

    pub fn block(statements: Vec<Expr>) -> Self {
        Expr::Block(statements)
    }

    pub fn tuple(items: Vec<Expr>) -> Self {
        Expr::Tuple(items)
    }

    pub fn index(target: Expr, key: Expr) -> Self {
        Expr::Index {
            target: Box::new(target),
            key: Box::new(key),
        }
    }

    pub fn field(target: Expr, name: &str) -> Self {
        Expr::Field {
            target: Box::new(target),
            name: Name::new(name),
        }
    }

    pub fn deferred(expr: Expr) -> Self {
        Expr::Deferred(Rc::new(expr))
    }

    pub fn unsupported(form: &str) -> Self {
        Expr::Unsupported {
            form: form.to_string(),
        }
    }
}

impl Arg {
    pub fn positional(expr: Expr) -> Self {
        Arg::Positional(expr)
    }

    pub fn splat(expr: Expr) -> Self {
        Arg::Splat(expr)
    }

    pub fn keyword(name: &str, expr: Expr) -> Self {
        Arg::Keyword(Name::new(name), expr)
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn is_operator(name: &Name) -> bool {
    name.with_str(|s| {
        matches!(
            s,
            "+" | "-" | "*" | "/" | "<" | ">" | "<=" | ">=" | "==" | "!=" | "=>"
        )
    })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Name(name) => write!(f, "{name}"),
            Expr::Assign { name, value } => write!(f, "{name} = {value}"),
            Expr::Call { callee, args } => match (callee.as_ref(), args.as_slice()) {
                (Expr::Name(op), [Arg::Positional(lhs), Arg::Positional(rhs)])
                    if is_operator(op) =>
                {
                    write!(f, "{lhs} {op} {rhs}")
                }
                _ => {
                    write!(f, "{callee}(")?;
                    write_list(f, args)?;
                    write!(f, ")")
                }
            },
            Expr::MacroCall { name, args } => {
                write!(f, "@{name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Expr::Lambda { params, body } => write!(f, "({params}) -> {body}"),
            Expr::Block(statements) => {
                write!(f, "begin ")?;
                for statement in statements {
                    write!(f, "{statement}; ")?;
                }
                write!(f, "end")
            }
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expr::Index { target, key } => write!(f, "{target}[{key}]"),
            Expr::Field { target, name } => write!(f, "{target}.{name}"),
            Expr::Deferred(inner) => write!(f, "{inner}"),
            Expr::Nested(ctx) => write!(f, "WithContext({})", ctx.expression()),
            Expr::Unsupported { form } => write!(f, "<{form}>"),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Positional(expr) => write!(f, "{expr}"),
            Arg::Splat(expr) => write!(f, "{expr}..."),
            Arg::Keyword(name, expr) => write!(f, "{name} = {expr}"),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, &self.positional)?;
        if let Some(rest) = self.variadic {
            if !self.positional.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "{rest}...")?;
        }
        if !self.keywords.is_empty() {
            write!(f, "; ")?;
            for (i, keyword) in self.keywords.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} = {}", keyword.name, keyword.default)?;
            }
        }
        Ok(())
    }
}
