use std::fmt;
use std::rc::Rc;

use im::OrdMap;

use crate::context::ExpressionContext;
use crate::environment::Environment;
use crate::expr::{Expr, Params};
use crate::interner::Name;
use crate::locked::LockedEnvironment;
use crate::namespace::Namespace;
use crate::numeric::NumericType;
use crate::runtime::NativeFunction;
use crate::scope::Scope;

// ============================================================================
// Core Type System
// ============================================================================

/// An anonymous function: parameters, body, and the scope it was defined in.
///
/// The scope is held by reference. Rebinding a name in the defining
/// environment after the closure is created changes what the next call sees.
#[derive(Clone)]
pub struct Closure {
    pub params: Rc<Params>,
    pub body: Rc<Expr>,
    pub scope: Scope,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("scope", &"<environment>")
            .finish()
    }
}

/// Immutable dictionary keyed by name, ordered by name text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    entries: OrdMap<Name, Value>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Name, Value)>,
    {
        MapValue {
            entries: pairs.into_iter().collect(),
        }
    }

    /// A new dictionary with `name` bound to `value`
    pub fn insert(&self, name: Name, value: Value) -> Self {
        MapValue {
            entries: self.entries.update(name, value),
        }
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.entries.iter()
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(NumericType),
    String(Rc<str>),
    Symbol(Name),
    Tuple(Rc<[Value]>),
    Dict(Rc<MapValue>),
    Environment(Environment),
    LockedEnvironment(Rc<LockedEnvironment>),
    Context(ExpressionContext),
    Closure(Rc<Closure>),
    NativeFn(NativeFunction),
    Namespace(Rc<Namespace>),
}

impl Value {
    pub fn int(n: i64) -> Self {
        Value::Number(NumericType::Int(n))
    }

    pub fn float(x: f64) -> Self {
        Value::Number(NumericType::Float(x))
    }

    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn symbol(s: &str) -> Self {
        Value::Symbol(Name::new(s))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Name, Value)>,
    {
        Value::Dict(Rc::new(MapValue::from_pairs(pairs)))
    }

    /// Short name of the value's kind, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(NumericType::Int(_)) => "int",
            Value::Number(NumericType::Float(_)) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Environment(_) => "environment",
            Value::LockedEnvironment(_) => "locked environment",
            Value::Context(_) => "context",
            Value::Closure(_) => "closure",
            Value::NativeFn(_) => "native function",
            Value::Namespace(_) => "namespace",
        }
    }
}

// Environments, contexts and closures compare by identity; two distinct
// environments with the same bindings are different scopes.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Environment(a), Value::Environment(b)) => a.ptr_eq(b),
            (Value::LockedEnvironment(a), Value::LockedEnvironment(b)) => Rc::ptr_eq(a, b),
            (Value::Context(a), Value::Context(b)) => a.ptr_eq(b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFn(a), Value::NativeFn(b)) => a == b,
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<NumericType> for Value {
    fn from(n: NumericType) -> Self {
        Value::Number(n)
    }
}

impl From<Environment> for Value {
    fn from(env: Environment) -> Self {
        Value::Environment(env)
    }
}

impl From<ExpressionContext> for Value {
    fn from(ctx: ExpressionContext) -> Self {
        Value::Context(ctx)
    }
}

impl From<Namespace> for Value {
    fn from(namespace: Namespace) -> Self {
        Value::Namespace(Rc::new(namespace))
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nothing"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(s) => write!(f, ":{s}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Dict(map) => {
                write!(f, "Dict(")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, ":{k} => {v}")?;
                }
                write!(f, ")")
            }
            Value::Environment(env) => match env.most_recent() {
                Some(name) => write!(f, "Environment. Most recent assignment: {name}"),
                None => write!(f, "Environment"),
            },
            Value::LockedEnvironment(_) => write!(f, "LockedEnvironment"),
            Value::Context(ctx) => write!(f, "WithContext({})", ctx.expression()),
            Value::Closure(_) => write!(f, "<closure>"),
            Value::NativeFn(native) => write!(f, "<native {}>", native.name),
            Value::Namespace(ns) => write!(f, "{}", ns.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Closure(closure) => fmt::Debug::fmt(closure, f),
            Value::Environment(env) => fmt::Debug::fmt(env, f),
            other => write!(f, "{other}"),
        }
    }
}
