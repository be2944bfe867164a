//! Base library
//!
//! Native functions exported by the `Base` namespace. [`register_stdlib`]
//! merges the exports into an environment and binds the namespace itself
//! under `Base`, so both `identity(x)` and `Base.identity(x)` resolve.

use std::cmp::Ordering;
use std::rc::Rc;

use lazyctx::{
    CallArgs, Environment, EvalError, EvalMode, ExpressionContext, MapValue, Name, Namespace,
    NativeFn, NativeFunction, NumericError, NumericType, Runtime, Scope, Value, pairs_from_value,
};

use crate::native::{
    expect_at_least, extract_bool, extract_context, extract_int, extract_name, extract_number,
    position, reject_keywords,
};

// ============================================================================
// Arithmetic
// ============================================================================

type NumericOp = fn(&NumericType, &NumericType) -> Result<NumericType, NumericError>;

/// Left fold over one or more numbers
fn fold_numeric(callee: &str, args: &CallArgs, op: NumericOp) -> Result<Value, EvalError> {
    reject_keywords(callee, &args.keywords)?;
    expect_at_least(callee, &args.positional, 1)?;

    let mut acc = extract_number(callee, &args.positional[0])?;
    for value in &args.positional[1..] {
        acc = op(&acc, &extract_number(callee, value)?)?;
    }
    Ok(Value::Number(acc))
}

/// Usage: `+(1, 2, 3)` => 6
pub fn add(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    fold_numeric("+", &args, NumericType::add)
}

/// Usage: `-(5, 2)` => 3, `-(5)` => -5
pub fn sub(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    if let [single] = args.positional.as_slice() {
        reject_keywords("-", &args.keywords)?;
        return Ok(Value::Number(extract_number("-", single)?.neg()?));
    }
    fold_numeric("-", &args, NumericType::sub)
}

/// Usage: `*(2, 3, 4)` => 24
pub fn mul(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    fold_numeric("*", &args, NumericType::mul)
}

/// Usage: `/(6, 3)` => 2, `/(1, 2)` => 0.5
pub fn div(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("/", 2, &[])?;
    let lhs = extract_number("/", &args.positional[0])?;
    let rhs = extract_number("/", &args.positional[1])?;
    Ok(Value::Number(lhs.div(&rhs)?))
}

// ============================================================================
// Comparison
// ============================================================================

fn compare(callee: &str, args: &CallArgs, accept: fn(Ordering) -> bool) -> Result<Value, EvalError> {
    args.require(callee, 2, &[])?;
    let lhs = extract_number(callee, &args.positional[0])?;
    let rhs = extract_number(callee, &args.positional[1])?;
    // NaN compares false against everything
    Ok(Value::Bool(lhs.partial_cmp(&rhs).is_some_and(accept)))
}

pub fn lt(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    compare("<", &args, Ordering::is_lt)
}

pub fn gt(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    compare(">", &args, Ordering::is_gt)
}

pub fn lte(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    compare("<=", &args, Ordering::is_le)
}

pub fn gte(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    compare(">=", &args, Ordering::is_ge)
}

/// Structural equality; environments and functions compare by identity
pub fn equal(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("==", 2, &[])?;
    Ok(Value::Bool(args.positional[0] == args.positional[1]))
}

pub fn not_equal(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("!=", 2, &[])?;
    Ok(Value::Bool(args.positional[0] != args.positional[1]))
}

// ============================================================================
// Values and Collections
// ============================================================================

/// Returns its argument. Under a macro call the argument is the unevaluated
/// expression: `@identity a + b` => `WithContext(a + b)`
pub fn identity(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("identity", 1, &[])?;
    Ok(args.positional.into_iter().next().unwrap_or(Value::Nil))
}

/// Usage: `tuple(1, 2)` => `(1, 2)`
pub fn tuple(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    reject_keywords("tuple", &args.keywords)?;
    Ok(Value::tuple(args.positional))
}

/// Usage: `:a => 1` => `(:a, 1)`
pub fn pair(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("=>", 2, &[])?;
    let name = extract_name("=>", &args.positional[0])?;
    let value = args.positional[1].clone();
    Ok(Value::tuple(vec![Value::Symbol(name), value]))
}

/// Build a dictionary from pairs and keyword arguments.
/// Usage: `Dict(:a => 1, :b => 2)`, `Dict(; a = 1)`
pub fn dict(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    let CallArgs {
        positional,
        keywords,
    } = args;
    let mut pairs = pairs_from_value(&Value::tuple(positional))?;
    pairs.extend(keywords);
    Ok(Value::dict(pairs))
}

/// `target[key]`
///
/// Environments, dictionaries and namespaces are indexed by name; tuples by
/// position, starting at 0.
pub fn index(target: &Value, key: &Value) -> Result<Value, EvalError> {
    match target {
        Value::Environment(env) => env.get(extract_name("getindex", key)?),
        Value::LockedEnvironment(locked) => locked.get(extract_name("getindex", key)?),
        Value::Dict(map) => {
            let name = extract_name("getindex", key)?;
            map.get(&name)
                .cloned()
                .ok_or(EvalError::KeyNotFound {
                    key: format!(":{name}"),
                })
        }
        Value::Namespace(namespace) => {
            let name = extract_name("getindex", key)?;
            namespace.get(&name).cloned().ok_or(EvalError::KeyNotFound {
                key: format!("{}.{name}", namespace.name()),
            })
        }
        Value::Tuple(items) => {
            let i = position(extract_int("getindex", key)?, items.len())?;
            Ok(items[i].clone())
        }
        other => Err(EvalError::type_mismatch(
            "getindex",
            "environment, dictionary, namespace or tuple",
            other,
        )),
    }
}

pub fn getindex(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("getindex", 2, &[])?;
    index(&args.positional[0], &args.positional[1])
}

pub fn haskey(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("haskey", 2, &[])?;
    let (target, key) = (&args.positional[0], &args.positional[1]);
    let found = match target {
        Value::Environment(env) => env.contains(extract_name("haskey", key)?),
        Value::LockedEnvironment(locked) => locked.get(extract_name("haskey", key)?).is_ok(),
        Value::Dict(map) => map.contains(&extract_name("haskey", key)?),
        Value::Namespace(namespace) => namespace.get(&extract_name("haskey", key)?).is_some(),
        Value::Tuple(items) => position(extract_int("haskey", key)?, items.len()).is_ok(),
        other => {
            return Err(EvalError::type_mismatch(
                "haskey",
                "environment, dictionary, namespace or tuple",
                other,
            ));
        }
    };
    Ok(Value::Bool(found))
}

pub fn length(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("length", 1, &[])?;
    let len = match &args.positional[0] {
        Value::Tuple(items) => items.len(),
        Value::Dict(map) => map.len(),
        Value::String(s) => s.chars().count(),
        Value::Environment(env) => env.len(),
        Value::LockedEnvironment(locked) => locked.len(),
        Value::Namespace(namespace) => namespace.exports().count(),
        other => return Err(EvalError::type_mismatch("length", "collection", other)),
    };
    Ok(Value::int(len as i64))
}

// ============================================================================
// Environments and Contexts
// ============================================================================

/// Merge sources into an environment, in order. Returns the environment.
/// Usage: `merge!(ENVIRONMENT, Dict(:a => 2))`
pub fn merge_bang(rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    reject_keywords("merge!", &args.keywords)?;
    expect_at_least("merge!", &args.positional, 1)?;
    let (target, sources) = args.positional.split_at(1);
    let scope = match &target[0] {
        Value::Environment(env) => Scope::Live(env.clone()),
        Value::LockedEnvironment(locked) => Scope::Locked(Rc::clone(locked)),
        other => return Err(EvalError::type_mismatch("merge!", "environment", other)),
    };
    let scope = writable(&*rt, scope);
    for source in sources {
        scope.merge_value(source)?;
    }
    Ok(target[0].clone())
}

/// The scope a builtin writes through. During a locked evaluation every
/// environment is seen as its snapshot, including live ones reached through
/// a binding or a context captured earlier, so the write is refused.
fn writable(rt: &dyn Runtime, scope: Scope) -> Scope {
    match rt.mode() {
        EvalMode::Locked => Scope::Locked(scope.lock()),
        EvalMode::Dynamic => scope,
    }
}

/// Non-mutating merge into a dictionary.
/// Usage: `merge(Dict(:a => 1), Dict(:a => 2))` => `Dict(:a => 2)`
pub fn merge(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    reject_keywords("merge", &args.keywords)?;
    expect_at_least("merge", &args.positional, 1)?;
    let mut map = match &args.positional[0] {
        Value::Dict(map) => MapValue::clone(map),
        other => return Err(EvalError::type_mismatch("merge", "dictionary", other)),
    };
    for source in &args.positional[1..] {
        for (name, value) in pairs_from_value(source)? {
            map = map.insert(name, value);
        }
    }
    Ok(Value::Dict(Rc::new(map)))
}

/// Copy a value. Contexts are duplicated onto a branched environment and
/// environments are branched; everything else is immutable and returned
/// as is.
pub fn copy(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("copy", 1, &[])?;
    Ok(match &args.positional[0] {
        Value::Context(ctx) => Value::Context(ctx.duplicate()),
        Value::Environment(env) => Value::Environment(env.branch()),
        other => other.clone(),
    })
}

/// Evaluate a context. `locked` defaults to the mode of the running
/// evaluation and can only tighten it: inside a locked evaluation the
/// context is evaluated locked whatever the keyword says.
/// Usage: `evaluate!(w)`, `evaluate!(w; locked = true)`
pub fn evaluate_bang(rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("evaluate!", 1, &["locked"])?;
    let requested = match args.keyword("locked") {
        Some(flag) => extract_bool("evaluate!", flag)?,
        None => false,
    };
    let mode = match rt.mode() {
        EvalMode::Locked => EvalMode::Locked,
        EvalMode::Dynamic if requested => EvalMode::Locked,
        EvalMode::Dynamic => EvalMode::Dynamic,
    };
    let ctx = extract_context("evaluate!", &args.positional[0])?;
    rt.evaluate(ctx, mode)
}

/// Evaluate `body` with the bindings of `data` merged into a copy of its
/// environment. `data` may be a context or an already evaluated value.
/// Usage: `@with d a + b`
pub fn with(rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("with", 2, &[])?;
    let mode = rt.mode();
    let data = match &args.positional[0] {
        Value::Context(ctx) => rt.evaluate(ctx, mode)?,
        other => other.clone(),
    };
    let body = extract_context("with", &args.positional[1])?;

    let copy = match body.scope() {
        Scope::Live(_) => {
            let copy = body.duplicate();
            copy.scope().merge_value(&data)?;
            copy
        }
        // The copy is new, so binding into it leaves every existing
        // snapshot untouched
        Scope::Locked(locked) => ExpressionContext::new(
            Rc::clone(body.expression()),
            locked.branch(pairs_from_value(&data)?),
        ),
    };
    rt.evaluate(&copy, mode)
}

/// A fresh root environment with the base library loaded
pub fn new_environment(_rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    args.require("new_environment", 0, &[])?;
    Ok(Value::Environment(crate::base_environment()?))
}

/// Evaluate each context to a namespace, in order, and hand it to `bind`
/// together with the scope the context was written in. Returns the last
/// namespace.
fn for_each_namespace(
    rt: &mut dyn Runtime,
    callee: &str,
    args: CallArgs,
    bind: fn(&Scope, Rc<Namespace>) -> Result<(), EvalError>,
) -> Result<Value, EvalError> {
    reject_keywords(callee, &args.keywords)?;
    expect_at_least(callee, &args.positional, 1)?;
    let mut last = Value::Nil;
    for arg in &args.positional {
        let ctx = extract_context(callee, arg)?;
        let mode = rt.mode();
        let namespace = match rt.evaluate(ctx, mode)? {
            Value::Namespace(namespace) => namespace,
            other => return Err(EvalError::type_mismatch(callee, "namespace", &other)),
        };
        bind(&writable(&*rt, ctx.scope().clone()), Rc::clone(&namespace))?;
        last = Value::Namespace(namespace);
    }
    Ok(last)
}

/// Bind each namespace under its own name in the caller's environment.
/// Usage: `@import_to_environment Base Other`
pub fn import_to_environment(rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    for_each_namespace(rt, "import_to_environment", args, |scope, namespace| {
        scope.assign(namespace.name(), Value::Namespace(namespace))
    })
}

/// Merge each namespace's exports into the caller's environment, in order.
/// Usage: `@use_in_environment Base Other`
pub fn use_in_environment(rt: &mut dyn Runtime, args: CallArgs) -> Result<Value, EvalError> {
    for_each_namespace(rt, "use_in_environment", args, |scope, namespace| {
        scope.merge_value(&Value::Namespace(namespace))
    })
}

// ============================================================================
// Registration
// ============================================================================

const BASE: &[(&str, NativeFn)] = &[
    // Arithmetic
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    // Comparison
    ("<", lt),
    (">", gt),
    ("<=", lte),
    (">=", gte),
    ("==", equal),
    ("!=", not_equal),
    // Values and collections
    ("identity", identity),
    ("tuple", tuple),
    ("=>", pair),
    ("Dict", dict),
    ("getindex", getindex),
    ("haskey", haskey),
    ("length", length),
    // Environments and contexts
    ("merge!", merge_bang),
    ("merge", merge),
    ("copy", copy),
    ("evaluate!", evaluate_bang),
    ("with", with),
    ("new_environment", new_environment),
    ("import_to_environment", import_to_environment),
    ("use_in_environment", use_in_environment),
];

/// The `Base` namespace, every builtin exported
pub fn base_namespace() -> Namespace {
    BASE.iter().fold(Namespace::new("Base"), |namespace, &(name, func)| {
        namespace.export(name, Value::NativeFn(NativeFunction::new(name, func)))
    })
}

/// Load the base library into an environment: exports merged in, and the
/// namespace bound as `Base`
pub fn register_stdlib(env: &Environment) -> Result<(), EvalError> {
    let base = Rc::new(base_namespace());
    env.use_namespace(&base)?;
    env.import(&base)
}

/// Names the base library binds, in registration order
pub fn builtin_names() -> impl Iterator<Item = Name> {
    BASE.iter().map(|(name, _)| Name::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use pretty_assertions::assert_eq;

    fn call(func: NativeFn, args: Vec<Value>) -> Result<Value, EvalError> {
        func(&mut Interpreter::new(), CallArgs::new(args))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            call(add, vec![Value::int(1), Value::int(2), Value::int(3)]),
            Ok(Value::int(6))
        );
        assert_eq!(call(sub, vec![Value::int(5)]), Ok(Value::int(-5)));
        assert_eq!(call(mul, vec![Value::int(2), Value::float(1.5)]), Ok(Value::float(3.0)));
        assert_eq!(call(div, vec![Value::int(1), Value::int(2)]), Ok(Value::float(0.5)));
        assert!(matches!(
            call(div, vec![Value::int(1), Value::int(0)]),
            Err(EvalError::Numeric(NumericError::DivisionByZero))
        ));
        assert!(matches!(call(add, vec![]), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(call(lt, vec![Value::int(1), Value::float(1.5)]), Ok(Value::Bool(true)));
        assert_eq!(call(gte, vec![Value::int(1), Value::int(2)]), Ok(Value::Bool(false)));
        assert_eq!(
            call(lt, vec![Value::float(f64::NAN), Value::int(1)]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_dict_from_pairs_and_keywords() {
        let pair_ab = call(pair, vec![Value::symbol("a"), Value::int(1)]).unwrap();
        let args = CallArgs::new(vec![pair_ab]).with_keyword("b", Value::int(2));
        let value = dict(&mut Interpreter::new(), args).unwrap();
        assert_eq!(value.to_string(), "Dict(:a => 1, :b => 2)");
    }

    #[test]
    fn test_index_tuple_from_zero() {
        let t = Value::tuple(vec![Value::int(3), Value::int(4)]);
        assert_eq!(index(&t, &Value::int(1)), Ok(Value::int(4)));
        assert_eq!(
            index(&t, &Value::int(2)),
            Err(EvalError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_merge_does_not_touch_input() {
        let original = Value::dict([(Name::new("a"), Value::int(1))]);
        let update = Value::dict([(Name::new("a"), Value::int(2))]);
        let merged = call(merge, vec![original.clone(), update]).unwrap();
        assert_eq!(merged.to_string(), "Dict(:a => 2)");
        assert_eq!(original.to_string(), "Dict(:a => 1)");
    }

    #[test]
    fn test_merge_bang_into_locked_fails() {
        let env = Environment::new_root();
        env.set("a", Value::int(1)).unwrap();
        let locked = Value::LockedEnvironment(env.lock());
        let update = Value::dict([(Name::new("a"), Value::int(2))]);
        let err = call(merge_bang, vec![locked, update]).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign 2 to a: environment is locked");
        assert_eq!(env.get("a"), Ok(Value::int(1)));
    }

    #[test]
    fn test_base_namespace_exports_everything() {
        let base = base_namespace();
        assert_eq!(base.exports().count(), BASE.len());
        assert!(builtin_names().all(|name| base.is_exported(&name)));
    }

    #[test]
    fn test_register_stdlib() {
        let env = Environment::new_root();
        register_stdlib(&env).unwrap();
        assert!(env.contains("identity"));
        assert!(matches!(env.get("Base"), Ok(Value::Namespace(_))));
    }
}
