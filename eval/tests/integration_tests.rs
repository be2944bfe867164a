use lazyctx::{
    Arg, Environment, EvalError, EvalMode, Expr, ExpressionContext, Name, Params, Value,
};
use lazyeval::config::DEFAULT_MAX_DEPTH;
use lazyeval::{Config, Interpreter, base_environment, evaluate, evaluate_in};

fn plus(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary("+", lhs, rhs)
}

fn a_plus_b() -> Expr {
    plus(Expr::name("a"), Expr::name("b"))
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::call_named(name, args)
}

fn env_with(bindings: &[(&str, i64)]) -> Environment {
    let env = base_environment().unwrap();
    for (name, value) in bindings {
        env.set(*name, Value::int(*value)).unwrap();
    }
    env
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_evaluate_over_root() {
    let env = env_with(&[("a", 1), ("b", 2)]);
    assert_eq!(evaluate_in(&env, a_plus_b()), Ok(Value::int(3)));
}

#[test]
fn test_branch_shadows_without_touching_parent() {
    let env = env_with(&[("a", 1), ("b", 2)]);
    let child = env.branch();
    child.set("b", Value::int(5)).unwrap();

    assert_eq!(evaluate_in(&child, a_plus_b()), Ok(Value::int(6)));
    assert_eq!(evaluate_in(&env, a_plus_b()), Ok(Value::int(3)));
}

#[test]
fn test_closure_sees_later_rebinding() {
    let env = env_with(&[("a", 1)]);
    let f = Expr::lambda(Params::new(["x"]), plus(Expr::name("a"), Expr::name("x")));
    evaluate_in(&env, Expr::assign("f", f)).unwrap();

    let call_f = || call("f", vec![Expr::int(10)]);
    assert_eq!(evaluate_in(&env, call_f()), Ok(Value::int(11)));

    env.set("a", Value::int(100)).unwrap();
    assert_eq!(evaluate_in(&env, call_f()), Ok(Value::int(110)));
}

#[test]
fn test_merge_later_source_wins() {
    let env = Environment::new_root();
    env.merge(&[(Name::new("a"), Value::int(1)), (Name::new("b"), Value::int(2))])
        .unwrap();
    env.merge(&[(Name::new("b"), Value::int(20))]).unwrap();

    assert_eq!(env.get("b"), Ok(Value::int(20)));
    assert_eq!(env.get("a"), Ok(Value::int(1)));
}

// ============================================================================
// Dynamic scoping
// ============================================================================

#[test]
fn test_dynamic_scoping_block() {
    // a = 1; test = b -> a + b; first = test(2); a = 2; second = test(2)
    let env = base_environment().unwrap();
    let program = Expr::block(vec![
        Expr::assign("a", Expr::int(1)),
        Expr::assign(
            "test",
            Expr::lambda(Params::new(["b"]), a_plus_b()),
        ),
        Expr::assign("first_result", call("test", vec![Expr::int(2)])),
        Expr::assign("a", Expr::int(2)),
        Expr::assign("second_result", call("test", vec![Expr::int(2)])),
        Expr::tuple(vec![Expr::name("first_result"), Expr::name("second_result")]),
    ]);

    let result = evaluate_in(&env, program).unwrap();
    assert_eq!(result, Value::tuple(vec![Value::int(3), Value::int(4)]));
    assert_eq!(result.to_string(), "(3, 4)");
}

#[test]
fn test_closure_frame_reserved_names() {
    // a = 1
    // test = b -> (merge!(ENVIRONMENT, Dict(:a => 2)); a + b + PARENT[:a])
    let env = env_with(&[("a", 1)]);
    let body = Expr::block(vec![
        call(
            "merge!",
            vec![
                Expr::name("ENVIRONMENT"),
                call("Dict", vec![Expr::binary("=>", Expr::symbol("a"), Expr::int(2))]),
            ],
        ),
        plus(
            a_plus_b(),
            Expr::index(Expr::name("PARENT"), Expr::symbol("a")),
        ),
    ]);
    evaluate_in(&env, Expr::assign("test", Expr::lambda(Params::new(["b"]), body))).unwrap();

    assert_eq!(
        evaluate_in(&env, call("test", vec![Expr::int(3)])),
        Ok(Value::int(6))
    );
    // The merge landed in the call frame, not in the defining environment
    assert_eq!(env.get("a"), Ok(Value::int(1)));
}

#[test]
fn test_variadic_and_keyword_parameters() {
    // test_function = (a, b...; c = 1) -> +(a, c, b...)
    let env = base_environment().unwrap();
    let params = Params::new(["a"])
        .with_variadic("b")
        .with_keyword("c", Expr::int(1));
    let body = Expr::call(
        Expr::name("+"),
        vec![
            Arg::positional(Expr::name("a")),
            Arg::positional(Expr::name("c")),
            Arg::splat(Expr::name("b")),
        ],
    );
    let f = Expr::lambda(params, body);
    assert_eq!(f.to_string(), "(a, b...; c = 1) -> +(a, c, b...)");
    evaluate_in(&env, Expr::assign("test_function", f)).unwrap();

    let with_keyword = Expr::call(
        Expr::name("test_function"),
        vec![
            Arg::positional(Expr::int(1)),
            Arg::positional(Expr::int(2)),
            Arg::positional(Expr::int(3)),
            Arg::keyword("c", Expr::int(4)),
        ],
    );
    assert_eq!(evaluate_in(&env, with_keyword), Ok(Value::int(10)));

    let defaults = call("test_function", vec![Expr::int(1)]);
    assert_eq!(evaluate_in(&env, defaults), Ok(Value::int(2)));
}

#[test]
fn test_keyword_default_sees_positionals() {
    // f = (x; y = x + 1) -> y
    let env = base_environment().unwrap();
    let params = Params::new(["x"]).with_keyword("y", plus(Expr::name("x"), Expr::int(1)));
    let f = Expr::lambda(params, Expr::name("y"));
    evaluate_in(&env, Expr::assign("f", f)).unwrap();

    assert_eq!(
        evaluate_in(&env, call("f", vec![Expr::int(41)])),
        Ok(Value::int(42))
    );
}

#[test]
fn test_unknown_keyword() {
    let env = base_environment().unwrap();
    let f = Expr::lambda(Params::new(["x"]), Expr::name("x"));
    let expr = Expr::call(
        f,
        vec![Arg::positional(Expr::int(1)), Arg::keyword("z", Expr::int(2))],
    );
    assert_eq!(
        evaluate_in(&env, expr),
        Err(EvalError::UnknownKeyword {
            callee: "anonymous function".to_string(),
            keyword: Name::new("z"),
        })
    );
}

// ============================================================================
// Deferred expressions and macro calls
// ============================================================================

#[test]
fn test_identity_macro_returns_context() {
    let env = base_environment().unwrap();
    let program = Expr::block(vec![
        Expr::assign("a", Expr::int(1)),
        Expr::assign("b", Expr::int(2)),
        Expr::macro_call("identity", vec![a_plus_b()]),
    ]);

    let wrapped = evaluate_in(&env, program).unwrap();
    assert_eq!(wrapped.to_string(), "WithContext(a + b)");

    let Value::Context(ctx) = wrapped else {
        panic!("expected a context, got {wrapped:?}");
    };
    assert!(ctx.environment().is_some_and(|e| e.ptr_eq(&env)));
    assert_eq!(evaluate(&ctx, EvalMode::Dynamic), Ok(Value::int(3)));
}

#[test]
fn test_deferred_argument_is_not_evaluated() {
    // identity(<undefined_name>) is fine as long as nobody evaluates it
    let env = base_environment().unwrap();
    let expr = call("identity", vec![Expr::deferred(Expr::name("undefined_name"))]);
    let value = evaluate_in(&env, expr).unwrap();
    assert!(matches!(value, Value::Context(_)));

    let force = call(
        "evaluate!",
        vec![Expr::lit(value)],
    );
    assert_eq!(
        evaluate_in(&env, force),
        Err(EvalError::unbound(Name::new("undefined_name")))
    );
}

#[test]
fn test_with_macro() {
    // d = Dict(:a => 1, :b => 2); @with d a + b
    let env = base_environment().unwrap();
    let program = Expr::block(vec![
        Expr::assign(
            "d",
            call(
                "Dict",
                vec![
                    Expr::binary("=>", Expr::symbol("a"), Expr::int(1)),
                    Expr::binary("=>", Expr::symbol("b"), Expr::int(2)),
                ],
            ),
        ),
        Expr::macro_call("with", vec![Expr::name("d"), a_plus_b()]),
    ]);

    assert_eq!(evaluate_in(&env, program), Ok(Value::int(3)));
    // The data went into a copy
    assert!(!env.contains("a"));
}

#[test]
fn test_nested_context_uses_its_own_environment() {
    let outer = env_with(&[("a", 1)]);
    let inner = env_with(&[("a", 10)]);
    let nested = ExpressionContext::new(Expr::name("a"), &inner);
    let expr = plus(Expr::name("a"), Expr::Nested(nested));

    assert_eq!(evaluate_in(&outer, expr), Ok(Value::int(11)));
}

#[test]
fn test_qualified_access() {
    let env = base_environment().unwrap();
    let expr = Expr::call(
        Expr::field(Expr::name("Base"), "identity"),
        vec![Arg::positional(Expr::int(5))],
    );
    assert_eq!(evaluate_in(&env, expr), Ok(Value::int(5)));
}

#[test]
fn test_new_environment_is_independent() {
    let env = base_environment().unwrap();
    let program = Expr::block(vec![
        Expr::assign("fresh", call("new_environment", vec![])),
        call(
            "merge!",
            vec![
                Expr::name("fresh"),
                call("Dict", vec![Expr::binary("=>", Expr::symbol("x"), Expr::int(1))]),
            ],
        ),
        Expr::index(Expr::name("fresh"), Expr::symbol("x")),
    ]);

    assert_eq!(evaluate_in(&env, program), Ok(Value::int(1)));
    assert!(!env.contains("x"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unbound_name() {
    let env = base_environment().unwrap();
    let err = evaluate_in(&env, Expr::name("nope")).unwrap_err();
    assert_eq!(err.to_string(), "UnboundName: `nope` is not defined");
}

#[test]
fn test_unsupported_form_propagates_through_calls() {
    let env = base_environment().unwrap();
    let expr = plus(Expr::int(1), Expr::unsupported("try/catch"));
    assert_eq!(
        evaluate_in(&env, expr),
        Err(EvalError::unsupported("try/catch"))
    );
}

#[test]
fn test_assignment_to_reserved_name() {
    let env = base_environment().unwrap();
    let err = evaluate_in(&env, Expr::assign("PARENT", Expr::int(1))).unwrap_err();
    assert!(matches!(err, EvalError::ReservedName { name: "PARENT" }));
}

#[test]
fn test_interpreter_reusable_after_error() {
    let env = env_with(&[("a", 1), ("b", 2)]);
    let mut interp = Interpreter::new();
    let bad = ExpressionContext::new(Expr::name("missing"), &env);
    assert!(interp.evaluate(&bad, EvalMode::Dynamic).is_err());

    let good = ExpressionContext::new(a_plus_b(), &env);
    assert_eq!(interp.run(&good), Ok(Value::int(3)));
}

#[test]
fn test_runaway_recursion_is_an_error() {
    // f = x -> f(x + 1); f(0) on a default-sized test thread
    let env = base_environment().unwrap();
    let f = Expr::lambda(
        Params::new(["x"]),
        call("f", vec![plus(Expr::name("x"), Expr::int(1))]),
    );
    let program = Expr::block(vec![Expr::assign("f", f), call("f", vec![Expr::int(0)])]);
    let ctx = ExpressionContext::new(program, &env);

    let mut interp = Interpreter::with_config(Config::default());
    assert_eq!(
        interp.evaluate(&ctx, EvalMode::Dynamic),
        Err(EvalError::RecursionLimit {
            limit: DEFAULT_MAX_DEPTH
        })
    );

    // Deeper limits grow the stack instead of overflowing it
    let mut deep = Interpreter::with_config(Config::new().with_max_depth(5_000));
    assert_eq!(
        deep.evaluate(&ctx, EvalMode::Dynamic),
        Err(EvalError::RecursionLimit { limit: 5_000 })
    );
}
