//! The environment an evaluation resolves names against.

use std::rc::Rc;

use crate::environment::{Environment, check_not_reserved};
use crate::error::EvalError;
use crate::interner::Name;
use crate::language::Value;
use crate::locked::LockedEnvironment;
use crate::merge::pairs_from_value;

/// Either a live, mutable environment or a frozen snapshot.
#[derive(Clone, Debug)]
pub enum Scope {
    Live(Environment),
    Locked(Rc<LockedEnvironment>),
}

impl Scope {
    pub fn get(&self, name: Name) -> Result<Value, EvalError> {
        match self {
            Scope::Live(env) => env.get(name),
            Scope::Locked(locked) => locked.get(name),
        }
    }

    /// Write a binding. Locked scopes refuse every write.
    pub fn assign(&self, name: Name, value: Value) -> Result<(), EvalError> {
        match self {
            Scope::Live(env) => env.set(name, value),
            Scope::Locked(_) => {
                check_not_reserved(name)?;
                Err(EvalError::LockedEnvironmentWrite {
                    name,
                    value: value.to_string(),
                })
            }
        }
    }

    /// Merge a runtime value's pairs. Locked scopes refuse any non-empty
    /// merge and nothing is written.
    pub fn merge_value(&self, source: &Value) -> Result<(), EvalError> {
        match self {
            Scope::Live(env) => env.merge_value(source),
            Scope::Locked(_) => match pairs_from_value(source)?.into_iter().next() {
                Some((name, value)) => Err(EvalError::LockedEnvironmentWrite {
                    name,
                    value: value.to_string(),
                }),
                None => Ok(()),
            },
        }
    }

    /// A frozen view of this scope
    pub fn lock(&self) -> Rc<LockedEnvironment> {
        match self {
            Scope::Live(env) => env.lock(),
            Scope::Locked(locked) => Rc::clone(locked),
        }
    }

    /// A child scope whose parent is this one. Live scopes branch a new
    /// environment; locked scopes build a frozen child.
    pub fn branch(&self) -> Scope {
        match self {
            Scope::Live(env) => Scope::Live(env.branch()),
            Scope::Locked(locked) => Scope::Locked(locked.branch(Vec::new())),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Scope::Locked(_))
    }

    /// The live environment, if this scope has one
    pub fn environment(&self) -> Option<&Environment> {
        match self {
            Scope::Live(env) => Some(env),
            Scope::Locked(_) => None,
        }
    }

    /// The scope as a first-class value (what `ENVIRONMENT` evaluates to)
    pub fn to_value(&self) -> Value {
        match self {
            Scope::Live(env) => Value::Environment(env.clone()),
            Scope::Locked(locked) => Value::LockedEnvironment(Rc::clone(locked)),
        }
    }

    /// True if both scopes are the same environment or the same snapshot
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        match (self, other) {
            (Scope::Live(a), Scope::Live(b)) => a.ptr_eq(b),
            (Scope::Locked(a), Scope::Locked(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Environment> for Scope {
    fn from(env: Environment) -> Self {
        Scope::Live(env)
    }
}

impl From<&Environment> for Scope {
    fn from(env: &Environment) -> Self {
        Scope::Live(env.clone())
    }
}

impl From<Rc<LockedEnvironment>> for Scope {
    fn from(locked: Rc<LockedEnvironment>) -> Self {
        Scope::Locked(locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_scope_refuses_writes() {
        let env = Environment::new_root();
        env.set("a", Value::int(1)).unwrap();
        let scope = Scope::Locked(env.lock());

        let err = scope.assign(Name::new("a"), Value::int(2)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign 2 to a: environment is locked");
        assert_eq!(scope.get(Name::new("a")), Ok(Value::int(1)));
    }

    #[test]
    fn test_live_branch_links_parent() {
        let env = Environment::new_root();
        let child = Scope::from(&env).branch();
        let parent = child.environment().and_then(Environment::parent);
        assert!(parent.is_some_and(|p| p.ptr_eq(&env)));
    }
}
