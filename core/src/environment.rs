//! Environment for variable bindings
//!
//! An Environment is a named scope: a persistent map of bindings plus a
//! reference to itself and, unless it is a root, to the environment it was
//! branched from. Both references are answered by `get` under the reserved
//! names [`ENVIRONMENT`] and [`PARENT`].
//!
//! Environments are handles. Cloning one shares the same scope, and every
//! `set` or `merge` through any handle is visible through all of them. This
//! is what gives closures dynamic scoping: they hold the handle, not a copy.
//!
//! Lookup is local. A child does not fall back to its parent's bindings;
//! the parent is reachable only through `PARENT`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::error::EvalError;
use crate::interner::Name;
use crate::language::Value;
use crate::locked::LockedEnvironment;
use crate::merge::{MergeSource, pairs_from_value};
use crate::namespace::Namespace;
use crate::persistent::PersistentMap;

/// Reserved name under which every environment exposes itself
pub const ENVIRONMENT: &str = "ENVIRONMENT";

/// Reserved name under which a branched environment exposes its parent
pub const PARENT: &str = "PARENT";

static ENVIRONMENT_NAME: Lazy<Name> = Lazy::new(|| Name::new(ENVIRONMENT));
static PARENT_NAME: Lazy<Name> = Lazy::new(|| Name::new(PARENT));

/// The reserved self/parent references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reserved {
    SelfRef,
    ParentRef,
}

impl Reserved {
    pub(crate) fn of(name: Name) -> Option<Reserved> {
        if name == *ENVIRONMENT_NAME {
            Some(Reserved::SelfRef)
        } else if name == *PARENT_NAME {
            Some(Reserved::ParentRef)
        } else {
            None
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Reserved::SelfRef => ENVIRONMENT,
            Reserved::ParentRef => PARENT,
        }
    }
}

/// Fail if `name` is one of the reserved references
pub(crate) fn check_not_reserved(name: Name) -> Result<(), EvalError> {
    match Reserved::of(name) {
        Some(reserved) => Err(EvalError::ReservedName {
            name: reserved.as_str(),
        }),
        None => Ok(()),
    }
}

// ============================================================================
// Environment
// ============================================================================

struct EnvironmentState {
    bindings: PersistentMap<Name, Value>,
    parent: Option<Environment>,
}

/// A mutable, shared scope mapping names to values.
#[derive(Clone)]
pub struct Environment {
    state: Rc<RefCell<EnvironmentState>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new_root()
    }
}

impl Environment {
    /// Create an empty environment with no parent
    pub fn new_root() -> Self {
        Environment {
            state: Rc::new(RefCell::new(EnvironmentState {
                bindings: PersistentMap::empty(),
                parent: None,
            })),
        }
    }

    /// Create a child environment.
    ///
    /// The child starts with a copy of this environment's current bindings
    /// and records this environment as its parent. The copy is taken now:
    /// later writes to the parent are visible from the child only through
    /// `PARENT`, and writes to the child never reach the parent.
    pub fn branch(&self) -> Self {
        let bindings = self.state.borrow().bindings.compacted();
        debug!(bindings = bindings.depth(), "branching environment");
        Environment {
            state: Rc::new(RefCell::new(EnvironmentState {
                bindings,
                parent: Some(self.clone()),
            })),
        }
    }

    /// Look up a name in this environment's own bindings.
    ///
    /// `ENVIRONMENT` answers with this environment and `PARENT` with its
    /// parent; a root has no `PARENT`.
    pub fn get(&self, name: impl Into<Name>) -> Result<Value, EvalError> {
        let name = name.into();
        trace!(%name, "environment lookup");
        match Reserved::of(name) {
            Some(Reserved::SelfRef) => Ok(Value::Environment(self.clone())),
            Some(Reserved::ParentRef) => self
                .parent()
                .map(Value::Environment)
                .ok_or(EvalError::unbound(name)),
            None => self
                .state
                .borrow()
                .bindings
                .lookup(&name)
                .cloned()
                .map_err(|_| EvalError::unbound(name)),
        }
    }

    /// Bind `name` to `value`, replacing any previous binding in this
    /// environment. Every handle to this environment sees the change.
    pub fn set(&self, name: impl Into<Name>, value: Value) -> Result<(), EvalError> {
        let name = name.into();
        check_not_reserved(name)?;
        trace!(%name, "environment set");
        let mut state = self.state.borrow_mut();
        state.bindings = state.bindings.bind(name, value);
        Ok(())
    }

    /// Absorb every pair `source` produces. Later pairs win over earlier
    /// ones and over existing bindings. A source that would rebind a
    /// reserved name is rejected before anything is written.
    pub fn merge<S>(&self, source: &S) -> Result<(), EvalError>
    where
        S: MergeSource + ?Sized,
    {
        let pairs = source.merge_pairs();
        self.absorb(pairs)
    }

    /// Merge a runtime value: a dictionary, namespace, environment or
    /// tuple of `(symbol, value)` pairs.
    pub fn merge_value(&self, value: &Value) -> Result<(), EvalError> {
        let pairs = pairs_from_value(value)?;
        self.absorb(pairs)
    }

    fn absorb(&self, pairs: Vec<(Name, Value)>) -> Result<(), EvalError> {
        for (name, _) in &pairs {
            check_not_reserved(*name)?;
        }
        debug!(count = pairs.len(), "merging into environment");
        let mut state = self.state.borrow_mut();
        state.bindings = state.bindings.merge_into(pairs);
        Ok(())
    }

    /// Bind a namespace under its own name, making qualified access
    /// (`Base.identity`) available.
    pub fn import(&self, namespace: &Rc<Namespace>) -> Result<(), EvalError> {
        self.set(namespace.name(), Value::Namespace(Rc::clone(namespace)))
    }

    /// Merge a namespace's exported names into this environment
    pub fn use_namespace(&self, namespace: &Namespace) -> Result<(), EvalError> {
        self.merge(namespace)
    }

    /// Freeze this environment and its parent chain into a read-only
    /// snapshot.
    pub fn lock(&self) -> Rc<LockedEnvironment> {
        let mut ancestors = Vec::new();
        let mut next = self.parent();
        while let Some(env) = next {
            next = env.parent();
            ancestors.push(env);
        }
        debug!(ancestors = ancestors.len(), "locking environment");

        // Root first, so each snapshot links to an already frozen parent
        let parent = ancestors
            .iter()
            .rev()
            .fold(None, |parent, env| Some(env.freeze(parent)));
        self.freeze(parent)
    }

    fn freeze(&self, parent: Option<Rc<LockedEnvironment>>) -> Rc<LockedEnvironment> {
        let state = self.state.borrow();
        Rc::new(LockedEnvironment::freeze(&state.bindings, parent))
    }

    pub fn parent(&self) -> Option<Environment> {
        self.state.borrow().parent.clone()
    }

    pub fn is_root(&self) -> bool {
        self.state.borrow().parent.is_none()
    }

    /// True if both handles refer to the same environment
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// True if `get(name)` would succeed
    pub fn contains(&self, name: impl Into<Name>) -> bool {
        let name = name.into();
        match Reserved::of(name) {
            Some(Reserved::SelfRef) => true,
            Some(Reserved::ParentRef) => !self.is_root(),
            None => self.state.borrow().bindings.contains_key(&name),
        }
    }

    /// Number of distinct names bound, reserved references excluded
    pub fn len(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().bindings.is_empty()
    }

    /// Bound names, oldest first, reserved references excluded
    pub fn names(&self) -> Vec<Name> {
        self.bindings()
            .resolved()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// The most recently assigned name
    pub fn most_recent(&self) -> Option<Name> {
        self.state.borrow().bindings.head_key().copied()
    }

    /// The current binding map. Cheap: the map is persistent.
    pub fn bindings(&self) -> PersistentMap<Name, Value> {
        self.state.borrow().bindings.clone()
    }
}

impl Drop for EnvironmentState {
    // Unlink uniquely owned parents one at a time so a long branch chain
    // does not drop recursively
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(env) = next {
            match Rc::try_unwrap(env.state) {
                Ok(cell) => next = cell.into_inner().parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.most_recent() {
            Some(name) => write!(f, "Environment(most recent assignment: {name})"),
            None => write!(f, "Environment(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let env = Environment::new_root();
        env.set("a", Value::int(1)).unwrap();
        assert_eq!(env.get("a"), Ok(Value::int(1)));
    }

    #[test]
    fn test_unbound_name() {
        let env = Environment::new_root();
        assert_eq!(env.get("missing"), Err(EvalError::unbound(Name::new("missing"))));
    }

    #[test]
    fn test_root_has_self_but_no_parent() {
        let env = Environment::new_root();
        assert_eq!(env.get(ENVIRONMENT), Ok(Value::Environment(env.clone())));
        assert!(matches!(env.get(PARENT), Err(EvalError::UnboundName { .. })));
        assert!(env.contains(ENVIRONMENT));
        assert!(!env.contains(PARENT));
    }

    #[test]
    fn test_reserved_names_cannot_be_set() {
        let env = Environment::new_root();
        assert_eq!(
            env.set(ENVIRONMENT, Value::int(1)),
            Err(EvalError::ReservedName { name: ENVIRONMENT })
        );
        assert_eq!(
            env.set(PARENT, Value::int(1)),
            Err(EvalError::ReservedName { name: PARENT })
        );
    }

    #[test]
    fn test_mutation_visible_through_every_handle() {
        let env = Environment::new_root();
        let alias = env.clone();
        alias.set("a", Value::int(7)).unwrap();
        assert_eq!(env.get("a"), Ok(Value::int(7)));
    }

    #[test]
    fn test_branch_copies_and_links_parent() {
        let parent = Environment::new_root();
        parent.set("a", Value::int(1)).unwrap();

        let child = parent.branch();
        assert_eq!(child.get("a"), Ok(Value::int(1)));
        assert_eq!(child.get(PARENT), Ok(Value::Environment(parent.clone())));
        assert_eq!(child.get(ENVIRONMENT), Ok(Value::Environment(child.clone())));

        child.set("b", Value::int(2)).unwrap();
        assert!(!parent.contains("b"));

        parent.set("a", Value::int(100)).unwrap();
        assert_eq!(child.get("a"), Ok(Value::int(1)));
    }

    #[test]
    fn test_merge_rejects_reserved_without_partial_write() {
        let env = Environment::new_root();
        let pairs = vec![
            (Name::new("ok"), Value::int(1)),
            (Name::new(PARENT), Value::int(2)),
        ];
        assert!(env.merge(&pairs).is_err());
        assert!(!env.contains("ok"));
    }

    #[test]
    fn test_deep_branch_chain_locks_and_drops() {
        let root = Environment::new_root();
        root.set("a", Value::int(1)).unwrap();
        let mut env = root.clone();
        for _ in 0..100_000 {
            env = env.branch();
        }

        let locked = env.lock();
        let mut depth = 0;
        let mut current = Rc::clone(&locked);
        while let Some(parent) = current.parent().cloned() {
            current = parent;
            depth += 1;
        }
        assert_eq!(depth, 100_000);
        assert_eq!(current.get("a"), Ok(Value::int(1)));

        drop(current);
        drop(locked);
        drop(env);
        assert_eq!(root.get("a"), Ok(Value::int(1)));
    }

    #[test]
    fn test_most_recent_assignment() {
        let env = Environment::new_root();
        env.set("a", Value::int(1)).unwrap();
        assert_eq!(format!("{env:?}"), "Environment(most recent assignment: a)");
    }
}
