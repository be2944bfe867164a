//! Frozen, read-only environments.
//!
//! Locking an environment resolves its persistent map into a flat table and
//! does the same for every parent up to the root. Nothing reachable from a
//! [`LockedEnvironment`] can change afterwards, so evaluating the same
//! expression against it twice gives the same answer.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::environment::Reserved;
use crate::error::EvalError;
use crate::interner::Name;
use crate::language::Value;
use crate::persistent::PersistentMap;

pub struct LockedEnvironment {
    /// Visible bindings, oldest first
    entries: Vec<(Name, Value)>,
    index: FxHashMap<Name, usize>,
    parent: Option<Rc<LockedEnvironment>>,
}

impl LockedEnvironment {
    pub(crate) fn freeze(
        bindings: &PersistentMap<Name, Value>,
        parent: Option<Rc<LockedEnvironment>>,
    ) -> Self {
        Self::from_entries(bindings.resolved(), parent)
    }

    fn from_entries(entries: Vec<(Name, Value)>, parent: Option<Rc<LockedEnvironment>>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (*name, i))
            .collect();
        LockedEnvironment {
            entries,
            index,
            parent,
        }
    }

    /// Look up a name; `ENVIRONMENT` and `PARENT` answer with snapshots.
    pub fn get(self: &Rc<Self>, name: impl Into<Name>) -> Result<Value, EvalError> {
        let name = name.into();
        match Reserved::of(name) {
            Some(Reserved::SelfRef) => Ok(Value::LockedEnvironment(Rc::clone(self))),
            Some(Reserved::ParentRef) => self
                .parent
                .clone()
                .map(Value::LockedEnvironment)
                .ok_or(EvalError::unbound(name)),
            None => self
                .lookup(&name)
                .cloned()
                .ok_or(EvalError::unbound(name)),
        }
    }

    /// Look up a name among the frozen bindings only
    pub fn lookup(&self, name: &Name) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// A frozen child: this snapshot's bindings followed by `extra`, with
    /// this snapshot as parent. Used for call frames during locked
    /// evaluation, where parameters are bound at construction.
    pub fn branch(self: &Rc<Self>, extra: Vec<(Name, Value)>) -> Rc<Self> {
        let mut entries: Vec<(Name, Value)> = self
            .entries
            .iter()
            .filter(|(name, _)| !extra.iter().any(|(k, _)| k == name))
            .cloned()
            .collect();
        let mut seen = FxHashMap::default();
        for (name, value) in extra {
            match seen.get(&name) {
                Some(&i) => entries[i] = (name, value),
                None => {
                    seen.insert(name, entries.len());
                    entries.push((name, value));
                }
            }
        }
        Rc::new(Self::from_entries(entries, Some(Rc::clone(self))))
    }

    pub fn parent(&self) -> Option<&Rc<LockedEnvironment>> {
        self.parent.as_ref()
    }

    /// Visible bindings, oldest first
    pub fn entries(&self) -> &[(Name, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn most_recent(&self) -> Option<Name> {
        self.entries.last().map(|(name, _)| *name)
    }
}

impl Drop for LockedEnvironment {
    // Same as `PersistentMap`: a long frozen parent chain must not drop
    // recursively
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(parent) = next {
            match Rc::try_unwrap(parent) {
                Ok(mut locked) => next = locked.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for LockedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedEnvironment")
            .field("len", &self.entries.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{ENVIRONMENT, Environment, PARENT};

    #[test]
    fn test_lock_is_isolated_from_later_writes() {
        let env = Environment::new_root();
        env.set("a", Value::int(1)).unwrap();
        let locked = env.lock();

        env.set("a", Value::int(2)).unwrap();
        assert_eq!(locked.get("a"), Ok(Value::int(1)));
    }

    #[test]
    fn test_lock_freezes_parent_chain() {
        let root = Environment::new_root();
        root.set("a", Value::int(1)).unwrap();
        let child = root.branch();
        let locked = child.lock();

        root.set("a", Value::int(5)).unwrap();
        match locked.get(PARENT) {
            Ok(Value::LockedEnvironment(parent)) => {
                assert_eq!(parent.get("a"), Ok(Value::int(1)));
                assert!(parent.get(PARENT).is_err());
            }
            other => panic!("expected locked parent, got {other:?}"),
        }
        assert_eq!(
            locked.get(ENVIRONMENT),
            Ok(Value::LockedEnvironment(Rc::clone(&locked)))
        );
    }

    #[test]
    fn test_branch_overrides_and_links_parent() {
        let env = Environment::new_root();
        env.set("x", Value::int(1)).unwrap();
        env.set("y", Value::int(2)).unwrap();
        let locked = env.lock();

        let frame = locked.branch(vec![(Name::new("x"), Value::int(10))]);
        assert_eq!(frame.get("x"), Ok(Value::int(10)));
        assert_eq!(frame.get("y"), Ok(Value::int(2)));
        assert_eq!(frame.most_recent(), Some(Name::new("x")));
        assert!(Rc::ptr_eq(frame.parent().unwrap(), &locked));
    }
}
