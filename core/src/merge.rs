//! Sources of bindings for [`Environment::merge`].
//!
//! Anything that can list `(name, value)` pairs in a deterministic order can
//! be merged into an environment by implementing [`MergeSource`]. The
//! environment never needs to know about the concrete type.
//!
//! [`Environment::merge`]: crate::environment::Environment::merge

use std::collections::BTreeMap;
use std::rc::Rc;

use im::OrdMap;
use rustc_hash::FxHashMap;

use crate::environment::Environment;
use crate::error::EvalError;
use crate::interner::Name;
use crate::language::{MapValue, Value};
use crate::locked::LockedEnvironment;
use crate::namespace::Namespace;
use crate::persistent::PersistentMap;

/// Something that produces an ordered sequence of `(name, value)` pairs.
///
/// When a name appears twice, the later pair wins.
pub trait MergeSource {
    fn merge_pairs(&self) -> Vec<(Name, Value)>;
}

impl MergeSource for [(Name, Value)] {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.to_vec()
    }
}

impl MergeSource for Vec<(Name, Value)> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.clone()
    }
}

impl<const N: usize> MergeSource for [(Name, Value); N] {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.to_vec()
    }
}

/// Ordered by key
impl MergeSource for BTreeMap<String, Value> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.iter()
            .map(|(name, value)| (Name::new(name), value.clone()))
            .collect()
    }
}

/// Sorted by name, since hash order depends on insertion history
impl MergeSource for FxHashMap<Name, Value> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        let mut pairs: Vec<(Name, Value)> = self
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        pairs
    }
}

impl MergeSource for OrdMap<Name, Value> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect()
    }
}

impl MergeSource for MapValue {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect()
    }
}

/// Exported names in export order
impl MergeSource for Namespace {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.exports()
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }
}

/// Visible bindings, oldest first
impl MergeSource for PersistentMap<Name, Value> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.resolved()
    }
}

impl MergeSource for Environment {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.bindings().resolved()
    }
}

impl MergeSource for LockedEnvironment {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        self.entries().to_vec()
    }
}

impl<S: MergeSource + ?Sized> MergeSource for &S {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        (**self).merge_pairs()
    }
}

impl<S: MergeSource + ?Sized> MergeSource for Rc<S> {
    fn merge_pairs(&self) -> Vec<(Name, Value)> {
        (**self).merge_pairs()
    }
}

/// Pairs from a runtime value.
///
/// Dictionaries, namespaces and environments merge as themselves. A tuple
/// merges if every element is a `(symbol, value)` tuple.
pub fn pairs_from_value(value: &Value) -> Result<Vec<(Name, Value)>, EvalError> {
    match value {
        Value::Dict(map) => Ok(map.merge_pairs()),
        Value::Namespace(namespace) => Ok(namespace.merge_pairs()),
        Value::Environment(env) => Ok(env.merge_pairs()),
        Value::LockedEnvironment(locked) => Ok(locked.merge_pairs()),
        Value::Tuple(items) => items
            .iter()
            .map(|item| match item {
                Value::Tuple(pair) => match pair.as_ref() {
                    [Value::Symbol(name), value] => Ok((*name, value.clone())),
                    _ => Err(EvalError::NotMergeable {
                        found: item.to_string(),
                    }),
                },
                _ => Err(EvalError::NotMergeable {
                    found: item.to_string(),
                }),
            })
            .collect(),
        other => Err(EvalError::NotMergeable {
            found: format!("{} {other}", other.type_name()),
        }),
    }
}

/// Merge `source` into a persistent map, returning the new map. `map` is
/// left unchanged.
pub fn immutable_merge<S>(map: &PersistentMap<Name, Value>, source: &S) -> PersistentMap<Name, Value>
where
    S: MergeSource + ?Sized,
{
    map.merge_into(source.merge_pairs())
}
