//! Module-like collections of named values.
//!
//! A namespace has members and a subset of them marked as exported.
//! Merging a namespace into an environment brings in the exported names in
//! the order they were exported; qualified access (`Base.identity`) can
//! reach any member.

use rustc_hash::FxHashMap;

use crate::interner::Name;
use crate::language::Value;

#[derive(Debug, Clone)]
pub struct Namespace {
    name: Name,
    exports: Vec<Name>,
    members: FxHashMap<Name, Value>,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        Namespace {
            name: Name::new(name),
            exports: Vec::new(),
            members: FxHashMap::default(),
        }
    }

    /// Add an exported member. Re-exporting a name replaces its value and
    /// keeps its original position.
    pub fn export(mut self, name: &str, value: Value) -> Self {
        let name = Name::new(name);
        if !self.exports.contains(&name) {
            self.exports.push(name);
        }
        self.members.insert(name, value);
        self
    }

    /// Add a member reachable only through qualified access
    pub fn define(mut self, name: &str, value: Value) -> Self {
        self.members.insert(Name::new(name), value);
        self
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn is_exported(&self, name: &Name) -> bool {
        self.exports.contains(name)
    }

    /// Exported members in export order
    pub fn exports(&self) -> impl Iterator<Item = (Name, &Value)> {
        self.exports
            .iter()
            .filter_map(|name| self.members.get(name).map(|value| (*name, value)))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
