//! Interned identifiers
//!
//! Every name bound in an environment is a [`Name`]: a copyable handle into a
//! process-wide string interner. Comparing two names is an integer compare;
//! ordering goes through the interned text so that it is stable no matter
//! which name happened to be interned first.

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// An identifier that has been interned in the global string interner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(DefaultSymbol);

impl Name {
    /// Intern a string and return its Name
    pub fn new(s: &str) -> Self {
        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
        Name(interner.get_or_intern(s))
    }

    /// Resolve the name back to its string representation
    pub fn resolve(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Resolve the name and run a function with the string slice.
    /// Avoids the allocation `resolve()` makes.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        f(interner.resolve(self.0).unwrap_or_default())
    }

    /// True if this name spells `s`
    pub fn is(&self, s: &str) -> bool {
        self.with_str(|name| name == s)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<&String> for Name {
    fn from(s: &String) -> Self {
        Name::new(s)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        // One guard for both lookups; taking the read lock twice could
        // deadlock behind a queued writer.
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        let a = interner.resolve(self.0).unwrap_or_default();
        let b = interner.resolve(other.0).unwrap_or_default();
        a.cmp(b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{s}"))
    }
}
