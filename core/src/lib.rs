//! Core types for lazyctx
//!
//! This crate contains the data model for deferred evaluation: the layered
//! persistent map, environments and their frozen snapshots, merge sources,
//! expression trees and the contexts that pair a tree with an environment.
//! It does not include the evaluator - that lives in the `lazyctx-eval`
//! crate, which reaches back into values through [`runtime::Runtime`].

pub mod context;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interner;
pub mod language;
pub mod locked;
pub mod merge;
pub mod namespace;
pub mod numeric;
pub mod persistent;
pub mod runtime;
pub mod scope;

// Re-export commonly used items for convenience
pub use context::ExpressionContext;
pub use environment::{ENVIRONMENT, Environment, PARENT};
pub use error::EvalError;
pub use expr::{Arg, Expr, KeywordParam, Params};
pub use interner::Name;
pub use language::{Closure, MapValue, Value};
pub use locked::LockedEnvironment;
pub use merge::{MergeSource, immutable_merge, pairs_from_value};
pub use namespace::Namespace;
pub use numeric::{NumericError, NumericType};
pub use persistent::{KeyNotFound, PersistentMap};
pub use runtime::{CallArgs, EvalMode, NativeFn, NativeFunction, Runtime};
pub use scope::Scope;
