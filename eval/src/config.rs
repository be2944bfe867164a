//! Evaluator settings.
//!
//! Defaults are usable as-is. [`Config::from_env`] layers two environment
//! variables on top:
//!
//! - `LAZYCTX_MODE`: `dynamic` or `locked`
//! - `LAZYCTX_MAX_DEPTH`: a positive integer
//!
//! Invalid values are logged and ignored.

use lazyctx::EvalMode;
use tracing::warn;

/// Nesting limit on expression evaluation. Each call through a closure
/// uses several levels.
pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Mode used by entry points that do not take one explicitly
    pub default_mode: EvalMode,
    /// Evaluation fails with `RecursionLimit` beyond this depth
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_mode: EvalMode::Dynamic,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: EvalMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Defaults overridden by `LAZYCTX_MODE` and `LAZYCTX_MAX_DEPTH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(raw) = lookup("LAZYCTX_MODE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "dynamic" => config.default_mode = EvalMode::Dynamic,
                "locked" => config.default_mode = EvalMode::Locked,
                _ => warn!(value = %raw, "ignoring invalid LAZYCTX_MODE"),
            }
        }

        if let Some(raw) = lookup("LAZYCTX_MAX_DEPTH") {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_depth = depth,
                _ => warn!(value = %raw, "ignoring invalid LAZYCTX_MAX_DEPTH"),
            }
        }

        config
    }
}
