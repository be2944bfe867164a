//! Tracing setup.
//!
//! The evaluator emits `tracing` events under the `lazyctx` and `lazyeval`
//! targets. A subscriber is installed only when `RUST_LOG` is set, and only
//! once per process:
//!
//! ```text
//! RUST_LOG=lazyeval=debug        # evaluation entry, closure calls
//! RUST_LOG=lazyctx=trace         # every environment lookup
//! ```

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset or a global subscriber is already
/// installed.
pub fn init_tracing() {
    INIT.call_once(|| {
        if std::env::var_os("RUST_LOG").is_none() {
            return;
        }

        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init();
    });
}
