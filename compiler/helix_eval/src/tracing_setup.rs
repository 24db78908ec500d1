//! Tracing subscriber setup.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a hierarchical tracing subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once; only
/// the first call installs anything. Specialization spans nest, so the
/// output shows each join point inside the one that requested it.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let tree = tracing_tree::HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true);
            // Another subscriber may already be installed by the embedding
            // program; keep it.
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tree)
                .try_init();
        }
    });
}
