//! Shared fixtures and scripted collaborators for socialsim tests.

pub mod fixtures;
pub mod llm;
pub mod world;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
