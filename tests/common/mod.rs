//! Shared test helpers.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a test binary. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
