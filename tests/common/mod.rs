//! Shared setup for integration tests.

use once_cell::sync::Lazy;

/// Force to install the test subscriber once per test binary.
pub static LOGGER_INIT: Lazy<fn()> = Lazy::new(logger_init);

fn logger_init() -> fn() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    || ()
}
