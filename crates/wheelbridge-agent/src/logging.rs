//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter directive for `level`, with noisy transport crates capped at `warn`.
fn directive(level: &str) -> String {
    format!("{level},hyper=warn,tungstenite=warn,tokio_tungstenite=warn")
}

/// Initialize the global tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init is a no-op if a subscriber is already set
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}
