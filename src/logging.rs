//! Diagnostic output for the binary
//!
//! Events go to stderr so stdout carries nothing but prefixes.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber
///
/// `debug` selects the default verbosity; `RUST_LOG` takes precedence when set.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "awsips=debug"
    } else {
        "awsips=warn"
    }
}
