use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

/// Installs a plain-text subscriber filtered by `RUST_LOG`.
///
/// Closing a proving phase span logs its duration. Records the library
/// crates emit through `log` are forwarded to the same output.
pub fn init() {
    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}
