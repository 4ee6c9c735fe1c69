// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Directive precedence: `SYNERGY_LOG`, then `RUST_LOG`, then the CLI level.
fn filter_for(level: &str) -> EnvFilter {
    if let Ok(directives) = std::env::var("SYNERGY_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logs go to stderr so `synergy discover` can stream its report on stdout.
pub fn init_logging(level: &str) {
    // try_init: tests and embedding callers may have installed a subscriber already
    let _ = fmt()
        .with_env_filter(filter_for(level))
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
