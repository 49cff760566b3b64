//! Logging setup for the Forno services.
//!
//! One call at startup wires a `tracing` subscriber in either pretty or
//! JSON format. HTTP-stack crates (hyper, reqwest, h2, rustls) are clamped
//! to `warn` so request-level business logs stay readable at `debug`;
//! `RUST_LOG` overrides everything when set.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Crates clamped to `warn` unless `RUST_LOG` says otherwise.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tower_http",
];

fn noise_clamped_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let directives = NOISY_MODULES
        .iter()
        .fold(String::from(log_level), |mut acc, module| {
            acc.push_str(&format!(",{module}=warn"));
            acc
        });
    EnvFilter::new(&directives)
}

/// Install the global subscriber.
///
/// `log_format` is `"json"` for machine-readable output with file and line
/// fields, anything else for the ANSI pretty format. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging(log_level: &str, log_format: &str) {
    let registry = tracing_subscriber::registry().with(noise_clamped_filter(log_level));

    if log_format == "json" {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = registry.with(layer).try_init();
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = registry.with(layer).try_init();
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        "Logging initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_stack_is_clamped() {
        assert!(NOISY_MODULES.contains(&"hyper"));
        assert!(NOISY_MODULES.contains(&"reqwest"));
        assert!(NOISY_MODULES.contains(&"rustls"));
    }

    #[test]
    fn test_directives_parse_for_every_module() {
        // EnvFilter::new panics only on hard syntax errors; building the
        // filter is the whole assertion.
        let _ = noise_clamped_filter("debug");
    }
}
