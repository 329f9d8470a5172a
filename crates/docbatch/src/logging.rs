//! Global tracing subscriber setup.
//!
//! The scheduler thread logs through `log`; the executor opens `tracing`
//! spans. Both end up in the same subscriber.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Call once at startup; later calls are ignored with a warning.
pub fn init_tracing(default_filter: &str) {
    if !try_init_tracing(default_filter, LogFormat::Text) {
        log::warn!("Tracing subscriber already installed");
    }
}

/// Like [`init_tracing`], returning whether this call installed the
/// subscriber.
pub fn try_init_tracing(default_filter: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_thread_names(true))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber).is_ok()
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(fmt::layer().json().with_current_span(true))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber).is_ok()
        }
    };

    if installed {
        // Forward `log` records into tracing.
        let _ = tracing_log::LogTracer::init();
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_second_init_is_rejected() {
        let _ = try_init_tracing("warn", LogFormat::Text);
        assert!(!try_init_tracing("debug", LogFormat::Json));

        // Both macro families are safe to call once installed.
        log::info!("log record after init");
        tracing::info!("tracing event after init");
    }

    #[test]
    #[serial]
    fn test_init_tracing_is_idempotent() {
        init_tracing("info");
        init_tracing("info");
    }
}
