//! Tracing subscriber setup.

use courierpay_types::LogConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` wins over `config.level` when set. Returns `false` if a
/// subscriber was already installed, which makes repeated calls from tests
/// harmless.
pub fn init_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = LogConfig {
            level: "debug".into(),
            json: true,
        };
        let _ = init_tracing(&config);
        assert!(!init_tracing(&LogConfig::default()));
        tracing::info!(component = "telemetry", "still logging");
    }
}
