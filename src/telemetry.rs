//! Structured logging

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Level actually used: `REPORACOON_DEBUG=true` forces debug
pub fn effective_level(config: &AppConfig, debug_flag: Option<&str>) -> String {
    match debug_flag {
        Some(flag) if flag.eq_ignore_ascii_case("true") => "debug".to_string(),
        _ => config.logging.level.to_lowercase(),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_telemetry(config: &AppConfig) {
    let debug_flag = std::env::var("REPORACOON_DEBUG").ok();
    let level = effective_level(config, debug_flag.as_deref());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
}
