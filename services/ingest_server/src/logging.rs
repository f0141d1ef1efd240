use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracker_config::LoggingConfig;

/// Build a subscriber for `config` without installing it; `RUST_LOG` wins over
/// the configured level
pub fn build_dispatch(config: &LoggingConfig) -> Result<Dispatch> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level '{}'", config.level))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    Ok(if config.json {
        Dispatch::new(registry.with(fmt::layer().json().with_current_span(true)))
    } else {
        Dispatch::new(registry.with(fmt::layer().with_target(true)))
    })
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    build_dispatch(config)?
        .try_init()
        .context("Failed to install log subscriber")
}

/// Run `f` with a scoped subscriber so events emitted before the global one is
/// installed, such as configuration loading, are not dropped
pub fn with_bootstrap_logging<T>(config: &LoggingConfig, f: impl FnOnce() -> T) -> Result<T> {
    let dispatch = build_dispatch(config)?;
    Ok(tracing::dispatcher::with_default(&dispatch, f))
}
