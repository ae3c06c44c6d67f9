use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use weather_core::Config;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
}

impl LoggingConfig {
    /// `RUST_LOG` has already been folded into `log_level` by [`Config::load`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
        }
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("Invalid log level directive: {}", self.log_level))
    }
}

/// Install the global console subscriber. Call once, before anything logs.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(level = %config.log_level, "logging initialized");
    Ok(())
}
