use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_DIRECTIVES: &str = "info";

/// Global subscriber whose filter is swapped once settings are known.
///
/// An operator's `RUST_LOG` is sticky: when present it is used from the start
/// and the configured `log.filter` is ignored.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
    env_directives: Option<String>,
}

impl Logger {
    pub fn new_bootstrap() -> Self {
        let env_directives = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|d| !d.trim().is_empty());
        let filter = env_directives
            .as_deref()
            .and_then(|d| parse_filter(d).ok())
            .unwrap_or_else(|| EnvFilter::new(BOOTSTRAP_DIRECTIVES));
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self {
            reload_handle,
            env_directives,
        }
    }

    /// Apply `log.filter` from settings unless `RUST_LOG` already decided.
    pub fn apply_configured(&self, configured: &str) -> Result<()> {
        let directives = effective_directives(self.env_directives.as_deref(), configured);
        if self.env_directives.is_some() {
            tracing::info!(%directives, "RUST_LOG set, keeping it over log.filter");
            return Ok(());
        }

        let filter = parse_filter(directives)?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        tracing::debug!(%directives, "log filter reloaded");
        Ok(())
    }
}

fn effective_directives<'a>(env: Option<&'a str>, configured: &'a str) -> &'a str {
    env.unwrap_or(configured)
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| anyhow!("invalid log filter {directives:?}: {e}"))
}
