//! Structured logging on stderr via `tracing`.
//!
//! `RUST_LOG` wins over the configured level. stdout is left alone so
//! commands can stream the canonical CSV there.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cohort::config::LogConfig;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn init(cfg: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cfg.level))
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if cfg.format == "json" {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
    installed.map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
