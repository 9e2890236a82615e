//! # Cadenza
//!
//! Interactive host for the Cadenza audio director.
//!
//! Reads commands from stdin and ticks the process-wide director at a fixed
//! rate. Run with `--headless` to skip the audio device.
//!
//! ```text
//! cadenza [config.toml] [--headless] [--write-config]
//! ```
//!
//! `--write-config` saves the effective configuration and exits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod commands;
mod config;
mod console;
mod timing;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::CadenzaConfig;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("cadenza=info".parse()?))
        .init();

    let mut config_path = None;
    let mut headless = false;
    let mut write_config = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--headless" => headless = true,
            "--write-config" => write_config = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            path if config_path.is_none() => config_path = Some(path.to_string()),
            extra => bail!("unexpected argument {extra}"),
        }
    }

    let mut config = match &config_path {
        Some(path) => CadenzaConfig::load_from(path),
        None => CadenzaConfig::load(),
    };
    config.headless |= headless;

    if write_config {
        let path = config_path.map_or_else(CadenzaConfig::config_path, Into::into);
        config.save_to(&path)?;
        return Ok(());
    }

    info!("Cadenza starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run(config)?;

    info!("Cadenza shutdown complete");
    Ok(())
}
