//! Validate database settings without connecting

use anyhow::{Context, Result};
use contactbox_server::{ConfigSource, EnvConfig};

pub fn run_check_config() -> Result<()> {
    let config = EnvConfig::new()
        .load()
        .context("Database configuration is incomplete")?;

    println!("database: {}", config.redacted());
    println!("tls: {}", if config.ssl { "required" } else { "off" });
    Ok(())
}
