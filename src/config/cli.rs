//! Command-line surface.
//!
//! Flags mirror the classic `-src`/`-dst`/`-md5`/`-timeout` relay options.
//! A TOML file may be supplied with `--config`; any flag given on the command
//! line overrides the corresponding file value.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{LogFormat, RelayConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "md5-relay")]
#[command(
    about = "Transparent TCP relay that signs the outbound leg with TCP-MD5 (RFC 2385)",
    version
)]
pub struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TCP address to listen on (use [] for IPv6).
    #[arg(long)]
    pub src: Option<String>,

    /// TCP address to connect to (use [] for IPv6).
    #[arg(long)]
    pub dst: Option<String>,

    /// TCP-MD5 password.
    #[arg(long, env = "RELAY_MD5_PASSWORD", hide_env_values = true)]
    pub md5: Option<String>,

    /// Prefix length the TCP-MD5 key is scoped to (default: full address).
    #[arg(long)]
    pub md5_prefix_len: Option<u8>,

    /// Connection timeout (seconds).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (pretty, compact, json).
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags,
    /// then validation.
    pub fn into_config(self) -> Result<RelayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => RelayConfig::default(),
        };

        if let Some(src) = self.src {
            config.listener.bind_address = src;
        }
        if let Some(dst) = self.dst {
            config.upstream.address = dst;
        }
        if let Some(md5) = self.md5 {
            config.upstream.md5_password = Some(md5);
        }
        if let Some(prefix_len) = self.md5_prefix_len {
            config.upstream.md5_prefix_len = Some(prefix_len);
        }
        if let Some(timeout) = self.timeout {
            config.timeouts.connect_secs = timeout;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(address) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
