//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts, key length and prefix length
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::RelayConfig;
use crate::net::address::{AddressError, Endpoint};
use crate::net::tcp_md5::TCP_MD5SIG_MAXKEYLEN;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address: {0}")]
    ListenAddress(AddressError),
    #[error("upstream.address: {0}")]
    UpstreamAddress(AddressError),
    #[error("upstream.md5_password: key is {0} bytes, maximum is {max}", max = TCP_MD5SIG_MAXKEYLEN)]
    KeyTooLong(usize),
    #[error("upstream.md5_prefix_len: {len} exceeds {max} bits for the destination family")]
    PrefixTooLong { len: u8, max: u8 },
    #[error("timeouts.connect_secs must be greater than zero")]
    ZeroConnectTimeout,
    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),
    #[error("observability.metrics_address: '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = Endpoint::parse(&config.listener.bind_address) {
        errors.push(ValidationError::ListenAddress(e));
    }

    match Endpoint::parse(&config.upstream.address) {
        Ok(destination) => {
            if let Some(len) = config.upstream.md5_prefix_len {
                let max = destination.family().full_prefix_len();
                if len > max {
                    errors.push(ValidationError::PrefixTooLong { len, max });
                }
            }
        }
        Err(e) => errors.push(ValidationError::UpstreamAddress(e)),
    }

    if let Some(key) = config.upstream.md5_key() {
        if key.len() > TCP_MD5SIG_MAXKEYLEN {
            errors.push(ValidationError::KeyTooLong(key.len()));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&RelayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.upstream.address = "[::1]".into();
        config.upstream.md5_password = Some("k".repeat(81));
        config.timeouts.connect_secs = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "localhost".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::KeyTooLong(81)));
        assert!(errors.contains(&ValidationError::ZeroConnectTimeout));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
    }

    #[test]
    fn max_length_key_is_accepted() {
        let mut config = RelayConfig::default();
        config.upstream.md5_password = Some("k".repeat(TCP_MD5SIG_MAXKEYLEN));
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn prefix_len_bounded_by_family() {
        let mut config = RelayConfig::default();
        config.upstream.md5_prefix_len = Some(33);
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::PrefixTooLong { len: 33, max: 32 }])
        );

        config.upstream.address = "[2001:db8::1]:179".into();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
