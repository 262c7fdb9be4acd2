//! `host:port` address handling.
//!
//! The address family of a configured address is decided syntactically: a
//! bracketed host literal (`[2001:db8::1]:179`) is IPv6, anything else is
//! IPv4. The TCP-MD5 key is installed for that family only, so resolved
//! addresses of the other family are never dialed.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// Error type for address parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address '{0}' is missing a port")]
    MissingPort(String),
    #[error("address '{0}' has an invalid port")]
    InvalidPort(String),
    #[error("address '{0}' has an empty host")]
    EmptyHost(String),
    #[error("address '{0}' is not a valid bracketed IPv6 literal")]
    InvalidIpv6(String),
    #[error("address '{0}' contains a bare IPv6 literal, use [addr]:port")]
    UnbracketedIpv6(String),
}

/// IP address family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Family implied by the textual form of `address`.
    pub fn of(address: &str) -> Self {
        if address.starts_with('[') {
            AddressFamily::Ipv6
        } else {
            AddressFamily::Ipv4
        }
    }

    /// Prefix length that matches exactly one address of this family.
    pub fn full_prefix_len(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    pub fn matches(self, ip: IpAddr) -> bool {
        matches!(
            (self, ip),
            (AddressFamily::Ipv4, IpAddr::V4(_)) | (AddressFamily::Ipv6, IpAddr::V6(_))
        )
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => f.write_str("IPv4"),
            AddressFamily::Ipv6 => f.write_str("IPv6"),
        }
    }
}

/// A validated `host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: String,
    family: AddressFamily,
    port: u16,
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(address.to_string()))?;

        let port: u16 = port
            .parse()
            .map_err(|_| AddressError::InvalidPort(address.to_string()))?;

        let family = AddressFamily::of(address);
        match family {
            AddressFamily::Ipv6 => {
                let literal = host
                    .strip_prefix('[')
                    .and_then(|h| h.strip_suffix(']'))
                    .ok_or_else(|| AddressError::InvalidIpv6(address.to_string()))?;
                literal
                    .parse::<Ipv6Addr>()
                    .map_err(|_| AddressError::InvalidIpv6(address.to_string()))?;
            }
            AddressFamily::Ipv4 => {
                if host.is_empty() {
                    return Err(AddressError::EmptyHost(address.to_string()));
                }
                if host.contains(':') {
                    return Err(AddressError::UnbracketedIpv6(address.to_string()));
                }
            }
        }

        Ok(Self {
            address: address.to_string(),
            family,
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
