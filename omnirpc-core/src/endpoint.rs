//! Connection target resolution
//!
//! Clients dial and servers bind the address produced by [`resolve`]. A
//! [`ConnectionProfile`] with a host wins over the raw address string, which
//! lets a deployment override a hard-coded address from its own configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host and port of an RPC endpoint
///
/// # Examples
///
/// ```rust
/// use omnirpc_core::ConnectionProfile;
///
/// let profile: ConnectionProfile = "10.0.0.5:8080".parse().unwrap();
/// assert_eq!(profile.address(), "10.0.0.5:8080");
///
/// let v6 = ConnectionProfile::new("::1", 9000);
/// assert_eq!(v6.address(), "[::1]:9000");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
}

impl ConnectionProfile {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, with IPv6 literals bracketed
    pub fn address(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

impl fmt::Display for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl FromStr for ConnectionProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::Configuration(format!("expected host:port, got {:?}", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::Configuration(format!("invalid port in {:?}: {}", s, e)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(host, port))
    }
}

/// Pick the address to dial or bind
///
/// A profile with a non-empty host gives `host:port`. Otherwise the trimmed
/// `fallback` is used, and an empty fallback is a configuration error.
pub fn resolve(profile: Option<&ConnectionProfile>, fallback: &str) -> Result<String> {
    if let Some(profile) = profile.filter(|p| p.has_host()) {
        return Ok(profile.address());
    }
    let fallback = fallback.trim();
    if fallback.is_empty() {
        return Err(Error::Configuration("server address is empty".to_string()));
    }
    Ok(fallback.to_string())
}
