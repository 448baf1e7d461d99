//! Queue backend and worker configuration
//!
//! [`RedisConfig`] describes how the task engine reaches its Redis backend in
//! one of three deployment modes. [`ServerConfig`] holds the worker-side
//! settings. Both derive `Deserialize` so a host application can load them
//! from its own configuration files.
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_tasks::{RedisConfig, RedisConnection, RedisMode};
//!
//! let config: RedisConfig = serde_json::from_str(
//!     r#"{"mode": "sentinel", "sentinel_addrs": ["10.0.0.1:26379"], "master_name": "main"}"#,
//! ).unwrap();
//! assert_eq!(config.mode, RedisMode::Sentinel);
//! assert!(matches!(config.connection().unwrap(), RedisConnection::Sentinel { .. }));
//! ```

use omnirpc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Redis deployment mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    #[default]
    Single,
    Sentinel,
    Cluster,
}

/// Connection settings for the task engine's Redis backend
///
/// Only the fields belonging to `mode` are used; the rest may stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub mode: RedisMode,

    /// `host:port` (single mode)
    pub addr: String,

    /// Sentinel addresses (sentinel mode)
    pub sentinel_addrs: Vec<String>,
    /// Name of the monitored master (sentinel mode)
    pub master_name: String,

    /// Seed node addresses (cluster mode)
    pub cluster_addrs: Vec<String>,

    pub username: String,
    pub password: String,
    /// Database index; ignored in cluster mode
    pub db: u32,
}

/// Connection options resolved for one [`RedisMode`]
#[derive(Debug, Clone, PartialEq)]
pub enum RedisConnection {
    Single {
        addr: String,
        username: String,
        password: String,
        db: u32,
    },
    Sentinel {
        master_name: String,
        sentinel_addrs: Vec<String>,
        username: String,
        password: String,
        db: u32,
    },
    Cluster {
        addrs: Vec<String>,
        username: String,
        password: String,
    },
}

impl RedisConfig {
    /// Single-instance configuration for `addr`
    pub fn single(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    /// Check that the selected mode has what it needs
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] naming the missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = match self.mode {
            RedisMode::Single if self.addr.trim().is_empty() => Some("redis addr is empty"),
            RedisMode::Sentinel if self.sentinel_addrs.is_empty() => {
                Some("redis sentinel_addrs is empty")
            }
            RedisMode::Sentinel if self.master_name.trim().is_empty() => {
                Some("redis master_name is empty")
            }
            RedisMode::Cluster if self.cluster_addrs.is_empty() => {
                Some("redis cluster_addrs is empty")
            }
            _ => None,
        };
        match missing {
            Some(msg) => Err(Error::Configuration(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Validate and pick the connection options for the configured mode
    pub fn connection(&self) -> Result<RedisConnection> {
        self.validate()?;
        let username = self.username.clone();
        let password = self.password.clone();
        Ok(match self.mode {
            RedisMode::Single => RedisConnection::Single {
                addr: self.addr.trim().to_string(),
                username,
                password,
                db: self.db,
            },
            RedisMode::Sentinel => RedisConnection::Sentinel {
                master_name: self.master_name.trim().to_string(),
                sentinel_addrs: self.sentinel_addrs.clone(),
                username,
                password,
                db: self.db,
            },
            RedisMode::Cluster => RedisConnection::Cluster {
                addrs: self.cluster_addrs.clone(),
                username,
                password,
            },
        })
    }
}

/// Worker settings: concurrency and weighted queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Tasks processed at the same time
    pub concurrency: usize,
    /// Queue name to priority weight
    pub queues: BTreeMap<String, u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let queues = [("critical", 6), ("default", 3), ("low", 1)]
            .into_iter()
            .map(|(name, weight)| (name.to_string(), weight))
            .collect();
        Self {
            concurrency: 10,
            queues,
        }
    }
}

impl ServerConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Add or reweight a queue
    pub fn with_queue(mut self, name: impl Into<String>, weight: u32) -> Self {
        self.queues.insert(name.into(), weight);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.queues["critical"], 6);
        assert_eq!(config.queues["default"], 3);
        assert_eq!(config.queues["low"], 1);
        assert_eq!(config.queues.len(), 3);
    }

    #[test]
    fn test_server_config_partial_deserialize() {
        let config: ServerConfig = serde_json::from_str(r#"{"concurrency": 2}"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.queues.len(), 3);

        let config = config.with_queue("bulk", 1).with_concurrency(4);
        assert_eq!(config.queues["bulk"], 1);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_mode_defaults_to_single() {
        let config: RedisConfig = serde_json::from_str(r#"{"addr": "127.0.0.1:6379", "db": 2}"#).unwrap();
        assert_eq!(config.mode, RedisMode::Single);
        assert_eq!(
            config.connection().unwrap(),
            RedisConnection::Single {
                addr: "127.0.0.1:6379".to_string(),
                username: String::new(),
                password: String::new(),
                db: 2,
            }
        );
    }

    #[test]
    fn test_cluster_drops_db() {
        let config = RedisConfig {
            mode: RedisMode::Cluster,
            cluster_addrs: vec!["a:7000".to_string(), "b:7000".to_string()],
            password: "secret".to_string(),
            db: 5,
            ..RedisConfig::default()
        };
        match config.connection().unwrap() {
            RedisConnection::Cluster { addrs, password, .. } => {
                assert_eq!(addrs.len(), 2);
                assert_eq!(password, "secret");
            }
            other => panic!("Expected cluster connection, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let cases = [
            (RedisConfig::default(), "redis addr is empty"),
            (
                RedisConfig {
                    mode: RedisMode::Sentinel,
                    master_name: "main".to_string(),
                    ..RedisConfig::default()
                },
                "redis sentinel_addrs is empty",
            ),
            (
                RedisConfig {
                    mode: RedisMode::Sentinel,
                    sentinel_addrs: vec!["s:26379".to_string()],
                    ..RedisConfig::default()
                },
                "redis master_name is empty",
            ),
            (
                RedisConfig {
                    mode: RedisMode::Cluster,
                    ..RedisConfig::default()
                },
                "redis cluster_addrs is empty",
            ),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(Error::Configuration(msg)) => assert_eq!(msg, expected),
                other => panic!("Expected Configuration error, got {:?}", other),
            }
        }
        assert!(RedisConfig::single("127.0.0.1:6379").validate().is_ok());
    }
}
