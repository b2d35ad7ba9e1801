//! Server configuration

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::broadcast::BroadcastConfig;
use crate::error::{Error, Result};
use crate::poller::PollerConfig;

/// Environment variable holding the bind address
pub const ENV_SERVER_ADDR: &str = "TF_SERVER_ADDR";
/// Environment variable holding the WebSocket connection limit
pub const ENV_MAX_CONNECTIONS: &str = "TF_MAX_CONNECTIONS";
/// Environment variable holding the poll interval in seconds
pub const ENV_POLL_INTERVAL_SECS: &str = "TF_POLL_INTERVAL_SECS";
/// Environment variable holding the number of records fetched per poll
pub const ENV_POLL_LIMIT: &str = "TF_POLL_LIMIT";
/// Environment variable holding the per-delivery timeout in milliseconds
pub const ENV_DELIVERY_TIMEOUT_MS: &str = "TF_DELIVERY_TIMEOUT_MS";
/// Environment variable holding the in-flight delivery limit
pub const ENV_MAX_CONCURRENT_DELIVERIES: &str = "TF_MAX_CONCURRENT_DELIVERIES";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent WebSocket subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Records returned by the latest-data endpoint when no limit is given
    pub latest_default_limit: usize,

    /// Fan-out settings
    pub broadcast: BroadcastConfig,

    /// Periodic poll settings
    pub poller: PollerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 0, // Unlimited
            latest_default_limit: 100,
            broadcast: BroadcastConfig::default(),
            poller: PollerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from `TF_*` environment variables
    ///
    /// Unset variables keep their defaults; a variable that is set but does
    /// not parse is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<SocketAddr, _>(&lookup, ENV_SERVER_ADDR)? {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_var(&lookup, ENV_MAX_CONNECTIONS)? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_POLL_INTERVAL_SECS)? {
            if secs == 0 {
                return Err(Error::Config(format!("{ENV_POLL_INTERVAL_SECS} must be positive")));
            }
            config.poller = config.poller.interval(Duration::from_secs(secs));
        }
        if let Some(limit) = parse_var(&lookup, ENV_POLL_LIMIT)? {
            config.poller = config.poller.fetch_limit(limit);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_DELIVERY_TIMEOUT_MS)? {
            config.broadcast = config.broadcast.delivery_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = parse_var(&lookup, ENV_MAX_CONCURRENT_DELIVERIES)? {
            config.broadcast = config.broadcast.max_concurrent_deliveries(max);
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the default limit of the latest-data endpoint
    pub fn latest_default_limit(mut self, limit: usize) -> Self {
        self.latest_default_limit = limit;
        self
    }

    /// Set fan-out settings
    pub fn broadcast(mut self, broadcast: BroadcastConfig) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Set poll settings
    pub fn poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.latest_default_limit, 100);
        assert_eq!(config.poller.interval, Duration::from_secs(10));
        assert_eq!(config.poller.fetch_limit, 20);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .latest_default_limit(25)
            .poller(PollerConfig::default().fetch_limit(5))
            .broadcast(BroadcastConfig::default().max_concurrent_deliveries(8));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.latest_default_limit, 25);
        assert_eq!(config.poller.fetch_limit, 5);
        assert_eq!(config.broadcast.max_concurrent_deliveries, 8);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(config.poller.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_reads_all_vars() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_SERVER_ADDR, "127.0.0.1:7000"),
            (ENV_MAX_CONNECTIONS, "10"),
            (ENV_POLL_INTERVAL_SECS, "3"),
            (ENV_POLL_LIMIT, "7"),
            (ENV_DELIVERY_TIMEOUT_MS, "1500"),
            (ENV_MAX_CONCURRENT_DELIVERIES, "32"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.poller.interval, Duration::from_secs(3));
        assert_eq!(config.poller.fetch_limit, 7);
        assert_eq!(config.broadcast.delivery_timeout, Duration::from_millis(1500));
        assert_eq!(config.broadcast.max_concurrent_deliveries, 32);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_POLL_LIMIT, "twenty")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(ENV_POLL_LIMIT)));

        let err = ServerConfig::from_lookup(lookup(&[(ENV_SERVER_ADDR, "nowhere")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_lookup_rejects_zero_interval() {
        let err =
            ServerConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL_SECS, "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_var_ignored() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_MAX_CONNECTIONS, "  ")])).unwrap();
        assert_eq!(config.max_connections, 0);
    }
}
