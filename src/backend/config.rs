use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Family, InitError};

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_SENTINEL_PORT: u16 = 26379;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_DELIVERY_LEASE_MS: u64 = 60_000;
pub const DEFAULT_DELIVERY_WAIT_MS: u64 = 10_000;
/// Upper bound for the delivery lease and wait (one day).
pub const MAX_DELIVERY_MS: u64 = 86_400_000;

const URL_SCHEME: &str = "redis://";

/// Shared-store topology and per-family provider choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Store endpoints, `redis://host:port` or `host:port`.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Sentinel-managed master name. With `sentinel_urls`, replaces the
    /// plain single-node connection.
    #[serde(default)]
    pub sentinel_master: Option<String>,

    #[serde(default)]
    pub sentinel_urls: Vec<String>,

    /// Try the endpoints as a cluster before falling back to single-node.
    #[serde(default = "default_true")]
    pub cluster_mode: bool,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Refuse to start the id generators without a distributed backend.
    #[serde(default)]
    pub require_distributed: bool,

    #[serde(default = "default_delivery_lease_ms")]
    pub delivery_lease_ms: u64,

    #[serde(default = "default_delivery_wait_ms")]
    pub delivery_wait_ms: u64,

    /// Provider name per family (`"local"`, `"distributed"`, or a
    /// registered custom name). Families not listed follow the selection.
    #[serde(default)]
    pub providers: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_delivery_lease_ms() -> u64 {
    DEFAULT_DELIVERY_LEASE_MS
}

fn default_delivery_wait_ms() -> u64 {
    DEFAULT_DELIVERY_WAIT_MS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            sentinel_master: None,
            sentinel_urls: Vec::new(),
            cluster_mode: true,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            require_distributed: false,
            delivery_lease_ms: DEFAULT_DELIVERY_LEASE_MS,
            delivery_wait_ms: DEFAULT_DELIVERY_WAIT_MS,
            providers: BTreeMap::new(),
        }
    }
}

impl BackendConfig {
    pub fn from_json(json: &str) -> Result<Self, InitError> {
        let config: Self = serde_json::from_str(json).map_err(|e| InitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject endpoint strings and provider keys that can never work.
    pub fn validate(&self) -> Result<(), InitError> {
        self.endpoints()?;
        self.sentinel_endpoints()?;
        if self.sentinel_master.is_some() && self.sentinel_urls.is_empty() {
            return Err(InitError::Config(
                "sentinel_master is set but sentinel_urls is empty".into(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(InitError::Config("probe_timeout_ms must be positive".into()));
        }
        if self.delivery_lease_ms == 0 {
            return Err(InitError::Config("delivery_lease_ms must be positive".into()));
        }
        if self.delivery_lease_ms > MAX_DELIVERY_MS || self.delivery_wait_ms > MAX_DELIVERY_MS {
            return Err(InitError::Config(format!(
                "delivery_lease_ms and delivery_wait_ms must not exceed {}",
                MAX_DELIVERY_MS
            )));
        }
        if self.delivery_lease_ms < self.delivery_wait_ms {
            return Err(InitError::Config(
                "delivery_lease_ms must be at least delivery_wait_ms".into(),
            ));
        }
        for family in self.providers.keys() {
            family.parse::<Family>()?;
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Vec<Endpoint>, InitError> {
        self.urls
            .iter()
            .map(|url| Endpoint::parse(url, DEFAULT_PORT))
            .collect()
    }

    pub fn sentinel_endpoints(&self) -> Result<Vec<Endpoint>, InitError> {
        self.sentinel_urls
            .iter()
            .map(|url| Endpoint::parse(url, DEFAULT_SENTINEL_PORT))
            .collect()
    }

    /// Sentinel master and its sentinels, when both are configured.
    pub fn sentinel(&self) -> Option<&str> {
        self.sentinel_master
            .as_deref()
            .filter(|_| !self.sentinel_urls.is_empty())
    }

    pub fn has_endpoints(&self) -> bool {
        !self.urls.is_empty() || self.sentinel().is_some()
    }

    pub fn provider(&self, family: Family) -> Option<&str> {
        self.providers.get(family.as_str()).map(String::as_str)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn delivery_lease(&self) -> Duration {
        Duration::from_millis(self.delivery_lease_ms)
    }

    pub fn delivery_wait(&self) -> Duration {
        Duration::from_millis(self.delivery_wait_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `redis://host[:port][/db]` or `host[:port]`.
    pub fn parse(raw: &str, default_port: u16) -> Result<Self, InitError> {
        let invalid = || InitError::InvalidEndpoint(raw.to_string());
        let rest = raw.trim();
        let rest = rest.strip_prefix(URL_SCHEME).unwrap_or(rest);
        if rest.contains("://") {
            return Err(invalid());
        }
        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (authority, default_port),
        };
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
