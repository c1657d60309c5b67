use std::net::SocketAddr;
use std::time::Duration;

use kvstash_core::error::{KvError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(KvError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            KvError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_key_count_interval_ms")]
    pub key_count_interval_ms: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            key_count_interval_ms: default_key_count_interval_ms(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1_000..=3_600_000).contains(&self.key_count_interval_ms) {
            return Err(KvError::BadRequest(
                "metrics.key_count_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn key_count_interval(&self) -> Duration {
        Duration::from_millis(self.key_count_interval_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_key_count_interval_ms() -> u64 {
    60_000
}
