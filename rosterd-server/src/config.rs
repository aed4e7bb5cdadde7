use rosterd_core::{ManagerSettings, RegistryBuilder, Result, RosterError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub cluster: ClusterConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Display name for log readability; never used in any decision.
    #[serde(default)]
    pub name: String,
    /// Address other systems use to reach this node.
    pub address: String,
    /// Where the node identity token is persisted across restarts.
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,
    /// Slot to ask for at first registration, 0 for no preference.
    #[serde(default)]
    pub requested_slot: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of slots; fixed for the life of the cluster.
    pub size: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    #[serde(default)]
    pub namespace: Option<String>,
    pub redis: Option<RedisConfig>,
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
}

impl RegistryConfig {
    pub fn namespace_or_default(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("default")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_miss_threshold")]
    pub miss_threshold: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            miss_threshold: default_miss_threshold(),
        }
    }
}

fn default_identity_file() -> PathBuf {
    PathBuf::from("rosterd-identity")
}

fn default_op_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_miss_threshold() -> u32 {
    3
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ROSTERD"))
            .build()
            .map_err(|e| RosterError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| RosterError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster.size == 0 {
            return Err(RosterError::Config(
                "cluster.size must be at least 1".to_string(),
            ));
        }

        if self.node.address.trim().is_empty() {
            return Err(RosterError::Config(
                "node.address cannot be empty".to_string(),
            ));
        }

        if self.node.requested_slot > self.cluster.size {
            return Err(RosterError::Config(format!(
                "node.requested_slot {} is outside the cluster range 1..={}",
                self.node.requested_slot, self.cluster.size
            )));
        }

        if self.timing.miss_threshold == 0 {
            return Err(RosterError::Config(
                "timing.miss_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn registry_builder(&self) -> RegistryBuilder {
        let mut builder = RegistryBuilder::new()
            .namespace(self.registry.namespace_or_default())
            .op_timeout(Duration::from_secs(self.registry.op_timeout_secs));

        builder = match self.registry.backend {
            RegistryBackend::Redis => builder.backend("redis"),
            RegistryBackend::Memory => builder.backend("memory"),
        };

        if let Some(redis) = &self.registry.redis {
            builder = builder.redis_url(redis.url.clone());
        }

        builder
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            cluster_size: self.cluster.size,
            poll_interval: Duration::from_secs(self.timing.poll_interval_secs),
            heartbeat_interval: Duration::from_secs(self.timing.heartbeat_interval_secs),
            miss_threshold: self.timing.miss_threshold,
        }
    }
}
