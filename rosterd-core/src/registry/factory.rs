use super::{memory::MemoryRegistry, redis::RedisRegistry, DynRegistry};
use crate::error::{Result, RosterError};
use crate::registry::redis::DEFAULT_OP_TIMEOUT;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    backend: Option<String>,
    namespace: Option<String>,
    redis_url: Option<String>,
    op_timeout: Option<Duration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    pub async fn build(&self) -> Result<Arc<DynRegistry>> {
        let backend = self.backend.as_deref().unwrap_or("redis");

        match backend {
            "redis" => {
                let url = self.redis_url.as_deref().ok_or_else(|| {
                    RosterError::Config(
                        "redis registry backend requires a redis url".to_string(),
                    )
                })?;
                let namespace = self.namespace.as_deref().unwrap_or("default");
                let op_timeout = self.op_timeout.unwrap_or(DEFAULT_OP_TIMEOUT);

                Ok(Arc::new(
                    RedisRegistry::new(url, namespace, op_timeout).await?,
                ))
            }
            "memory" => Ok(Arc::new(MemoryRegistry::new())),
            other => Err(RosterError::Config(format!(
                "unknown registry backend '{}'",
                other
            ))),
        }
    }
}
