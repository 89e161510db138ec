use serde::Deserialize;

use enginepool_api::{PoolError, PoolResult};

pub const DEFAULT_WORKER_THREAD_PREFIX: &str = "engine-worker-";
pub const DEFAULT_ENGINE_THREAD_NAME: &str = "engine-main";

/// Configuration for a `Supervisor`.
///
/// Collaborators fill this in from flags, files or the environment; the pool
/// only validates it.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers. Fixed for the lifetime of the pool.
    pub num_workers: usize,

    /// Name prefix of worker OS threads; the worker index is appended.
    pub worker_thread_prefix: String,

    /// Name of the engine main thread.
    pub engine_thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get() * 2,
            worker_thread_prefix: DEFAULT_WORKER_THREAD_PREFIX.to_string(),
            engine_thread_name: DEFAULT_ENGINE_THREAD_NAME.to_string(),
        }
    }
}

impl PoolConfig {
    /// Default configuration with `num_workers` workers.
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> PoolResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.num_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.engine_thread_name.is_empty() {
            return Err(PoolError::InvalidConfig(
                "engine_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn worker_thread_name(&self, index: usize) -> String {
        format!("{}{}", self.worker_thread_prefix, index)
    }
}
