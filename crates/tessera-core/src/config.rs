//! Configuration for the tessera query-planning core.
//!
//! Supports file-based configuration with environment variable overrides and
//! reasonable defaults:
//! 1. Environment variables (highest priority)
//! 2. Config file specified by `TESSERA_CONFIG`
//! 3. `./config/tessera.yaml`
//! 4. `/etc/tessera/tessera.yaml`
//! 5. Hardcoded defaults (lowest priority)

use std::time::Duration;

use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TesseraConfig {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

impl TesseraConfig {
    /// Loads configuration from all sources in precedence order.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(config_path) = std::env::var("TESSERA_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/tessera").required(false))
            .add_source(File::with_name("/etc/tessera/tessera").required(false));

        // Example override: TESSERA_QUERY__EXECUTION_QUOTA_MS=5000
        builder = builder.add_source(
            Environment::with_prefix("TESSERA")
                .separator("__")
                .try_parsing(true),
        );

        let config: TesseraConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.execution_quota_ms == 0 {
            return Err(ConfigError::Message(
                "query.execution_quota_ms must be greater than zero".into(),
            ));
        }
        if self.query.checkpoint_batch == 0 {
            return Err(ConfigError::Message(
                "query.checkpoint_batch must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Query-session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Wall-clock execution quota per query session, in milliseconds.
    pub execution_quota_ms: u64,

    /// Suggested number of rows a consumer produces between `checkpoint`
    /// calls. Cancellation is cooperative; a smaller batch bounds overrun
    /// tighter at the cost of more quota checks.
    pub checkpoint_batch: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            execution_quota_ms: 10_000,
            checkpoint_batch: 1_000,
        }
    }
}

impl QueryConfig {
    /// Execution quota as a duration.
    #[must_use]
    pub fn execution_quota(&self) -> Duration {
        Duration::from_millis(self.execution_quota_ms)
    }
}

/// Index-view configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Initial capacity hint for the interval structures built per view
    /// snapshot.
    pub initial_interval_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_interval_capacity: 64,
        }
    }
}
