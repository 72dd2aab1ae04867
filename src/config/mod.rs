pub mod secret;

use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::pipeline::sinks::SinkConfig;
use crate::sources::config::ProducerConfig;
use secret::SecretSource;

const ENV_PREFIX: &str = "XDR";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub agent_id: String,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub producers: Vec<ProducerConfig>,
}

/// Sizing of one pipeline instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// How long shutdown may take before it is reported as slow. Shutdown still
    /// waits for every producer past this point.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            worker_count: default_worker_count(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::Config("pipeline.queue_capacity must be at least 1".to_string()));
        }
        if self.worker_count == 0 {
            return Err(AppError::Config("pipeline.worker_count must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Loads a JSON file, then applies `XDR_`-prefixed environment overrides
    /// (`XDR_PIPELINE__WORKER_COUNT=5`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).format(FileFormat::Json))
            .add_source(env_overrides());

        Self::finish(builder.build()?)
    }

    pub fn from_env() -> Result<Self> {
        let config_path = std::env::var("CONFIGURATION_PATH")
            .unwrap_or_else(|_| "config/agent.json".to_string());
        Self::from_file(config_path)
    }

    /// Parses an in-memory JSON document, without environment overrides.
    pub fn from_json(content: &str) -> Result<Self> {
        let built = Config::builder()
            .add_source(File::from_str(content, FileFormat::Json))
            .build()?;

        Self::finish(built)
    }

    fn finish(built: Config) -> Result<Self> {
        let config: AppConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(AppError::Config("agent_id must not be empty".to_string()));
        }

        self.pipeline.validate()?;

        let mut seen = std::collections::HashSet::new();
        for producer in &self.producers {
            producer.validate()?;
            if !seen.insert(producer.id.as_str()) {
                return Err(AppError::Config(format!("duplicate producer id: {}", producer.id)));
            }
        }

        Ok(())
    }
}

fn env_overrides() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Settings of the audit server binary, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub secret: Option<SecretSource>,
    pub header_name: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9090);

        let secret = std::env::var("AUDIT_SECRET").ok().map(SecretSource::Plain);

        let header_name = std::env::var("AUDIT_SIGNATURE_HEADER")
            .unwrap_or_else(|_| crate::signature::DEFAULT_SIGNATURE_HEADER.to_string());

        Self {
            port,
            secret,
            header_name,
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

fn default_worker_count() -> usize {
    3
}

fn default_shutdown_grace_ms() -> u64 {
    1000
}
