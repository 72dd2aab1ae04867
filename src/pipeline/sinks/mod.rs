pub mod http;
pub mod log;

use std::sync::Arc;

use crate::config::secret::SecretSource;
use crate::error::Result;
use crate::pipeline::event::Event;
use crate::signature::{HmacSigner, DEFAULT_SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Http {
        url: String,
        #[serde(default)]
        secret: Option<SecretSource>,
        #[serde(default = "default_header_name")]
        header_name: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    Log,
}

/// Destination for events leaving the pipeline.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, event: &Event) -> Result<()>;
}

pub fn build_sink(config: &SinkConfig, agent_id: &str) -> Result<Arc<dyn Sink>> {
    let sink: Arc<dyn Sink> = match config {
        SinkConfig::Http { url, secret, header_name, timeout_ms } => {
            let signer = secret
                .as_ref()
                .map(|s| s.resolve().map(|key| HmacSigner::new(key, header_name.clone())))
                .transpose()?;

            Arc::new(http::HttpSink::new(
                url,
                agent_id,
                std::time::Duration::from_millis(*timeout_ms),
                signer,
            )?)
        }
        SinkConfig::Log => Arc::new(log::LogSink::new(agent_id)),
    };

    Ok(sink)
}

fn default_header_name() -> String {
    DEFAULT_SIGNATURE_HEADER.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}
