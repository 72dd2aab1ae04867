use std::time::Duration;

use reqwest::{Client, Url};

use super::Sink;
use crate::error::{AppError, Result};
use crate::pipeline::event::{Alert, Event};
use crate::signature::HmacSigner;

pub const EVENT_ID_HEADER: &str = "X-Event-Id";

/// POSTs each event as a JSON alert to the audit server.
pub struct HttpSink {
    client: Client,
    url: Url,
    agent_id: String,
    signer: Option<HmacSigner>,
}

impl HttpSink {
    pub fn new(url: &str, agent_id: &str, timeout: Duration, signer: Option<HmacSigner>) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| AppError::Config(format!("Invalid sink URL '{}': {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(AppError::Config(format!(
                "Invalid sink URL '{}': must be an http:// or https:// URL with a host",
                url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            agent_id: agent_id.to_string(),
            signer,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl Sink for HttpSink {
    async fn send(&self, event: &Event) -> Result<()> {
        let alert = Alert::from_event(&self.agent_id, event);
        let body = serde_json::to_vec(&alert)?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_ID_HEADER, event.id());

        if let Some(signer) = &self.signer {
            request = request.header(signer.header_name(), signer.sign(&body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Sink(format!("Failed to send alert to {}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Sink(format!("Audit server at {} responded with {}", self.url, status)));
        }

        Ok(())
    }
}
