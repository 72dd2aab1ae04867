use super::Sink;
use crate::error::Result;
use crate::pipeline::event::{Alert, Event};

/// Writes alerts to the log instead of a remote server.
pub struct LogSink {
    agent_id: String,
}

impl LogSink {
    pub fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Sink for LogSink {
    async fn send(&self, event: &Event) -> Result<()> {
        let alert = Alert::from_event(&self.agent_id, event);

        tracing::info!(
            agent = %alert.agent_id,
            source = %event.source_id(),
            event_type = %alert.event_type,
            timestamp = alert.timestamp,
            "{}",
            alert.details
        );

        Ok(())
    }
}
