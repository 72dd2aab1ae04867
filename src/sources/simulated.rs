use crate::error::Result;
use crate::pipeline::event::{EventKind, Observation};
use super::config::{EmitRule, ProducerConfig};
use super::EventSource;

/// Stand-in for a file-integrity or process monitor: reports a fixed finding
/// whenever its emission rule fires.
pub struct SimulatedMonitor {
    kind: EventKind,
    details: String,
    rule: EmitRule,
}

impl SimulatedMonitor {
    pub fn new(kind: EventKind, details: impl Into<String>, rule: EmitRule) -> Self {
        Self {
            kind,
            details: details.into(),
            rule,
        }
    }

    pub fn from_config(config: &ProducerConfig) -> Self {
        Self::new(config.kind, config.details.clone(), config.emit.clone())
    }
}

#[async_trait::async_trait]
impl EventSource for SimulatedMonitor {
    async fn poll(&mut self, tick: u64) -> Result<Option<Observation>> {
        if !self.rule.should_emit(tick) {
            return Ok(None);
        }

        Ok(Some(Observation::new(self.kind, self.details.clone())))
    }
}
