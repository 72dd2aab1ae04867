use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::pipeline::event::EventKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    pub id: String,

    pub kind: EventKind,

    pub details: String,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub emit: EmitRule,
}

impl ProducerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Config("producer id must not be empty".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(AppError::Config(format!(
                "producer {}: tick_interval_ms must be greater than zero",
                self.id
            )));
        }
        self.emit
            .validate()
            .map_err(|e| AppError::Config(format!("producer {}: {}", self.id, e)))
    }
}

/// Decides, tick by tick, whether a monitor reports anything.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmitRule {
    #[default]
    Always,
    Never,
    /// Emit with probability `p` on every tick.
    Probability { p: f64 },
    /// Emit on every `n`-th tick.
    Every { n: u64 },
}

impl EmitRule {
    pub fn should_emit(&self, tick: u64) -> bool {
        match self {
            EmitRule::Always => true,
            EmitRule::Never => false,
            EmitRule::Probability { p } => rand::thread_rng().gen_bool(*p),
            EmitRule::Every { n } => *n > 0 && tick % n == 0,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            EmitRule::Probability { p } if !(0.0..=1.0).contains(p) => {
                Err(format!("probability {} is outside [0, 1]", p))
            }
            EmitRule::Every { n: 0 } => Err("every.n must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    2000
}
