pub mod config;
pub mod simulated;

use crate::error::Result;
use crate::pipeline::event::Observation;
use crate::pipeline::producer::Producer;
use self::config::ProducerConfig;
use simulated::SimulatedMonitor;

pub use self::config::EmitRule;

/// Something a producer inspects once per tick.
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// Returns `Ok(None)` when there is nothing to report on this tick.
    async fn poll(&mut self, tick: u64) -> Result<Option<Observation>>;
}

pub fn build_producers(configs: &[ProducerConfig]) -> Result<Vec<Producer>> {
    let mut producers = Vec::with_capacity(configs.len());

    for config in configs {
        config.validate()?;

        let producer = Producer::new(
            config.id.clone(),
            config.tick_interval(),
            Box::new(SimulatedMonitor::from_config(config)),
        );
        producers.push(producer);
    }

    Ok(producers)
}
