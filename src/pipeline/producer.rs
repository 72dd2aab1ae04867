use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::event::Event;
use crate::pipeline::queue::EventQueue;
use crate::sources::EventSource;

/// Counters a producer hands back to the coordinator when it returns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProducerStats {
    pub emitted: u64,
    /// Observations dropped because cancellation arrived before they were queued.
    pub abandoned: u64,
    pub faulted: bool,
}

/// Periodic, cancellable task that turns source observations into events.
pub struct Producer {
    id: String,
    interval: Duration,
    source: Box<dyn EventSource>,
}

impl Producer {
    pub fn new(id: impl Into<String>, interval: Duration, source: Box<dyn EventSource>) -> Self {
        Self {
            id: id.into(),
            interval,
            source,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(mut self, queue: Arc<EventQueue>, cancel: CancellationToken) -> ProducerStats {
        info!(producer = %self.id, interval_ms = self.interval.as_millis() as u64, "Producer started");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stats = ProducerStats::default();
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tick += 1;

            let observation = match self.source.poll(tick).await {
                Ok(Some(observation)) => observation,
                Ok(None) => continue,
                Err(e) => {
                    error!(producer = %self.id, tick, "Producer fault, no further events from this source: {}", e);
                    stats.faulted = true;
                    break;
                }
            };

            // The poll may have outlived the stop request.
            if cancel.is_cancelled() {
                stats.abandoned += 1;
                debug!(producer = %self.id, tick, "Dropping observation made during shutdown");
                break;
            }

            let event = Event::from_observation(&self.id, observation);
            let kind = event.kind();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stats.abandoned += 1;
                    debug!(producer = %self.id, tick, "Cancelled while waiting for queue space");
                    break;
                }
                result = queue.put(event) => match result {
                    Ok(()) => {
                        stats.emitted += 1;
                        debug!(producer = %self.id, tick, kind = %kind, "Event queued");
                    }
                    Err(e) => {
                        warn!(producer = %self.id, tick, "Stopping producer: {}", e);
                        stats.abandoned += 1;
                        break;
                    }
                },
            }
        }

        info!(
            producer = %self.id,
            emitted = stats.emitted,
            abandoned = stats.abandoned,
            "Producer stopped"
        );

        stats
    }
}
