//! Pipeline assembly and the shutdown sequence.
//!
//! Shutdown order is fixed: cancel producers, join every producer, close the queue,
//! join every worker. The queue is closed only after the last producer has
//! returned, so no put can race the close, however long a producer's tick is.
//!
//! A coordinator dropped without `shutdown` cancels its producers and closes the
//! queue, so no task outlives it. Nothing is joined on that path.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::pipeline::producer::{Producer, ProducerStats};
use crate::pipeline::queue::EventQueue;
use crate::pipeline::sinks::Sink;
use crate::pipeline::worker::{WorkerPool, WorkerStats};
use crate::pipeline::PipelineState;

/// What happened over the life of a pipeline, collected once it is stopped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub emitted: u64,
    pub abandoned: u64,
    pub delivered: u64,
    pub failed: u64,
    pub producer_faults: u64,
    pub crashed_workers: u64,
    pub shutdown_duration: Duration,
    pub grace_exceeded: bool,
}

/// Builder for a pipeline instance.
pub struct Pipeline {
    config: PipelineConfig,
    sink: Arc<dyn Sink>,
    producers: Vec<Producer>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, sink: Arc<dyn Sink>) -> Self {
        Self {
            config,
            sink,
            producers: Vec::new(),
        }
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn with_producers(mut self, producers: impl IntoIterator<Item = Producer>) -> Self {
        self.producers.extend(producers);
        self
    }

    /// Spawns the workers, then the producers. Must be called inside a Tokio runtime.
    pub fn start(self) -> Result<Coordinator> {
        self.config.validate()?;

        if let Some(producer) = self.producers.iter().find(|p| p.interval().is_zero()) {
            return Err(AppError::Config(format!(
                "producer {} has a zero tick interval",
                producer.id()
            )));
        }

        let queue = Arc::new(EventQueue::new(self.config.queue_capacity)?);
        let workers = WorkerPool::spawn(self.config.worker_count, Arc::clone(&queue), self.sink);
        let cancel = CancellationToken::new();

        let producers = self
            .producers
            .into_iter()
            .map(|producer| {
                let id = producer.id().to_string();
                let handle = tokio::spawn(producer.run(Arc::clone(&queue), cancel.clone()));
                (id, handle)
            })
            .collect::<Vec<_>>();

        let (state, _) = watch::channel(PipelineState::Running);

        info!(
            producers = producers.len(),
            workers = workers.size(),
            queue_capacity = queue.capacity(),
            "Pipeline started"
        );

        let teardown = TeardownOnDrop {
            cancel: Some(cancel.clone().drop_guard()),
            queue: Arc::clone(&queue),
        };

        Ok(Coordinator {
            queue,
            cancel,
            teardown,
            producers,
            workers,
            state,
            grace: self.config.shutdown_grace(),
        })
    }
}

/// Owner of a running pipeline and the only party allowed to close its queue.
pub struct Coordinator {
    queue: Arc<EventQueue>,
    cancel: CancellationToken,
    teardown: TeardownOnDrop,
    producers: Vec<(String, JoinHandle<ProducerStats>)>,
    workers: WorkerPool,
    state: watch::Sender<PipelineState>,
    grace: Duration,
}

/// Stops the tasks of a coordinator that goes away without `shutdown`.
struct TeardownOnDrop {
    cancel: Option<DropGuard>,
    queue: Arc<EventQueue>,
}

impl TeardownOnDrop {
    fn disarm(mut self) {
        if let Some(guard) = self.cancel.take() {
            guard.disarm();
        }
    }
}

impl Drop for TeardownOnDrop {
    fn drop(&mut self) {
        // Producers are cancelled before the queue closes.
        if let Some(guard) = self.cancel.take() {
            warn!("Coordinator dropped without shutdown, stopping pipeline tasks");
            drop(guard);
            let _ = self.queue.close();
        }
    }
}

impl Coordinator {
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    /// Runs until `stop` resolves, then shuts the pipeline down.
    pub async fn run_until<F>(self, stop: F) -> Result<PipelineReport>
    where
        F: Future<Output = ()>,
    {
        stop.await;
        info!("Stop signal received");
        self.shutdown().await
    }

    pub async fn shutdown(self) -> Result<PipelineReport> {
        let Coordinator {
            queue,
            cancel,
            teardown,
            producers,
            workers,
            state,
            grace,
        } = self;
        teardown.disarm();

        let started = Instant::now();
        let mut report = PipelineReport::default();

        transition(&state, PipelineState::Stopping)?;
        cancel.cancel();

        let mut join = Box::pin(join_producers(producers));
        let producer_totals = match tokio::time::timeout(grace, join.as_mut()).await {
            Ok(totals) => totals,
            Err(_) => {
                report.grace_exceeded = true;
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Producers still running after the grace period, waiting for them to return"
                );
                join.await
            }
        };

        report.emitted = producer_totals.emitted;
        report.abandoned = producer_totals.abandoned;
        report.producer_faults = producer_totals.faults;

        transition(&state, PipelineState::Draining)?;
        if let Err(e) = queue.close() {
            error!("Queue close failed: {}", e);
        }

        let WorkerStats {
            delivered,
            failed,
            crashed,
        } = workers.join().await;
        report.delivered = delivered;
        report.failed = failed;
        report.crashed_workers = crashed;

        transition(&state, PipelineState::Stopped)?;

        report.shutdown_duration = started.elapsed();
        report.grace_exceeded |= report.shutdown_duration > grace;

        info!(
            emitted = report.emitted,
            delivered = report.delivered,
            failed = report.failed,
            abandoned = report.abandoned,
            producer_faults = report.producer_faults,
            shutdown_ms = report.shutdown_duration.as_millis() as u64,
            "Pipeline stopped"
        );

        Ok(report)
    }
}

#[derive(Default)]
struct ProducerTotals {
    emitted: u64,
    abandoned: u64,
    faults: u64,
}

async fn join_producers(producers: Vec<(String, JoinHandle<ProducerStats>)>) -> ProducerTotals {
    let mut totals = ProducerTotals::default();

    for (id, handle) in producers {
        match handle.await {
            Ok(stats) => {
                totals.emitted += stats.emitted;
                totals.abandoned += stats.abandoned;
                if stats.faulted {
                    totals.faults += 1;
                }
            }
            Err(e) => {
                error!(producer = %id, "Producer task ended abnormally: {}", e);
                totals.faults += 1;
            }
        }
    }

    totals
}

fn transition(state: &watch::Sender<PipelineState>, next: PipelineState) -> Result<()> {
    let current = *state.borrow();
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: current,
            to: next,
        });
    }

    state.send_replace(next);
    info!(from = ?current, to = ?next, "Pipeline state changed");
    Ok(())
}
