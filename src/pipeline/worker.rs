use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::pipeline::queue::EventQueue;
use crate::pipeline::sinks::Sink;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: u64,
    pub failed: u64,
    /// Workers whose task ended abnormally.
    pub crashed: u64,
}

impl WorkerStats {
    fn merge(&mut self, other: WorkerStats) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.crashed += other.crashed;
    }
}

/// Fixed set of tasks forwarding queued events to the sink.
pub struct WorkerPool {
    workers: Vec<(usize, JoinHandle<WorkerStats>)>,
}

impl WorkerPool {
    pub fn spawn(count: usize, queue: Arc<EventQueue>, sink: Arc<dyn Sink>) -> Self {
        let workers = (0..count)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let sink = Arc::clone(&sink);
                (id, tokio::spawn(run_worker(id, queue, sink)))
            })
            .collect();

        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker. Only returns once the queue is closed and drained.
    pub async fn join(self) -> WorkerStats {
        let mut total = WorkerStats::default();

        for (id, handle) in self.workers {
            match handle.await {
                Ok(stats) => total.merge(stats),
                Err(e) => {
                    error!(worker = id, "Worker task ended abnormally: {}", e);
                    total.crashed += 1;
                }
            }
        }

        total
    }
}

async fn run_worker(id: usize, queue: Arc<EventQueue>, sink: Arc<dyn Sink>) -> WorkerStats {
    debug!(worker = id, "Worker started");

    let mut stats = WorkerStats::default();

    while let Some(event) = queue.take().await {
        // A panicking sink costs one event, not the worker.
        match AssertUnwindSafe(sink.send(&event)).catch_unwind().await {
            Ok(Ok(())) => {
                stats.delivered += 1;
                debug!(worker = id, source = %event.source_id(), kind = %event.kind(), "Event delivered");
            }
            Ok(Err(e)) => {
                stats.failed += 1;
                warn!(worker = id, source = %event.source_id(), kind = %event.kind(), "Failed to deliver event: {}", e);
            }
            Err(_) => {
                stats.failed += 1;
                error!(worker = id, source = %event.source_id(), kind = %event.kind(), "Sink panicked while delivering event");
            }
        }
    }

    info!(worker = id, delivered = stats.delivered, failed = stats.failed, "Worker stopped");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::pipeline::event::{Event, EventKind};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Sink for Recording {
        async fn send(&self, event: &Event) -> Result<()> {
            self.seen.lock().unwrap().push(event.payload().to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct EveryOtherFails {
        calls: AtomicU64,
    }

    #[async_trait::async_trait]
    impl Sink for EveryOtherFails {
        async fn send(&self, _event: &Event) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                return Err(AppError::Sink("audit server unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct PanicsOnThird {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Sink for PanicsOnThird {
        async fn send(&self, event: &Event) -> Result<()> {
            if event.payload() == "event-3" {
                panic!("sink bug");
            }
            self.seen.lock().unwrap().push(event.payload().to_string());
            Ok(())
        }
    }

    async fn fill(queue: &EventQueue, count: usize) {
        for n in 0..count {
            queue
                .put(Event::new("test", EventKind::NetworkConnection, format!("event-{}", n)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_pool_delivers_each_event_once() {
        let queue = Arc::new(EventQueue::new(64).unwrap());
        let sink = Arc::new(Recording::default());

        let pool = WorkerPool::spawn(4, Arc::clone(&queue), sink.clone());
        assert_eq!(pool.size(), 4);

        fill(&queue, 50).await;
        queue.close().unwrap();

        let stats = pool.join().await;
        assert_eq!(stats.delivered, 50);
        assert_eq!(stats.failed, 0);

        let mut seen = sink.seen.lock().unwrap().clone();
        seen.sort();
        let mut expected: Vec<String> = (0..50).map(|n| format!("event-{}", n)).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_strand_events() {
        let queue = Arc::new(EventQueue::new(32).unwrap());
        let sink = Arc::new(EveryOtherFails::default());

        let pool = WorkerPool::spawn(3, Arc::clone(&queue), sink.clone());

        fill(&queue, 20).await;
        queue.close().unwrap();

        let stats = pool.join().await;
        assert_eq!(stats.delivered + stats.failed, 20);
        assert_eq!(stats.failed, 10);
        assert_eq!(stats.crashed, 0);
        assert!(queue.is_empty());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_sink_panic_keeps_worker_alive() {
        let queue = Arc::new(EventQueue::new(16).unwrap());
        let sink = Arc::new(PanicsOnThird::default());

        let pool = WorkerPool::spawn(1, Arc::clone(&queue), sink.clone());

        fill(&queue, 10).await;
        queue.close().unwrap();

        let stats = pool.join().await;
        assert_eq!(stats.delivered, 9);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.crashed, 0);
        assert!(queue.is_empty());
        assert!(!sink.seen.lock().unwrap().contains(&"event-3".to_string()));
    }

    #[tokio::test]
    async fn test_idle_pool_exits_on_close() {
        let queue = Arc::new(EventQueue::new(4).unwrap());
        let pool = WorkerPool::spawn(3, Arc::clone(&queue), Arc::new(Recording::default()));

        queue.close().unwrap();

        let stats = pool.join().await;
        assert_eq!(stats, WorkerStats::default());
    }
}
