use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::pipeline::event::Event;

/// Bounded, closable FIFO between producers and workers.
///
/// Producers `put` through a sender kept behind a lock; `close` drops that sender so
/// no new put can start, and wakes puts still waiting for space so they fail with
/// [`AppError::QueueClosed`]. An event is either buffered before the close or
/// rejected, and `take` reports the end of the stream once the buffer is empty.
pub struct EventQueue {
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<Event>>>,
    closed: CancellationToken,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    // Signed: a take may observe an event before its put records it.
    buffered: AtomicIsize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AppError::Config("queue capacity must be at least 1".to_string()));
        }

        let (tx, rx) = mpsc::channel(capacity);

        Ok(Self {
            capacity,
            sender: Mutex::new(Some(tx)),
            closed: CancellationToken::new(),
            receiver: tokio::sync::Mutex::new(rx),
            buffered: AtomicIsize::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered events. Approximate while puts and takes are in flight.
    pub fn len(&self) -> usize {
        self.buffered.load(Ordering::Acquire).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Waits for space, then appends the event.
    ///
    /// Fails with [`AppError::QueueClosed`] if the queue is closed before the call or
    /// while the call waits for space. A rejected event is never buffered.
    pub async fn put(&self, event: Event) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AppError::QueueClosed)?;

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(AppError::QueueClosed),
            sent = sender.send(event) => {
                sent.map_err(|_| AppError::QueueClosed)?;
                self.buffered.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
        }
    }

    /// Waits for the next event. `None` means the queue is closed and drained.
    pub async fn take(&self) -> Option<Event> {
        let event = self.receiver.lock().await.recv().await?;
        self.buffered.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Stops accepting events and fails puts waiting for space. Buffered events stay
    /// available to `take`.
    pub fn close(&self) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(_) => {
                self.closed.cancel();
                Ok(())
            }
            None => Err(AppError::QueueAlreadyClosed),
        }
    }
}
