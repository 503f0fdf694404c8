// crates/server/src/jobs/channel.rs
//! Per-job event channel: ordered broadcast from one producer to any
//! number of independently-positioned readers.
//!
//! Pushing never blocks, with or without readers. The buffer is bounded at
//! [`EVENT_BUFFER`] events; the overflow policy is drop-oldest — a reader
//! that falls more than a buffer behind observes [`Polled::Lagged`] and
//! should recover the full history from the job snapshot. Readers that
//! attach late only see events pushed after they attached; history lives
//! in the job record, not here.

use std::time::Duration;

use tokio::sync::broadcast;

use super::types::JobEvent;

/// Buffered events per job before the oldest are dropped.
pub const EVENT_BUFFER: usize = 1024;

#[derive(Debug)]
pub struct EventChannel {
    tx: broadcast::Sender<JobEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Enqueue an event. Never blocks; a send with no attached readers is
    /// fine (the record keeps the authoritative log history).
    pub fn push(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }

    /// Attach a new reader at the current end of the stream.
    pub fn subscribe(&self) -> EventReader {
        EventReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// What a bounded wait for the next event produced.
#[derive(Debug)]
pub enum Polled {
    Event(JobEvent),
    /// Nothing arrived within the timeout; the caller decides whether to
    /// heartbeat and re-poll or give up (e.g. the job already finished).
    TimedOut,
    /// This reader fell behind and `skipped` events were dropped.
    Lagged(u64),
    /// The producer is gone and the buffer is drained.
    Closed,
}

/// One reader's private position in a job's event stream.
pub struct EventReader {
    rx: broadcast::Receiver<JobEvent>,
}

impl EventReader {
    /// Wait up to `timeout` for the next event. The timeout is a
    /// parameter, not a hidden constant, so each transport can tune its
    /// heartbeat interval.
    pub async fn poll(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(event)) => Polled::Event(event),
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => Polled::Lagged(skipped),
            Ok(Err(broadcast::error::RecvError::Closed)) => Polled::Closed,
            Err(_) => Polled::TimedOut,
        }
    }
}
