use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use super::JobEvent;

/// Envelope wrapping a job event with metadata
#[derive(Debug, Clone, Serialize)]
pub struct JobEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: JobEvent,
}

/// Handle for emitting job events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to be consumed by the EventWriter.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<JobEventEnvelope>,
}

impl EventHandle {
    /// Create a new event handle from a channel sender
    pub fn new(tx: mpsc::Sender<JobEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit a job event
    ///
    /// If the channel is closed the error is logged; the caller is never failed.
    pub async fn emit(&self, event: JobEvent) {
        let envelope = JobEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit job event: {}", e);
        }
    }
}

/// Bounded, in-memory list of the most recent job events.
#[derive(Clone)]
pub struct RecentEvents {
    events: Arc<RwLock<VecDeque<JobEventEnvelope>>>,
    capacity: usize,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    async fn push(&self, envelope: JobEventEnvelope) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(envelope);
    }

    /// Events oldest first.
    pub async fn snapshot(&self) -> Vec<JobEventEnvelope> {
        self.events.read().await.iter().cloned().collect()
    }
}

/// Background task that receives job events, logs them and keeps the
/// recent history
pub struct EventWriter {
    rx: mpsc::Receiver<JobEventEnvelope>,
    recent: RecentEvents,
}

impl EventWriter {
    pub fn new(rx: mpsc::Receiver<JobEventEnvelope>, recent: RecentEvents) -> Self {
        Self { rx, recent }
    }

    /// Run the writer, consuming events until the channel is closed
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("Job event writer started");

        while let Some(envelope) = self.rx.recv().await {
            match &envelope.event {
                JobEvent::Started {
                    run_id,
                    workspace,
                    input_count,
                } => {
                    tracing::info!(
                        run_id,
                        workspace = %workspace.display(),
                        input_count,
                        "Starting video merge job"
                    );
                }
                JobEvent::Completed {
                    run_id,
                    outcome,
                    duration_ms,
                } => {
                    if outcome.is_success() {
                        tracing::info!(run_id, duration_ms, "Video merge job completed");
                    } else {
                        tracing::warn!(
                            run_id,
                            duration_ms,
                            outcome = outcome.label(),
                            "Video merge job failed"
                        );
                    }
                }
            }
            self.recent.push(envelope).await;
        }

        tracing::info!("Job event writer shutting down");
    }
}

/// Create a complete job event system
///
/// Returns:
/// - `EventHandle` - for emitting events (clone this to share across tasks)
/// - `EventWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
/// - `RecentEvents` - read side of the in-memory history
pub fn create_event_system(
    buffer_size: usize,
    history_size: usize,
) -> (EventHandle, EventWriter, RecentEvents) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let recent = RecentEvents::new(history_size);
    let handle = EventHandle::new(tx);
    let writer = EventWriter::new(rx, recent.clone());
    (handle, writer, recent)
}
