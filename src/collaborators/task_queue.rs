use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::collaborators::TaskQueue;
use crate::errors::InternalError;
use crate::types::internal::{JobRef, QueuedJob};

/// In-process queue backed by a tokio channel; the worker owns the receiver
#[derive(Debug, Clone)]
pub struct TokioTaskQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
}

impl TokioTaskQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QueuedJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl TaskQueue for TokioTaskQueue {
    async fn enqueue(&self, job: JobRef, queue: &str, timeout: Duration) -> Result<(), InternalError> {
        let payload = job.to_payload()?;
        tracing::info!(queue = %queue, timeout_secs = timeout.as_secs(), payload = %payload, "Enqueued job");

        self.sender
            .send(QueuedJob {
                job,
                queue: queue.to_string(),
                timeout,
            })
            .map_err(|e| InternalError::collaborator("task_queue", format!("worker is gone: {}", e)))
    }
}
