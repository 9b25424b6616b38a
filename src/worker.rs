//! Background worker draining the newsletter task queue
//!
//! Jobs run concurrently up to the configured limit, each bounded by the
//! timeout it was enqueued with.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::coordinators::DispatchCoordinator;
use crate::errors::internal::DispatchError;
use crate::errors::InternalError;
use crate::types::internal::{JobRef, QueuedJob};

/// Process jobs until every queue sender is dropped
///
/// Waits for in-flight jobs before returning.
pub async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<QueuedJob>,
    dispatch: Arc<DispatchCoordinator>,
    concurrency: usize,
) {
    let concurrency = concurrency.max(1);
    tracing::info!(concurrency, "Starting newsletter worker");

    let semaphore = Arc::new(Semaphore::new(concurrency));
    while let Some(queued) = receiver.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, "Worker semaphore closed");
                break;
            }
        };

        let dispatch = dispatch.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let JobRef::SendNewsletter { subject, .. } = &queued.job;
            let subject = subject.clone();
            // Not retried; the newsletter waits in Draft for a manual send
            if let Err(e) = process_job(&dispatch, queued).await {
                tracing::error!(subject = %subject, error = %e, kind = e.kind(), "Newsletter job failed");
            }
        });
    }

    tracing::info!("Queue closed, waiting for in-flight jobs...");
    let _ = semaphore.acquire_many(concurrency as u32).await;
    tracing::info!("Worker stopped");
}

/// Run one job under its timeout
///
/// A timed out send is abandoned and its newsletter reset to `Draft`;
/// it has to be sent again by hand.
pub async fn process_job(dispatch: &DispatchCoordinator, queued: QueuedJob) -> Result<(), InternalError> {
    tracing::debug!(event = queued.job.event_name(), queue = %queued.queue, "Processing job");

    match tokio::time::timeout(queued.timeout, dispatch.handle_job(&queued.job)).await {
        Ok(result) => result,
        Err(_) => {
            let JobRef::SendNewsletter { subject, .. } = &queued.job;
            let error = DispatchError::Timeout {
                subject: subject.clone(),
                seconds: queued.timeout.as_secs(),
            };
            tracing::error!(subject = %subject, error = %error, "Newsletter job timed out");
            dispatch.reset_to_draft(subject).await?;
            Err(error.into())
        }
    }
}
