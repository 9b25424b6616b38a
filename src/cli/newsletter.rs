// Newsletter CLI commands

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app_data::AppData;
use crate::coordinators::DispatchCoordinator;
use crate::types::internal::{DispatchState, QueuedJob, RequestContext};
use crate::worker;

/// Send a newsletter
///
/// With `queue` the send goes through the task queue and the job is run by
/// this process before returning.
pub async fn send_newsletter(
    app_data: Arc<AppData>,
    mut jobs: mpsc::UnboundedReceiver<QueuedJob>,
    subject: &str,
    queue: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::for_cli("send_newsletter");
    let dispatch = DispatchCoordinator::new(app_data);

    let recipients = dispatch.resolve_recipients(subject).await?;
    println!("Sending \"{}\" to {} recipients...", subject, recipients.len());

    match dispatch.send(&ctx, subject, !queue).await? {
        DispatchState::Queued => {
            let queued = jobs.recv().await.ok_or("Task queue closed before the job arrived")?;
            worker::process_job(&dispatch, queued).await?;
        }
        DispatchState::Sent | DispatchState::Draft => {}
    }

    println!("✓ Newsletter is {}", dispatch.get(subject).await?.state);
    Ok(())
}

/// Run the worker until Ctrl-C
///
/// Newsletters left `Queued` by an earlier process are enqueued first.
pub async fn run_worker(
    app_data: Arc<AppData>,
    jobs: mpsc::UnboundedReceiver<QueuedJob>,
) -> Result<(), Box<dyn std::error::Error>> {
    let concurrency = app_data.settings.worker_concurrency;
    let dispatch = Arc::new(DispatchCoordinator::new(app_data));

    let pending = dispatch
        .requeue_pending(&RequestContext::for_cli("worker"))
        .await?;
    println!("Worker started, {} pending newsletters requeued. Press Ctrl-C to stop.", pending.len());

    tokio::select! {
        _ = worker::run_worker(jobs, dispatch, concurrency) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("Interrupted, stopping worker");
        }
    }

    Ok(())
}
