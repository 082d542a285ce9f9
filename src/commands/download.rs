//! Shared download flow for `get` and `papers --download`.

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use papergrab_core::{DownloadQueue, Resource, TaskStatus};
use tracing::{info, warn};

use super::Context;
use crate::progress;

/// Downloads crawler output into `dir`.
pub(crate) async fn download_resources(
    context: &Context,
    resources: &[Resource],
    dir: &Path,
) -> Result<()> {
    run_queue(context, resources.len(), dir, |queue| {
        queue.add_resources(resources, dir);
    })
    .await
}

/// Downloads plain URLs into `dir`.
pub(crate) async fn download_urls(context: &Context, urls: &[String], dir: &Path) -> Result<()> {
    run_queue(context, urls.len(), dir, |queue| {
        for url in urls {
            queue.add_task(url, dir);
        }
    })
    .await
}

/// Fills a fresh queue, waits for it to drain and reports failures.
///
/// Ctrl-C aborts all transfers, which removes their staging files.
async fn run_queue<F>(context: &Context, total: usize, dir: &Path, enqueue: F) -> Result<()>
where
    F: FnOnce(&DownloadQueue),
{
    if total == 0 {
        info!("Nothing to download");
        return Ok(());
    }

    let queue = DownloadQueue::with_client(context.queue_config.clone(), context.client.clone())
        .context("Failed to start download queue")?;
    let ui = progress::spawn_download_progress(context.show_progress, &queue, total);
    enqueue(&queue);

    let interrupted = tokio::select! {
        () = queue.wait_until_idle() => false,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            warn!("Interrupted, aborting downloads");
            queue.abort_all();
            true
        }
    };
    ui.finish().await;

    let tasks = queue.task_list();
    let succeeded = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Success)
        .count();
    let failed: Vec<_> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Fail)
        .collect();
    for task in &failed {
        eprintln!(
            "failed: {} ({})",
            task.url,
            task.error.as_deref().unwrap_or("unknown error")
        );
    }
    info!(
        succeeded,
        failed = failed.len(),
        dir = %dir.display(),
        "Downloads finished"
    );

    if interrupted {
        bail!("Interrupted; {succeeded} of {} downloads completed", tasks.len());
    }
    if !failed.is_empty() {
        bail!("{} of {} downloads failed", failed.len(), tasks.len());
    }
    Ok(())
}
