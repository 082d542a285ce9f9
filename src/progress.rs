//! Progress bars for crawls and download runs.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use papergrab_core::{DownloadQueue, TaskEvent, TaskStatus};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Bar for a crawl's 0-100 progress; hidden when `show` is false.
pub(crate) fn crawl_bar(show: bool, subject: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!("Crawling {subject}"));
    bar
}

/// Handle to the download progress UI.
pub(crate) struct DownloadProgress {
    handle: Option<tokio::task::JoinHandle<()>>,
    stop: CancellationToken,
}

impl DownloadProgress {
    /// Stops the UI and waits for it to clear its bar.
    pub(crate) async fn finish(self) {
        self.stop.cancel();
        if let Some(handle) = self.handle {
            let _ = handle.await;
        }
    }
}

/// Spawns a bar that counts finished tasks out of `total`.
///
/// Must be called before tasks are added so no event is missed.
pub(crate) fn spawn_download_progress(
    show: bool,
    queue: &DownloadQueue,
    total: usize,
) -> DownloadProgress {
    let stop = CancellationToken::new();
    if !show {
        return DownloadProgress { handle: None, stop };
    }

    let mut events = queue.subscribe();
    let queue = queue.clone();
    let token = stop.clone();
    let handle = tokio::spawn(async move {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let mut statuses: HashMap<u64, TaskStatus> = HashMap::new();

        loop {
            let event = tokio::select! {
                () = token.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(TaskEvent { id, status, .. }) => {
                    statuses.insert(id, status);
                }
                Err(RecvError::Lagged(_)) => {
                    statuses = queue
                        .task_list()
                        .into_iter()
                        .map(|task| (task.id, task.status))
                        .collect();
                }
                Err(RecvError::Closed) => break,
            }

            let (finished, loading) = tally(&statuses);
            bar.set_position(finished as u64);
            bar.set_message(format!("{loading} loading"));
        }

        bar.finish_and_clear();
    });

    DownloadProgress {
        handle: Some(handle),
        stop,
    }
}

/// Counts finished and loading tasks.
fn tally(statuses: &HashMap<u64, TaskStatus>) -> (usize, usize) {
    statuses
        .values()
        .fold((0, 0), |(finished, loading), status| match status {
            TaskStatus::Success | TaskStatus::Fail | TaskStatus::Aborted => (finished + 1, loading),
            TaskStatus::Loading => (finished, loading + 1),
            TaskStatus::New | TaskStatus::Waiting => (finished, loading),
        })
}
