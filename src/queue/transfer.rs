//! The transfer loop run for each task that enters `loading`.
//!
//! One attempt sends the request and streams the body to the staging file.
//! A timer, rearmed for the response headers and every chunk, restarts the
//! attempt when the server goes quiet. Connection failures wait one stall
//! timeout and try again. Everything else ends the transfer.
//!
//! The loop never touches task state directly; it reports through
//! [`Shared`], which ignores a transfer that no longer owns its task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::{Shared, TransferError};
use crate::fetch::FetchError;

/// Everything a spawned transfer needs to know about its task.
#[derive(Debug, Clone)]
pub(crate) struct TransferJob {
    pub(crate) id: u64,
    pub(crate) generation: u64,
    pub(crate) token: CancellationToken,
    pub(crate) url: String,
    pub(crate) target_directory: PathBuf,
    pub(crate) staging_path: PathBuf,
}

/// How a single attempt ended, short of a failure.
#[derive(Debug)]
enum Outcome {
    Completed,
    Stalled,
    Retry(FetchError),
    Cancelled,
}

#[instrument(skip(shared, job), fields(task_id = job.id, generation = job.generation, url = %job.url))]
pub(crate) async fn run(shared: Arc<Shared>, job: TransferJob) {
    let mut attempts: u32 = 0;
    let result = loop {
        if !shared.begin_attempt(&job, attempts > 0) {
            break None;
        }
        attempts += 1;

        match attempt(&shared, &job).await {
            Ok(Outcome::Completed) => break Some(Ok(())),
            Ok(Outcome::Cancelled) => break None,
            Ok(Outcome::Stalled) => {
                warn!(attempt = attempts, "transfer stalled, restarting");
            }
            Ok(Outcome::Retry(error)) => {
                let delay = shared.stall_timeout();
                warn!(
                    attempt = attempts,
                    error = %error,
                    delay_ms = millis(delay),
                    "request failed before response, retrying"
                );
                let cancelled = tokio::select! {
                    biased;
                    () = job.token.cancelled() => true,
                    () = sleep(delay) => false,
                };
                if cancelled {
                    break None;
                }
            }
            Err(error) => break Some(Err(error)),
        }
    };

    match result {
        Some(result) => shared.finish(&job, result),
        None => {
            debug!("transfer cancelled");
            shared.discard(&job);
        }
    }
}

async fn attempt(shared: &Shared, job: &TransferJob) -> Result<Outcome, TransferError> {
    fs::create_dir_all(&job.target_directory)
        .await
        .map_err(|e| TransferError::io(&job.target_directory, e))?;

    let timeout = shared.stall_timeout();
    debug!(timeout_ms = millis(timeout), "sending request");
    let response = tokio::select! {
        biased;
        () = job.token.cancelled() => return Ok(Outcome::Cancelled),
        response = shared.client().get(&job.url) => response,
        () = sleep(timeout) => return Ok(Outcome::Stalled),
    };
    let response = match response {
        Ok(response) => response,
        Err(error) if error.is_connection_phase() => return Ok(Outcome::Retry(error)),
        Err(error) => return Err(error.into()),
    };

    let expected = response.content_length();
    let file = File::create(&job.staging_path)
        .await
        .map_err(|e| TransferError::io(&job.staging_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut received: u64 = 0;

    loop {
        let timeout = shared.stall_timeout();
        let next = tokio::select! {
            biased;
            () = job.token.cancelled() => return Ok(Outcome::Cancelled),
            next = stream.next() => next,
            () = sleep(timeout) => return Ok(Outcome::Stalled),
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| TransferError::body(&job.url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(&job.staging_path, e))?;
        received += chunk.len() as u64;

        if let Some(total) = expected
            && total > 0
        {
            shared.report_progress(job, percent(received, total));
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(&job.staging_path, e))?;
    drop(writer);

    // A short body normally surfaces above as `TransferError::Body`, since
    // reqwest fails the stream itself. This only catches a stream that ends
    // cleanly with a mismatched count.
    if let Some(expected) = expected
        && received != expected
    {
        return Err(TransferError::incomplete(&job.url, expected, received));
    }

    debug!(bytes = received, "body received");
    Ok(Outcome::Completed)
}

fn percent(received: u64, total: u64) -> u8 {
    let value = received.saturating_mul(100) / total.max(1);
    u8::try_from(value.min(100)).unwrap_or(100)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
