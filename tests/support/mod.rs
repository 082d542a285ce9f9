//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod raw_http;
pub mod socket_guard;

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Polls `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}
