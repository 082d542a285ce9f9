//! Constants for the fetch module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout for directory page fetches (30 seconds).
///
/// Transfers do not use a request timeout; they are governed by the queue's
/// stall timer instead.
pub const PAGE_TIMEOUT_SECS: u64 = 30;
