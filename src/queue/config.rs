//! Queue configuration and the adaptive stall timeout.

use std::time::Duration;

use super::error::QueueError;

/// Minimum allowed `max_active` value.
pub const MIN_ACTIVE: usize = 1;

/// Maximum allowed `max_active` value.
pub const MAX_ACTIVE: usize = 1000;

/// Default concurrency ceiling.
pub const DEFAULT_MAX_ACTIVE: usize = 150;

/// Default lower bound of the stall timeout.
pub const DEFAULT_STALL_FLOOR: Duration = Duration::from_secs(10);

/// Default stall allowance per active transfer.
pub const DEFAULT_STALL_PER_ACTIVE: Duration = Duration::from_millis(100);

/// Default suffix of in-flight files.
pub const DEFAULT_STAGING_SUFFIX: &str = ".downloading";

/// Settings for a [`DownloadQueue`](super::DownloadQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of tasks loading at once.
    pub max_active: usize,
    /// The stall timeout never drops below this.
    pub stall_floor: Duration,
    /// Stall allowance added per loading task; many parallel transfers
    /// share bandwidth, so each one gets longer between chunks.
    pub stall_per_active: Duration,
    /// Appended to the target file name while a transfer is in flight.
    pub staging_suffix: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_active: DEFAULT_MAX_ACTIVE,
            stall_floor: DEFAULT_STALL_FLOOR,
            stall_per_active: DEFAULT_STALL_PER_ACTIVE,
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
        }
    }
}

impl QueueConfig {
    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the [`QueueError`] for the first invalid field.
    pub fn validate(&self) -> Result<(), QueueError> {
        if !(MIN_ACTIVE..=MAX_ACTIVE).contains(&self.max_active) {
            return Err(QueueError::InvalidMaxActive {
                value: self.max_active,
            });
        }
        if self.stall_floor.is_zero() {
            return Err(QueueError::InvalidStallTimeout);
        }
        if self.staging_suffix.is_empty() || self.staging_suffix.contains(['/', '\\']) {
            return Err(QueueError::InvalidStagingSuffix {
                suffix: self.staging_suffix.clone(),
            });
        }
        Ok(())
    }

    /// Stall timeout for a transfer while `active` tasks are loading:
    /// `max(stall_per_active * active, stall_floor)`.
    #[must_use]
    pub fn stall_timeout(&self, active: usize) -> Duration {
        let active = u32::try_from(active).unwrap_or(u32::MAX);
        self.stall_per_active
            .saturating_mul(active)
            .max(self.stall_floor)
    }
}
