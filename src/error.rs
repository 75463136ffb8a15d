//! Error taxonomy for the watch pipeline.
//!
//! The run controller retries a whole run only for errors where a repeat
//! attempt can plausibly succeed; upstream data defects abort immediately.

use thiserror::Error;

/// Errors produced by the fetch/extract/price/notify pipeline.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Network-level failure or non-2xx status on an outbound call.
    /// Carries the attempted URL so third-party schema drift is diagnosable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A search result is missing required option codes or fields.
    /// Retrying returns the same upstream data, so this aborts the run.
    #[error("malformed listing {vin}: {reason}")]
    MalformedListing { vin: String, reason: String },

    /// The order-flow response did not yield a session cookie or CSRF pair.
    #[error("missing session token for {vin}: {reason}")]
    MissingToken { vin: String, reason: String },

    /// Non-200 from the fees/taxes calculator.
    #[error("fees/taxes calculator failed: status={status}")]
    PricingService { status: u16 },

    /// SMTP delivery failed on one channel. Does not invalidate computed
    /// results; the snapshot is left untouched so the next run re-notifies.
    #[error("notification failed on {channel}: {reason}")]
    Notification { channel: String, reason: String },

    /// The previous snapshot is missing or unreadable; treated as first run.
    #[error("snapshot read failed: {0}")]
    SnapshotRead(String),
}

impl WatchError {
    /// Whether the run controller should retry the whole run for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WatchError::Transport(_)
                | WatchError::MissingToken { .. }
                | WatchError::PricingService { .. }
        )
    }
}

/// Pipeline-wide result alias.
pub type Result<T, E = WatchError> = std::result::Result<T, E>;
