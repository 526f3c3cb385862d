use thiserror::Error;

/// Failures surfaced by a [`crate::store::GridStore`] backend.
///
/// Rate-limit and transient server failures are kept distinct from
/// logical errors so the retry wrapper knows what it may retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limited by the grid store")]
    RateLimited,
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("unknown tab '{0}'")]
    UnknownTab(String),
    #[error("malformed store data: {0}")]
    Malformed(String),
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for failures the backoff wrapper is allowed to retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::RateLimited | StoreError::Transient(_))
    }
}

/// User-facing failures from the mutation engine and its helpers.
#[derive(Debug, Error)]
pub enum SchedulerError {
    // ── input validation (never retried) ─────────────────────────────
    #[error("{0}")]
    InvalidRequest(String),
    #[error("'{0}' is not on the roster; names must match the roster exactly (spacing aside)")]
    UnknownPerson(String),
    #[error("unknown campus/tab '{0}'")]
    UnknownTarget(String),

    // ── resolution (reported with full diagnostic context) ───────────
    #[error("could not read a weekday header from '{tab}' for {day}; attempted header rows:\n{scan}")]
    DayUnresolved { tab: String, day: String, scan: String },
    #[error("'{tab}' supports fixed blocks; '{start} – {end}' not found in column {col}; blocks present:\n{blocks}")]
    BlockNotFound {
        tab: String,
        start: String,
        end: String,
        col: usize,
        blocks: String,
    },
    #[error("time ladder on '{tab}' is not on a 30-minute grid: '{prev}' is followed by '{next}'")]
    MalformedLadder {
        tab: String,
        prev: String,
        next: String,
    },

    // ── capacity / policy (current vs. requested numbers included) ───
    #[error("more than {cap:.0} hours: have {have:.1}h; request {want:.1}h")]
    WeeklyCeiling { cap: f64, have: f64, want: f64 },
    #[error("daily cap exceeded on {day}: have {have}, request {want}")]
    DailyCeiling {
        day: String,
        have: String,
        want: String,
    },
    #[error("no room on '{tab}': {reasons}")]
    SlotFull { tab: String, reasons: String },
    #[error("{person} not found in block '{start} – {end}' on '{tab}'")]
    NotInBlock {
        person: String,
        start: String,
        end: String,
        tab: String,
    },

    // ── concurrency conflicts (caller should resubmit) ───────────────
    #[error("another request just claimed this window; try again")]
    LockLost,
    #[error("slot {label} filled before write; please retry")]
    LaneTaken { label: String },

    // ── transient store errors, surfaced after retries exhaust ───────
    #[error(transparent)]
    Store(#[from] StoreError),

    // ── change compensation ──────────────────────────────────────────
    #[error("could not add the new window ({reason}); your original shift was restored")]
    ChangeReverted { reason: String },
    #[error(
        "change failed and restoring the original window also failed — the schedule may be \
         inconsistent and needs manual review.\nadd error: {add}\nrestore error: {restore}"
    )]
    CompensationFailed { add: String, restore: String },
}

impl SchedulerError {
    /// True for conflicts that a caller is expected to resolve by
    /// simply resubmitting the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::LockLost | SchedulerError::LaneTaken { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::RateLimited.is_transient());
        assert!(StoreError::Transient("503".into()).is_transient());
        assert!(!StoreError::UnknownTab("x".into()).is_transient());
    }

    #[test]
    fn retryable_classification() {
        assert!(SchedulerError::LockLost.is_retryable());
        assert!(SchedulerError::LaneTaken {
            label: "9:00 AM".into()
        }
        .is_retryable());
        assert!(!SchedulerError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn ceiling_message_cites_numbers() {
        let e = SchedulerError::WeeklyCeiling {
            cap: 20.0,
            have: 19.5,
            want: 1.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("19.5"));
        assert!(msg.contains("1.0"));
    }
}
