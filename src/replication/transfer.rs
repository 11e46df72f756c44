//! Transfer of a single key
//!
//! `DUMP` on the source, `PTTL` on the source, `RESTORE` on the destination.
//! Every failure is classified into a [`TransferOutcome`] and never retried.

use std::fmt;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::{Key, Store, Ttl};

/// Per-key transfer policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// When the TTL cannot be read, fail the key instead of restoring it
    /// without expiry
    pub strict_ttl: bool,
}

/// Result of moving one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The key was restored on the destination
    Copied {
        /// TTL the key was restored with
        ttl: Ttl,
        /// The TTL could not be read and the key was restored without expiry
        ttl_defaulted: bool,
    },
    /// The key no longer existed on the source
    SkippedMissing,
    /// `DUMP` failed for a reason other than a missing key
    FailedDump(StoreError),
    /// The key could not be installed on the destination
    FailedRestore(StoreError),
}

impl TransferOutcome {
    /// Classification without payload
    pub fn kind(&self) -> OutcomeKind {
        match self {
            TransferOutcome::Copied { .. } => OutcomeKind::Copied,
            TransferOutcome::SkippedMissing => OutcomeKind::SkippedMissing,
            TransferOutcome::FailedDump(_) => OutcomeKind::FailedDump,
            TransferOutcome::FailedRestore(_) => OutcomeKind::FailedRestore,
        }
    }

    /// Underlying error of a failed transfer
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            TransferOutcome::FailedDump(e) | TransferOutcome::FailedRestore(e) => Some(e),
            _ => None,
        }
    }
}

/// Kind of a [`TransferOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// Restored on the destination
    Copied,
    /// Gone from the source before it could be dumped
    SkippedMissing,
    /// Dump failed
    FailedDump,
    /// Restore failed
    FailedRestore,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied => write!(f, "copied"),
            Self::SkippedMissing => write!(f, "skipped_missing"),
            Self::FailedDump => write!(f, "failed_dump"),
            Self::FailedRestore => write!(f, "failed_restore"),
        }
    }
}

/// Move `key` from `source` to `destination`.
pub async fn transfer_key(
    key: &Key,
    source: &dyn Store,
    destination: &dyn Store,
    options: TransferOptions,
) -> TransferOutcome {
    let dump = match source.dump(key).await {
        Ok(dump) => dump,
        Err(e) if e.is_not_found() => {
            debug!(key = %key, "skipping missing key");
            return TransferOutcome::SkippedMissing;
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to dump key");
            return TransferOutcome::FailedDump(e);
        }
    };

    let mut ttl_defaulted = false;
    let ttl = match source.remaining_ttl(key).await {
        Ok(ttl) => ttl,
        // expired between DUMP and PTTL
        Err(e) if e.is_not_found() => {
            debug!(key = %key, "key expired during transfer, skipping");
            return TransferOutcome::SkippedMissing;
        }
        Err(e) if options.strict_ttl => {
            warn!(key = %key, error = %e, "failed to read ttl, key not restored");
            return TransferOutcome::FailedRestore(e);
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to read ttl, restoring without expiry");
            ttl_defaulted = true;
            Ttl::Persistent
        }
    };

    match destination.restore(key, &dump, ttl).await {
        Ok(()) => TransferOutcome::Copied { ttl, ttl_defaulted },
        Err(e) => {
            warn!(key = %key, error = %e, "failed to restore key");
            TransferOutcome::FailedRestore(e)
        }
    }
}
