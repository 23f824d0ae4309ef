// src/diagnostics.rs
//
// Decode-path diagnostics.
//
// Per-cycle framing errors are expected noise on a sensor link; the
// acquisition loop swallows them, but every one is counted here so callers
// and tests can observe the policy instead of guessing from silence.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::io::error::AcquireError;

/// Lock-free counters updated by the acquisition cycle.
#[derive(Debug, Default)]
pub struct DecodeStats {
    packets_ok: AtomicU64,
    sync_timeouts: AtomicU64,
    incomplete_payloads: AtomicU64,
    checksum_mismatches: AtomicU64,
    truncated_payloads: AtomicU64,
    bytes_discarded: AtomicU64,
}

impl DecodeStats {
    pub(crate) fn record_ok(&self) {
        self.packets_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, err: &AcquireError) {
        let counter = match err {
            AcquireError::SyncTimeout => &self.sync_timeouts,
            AcquireError::IncompletePayload { .. } => &self.incomplete_payloads,
            AcquireError::ChecksumMismatch { .. } => &self.checksum_mismatches,
            AcquireError::TruncatedPayload { .. } => &self.truncated_payloads,
            // Fatal errors end the loop; they are reported, not counted.
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_discarded(&self, n: u64) {
        if n > 0 {
            self.bytes_discarded.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DecodeStatsSnapshot {
        DecodeStatsSnapshot {
            packets_ok: self.packets_ok.load(Ordering::Relaxed),
            sync_timeouts: self.sync_timeouts.load(Ordering::Relaxed),
            incomplete_payloads: self.incomplete_payloads.load(Ordering::Relaxed),
            checksum_mismatches: self.checksum_mismatches.load(Ordering::Relaxed),
            truncated_payloads: self.truncated_payloads.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of the decode counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStatsSnapshot {
    pub packets_ok: u64,
    pub sync_timeouts: u64,
    pub incomplete_payloads: u64,
    pub checksum_mismatches: u64,
    pub truncated_payloads: u64,
    pub bytes_discarded: u64,
}

impl DecodeStatsSnapshot {
    /// Total per-cycle errors the loop absorbed.
    pub fn total_errors(&self) -> u64 {
        self.sync_timeouts
            + self.incomplete_payloads
            + self.checksum_mismatches
            + self.truncated_payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_map_to_error_kinds() {
        let stats = DecodeStats::default();
        stats.record_ok();
        stats.record_ok();
        stats.record_error(&AcquireError::SyncTimeout);
        stats.record_error(&AcquireError::ChecksumMismatch { expected: 1, got: 2 });
        stats.record_error(&AcquireError::Disconnected); // fatal, not counted
        stats.add_discarded(17);

        let snap = stats.snapshot();
        assert_eq!(snap.packets_ok, 2);
        assert_eq!(snap.sync_timeouts, 1);
        assert_eq!(snap.checksum_mismatches, 1);
        assert_eq!(snap.incomplete_payloads, 0);
        assert_eq!(snap.truncated_payloads, 0);
        assert_eq!(snap.bytes_discarded, 17);
        assert_eq!(snap.total_errors(), 2);
    }
}
