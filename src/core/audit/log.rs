//! Bounded audit log for one segment
//!
//! Fixed-capacity storage, oldest record first. Records are immutable once
//! written except for the Pending -> Done/Failed transition.

use super::{AuditRecord, OperationKind, ResultState};
use crate::config::AuditOverflowPolicy;
use crate::error::{Result, TyfsError};
use crate::geometry::SEGMENT_AUDIT_CAPACITY;
use crate::identity::{OperationId, UserId};
use tracing::warn;

const EMPTY_RECORD: AuditRecord = AuditRecord {
    user: UserId::SYSTEM,
    operation_id: OperationId::NIL,
    timestamp: 0,
    target_block: 0,
    kind: OperationKind::New,
    state: ResultState::Pending,
};

/// Bounded, append-only audit log
///
/// Stored as a ring over a fixed array so `EvictOldest` can drop the oldest
/// record without shifting. With `Reject` the ring never wraps.
#[derive(Debug, Clone)]
pub struct SegmentAuditLog {
    /// Record storage
    slots: [AuditRecord; SEGMENT_AUDIT_CAPACITY],
    /// Slot holding the oldest record
    start: usize,
    /// Number of stored records
    len: usize,
    /// What to do on append at capacity
    policy: AuditOverflowPolicy,
    /// Records dropped by `EvictOldest` since creation
    evicted: u64,
}

impl SegmentAuditLog {
    /// Create an empty log
    pub fn new(policy: AuditOverflowPolicy) -> Self {
        SegmentAuditLog {
            slots: [EMPTY_RECORD; SEGMENT_AUDIT_CAPACITY],
            start: 0,
            len: 0,
            policy,
            evicted: 0,
        }
    }

    /// Rebuild a log from decoded records, oldest first
    pub(crate) fn from_records(records: &[AuditRecord], policy: AuditOverflowPolicy) -> Result<Self> {
        if records.len() > SEGMENT_AUDIT_CAPACITY {
            return Err(TyfsError::Corrupt(format!(
                "{} audit records exceed capacity {}",
                records.len(),
                SEGMENT_AUDIT_CAPACITY
            )));
        }

        let mut log = Self::new(policy);
        log.slots[..records.len()].copy_from_slice(records);
        log.len = records.len();
        Ok(log)
    }

    /// Append a record
    ///
    /// At capacity, `Reject` fails with `AuditLogFull` and leaves the log
    /// untouched; `EvictOldest` drops the oldest record first.
    pub fn append(&mut self, record: AuditRecord) -> Result<()> {
        record.check()?;

        if self.is_full() {
            match self.policy {
                AuditOverflowPolicy::Reject => {
                    return Err(TyfsError::AuditLogFull {
                        capacity: SEGMENT_AUDIT_CAPACITY,
                    });
                }
                AuditOverflowPolicy::EvictOldest => {
                    self.start = (self.start + 1) % SEGMENT_AUDIT_CAPACITY;
                    self.len -= 1;
                    self.evicted += 1;
                }
            }
        }

        let slot = (self.start + self.len) % SEGMENT_AUDIT_CAPACITY;
        self.slots[slot] = record;
        self.len += 1;
        Ok(())
    }

    /// Move the most recent Pending record of `operation_id` to `outcome`
    pub fn resolve(&mut self, operation_id: OperationId, outcome: ResultState) -> Result<()> {
        let mut known = false;

        for i in (0..self.len).rev() {
            let slot = (self.start + i) % SEGMENT_AUDIT_CAPACITY;
            let record = &mut self.slots[slot];
            if record.operation_id != operation_id {
                continue;
            }
            known = true;

            if record.is_pending() {
                if outcome == ResultState::Pending {
                    break;
                }
                record.state = outcome;
                return Ok(());
            }
        }

        if known {
            warn!("No pending audit record to resolve for operation {}", operation_id);
            Err(TyfsError::OperationNotPending(operation_id.to_string()))
        } else {
            Err(TyfsError::UnknownOperation(operation_id.to_string()))
        }
    }

    /// Records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &AuditRecord> + '_ {
        (0..self.len).map(move |i| &self.slots[(self.start + i) % SEGMENT_AUDIT_CAPACITY])
    }

    /// Newest record
    pub fn last(&self) -> Option<&AuditRecord> {
        self.records().last()
    }

    /// Timestamp of the newest record, 0 when empty
    pub fn last_timestamp(&self) -> i64 {
        self.last().map(|r| r.timestamp).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == SEGMENT_AUDIT_CAPACITY
    }

    pub fn capacity(&self) -> usize {
        SEGMENT_AUDIT_CAPACITY
    }

    pub fn policy(&self) -> AuditOverflowPolicy {
        self.policy
    }

    /// Number of records dropped under `EvictOldest`
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
