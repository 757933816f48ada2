//! Segment audit trail
//!
//! Every mutating block operation leaves an [`AuditRecord`] in the owning
//! segment's [`SegmentAuditLog`]:
//! - Fixed 28-byte record layout
//! - Bounded log (128 records per segment)
//! - Two-phase state: records are written Pending and resolved to Done/Failed
//! - Microsecond timestamps, non-decreasing within one log

mod log;

pub use log::SegmentAuditLog;

use crate::error::{Result, TyfsError};
use crate::geometry::ID_SIZE;
use crate::identity::{hash_bytes, Describe, OperationId, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Encoded size of one audit record
pub const AUDIT_RECORD_LEN: usize = 28;

/// Operation recorded against a block
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Block allocated (or, for block 0, segment created)
    New = 0x01,
    /// Block contents changed, allocation unchanged
    Modify = 0x10,
    /// Block freed
    Delete = 0x20,
}

impl OperationKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::New),
            0x10 => Some(Self::Modify),
            0x20 => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Outcome of a recorded operation
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultState {
    /// Intent recorded, outcome not yet known
    Pending = 0x00,
    Done = 0x01,
    Failed = 0x02,
}

impl ResultState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Pending),
            0x01 => Some(Self::Done),
            0x02 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Single audit log entry (28 bytes encoded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// User table index of the actor
    pub user: UserId,
    /// Id shared by the Pending record and its resolution
    pub operation_id: OperationId,
    /// Microseconds since UNIX epoch
    pub timestamp: i64,
    /// Block index inside the segment
    pub target_block: u8,
    pub kind: OperationKind,
    pub state: ResultState,
}

impl AuditRecord {
    /// Create a Pending record
    ///
    /// Fails with `ReservedBlock` when a non-New operation targets block 0.
    pub fn pending(
        user: UserId,
        operation_id: OperationId,
        timestamp: i64,
        target_block: u8,
        kind: OperationKind,
    ) -> Result<Self> {
        let record = AuditRecord {
            user,
            operation_id,
            timestamp,
            target_block,
            kind,
            state: ResultState::Pending,
        };
        record.check()?;
        Ok(record)
    }

    /// Enforce the descriptor-block rule: block 0 only accepts New
    pub fn check(&self) -> Result<()> {
        if self.target_block == 0 && self.kind != OperationKind::New {
            return Err(TyfsError::ReservedBlock);
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.state == ResultState::Pending
    }

    pub fn to_bytes(&self) -> [u8; AUDIT_RECORD_LEN] {
        let mut bytes = [0u8; AUDIT_RECORD_LEN];
        bytes[0] = self.user.0;
        bytes[1..17].copy_from_slice(self.operation_id.as_bytes());
        bytes[17..25].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[25] = self.target_block;
        bytes[26] = self.kind as u8;
        bytes[27] = self.state as u8;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != AUDIT_RECORD_LEN {
            return Err(TyfsError::Corrupt(format!(
                "audit record needs {} bytes, got {}",
                AUDIT_RECORD_LEN,
                bytes.len()
            )));
        }

        let mut operation_id = [0u8; ID_SIZE];
        operation_id.copy_from_slice(&bytes[1..17]);

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[17..25]);

        let kind = OperationKind::from_u8(bytes[26]).ok_or_else(|| {
            TyfsError::Corrupt(format!("unknown audit operation kind 0x{:02x}", bytes[26]))
        })?;
        let state = ResultState::from_u8(bytes[27]).ok_or_else(|| {
            TyfsError::Corrupt(format!("unknown audit result state 0x{:02x}", bytes[27]))
        })?;

        let record = AuditRecord {
            user: UserId(bytes[0]),
            operation_id: OperationId(operation_id),
            timestamp: i64::from_le_bytes(timestamp),
            target_block: bytes[25],
            kind,
            state,
        };

        record
            .check()
            .map_err(|_| TyfsError::Corrupt("audit record targets block 0 with a non-New operation".to_string()))?;

        Ok(record)
    }
}

impl Describe for AuditRecord {
    fn describe(&self) -> String {
        format!(
            "{:?} block {} by {} at {} ({:?}, op {})",
            self.kind, self.target_block, self.user, self.timestamp, self.state, self.operation_id
        )
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.audit_record"
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(&self.to_bytes())
    }
}

/// Current wall-clock time in microseconds since UNIX epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
