//! Segment descriptor (block 0 of every segment)
//!
//! # Layout
//!
//! ```text
//! Offset  Size   Field
//! 0       32     bitmap (bit i of byte i/8 = block i)
//! 32      16     descriptor id
//! 48      1      audit count
//! 49      3584   128 x audit record (28 bytes each), unused slots zeroed
//! ```

use crate::allocator::BitVector;
use crate::audit::{AuditRecord, OperationKind, ResultState, AUDIT_RECORD_LEN};
use crate::error::{Result, TyfsError};
use crate::geometry::{BLOCKS_PER_SEGMENT, ID_SIZE, SEGMENT_AUDIT_CAPACITY, SEGMENT_BITMAP_SIZE};
use std::collections::HashMap;

const BITMAP_OFFSET: usize = 0;
const ID_OFFSET: usize = BITMAP_OFFSET + SEGMENT_BITMAP_SIZE;
const COUNT_OFFSET: usize = ID_OFFSET + ID_SIZE;
const RECORDS_OFFSET: usize = COUNT_OFFSET + 1;

/// Encoded size of a segment descriptor
pub const DESCRIPTOR_LEN: usize = RECORDS_OFFSET + SEGMENT_AUDIT_CAPACITY * AUDIT_RECORD_LEN;

/// Decoded contents of a segment's block 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub bitmap: BitVector,
    pub descriptor_id: [u8; ID_SIZE],
    /// Audit records, oldest first
    pub records: Vec<AuditRecord>,
}

impl SegmentDescriptor {
    /// Serialize to exactly `DESCRIPTOR_LEN` bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DESCRIPTOR_LEN);

        bytes.extend_from_slice(&self.bitmap.to_bytes());
        bytes.extend_from_slice(&self.descriptor_id);
        bytes.push(self.records.len() as u8);
        for record in &self.records {
            bytes.extend_from_slice(&record.to_bytes());
        }

        bytes.resize(DESCRIPTOR_LEN, 0);
        bytes
    }

    /// Deserialize and validate
    ///
    /// Bytes past `DESCRIPTOR_LEN` (the rest of block 0) are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DESCRIPTOR_LEN {
            return Err(TyfsError::Corrupt(format!(
                "segment descriptor needs {} bytes, got {}",
                DESCRIPTOR_LEN,
                bytes.len()
            )));
        }

        let bitmap = BitVector::from_bytes(&bytes[BITMAP_OFFSET..ID_OFFSET], BLOCKS_PER_SEGMENT)?;

        let mut descriptor_id = [0u8; ID_SIZE];
        descriptor_id.copy_from_slice(&bytes[ID_OFFSET..COUNT_OFFSET]);

        let count = bytes[COUNT_OFFSET] as usize;
        if count > SEGMENT_AUDIT_CAPACITY {
            return Err(TyfsError::Corrupt(format!(
                "audit count {} exceeds capacity {}",
                count, SEGMENT_AUDIT_CAPACITY
            )));
        }

        let mut records = Vec::with_capacity(count);
        for slot in 0..SEGMENT_AUDIT_CAPACITY {
            let start = RECORDS_OFFSET + slot * AUDIT_RECORD_LEN;
            let raw = &bytes[start..start + AUDIT_RECORD_LEN];

            if slot < count {
                records.push(AuditRecord::from_bytes(raw)?);
            } else if raw.iter().any(|&b| b != 0) {
                return Err(TyfsError::Corrupt(format!(
                    "audit slot {} holds data past audit count {}",
                    slot, count
                )));
            }
        }

        let descriptor = SegmentDescriptor {
            bitmap,
            descriptor_id,
            records,
        };
        descriptor.validate()?;

        Ok(descriptor)
    }

    /// Check bitmap and audit trail against each other
    pub fn validate(&self) -> Result<()> {
        if !self.bitmap.test(0) {
            return Err(TyfsError::Corrupt(
                "descriptor block 0 is not marked allocated".to_string(),
            ));
        }

        if self.descriptor_id == [0u8; ID_SIZE] {
            return Err(TyfsError::Corrupt("descriptor id is nil".to_string()));
        }

        if self.records.len() > SEGMENT_AUDIT_CAPACITY {
            return Err(TyfsError::Corrupt(format!(
                "{} audit records exceed capacity {}",
                self.records.len(),
                SEGMENT_AUDIT_CAPACITY
            )));
        }

        // Newest completed operation per block decides its expected bit
        let mut newest_done: HashMap<u8, OperationKind> = HashMap::new();
        for record in self.records.iter().filter(|r| r.state == ResultState::Done) {
            record
                .check()
                .map_err(|_| TyfsError::Corrupt("audit record violates block 0 rule".to_string()))?;
            newest_done.insert(record.target_block, record.kind);
        }

        for (&block, &kind) in &newest_done {
            let expect_set = kind != OperationKind::Delete;
            if self.bitmap.test(block as usize) != expect_set {
                return Err(TyfsError::Corrupt(format!(
                    "block {} bitmap state disagrees with its last {:?} record",
                    block, kind
                )));
            }
        }

        Ok(())
    }
}
