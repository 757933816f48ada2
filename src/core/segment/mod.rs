//! File system segments
//!
//! A segment is 256 blocks. Block 0 holds the [`SegmentDescriptor`]; blocks
//! 1..=255 are handed out first-fit. Each allocate/free/modify is one atomic
//! unit with its audit record: if the record cannot be written the bitmap
//! change is undone before the segment lock is released.

mod descriptor;

pub use descriptor::{SegmentDescriptor, DESCRIPTOR_LEN};

use crate::allocator::BitVector;
use crate::audit::{now_micros, AuditRecord, OperationKind, ResultState, SegmentAuditLog};
use crate::config::{self, AuditOverflowPolicy};
use crate::error::{Result, TyfsError};
use crate::geometry::{ALLOCATABLE_BLOCKS, BLOCKS_PER_SEGMENT, FIRST_DATA_BLOCK, ID_SIZE};
use crate::identity::{hash_bytes, Describe, OperationId, OperationIdGenerator, UserId, UuidGenerator};
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Mutable segment state, guarded as one unit
#[derive(Debug)]
struct SegmentState {
    bitmap: BitVector,
    audit: SegmentAuditLog,
}

impl SegmentState {
    /// Wall-clock time, never earlier than the newest record
    fn next_timestamp(&self) -> i64 {
        now_micros().max(self.audit.last_timestamp())
    }

    fn check_data_block(&self, block: u8) -> Result<()> {
        if (block as usize) < FIRST_DATA_BLOCK {
            return Err(TyfsError::ReservedBlock);
        }
        if !self.bitmap.test(block as usize) {
            return Err(TyfsError::BlockNotAllocated(block));
        }
        Ok(())
    }
}

/// One 256-block segment: bitmap, audit log and descriptor id
pub struct FsSegment {
    descriptor_id: [u8; ID_SIZE],
    ids: Arc<dyn OperationIdGenerator>,
    state: CachePadded<Mutex<SegmentState>>,
}

impl FsSegment {
    /// Create an empty segment using the process-wide audit policy
    pub fn new() -> Self {
        Self::with_policy(config::global().audit_overflow)
    }

    /// Create an empty segment with an explicit audit overflow policy
    pub fn with_policy(policy: AuditOverflowPolicy) -> Self {
        let ids: Arc<dyn OperationIdGenerator> = Arc::new(UuidGenerator);
        let descriptor_id = *Uuid::new_v4().as_bytes();
        Self::assemble(descriptor_id, ids, Self::fresh_bitmap(), SegmentAuditLog::new(policy))
    }

    /// Create an empty segment drawing descriptor and operation ids from `ids`
    pub fn with_generator(policy: AuditOverflowPolicy, ids: Arc<dyn OperationIdGenerator>) -> Result<Self> {
        let descriptor_id = ids.next_id();
        if descriptor_id == [0u8; ID_SIZE] {
            return Err(TyfsError::InvalidConfiguration(
                "id generator produced a nil descriptor id".to_string(),
            ));
        }
        Ok(Self::assemble(descriptor_id, ids, Self::fresh_bitmap(), SegmentAuditLog::new(policy)))
    }

    /// Rebuild a segment from a decoded descriptor
    pub fn from_descriptor(
        descriptor: SegmentDescriptor,
        policy: AuditOverflowPolicy,
        ids: Arc<dyn OperationIdGenerator>,
    ) -> Result<Self> {
        descriptor.validate()?;
        let audit = SegmentAuditLog::from_records(&descriptor.records, policy)?;
        Ok(Self::assemble(descriptor.descriptor_id, ids, descriptor.bitmap, audit))
    }

    /// Decode block 0 bytes into a segment
    pub fn decode(bytes: &[u8], policy: AuditOverflowPolicy) -> Result<Self> {
        let descriptor = SegmentDescriptor::from_bytes(bytes).map_err(|e| {
            warn!("Rejecting segment descriptor: {}", e);
            e
        })?;
        Self::from_descriptor(descriptor, policy, Arc::new(UuidGenerator))
    }

    fn fresh_bitmap() -> BitVector {
        let mut bitmap = BitVector::new(BLOCKS_PER_SEGMENT);
        // Descriptor block
        bitmap.set(0).ok();
        bitmap
    }

    fn assemble(
        descriptor_id: [u8; ID_SIZE],
        ids: Arc<dyn OperationIdGenerator>,
        bitmap: BitVector,
        audit: SegmentAuditLog,
    ) -> Self {
        FsSegment {
            descriptor_id,
            ids,
            state: CachePadded::new(Mutex::new(SegmentState { bitmap, audit })),
        }
    }

    /// Allocate the lowest free block on behalf of the system user
    pub fn allocate(&self) -> Result<u8> {
        self.allocate_as(UserId::SYSTEM)
    }

    /// Allocate the lowest free block
    ///
    /// # Errors
    ///
    /// - `SegmentFull` when all 255 data blocks are allocated
    /// - `AuditLogFull` when the New record cannot be stored (nothing is allocated)
    pub fn allocate_as(&self, user: UserId) -> Result<u8> {
        let mut state = self.state.lock();

        let index = state
            .bitmap
            .first_clear_from(FIRST_DATA_BLOCK)
            .ok_or(TyfsError::SegmentFull)?;
        let block = index as u8;

        state.bitmap.set(index)?;
        let operation_id = OperationId(self.ids.next_id());
        let record = AuditRecord::pending(user, operation_id, state.next_timestamp(), block, OperationKind::New)?;

        if let Err(e) = state.audit.append(record) {
            state.bitmap.clear(index)?;
            warn!("Allocation of block {} rolled back: {}", block, e);
            return Err(e);
        }
        state.audit.resolve(operation_id, ResultState::Done)?;

        debug!("Allocated block {} for {}", block, user);
        Ok(block)
    }

    /// Free a block on behalf of the system user
    pub fn free(&self, block: u8) -> Result<()> {
        self.free_as(UserId::SYSTEM, block)
    }

    /// Free an allocated block
    ///
    /// # Errors
    ///
    /// - `ReservedBlock` for block 0
    /// - `DoubleFree` when the block is already free
    /// - `AuditLogFull` when the Delete record cannot be stored (block stays allocated)
    pub fn free_as(&self, user: UserId, block: u8) -> Result<()> {
        let mut state = self.state.lock();

        if (block as usize) < FIRST_DATA_BLOCK {
            return Err(TyfsError::ReservedBlock);
        }
        if !state.bitmap.test(block as usize) {
            warn!("Double-free detected for block {}", block);
            return Err(TyfsError::DoubleFree(block));
        }

        state.bitmap.clear(block as usize)?;
        let operation_id = OperationId(self.ids.next_id());
        let record = AuditRecord::pending(user, operation_id, state.next_timestamp(), block, OperationKind::Delete)?;

        if let Err(e) = state.audit.append(record) {
            state.bitmap.set(block as usize)?;
            warn!("Free of block {} rolled back: {}", block, e);
            return Err(e);
        }
        state.audit.resolve(operation_id, ResultState::Done)?;

        debug!("Freed block {} for {}", block, user);
        Ok(())
    }

    /// Record a content change on behalf of the system user
    pub fn mark_changed(&self, block: u8) -> Result<()> {
        self.mark_changed_as(UserId::SYSTEM, block)
    }

    /// Record that an allocated block's contents changed
    pub fn mark_changed_as(&self, user: UserId, block: u8) -> Result<()> {
        let mut state = self.state.lock();
        state.check_data_block(block)?;

        let operation_id = OperationId(self.ids.next_id());
        let record = AuditRecord::pending(user, operation_id, state.next_timestamp(), block, OperationKind::Modify)?;
        state.audit.append(record)?;
        state.audit.resolve(operation_id, ResultState::Done)?;

        debug!("Block {} marked changed by {}", block, user);
        Ok(())
    }

    /// Record the intent to change a block; finish with [`FsSegment::resolve`]
    pub fn begin_change(&self, user: UserId, block: u8) -> Result<OperationId> {
        let mut state = self.state.lock();
        state.check_data_block(block)?;

        let operation_id = OperationId(self.ids.next_id());
        let record = AuditRecord::pending(user, operation_id, state.next_timestamp(), block, OperationKind::Modify)?;
        state.audit.append(record)?;

        debug!("Change {} of block {} pending", operation_id, block);
        Ok(operation_id)
    }

    /// Record the outcome of a pending operation
    pub fn resolve(&self, operation_id: OperationId, outcome: ResultState) -> Result<()> {
        self.state.lock().audit.resolve(operation_id, outcome)
    }

    pub fn descriptor_id(&self) -> [u8; ID_SIZE] {
        self.descriptor_id
    }

    pub fn is_allocated(&self, block: u8) -> bool {
        self.state.lock().bitmap.test(block as usize)
    }

    /// Number of free data blocks
    pub fn free_blocks(&self) -> usize {
        BLOCKS_PER_SEGMENT - self.state.lock().bitmap.count_ones()
    }

    /// Allocated data blocks, ascending (block 0 excluded)
    pub fn allocated_blocks(&self) -> Vec<u8> {
        self.state
            .lock()
            .bitmap
            .iter_ones()
            .filter(|&i| i >= FIRST_DATA_BLOCK)
            .map(|i| i as u8)
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.free_blocks() == 0
    }

    /// Snapshot of the audit trail, oldest first
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.state.lock().audit.records().copied().collect()
    }

    pub fn audit_len(&self) -> usize {
        self.state.lock().audit.len()
    }

    pub fn audit_policy(&self) -> AuditOverflowPolicy {
        self.state.lock().audit.policy()
    }

    /// Consistent snapshot of block 0 contents
    pub fn descriptor(&self) -> SegmentDescriptor {
        let state = self.state.lock();
        SegmentDescriptor {
            bitmap: state.bitmap.clone(),
            descriptor_id: self.descriptor_id,
            records: state.audit.records().copied().collect(),
        }
    }

    /// Encode block 0 contents (`DESCRIPTOR_LEN` bytes)
    pub fn encode(&self) -> Vec<u8> {
        self.descriptor().to_bytes()
    }
}

impl Default for FsSegment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FsSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsSegment")
            .field("descriptor_id", &Uuid::from_bytes(self.descriptor_id))
            .field("free_blocks", &self.free_blocks())
            .field("audit_len", &self.audit_len())
            .finish()
    }
}

impl Describe for FsSegment {
    fn describe(&self) -> String {
        format!(
            "segment {}: {}/{} blocks allocated, {} audit records",
            Uuid::from_bytes(self.descriptor_id),
            ALLOCATABLE_BLOCKS - self.free_blocks(),
            ALLOCATABLE_BLOCKS,
            self.audit_len()
        )
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.segment"
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(&self.encode())
    }
}
