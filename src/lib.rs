//! # TYFS - Tianyu File System governance core
//!
//! `tyfs` keeps the bookkeeping of a TYFS volume exact:
//!
//! - **Segments** of 256 blocks tracked by a bitmap, block 0 reserved for the
//!   segment descriptor, first-fit allocation
//! - **Audit trail** of up to 128 records per segment; every allocate, free
//!   and modify is recorded atomically with its bitmap change
//! - **Attributes**: a fixed bank of feature flags (paging, compression)
//! - **Authorities**: a 256 x 8 permission grid with explicit-deny precedence
//!
//! All metadata has a fixed size. Disk I/O, compression and id generation
//! belong to the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use tyfs::{FsSegment, OperationKind, Result};
//!
//! # fn main() -> Result<()> {
//! let segment = FsSegment::new();
//!
//! let block = segment.allocate()?;
//! assert_eq!(block, 1);
//!
//! let audit = segment.audit_records();
//! assert_eq!(audit[0].kind, OperationKind::New);
//!
//! segment.free(block)?;
//!
//! // Block 0 content, ready for the backing store
//! let descriptor = segment.encode();
//! let restored = FsSegment::decode(&descriptor, segment.audit_policy())?;
//! assert_eq!(restored.audit_len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    allocator, attribute, audit, authority, config, error, geometry, identity, instance, segment,
};

pub use crate::core::{
    allocator::BitVector,
    attribute::{FsAttribute, FsAttributeSet},
    audit::{AuditRecord, OperationKind, ResultState, SegmentAuditLog, AUDIT_RECORD_LEN},
    authority::{AccessList, AuthorityState, AuthorityType, FsAuthorityTable, AUTHORITY_TABLE_LEN},
    config::{AuditOverflowPolicy, TyfsConfig},
    error::{Result, TyfsError},
    identity::{Describe, OperationId, OperationIdGenerator, UserId, UuidGenerator},
    instance::{CompressionExtension, FsIdentity, FsInstance, FsInstanceBuilder, FsType, PageExtension},
    segment::{FsSegment, SegmentDescriptor, DESCRIPTOR_LEN},
};
