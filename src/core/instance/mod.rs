//! File system instances
//!
//! An [`FsInstance`] ties together the immutable identity of one file system
//! (type, id, block size) with its mutable governance state (attributes,
//! authority table, segments) and its optional extensions.
//!
//! # Examples
//!
//! ```
//! use tyfs::{AuthorityState, AuthorityType, FsInstanceBuilder, FsType, UserId};
//!
//! # fn main() -> tyfs::Result<()> {
//! let fs = FsInstanceBuilder::new()
//!     .fs_type(FsType::VirtualDisk)
//!     .name("scratch")
//!     .block_size(8192)
//!     .build()?;
//!
//! let alice = UserId(10);
//! fs.set_authority(alice, AuthorityType::Modify, AuthorityState::Allow);
//!
//! let segment = fs.create_segment();
//! let block = fs.allocate_block(alice, segment)?;
//! assert_eq!(block, 1);
//! # Ok(())
//! # }
//! ```

mod builder;
mod extension;

pub use builder::FsInstanceBuilder;
pub use extension::{CompressionExtension, PageExtension, MAX_PAGES};

use crate::attribute::{FsAttribute, FsAttributeSet};
use crate::authority::{AuthorityState, AuthorityType, FsAuthorityTable};
use crate::config::{self, AuditOverflowPolicy};
use crate::error::{Result, TyfsError};
use crate::geometry::{is_valid_block_size, ID_SIZE};
use crate::identity::{hash_bytes, Describe, UserId};
use crate::segment::FsSegment;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Kind of storage a TYFS instance lives on
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsType {
    PhysicalDisk = 0,
    VirtualDisk = 1,
    /// Virtual disk tuned for relational databases
    SqlDatabase = 2,
    /// Virtual disk tuned for dimensional databases
    NonSqlDatabase = 3,
    /// Static package file, no content growth
    Package = 4,
}

impl TryFrom<u8> for FsType {
    type Error = TyfsError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::PhysicalDisk),
            1 => Ok(Self::VirtualDisk),
            2 => Ok(Self::SqlDatabase),
            3 => Ok(Self::NonSqlDatabase),
            4 => Ok(Self::Package),
            other => Err(TyfsError::InvalidConfiguration(format!(
                "unknown file system type {}",
                other
            ))),
        }
    }
}

/// Id and display name of a file system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsIdentity {
    pub id: [u8; ID_SIZE],
    pub name: String,
}

impl FsIdentity {
    pub fn new(id: [u8; ID_SIZE], name: impl Into<String>) -> Self {
        FsIdentity { id, name: name.into() }
    }

    /// Identity with a freshly generated id
    pub fn generate(name: impl Into<String>) -> Self {
        Self::new(*Uuid::new_v4().as_bytes(), name)
    }
}

pub struct FsInstance {
    fs_type: FsType,
    identity: FsIdentity,
    block_size: u32,
    audit_policy: AuditOverflowPolicy,

    /// Position of the data root block
    drb_position: i64,

    attributes: RwLock<FsAttributeSet>,
    authorities: RwLock<FsAuthorityTable>,
    segments: RwLock<Vec<Arc<FsSegment>>>,

    page: Option<PageExtension>,
    compression: Option<CompressionExtension>,
}

impl FsInstance {
    /// Create an instance with empty attributes and authority table
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the block size is not `4096 * 2^k` (or is
    /// above the configured maximum), the id is nil or the name is empty.
    pub fn new(fs_type: FsType, identity: FsIdentity, block_size: u32) -> Result<Self> {
        Self::with_policy(fs_type, identity, block_size, config::global().audit_overflow)
    }

    /// Like [`FsInstance::new`] with a raw type byte
    pub fn from_raw_type(fs_type: u8, identity: FsIdentity, block_size: u32) -> Result<Self> {
        Self::new(FsType::try_from(fs_type)?, identity, block_size)
    }

    /// Like [`FsInstance::new`] with an explicit audit policy for new segments
    pub fn with_policy(
        fs_type: FsType,
        identity: FsIdentity,
        block_size: u32,
        audit_policy: AuditOverflowPolicy,
    ) -> Result<Self> {
        if !is_valid_block_size(block_size) {
            return Err(TyfsError::InvalidConfiguration(format!(
                "block size {} is not 4096 * 2^k",
                block_size
            )));
        }

        let max = config::global().max_block_size;
        if block_size > max {
            return Err(TyfsError::InvalidConfiguration(format!(
                "block size {} exceeds maximum {}",
                block_size, max
            )));
        }

        if identity.id == [0u8; ID_SIZE] {
            return Err(TyfsError::InvalidConfiguration("file system id is nil".to_string()));
        }

        if identity.name.trim().is_empty() {
            return Err(TyfsError::InvalidConfiguration("file system name is empty".to_string()));
        }

        info!(
            "Creating {:?} file system '{}' ({}), block size {}",
            fs_type,
            identity.name,
            Uuid::from_bytes(identity.id),
            block_size
        );

        Ok(FsInstance {
            fs_type,
            identity,
            block_size,
            audit_policy,
            drb_position: 0,
            attributes: RwLock::new(FsAttributeSet::new()),
            authorities: RwLock::new(FsAuthorityTable::new()),
            segments: RwLock::new(Vec::new()),
            page: None,
            compression: None,
        })
    }

    pub fn fs_type(&self) -> FsType {
        self.fs_type
    }

    pub fn identity(&self) -> &FsIdentity {
        &self.identity
    }

    pub fn id(&self) -> [u8; ID_SIZE] {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn drb_position(&self) -> i64 {
        self.drb_position
    }

    pub fn set_drb_position(&mut self, position: i64) {
        self.drb_position = position;
    }

    // Attributes

    pub fn get_attribute(&self, attribute: impl Into<usize>) -> Result<bool> {
        self.attributes.read().get(attribute)
    }

    pub fn set_attribute(&self, attribute: impl Into<usize>, valid: bool) -> Result<()> {
        self.attributes.write().set(attribute, valid)
    }

    /// Copy of the attribute bank
    pub fn attributes(&self) -> FsAttributeSet {
        *self.attributes.read()
    }

    /// Replace the attribute bank (e.g. after loading it from disk)
    pub fn load_attributes(&self, attributes: FsAttributeSet) {
        *self.attributes.write() = attributes;
    }

    // Authorities

    pub fn authority(&self, user: UserId, authority: AuthorityType) -> AuthorityState {
        self.authorities.read().evaluate(user, authority)
    }

    pub fn set_authority(&self, user: UserId, authority: AuthorityType, state: AuthorityState) {
        self.authorities.write().set(user, authority, state);
    }

    pub fn is_allowed(&self, user: UserId, authority: AuthorityType) -> bool {
        self.authorities.read().is_allowed(user, authority)
    }

    /// Shared view of the authority table
    pub fn authorities(&self) -> RwLockReadGuard<'_, FsAuthorityTable> {
        self.authorities.read()
    }

    /// Exclusive view of the authority table
    pub fn authorities_mut(&self) -> RwLockWriteGuard<'_, FsAuthorityTable> {
        self.authorities.write()
    }

    fn require(&self, user: UserId, authority: AuthorityType) -> Result<()> {
        if self.is_allowed(user, authority) {
            return Ok(());
        }
        warn!("Denied {} authority to {}", authority, user);
        Err(TyfsError::AccessDenied {
            user: user.0,
            authority: authority.to_string(),
        })
    }

    // Segments

    /// Add an empty segment, returning its index
    pub fn create_segment(&self) -> usize {
        let mut segments = self.segments.write();
        segments.push(Arc::new(FsSegment::with_policy(self.audit_policy)));
        debug!("Created segment {} in '{}'", segments.len() - 1, self.identity.name);
        segments.len() - 1
    }

    /// Add a segment decoded from its descriptor block, returning its index
    pub fn restore_segment(&self, descriptor: &[u8]) -> Result<usize> {
        let segment = FsSegment::decode(descriptor, self.audit_policy)?;
        let mut segments = self.segments.write();
        segments.push(Arc::new(segment));
        Ok(segments.len() - 1)
    }

    pub fn segment(&self, index: usize) -> Result<Arc<FsSegment>> {
        self.segments
            .read()
            .get(index)
            .cloned()
            .ok_or(TyfsError::UnknownSegment(index))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Allocate a block in `segment` for `user` (requires Write)
    pub fn allocate_block(&self, user: UserId, segment: usize) -> Result<u8> {
        let segment = self.segment(segment)?;
        self.require(user, AuthorityType::Write)?;
        segment.allocate_as(user)
    }

    /// Free a block in `segment` for `user` (requires Write)
    pub fn free_block(&self, user: UserId, segment: usize, block: u8) -> Result<()> {
        let segment = self.segment(segment)?;
        self.require(user, AuthorityType::Write)?;
        segment.free_as(user, block)
    }

    /// Record a content change in `segment` for `user` (requires Modify)
    pub fn mark_block_changed(&self, user: UserId, segment: usize, block: u8) -> Result<()> {
        let segment = self.segment(segment)?;
        self.require(user, AuthorityType::Modify)?;
        segment.mark_changed_as(user, block)
    }

    // Extensions

    /// Attach a page extension, returning the one it replaces
    pub fn attach_page_extension(&mut self, page: PageExtension) -> Option<PageExtension> {
        self.page.replace(page)
    }

    pub fn detach_page_extension(&mut self) -> Option<PageExtension> {
        self.page.take()
    }

    /// Page extension, only while PageSupport is on
    pub fn page_extension(&self) -> Option<&PageExtension> {
        if self.get_attribute(FsAttribute::PageSupport).unwrap_or(false) {
            self.page.as_ref()
        } else {
            None
        }
    }

    pub fn page_extension_mut(&mut self) -> Option<&mut PageExtension> {
        if self.get_attribute(FsAttribute::PageSupport).unwrap_or(false) {
            self.page.as_mut()
        } else {
            None
        }
    }

    /// Attach a compression extension, returning the one it replaces
    pub fn attach_compression_extension(
        &mut self,
        compression: CompressionExtension,
    ) -> Option<CompressionExtension> {
        self.compression.replace(compression)
    }

    pub fn detach_compression_extension(&mut self) -> Option<CompressionExtension> {
        self.compression.take()
    }

    /// Compression extension, only while Compress is on
    pub fn compression_extension(&self) -> Option<&CompressionExtension> {
        if self.get_attribute(FsAttribute::Compress).unwrap_or(false) {
            self.compression.as_ref()
        } else {
            None
        }
    }
}

impl std::fmt::Debug for FsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsInstance")
            .field("fs_type", &self.fs_type)
            .field("identity", &self.identity)
            .field("block_size", &self.block_size)
            .field("segments", &self.segment_count())
            .finish()
    }
}

impl Describe for FsInstance {
    fn describe(&self) -> String {
        format!(
            "{:?} file system '{}' ({}), {} byte blocks, {} segments",
            self.fs_type,
            self.identity.name,
            Uuid::from_bytes(self.identity.id),
            self.block_size,
            self.segment_count()
        )
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.instance"
    }

    fn content_hash(&self) -> u64 {
        let mut bytes = vec![self.fs_type as u8];
        bytes.extend_from_slice(&self.identity.id);
        bytes.extend_from_slice(self.identity.name.as_bytes());
        bytes.extend_from_slice(&self.block_size.to_le_bytes());
        bytes.extend_from_slice(&self.drb_position.to_le_bytes());
        bytes.extend_from_slice(&self.attributes.read().to_bytes());
        bytes.extend_from_slice(&self.authorities.read().to_bytes());
        hash_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::OperationKind;

    fn identity() -> FsIdentity {
        FsIdentity::new([7u8; ID_SIZE], "test-fs")
    }

    fn instance() -> FsInstance {
        FsInstance::with_policy(FsType::VirtualDisk, identity(), 4096, AuditOverflowPolicy::Reject).unwrap()
    }

    #[test]
    fn test_valid_construction() {
        for size in [4096, 8192, 65536] {
            let fs = FsInstance::new(FsType::PhysicalDisk, identity(), size).unwrap();
            assert_eq!(fs.block_size(), size);
            assert_eq!(fs.fs_type(), FsType::PhysicalDisk);
            assert_eq!(fs.id(), [7u8; ID_SIZE]);
        }
    }

    #[test]
    fn test_invalid_block_sizes() {
        for size in [0, 4095, 6144, 12288] {
            let result = FsInstance::new(FsType::VirtualDisk, identity(), size);
            assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))), "size {}", size);
        }
    }

    #[test]
    fn test_nil_id_and_empty_name() {
        let result = FsInstance::new(FsType::VirtualDisk, FsIdentity::new([0; ID_SIZE], "x"), 4096);
        assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))));

        let result = FsInstance::new(FsType::VirtualDisk, FsIdentity::new([1; ID_SIZE], "  "), 4096);
        assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_raw_type() {
        let fs = FsInstance::from_raw_type(2, identity(), 4096).unwrap();
        assert_eq!(fs.fs_type(), FsType::SqlDatabase);

        let result = FsInstance::from_raw_type(5, identity(), 4096);
        assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_attribute_delegation() {
        let fs = instance();
        fs.set_attribute(FsAttribute::Compress, true).unwrap();
        assert!(fs.get_attribute(FsAttribute::Compress).unwrap());
        assert!(fs.attributes().get(FsAttribute::Compress).unwrap());
        assert!(matches!(fs.set_attribute(9usize, true), Err(TyfsError::UnknownAttribute(9))));
    }

    #[test]
    fn test_governed_allocation() {
        let fs = instance();
        let seg = fs.create_segment();
        let alice = UserId(20);

        let result = fs.allocate_block(alice, seg);
        assert!(matches!(result, Err(TyfsError::AccessDenied { user: 20, .. })));
        assert_eq!(fs.segment(seg).unwrap().audit_len(), 0);

        fs.set_authority(alice, AuthorityType::Write, AuthorityState::Allow);
        assert_eq!(fs.allocate_block(alice, seg).unwrap(), 1);

        // Write alone does not cover Modify
        assert!(matches!(
            fs.mark_block_changed(alice, seg, 1),
            Err(TyfsError::AccessDenied { .. })
        ));

        fs.set_authority(alice, AuthorityType::Modify, AuthorityState::Allow);
        fs.mark_block_changed(alice, seg, 1).unwrap();
        fs.free_block(alice, seg, 1).unwrap();

        let kinds: Vec<OperationKind> = fs
            .segment(seg)
            .unwrap()
            .audit_records()
            .iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![OperationKind::New, OperationKind::Modify, OperationKind::Delete]);
    }

    #[test]
    fn test_unknown_segment() {
        let fs = instance();
        assert!(matches!(fs.allocate_block(UserId(2), 3), Err(TyfsError::UnknownSegment(3))));
    }

    #[test]
    fn test_restore_segment() {
        let fs = instance();
        let seg = fs.create_segment();
        fs.segment(seg).unwrap().allocate().unwrap();

        let bytes = fs.segment(seg).unwrap().encode();
        let restored = fs.restore_segment(&bytes).unwrap();
        assert_eq!(fs.segment_count(), 2);
        assert_eq!(fs.segment(restored).unwrap().allocated_blocks(), vec![1]);
    }

    #[test]
    fn test_extensions_gated_by_attributes() {
        let mut fs = instance();
        assert!(fs.attach_page_extension(PageExtension::new(0)).is_none());
        assert!(fs.attach_compression_extension(CompressionExtension::new("lz4", 1)).is_none());

        assert!(fs.page_extension().is_none());
        assert!(fs.compression_extension().is_none());

        fs.set_attribute(FsAttribute::PageSupport, true).unwrap();
        fs.page_extension_mut().unwrap().mark_present(4).unwrap();
        assert!(fs.page_extension().unwrap().is_present(4));
        assert!(fs.compression_extension().is_none());

        fs.set_attribute(FsAttribute::Compress, true).unwrap();
        assert_eq!(fs.compression_extension().unwrap().codec, "lz4");

        assert!(fs.detach_compression_extension().is_some());
        assert!(fs.compression_extension().is_none());
    }

    #[test]
    fn test_drb_position_and_hash() {
        let mut fs = instance();
        let before = fs.content_hash();
        fs.set_drb_position(4096 * 12);
        assert_eq!(fs.drb_position(), 4096 * 12);
        assert_ne!(fs.content_hash(), before);
        assert_eq!(fs.type_tag(), "tyfs.instance");
    }
}
