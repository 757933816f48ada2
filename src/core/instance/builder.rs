//! Builder for customizing instance creation

use super::{FsIdentity, FsInstance, FsType};
use crate::attribute::FsAttribute;
use crate::config::{self, AuditOverflowPolicy};
use crate::error::Result;
use crate::geometry::ID_SIZE;
use uuid::Uuid;

/// Builder for [`FsInstance`]
///
/// Unset fields fall back to the process-wide configuration; an unset id is
/// generated.
///
/// # Examples
///
/// ```
/// use tyfs::{FsAttribute, FsInstanceBuilder, FsType};
///
/// let fs = FsInstanceBuilder::new()
///     .fs_type(FsType::SqlDatabase)
///     .name("orders")
///     .block_size(16384)
///     .with_attribute(FsAttribute::Compress)
///     .build()
///     .unwrap();
///
/// assert_eq!(fs.block_size(), 16384);
/// assert!(fs.get_attribute(FsAttribute::Compress).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FsInstanceBuilder {
    fs_type: Option<FsType>,
    id: Option<[u8; ID_SIZE]>,
    name: Option<String>,
    block_size: Option<u32>,
    audit_policy: Option<AuditOverflowPolicy>,
    attributes: Vec<FsAttribute>,
}

impl FsInstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fs_type(mut self, fs_type: FsType) -> Self {
        self.fs_type = Some(fs_type);
        self
    }

    pub fn id(mut self, id: [u8; ID_SIZE]) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Audit overflow policy for segments created by the instance
    pub fn audit_policy(mut self, policy: AuditOverflowPolicy) -> Self {
        self.audit_policy = Some(policy);
        self
    }

    /// Turn an attribute on at creation
    pub fn with_attribute(mut self, attribute: FsAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Result<FsInstance> {
        let defaults = config::global();

        let identity = FsIdentity::new(
            self.id.unwrap_or_else(|| *Uuid::new_v4().as_bytes()),
            self.name.unwrap_or_default(),
        );

        let instance = FsInstance::with_policy(
            self.fs_type.unwrap_or(defaults.default_fs_type),
            identity,
            self.block_size.unwrap_or(defaults.default_block_size),
            self.audit_policy.unwrap_or(defaults.audit_overflow),
        )?;

        for attribute in self.attributes {
            instance.set_attribute(attribute, true)?;
        }

        Ok(instance)
    }
}
