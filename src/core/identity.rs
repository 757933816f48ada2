//! Identity types shared by every TYFS entity
//!
//! - [`UserId`]: index into the 256-entry user table
//! - [`OperationId`]: 16-byte opaque id of one audited operation
//! - [`OperationIdGenerator`]: source of fresh ids (GUIDs by default)
//! - [`Describe`]: text, type tag and content hash of an entity

use crate::geometry::ID_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

/// Index into a file system's user table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u8);

impl UserId {
    /// Reserved for operations the file system performs on its own behalf
    pub const SYSTEM: UserId = UserId(0);
    /// Reserved for the default user
    pub const DEFAULT: UserId = UserId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// True for the two reserved user slots
    pub fn is_reserved(self) -> bool {
        self.0 <= 1
    }
}

impl From<u8> for UserId {
    fn from(value: u8) -> Self {
        UserId(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

/// Opaque 16-byte operation id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OperationId(pub [u8; ID_SIZE]);

impl OperationId {
    pub const NIL: OperationId = OperationId([0; ID_SIZE]);

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; ID_SIZE]
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).hyphenated())
    }
}

/// Source of fresh 16-byte ids
///
/// Generated ids must be unique and never nil.
pub trait OperationIdGenerator: Send + Sync {
    fn next_id(&self) -> [u8; ID_SIZE];
}

/// Random (v4) GUID generator
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl OperationIdGenerator for UuidGenerator {
    fn next_id(&self) -> [u8; ID_SIZE] {
        *Uuid::new_v4().as_bytes()
    }
}

/// Text, type tag and content hash of an entity
pub trait Describe {
    /// Human-readable one-line summary
    fn describe(&self) -> String;

    /// Stable identifier of the entity's type
    fn type_tag(&self) -> &'static str;

    /// Hash of the entity's canonical byte encoding
    fn content_hash(&self) -> u64;
}

/// xxh3 over a canonical encoding, used by every [`Describe`] impl
pub(crate) fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}
