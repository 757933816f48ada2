//! Optional instance extensions
//!
//! Paging and compression are implemented outside this crate. The instance
//! only owns their descriptors and hands them out when the matching
//! attribute is on.

use crate::allocator::BitVector;
use crate::error::Result;
use crate::identity::{hash_bytes, Describe};

/// Maximum number of pages (partitions or files) one file system combines
pub const MAX_PAGES: usize = 65536;

/// Paging state: which page this instance is and which pages are present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtension {
    page_index: u16,
    page_states: BitVector,
}

impl PageExtension {
    pub fn new(page_index: u16) -> Self {
        PageExtension {
            page_index,
            page_states: BitVector::new(MAX_PAGES),
        }
    }

    pub fn page_index(&self) -> u16 {
        self.page_index
    }

    /// Mark a page present, returning whether it already was
    pub fn mark_present(&mut self, page: u16) -> Result<bool> {
        self.page_states.set(page as usize)
    }

    /// Mark a page absent, returning whether it was present
    pub fn mark_absent(&mut self, page: u16) -> Result<bool> {
        self.page_states.clear(page as usize)
    }

    pub fn is_present(&self, page: u16) -> bool {
        self.page_states.test(page as usize)
    }

    pub fn present_pages(&self) -> usize {
        self.page_states.count_ones()
    }
}

impl Describe for PageExtension {
    fn describe(&self) -> String {
        format!("page {} of {} present pages", self.page_index, self.present_pages())
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.page_extension"
    }

    fn content_hash(&self) -> u64 {
        let mut bytes = self.page_index.to_le_bytes().to_vec();
        bytes.extend_from_slice(&self.page_states.to_bytes());
        hash_bytes(&bytes)
    }
}

/// Compression settings handed to the external codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionExtension {
    /// Codec name understood by the backing store, e.g. "lz4"
    pub codec: String,
    pub level: i32,
}

impl CompressionExtension {
    pub fn new(codec: impl Into<String>, level: i32) -> Self {
        CompressionExtension {
            codec: codec.into(),
            level,
        }
    }
}

impl Describe for CompressionExtension {
    fn describe(&self) -> String {
        format!("compression {} level {}", self.codec, self.level)
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.compression_extension"
    }

    fn content_hash(&self) -> u64 {
        let mut bytes = self.codec.as_bytes().to_vec();
        bytes.extend_from_slice(&self.level.to_le_bytes());
        hash_bytes(&bytes)
    }
}
