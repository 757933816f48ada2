//! Fixed geometry of the TYFS metadata structures
//!
//! None of these values are configurable per instance. Every on-disk record
//! layout in this crate is derived from them.

/// Number of blocks in one segment
pub const BLOCKS_PER_SEGMENT: usize = 256;

/// First block index that may hold user data
///
/// Block 0 of every segment carries the segment descriptor.
pub const FIRST_DATA_BLOCK: usize = 1;

/// Blocks available for allocation in one segment
pub const ALLOCATABLE_BLOCKS: usize = BLOCKS_PER_SEGMENT - FIRST_DATA_BLOCK;

/// Minimum (and base) block size in bytes
pub const BLOCK_BASE_SIZE: u32 = 4096;

/// Size of descriptor and operation ids
pub const ID_SIZE: usize = 16;

/// Maximum number of audit records kept per segment
pub const SEGMENT_AUDIT_CAPACITY: usize = 128;

/// Bytes needed for one segment bitmap
pub const SEGMENT_BITMAP_SIZE: usize = BLOCKS_PER_SEGMENT / 8;

/// Number of attribute slots in an attribute set
pub const ATTRIBUTE_SLOTS: usize = 32;

/// Number of authority columns per user
pub const AUTHORITY_COLUMNS: usize = 8;

/// Number of users in an authority table
pub const USER_TABLE_SIZE: usize = 256;

/// Check the `4096 * 2^k` block size rule
pub fn is_valid_block_size(block_size: u32) -> bool {
    block_size >= BLOCK_BASE_SIZE
        && block_size % BLOCK_BASE_SIZE == 0
        && (block_size / BLOCK_BASE_SIZE).is_power_of_two()
}
