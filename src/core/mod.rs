//! TYFS governance core
//!
//! Leaves first:
//! - `allocator`: fixed-length bit vector
//! - `audit`: audit records and the bounded per-segment log
//! - `segment`: 256-block segments and their descriptor block
//! - `attribute`: attribute flag bank
//! - `authority`: per-user authority table
//! - `instance`: file system instance tying it all together

pub mod allocator;
pub mod attribute;
pub mod audit;
pub mod authority;
pub mod config;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod instance;
pub mod segment;
