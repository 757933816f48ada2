//! Block allocation primitives
//!
//! Allocation inside a segment is first-fit over a [`BitVector`]. The
//! segment pairs every allocation with an audit record; see
//! [`crate::segment::FsSegment`].

pub mod bitmap;

pub use bitmap::BitVector;
