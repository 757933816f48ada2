//! File system attribute flags
//!
//! A fixed bank of 32 one-byte slots. Only the slots named by [`FsAttribute`]
//! are addressable through `get`/`set`; the remaining slots are reserved and
//! are carried through `to_bytes`/`from_bytes` untouched.

use crate::error::{Result, TyfsError};
use crate::geometry::ATTRIBUTE_SLOTS;
use crate::identity::{hash_bytes, Describe};
use serde::{Deserialize, Serialize};

/// Defined attribute slots
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsAttribute {
    /// Paging storage: several partitions or files combined into one file system
    PageSupport = 0,
    /// Data compression enabled
    Compress = 1,
}

impl FsAttribute {
    pub const ALL: [FsAttribute; 2] = [FsAttribute::PageSupport, FsAttribute::Compress];

    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(Self::PageSupport),
            1 => Some(Self::Compress),
            _ => None,
        }
    }

    pub fn slot(self) -> usize {
        self as usize
    }
}

impl From<FsAttribute> for usize {
    fn from(attr: FsAttribute) -> usize {
        attr.slot()
    }
}

/// Bit 0 of a slot carries the flag; the other bits are preserved
const FLAG_BIT: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsAttributeSet {
    slots: [u8; ATTRIBUTE_SLOTS],
}

impl FsAttributeSet {
    /// All flags off
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a flag
    ///
    /// Accepts an [`FsAttribute`] or a raw slot number. Reserved and
    /// out-of-range slots fail with `UnknownAttribute`.
    pub fn get(&self, attribute: impl Into<usize>) -> Result<bool> {
        let slot = Self::defined_slot(attribute.into())?;
        Ok(self.slots[slot] & FLAG_BIT != 0)
    }

    /// Write a flag, leaving the slot's other bits unchanged
    pub fn set(&mut self, attribute: impl Into<usize>, valid: bool) -> Result<()> {
        let slot = Self::defined_slot(attribute.into())?;
        if valid {
            self.slots[slot] |= FLAG_BIT;
        } else {
            self.slots[slot] &= !FLAG_BIT;
        }
        Ok(())
    }

    /// Stored byte of any slot, reserved ones included
    pub fn raw_byte(&self, slot: usize) -> Result<u8> {
        self.slots
            .get(slot)
            .copied()
            .ok_or(TyfsError::UnknownAttribute(slot))
    }

    /// Defined attributes currently on
    pub fn enabled(&self) -> Vec<FsAttribute> {
        FsAttribute::ALL
            .into_iter()
            .filter(|a| self.slots[a.slot()] & FLAG_BIT != 0)
            .collect()
    }

    pub fn to_bytes(&self) -> [u8; ATTRIBUTE_SLOTS] {
        self.slots
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let slots: [u8; ATTRIBUTE_SLOTS] = bytes.try_into().map_err(|_| {
            TyfsError::Corrupt(format!(
                "attribute set needs {} bytes, got {}",
                ATTRIBUTE_SLOTS,
                bytes.len()
            ))
        })?;
        Ok(FsAttributeSet { slots })
    }

    fn defined_slot(slot: usize) -> Result<usize> {
        FsAttribute::from_slot(slot)
            .map(FsAttribute::slot)
            .ok_or(TyfsError::UnknownAttribute(slot))
    }
}

impl Describe for FsAttributeSet {
    fn describe(&self) -> String {
        format!("attributes {:?}", self.enabled())
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.attribute_set"
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(&self.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_off() {
        let attrs = FsAttributeSet::new();
        assert!(!attrs.get(FsAttribute::PageSupport).unwrap());
        assert!(!attrs.get(FsAttribute::Compress).unwrap());
        assert!(attrs.enabled().is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut attrs = FsAttributeSet::new();
        attrs.set(FsAttribute::Compress, true).unwrap();
        assert!(attrs.get(FsAttribute::Compress).unwrap());
        assert!(!attrs.get(FsAttribute::PageSupport).unwrap());
        assert_eq!(attrs.enabled(), vec![FsAttribute::Compress]);

        attrs.set(FsAttribute::Compress, false).unwrap();
        assert!(!attrs.get(FsAttribute::Compress).unwrap());
    }

    #[test]
    fn test_raw_slot_numbers() {
        let mut attrs = FsAttributeSet::new();
        attrs.set(0usize, true).unwrap();
        assert!(attrs.get(FsAttribute::PageSupport).unwrap());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let mut attrs = FsAttributeSet::new();
        let before = attrs.to_bytes();

        assert!(matches!(attrs.set(5usize, true), Err(TyfsError::UnknownAttribute(5))));
        assert!(matches!(attrs.set(32usize, true), Err(TyfsError::UnknownAttribute(32))));
        assert!(matches!(attrs.get(31usize), Err(TyfsError::UnknownAttribute(31))));
        assert_eq!(attrs.to_bytes(), before);
    }

    #[test]
    fn test_reserved_bits_roundtrip() {
        let mut bytes = [0u8; ATTRIBUTE_SLOTS];
        bytes[0] = 0b1010_0000;
        bytes[17] = 0xFF;

        let mut attrs = FsAttributeSet::from_bytes(&bytes).unwrap();
        attrs.set(FsAttribute::PageSupport, true).unwrap();

        let out = attrs.to_bytes();
        assert_eq!(out[0], 0b1010_0001);
        assert_eq!(out[17], 0xFF);
        assert_eq!(attrs.raw_byte(17).unwrap(), 0xFF);
        // Reserved slot stays unreadable as a flag
        assert!(attrs.get(17usize).is_err());
    }

    #[test]
    fn test_from_bytes_wrong_length() {
        assert!(matches!(FsAttributeSet::from_bytes(&[0u8; 31]), Err(TyfsError::Corrupt(_))));
    }
}
