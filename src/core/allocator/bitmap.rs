//! Fixed-length bit vector backing segment and page-state bitmaps
//!
//! Each bit represents one block:
//! - 0 = free block
//! - 1 = allocated block
//!
//! The length is fixed at construction. There is no resize operation.

use crate::error::{Result, TyfsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    /// Bitmap words (each word = 64 bits)
    words: Box<[u64]>,

    /// Number of addressable bits
    len: usize,
}

impl BitVector {
    /// Create an all-clear bit vector of `len` bits
    pub fn new(len: usize) -> Self {
        let num_words = (len + 63) / 64;
        BitVector {
            words: vec![0u64; num_words].into_boxed_slice(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Test a bit. Out-of-range indices read as clear.
    pub fn test(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / 64] & (1u64 << (index % 64))) != 0
    }

    /// Set a bit, returning its previous value
    pub fn set(&mut self, index: usize) -> Result<bool> {
        self.check(index)?;
        let mask = 1u64 << (index % 64);
        let word = &mut self.words[index / 64];
        let was_set = (*word & mask) != 0;
        *word |= mask;
        Ok(was_set)
    }

    /// Clear a bit, returning its previous value
    pub fn clear(&mut self, index: usize) -> Result<bool> {
        self.check(index)?;
        let mask = 1u64 << (index % 64);
        let word = &mut self.words[index / 64];
        let was_set = (*word & mask) != 0;
        *word &= !mask;
        Ok(was_set)
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Lowest clear bit at or above `start`
    pub fn first_clear_from(&self, start: usize) -> Option<usize> {
        if start >= self.len {
            return None;
        }

        let mut word_idx = start / 64;
        // Treat bits below `start` in the first word as set
        let mut word = self.words[word_idx] | ((1u64 << (start % 64)) - 1);

        loop {
            if word != u64::MAX {
                let index = word_idx * 64 + word.trailing_ones() as usize;
                return (index < self.len).then_some(index);
            }

            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Indices of all set bits, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.test(i))
    }

    /// Encode as `len / 8` bytes, bit `i` stored in byte `i / 8` at position `i % 8`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.len + 7) / 8);
        for word in self.words.iter() {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.truncate((self.len + 7) / 8);
        bytes
    }

    /// Decode from the layout written by [`BitVector::to_bytes`]
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self> {
        let needed = (len + 7) / 8;
        if bytes.len() != needed {
            return Err(TyfsError::Corrupt(format!(
                "bitmap needs {} bytes, got {}",
                needed,
                bytes.len()
            )));
        }

        let mut bits = BitVector::new(len);
        for (word_idx, chunk) in bytes.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            bits.words[word_idx] = u64::from_le_bytes(buf);
        }

        if len % 64 != 0 {
            let last = bits.words.len() - 1;
            if bits.words[last] >> (len % 64) != 0 {
                return Err(TyfsError::Corrupt(
                    "bitmap has bits set past its length".to_string(),
                ));
            }
        }

        Ok(bits)
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(TyfsError::BlockOutOfRange(index));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitvector_creation() {
        let bits = BitVector::new(256);
        assert_eq!(bits.len(), 256);
        assert_eq!(bits.count_ones(), 0);
        assert_eq!(bits.first_clear_from(0), Some(0));
    }

    #[test]
    fn test_set_and_clear() {
        let mut bits = BitVector::new(256);

        assert!(!bits.set(10).unwrap());
        assert!(bits.set(10).unwrap());
        assert!(bits.test(10));
        assert_eq!(bits.count_ones(), 1);

        assert!(bits.clear(10).unwrap());
        assert!(!bits.clear(10).unwrap());
        assert!(!bits.test(10));
    }

    #[test]
    fn test_out_of_range() {
        let mut bits = BitVector::new(100);
        assert!(matches!(bits.set(100), Err(TyfsError::BlockOutOfRange(100))));
        assert!(!bits.test(1000));
    }

    #[test]
    fn test_first_clear_skips_full_words() {
        let mut bits = BitVector::new(256);
        for i in 0..130 {
            bits.set(i).unwrap();
        }
        assert_eq!(bits.first_clear_from(0), Some(130));
        assert_eq!(bits.first_clear_from(1), Some(130));
        assert_eq!(bits.first_clear_from(200), Some(200));
    }

    #[test]
    fn test_first_clear_when_full() {
        let mut bits = BitVector::new(70);
        for i in 0..70 {
            bits.set(i).unwrap();
        }
        assert_eq!(bits.first_clear_from(0), None);
        assert_eq!(bits.first_clear_from(70), None);
    }

    #[test]
    fn test_byte_layout() {
        let mut bits = BitVector::new(256);
        bits.set(0).unwrap();
        bits.set(9).unwrap();
        bits.set(255).unwrap();

        let bytes = bits.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 0b0000_0001);
        assert_eq!(bytes[1], 0b0000_0010);
        assert_eq!(bytes[31], 0b1000_0000);

        let decoded = BitVector::from_bytes(&bytes, 256).unwrap();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn test_from_bytes_rejects_stray_bits() {
        // 12 bits stored in 2 bytes, bit 13 set
        let result = BitVector::from_bytes(&[0x00, 0x20], 12);
        assert!(matches!(result, Err(TyfsError::Corrupt(_))));
    }
}
