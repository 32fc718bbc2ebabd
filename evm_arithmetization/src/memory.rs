use crate::error::ExecutionError;
use crate::word::{word_size, Word};

/// Offsets past this bound can never be paid for and fail with out of gas.
pub const MAX_MEMORY_SIZE: usize = 1 << 25;

/// Gas cost of a memory of `words` 32-byte words.
pub fn memory_cost(words: usize) -> u64 {
    let words = words as u64;
    3 * words + words * words / 512
}

/// Byte-addressed volatile memory of a call frame, grown in whole words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes, always a multiple of 32.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gas needed to make `[offset, offset + len)` addressable. Empty ranges
    /// never expand memory.
    pub fn expansion_cost(&self, offset: &Word, len: &Word) -> Result<u64, ExecutionError> {
        let Some(end) = checked_end(offset, len)? else {
            return Ok(0);
        };
        let current = word_size(self.data.len());
        let new = word_size(end);
        if new <= current {
            return Ok(0);
        }
        Ok(memory_cost(new) - memory_cost(current))
    }

    /// Grows memory to cover `[offset, offset + len)`. Callers charge
    /// [`Memory::expansion_cost`] first.
    pub fn expand(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = word_size(offset + len) * 32;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
    }

    pub fn load_word(&mut self, offset: usize) -> Word {
        self.expand(offset, 32);
        Word::from_be_slice_truncated(&self.data[offset..offset + 32])
    }

    pub fn store_word(&mut self, offset: usize, value: &Word) {
        self.store(offset, &value.to_be_bytes());
    }

    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.expand(offset, 1);
        self.data[offset] = value;
    }

    pub fn store(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.expand(offset, bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Reads `len` bytes, expanding memory as needed.
    pub fn read(&mut self, offset: usize, len: usize) -> Vec<u8> {
        self.expand(offset, len);
        if len == 0 {
            return vec![];
        }
        self.data[offset..offset + len].to_vec()
    }

    /// Byte at `offset`, zero past the end.
    pub fn byte(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// End of a non-empty range, or `None` for an empty one. Ranges reaching past
/// [`MAX_MEMORY_SIZE`] are unaffordable.
pub fn checked_end(offset: &Word, len: &Word) -> Result<Option<usize>, ExecutionError> {
    if len.is_zero() {
        return Ok(None);
    }
    let offset = usize::try_from(offset).map_err(|_| ExecutionError::OutOfGas)?;
    let len = usize::try_from(len).map_err(|_| ExecutionError::OutOfGas)?;
    match offset.checked_add(len) {
        Some(end) if end <= MAX_MEMORY_SIZE => Ok(Some(end)),
        _ => Err(ExecutionError::OutOfGas),
    }
}

/// Copies `len` bytes of `src` starting at `offset`, zero-padding past its
/// end.
pub fn padded_slice(src: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < src.len() {
        let available = (src.len() - offset).min(len);
        out[..available].copy_from_slice(&src[offset..offset + available]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_cost() -> anyhow::Result<()> {
        let mut memory = Memory::new();
        assert_eq!(memory.expansion_cost(&Word::ZERO, &Word::from(32u64))?, 3);
        assert_eq!(memory.expansion_cost(&Word::from(1000u64), &Word::ZERO)?, 0);
        memory.expand(0, 32);
        assert_eq!(memory.len(), 32);
        assert_eq!(
            memory.expansion_cost(&Word::from(16u64), &Word::from(32u64))?,
            memory_cost(2) - memory_cost(1)
        );
        assert_eq!(
            memory.expansion_cost(&Word::MAX, &Word::ONE),
            Err(ExecutionError::OutOfGas)
        );
        Ok(())
    }

    #[test]
    fn test_quadratic_cost() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        assert_eq!(memory_cost(1024), 3 * 1024 + 2048);
    }

    #[test]
    fn test_store_and_load() {
        let mut memory = Memory::new();
        memory.store_byte(33, 0xab);
        assert_eq!(memory.len(), 64);
        assert_eq!(memory.load_word(2), Word::from(0xabu64));
        assert_eq!(memory.load_word(3), Word::from(0xab00u64));
        assert_eq!(memory.load_word(1), Word::ZERO);
        assert_eq!(memory.byte(1000), 0);
    }

    #[test]
    fn test_padded_slice() {
        assert_eq!(padded_slice(&[1, 2, 3], 1, 4), vec![2, 3, 0, 0]);
        assert_eq!(padded_slice(&[1, 2, 3], 10, 2), vec![0, 0]);
    }
}
