use thiserror::Error;

use crate::constants::{Address, Byte};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was invalid
    #[error("invalid address {0}")]
    InvalidAddress(Address),

    /// A block of bytes does not fit in memory at the given offset
    #[error("{length} bytes at offset {offset} do not fit in a memory of {size} cells")]
    OutOfRange {
        offset: Address,
        length: usize,
        size: usize,
    },
}

/// Holds the memory cells of the computer.
///
/// Every cell is a single byte, whatever the width of the registers.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Byte]>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ size: {}, cells: [...] }}", self.inner.len())
    }
}

impl Memory {
    /// Create a zeroed memory of `size` cells
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            inner: vec![0; size].into_boxed_slice(),
        }
    }

    /// Number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get a cell at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Byte, MemoryError> {
        self.inner
            .get(address)
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Get a mutable reference to a cell at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Byte, MemoryError> {
        self.inner
            .get_mut(address)
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Copy a block of bytes into memory, starting at `offset`
    ///
    /// # Errors
    ///
    /// Fails without touching any cell if the block does not fit.
    pub fn load(&mut self, bytes: &[Byte], offset: Address) -> Result<(), MemoryError> {
        let size = self.inner.len();
        let out_of_range = || MemoryError::OutOfRange {
            offset,
            length: bytes.len(),
            size,
        };

        let end = offset.checked_add(bytes.len()).ok_or_else(out_of_range)?;
        let target = self.inner.get_mut(offset..end).ok_or_else(out_of_range)?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// View a range of cells
    ///
    /// # Errors
    ///
    /// Fails if any address of the range is out of bounds.
    pub fn slice(&self, offset: Address, length: usize) -> Result<&[Byte], MemoryError> {
        let end = offset
            .checked_add(length)
            .ok_or(MemoryError::InvalidAddress(offset))?;
        self.inner
            .get(offset..end)
            .ok_or(MemoryError::InvalidAddress(end.saturating_sub(1)))
    }

    /// All the cells, in address order
    #[must_use]
    pub fn as_slice(&self) -> &[Byte] {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_test() {
        let mut memory = Memory::new(4);
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.get(3), Ok(0));
        assert_eq!(memory.get(4), Err(MemoryError::InvalidAddress(4)));

        *memory.get_mut(2).unwrap() = 0x42;
        assert_eq!(memory.get(2), Ok(0x42));
        assert!(memory.get_mut(10).is_err());
    }

    #[test]
    fn load_test() {
        let mut memory = Memory::new(8);
        memory.load(&[1, 2, 3], 0).unwrap();
        memory.load(&[9, 9], 6).unwrap();
        assert_eq!(memory.as_slice(), &[1, 2, 3, 0, 0, 0, 9, 9]);

        // Exactly filling the memory is fine, an empty block too
        memory.load(&[7; 8], 0).unwrap();
        memory.load(&[], 8).unwrap();
        assert_eq!(memory.as_slice(), &[7; 8]);
    }

    #[test]
    fn load_out_of_range_test() {
        let mut memory = Memory::new(4);
        memory.load(&[1, 2, 3, 4], 0).unwrap();

        assert_eq!(
            memory.load(&[5, 6], 3),
            Err(MemoryError::OutOfRange {
                offset: 3,
                length: 2,
                size: 4
            })
        );
        assert!(memory.load(&[5], usize::MAX).is_err());
        assert!(memory.load(&[0; 5], 0).is_err());

        // Nothing was written by the failed loads
        assert_eq!(memory.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn slice_test() {
        let mut memory = Memory::new(4);
        memory.load(&[1, 2, 3, 4], 0).unwrap();
        assert_eq!(memory.slice(1, 2), Ok(&[2, 3][..]));
        assert!(memory.slice(3, 2).is_err());
    }
}
