//! LS-8 memory subsystem.
//!
//! A flat array of bytes shared by program code, data and the stack.
//! There is no separation between code and data, so self-modifying
//! programs and stack/code collisions are possible.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells in the reference machine.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: up to 256 eight-bit cells.
///
/// Snapshots are validated on deserialization, so every `Memory` has a
/// power-of-two length.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemorySnapshot")]
pub struct Memory {
    cells: Vec<u8>,
}

/// Serialized form of [`Memory`].
#[derive(Deserialize)]
struct MemorySnapshot {
    cells: Vec<u8>,
}

impl TryFrom<MemorySnapshot> for Memory {
    type Error = MemoryError;

    fn try_from(snapshot: MemorySnapshot) -> Result<Self, Self::Error> {
        let mut mem = Self::with_size(snapshot.cells.len())?;
        mem.cells = snapshot.cells;
        Ok(mem)
    }
}

impl Memory {
    /// Create a 256-cell memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Create a memory of `size` cells.
    ///
    /// The size must be a power of two no larger than 256 so that address
    /// arithmetic on 8-bit values wraps cleanly onto the address space.
    pub fn with_size(size: usize) -> Result<Self, MemoryError> {
        if size == 0 || size > MEMORY_SIZE || !size.is_power_of_two() {
            return Err(MemoryError::InvalidSize(size));
        }
        Ok(Self {
            cells: vec![0; size],
        })
    }

    /// Number of addressable cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; construction and deserialization reject empty memories.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read the byte stored at `addr`.
    #[inline]
    pub fn read(&self, addr: u8) -> Result<u8, MemoryError> {
        self.cells
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange { addr, size: self.cells.len() })
    }

    /// Store `value` at `addr`.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) -> Result<(), MemoryError> {
        let size = self.cells.len();
        let cell = self.cells
            .get_mut(addr as usize)
            .ok_or(MemoryError::AddressOutOfRange { addr, size })?;
        *cell = value;
        Ok(())
    }

    /// Wrap an arbitrary offset onto the address space.
    #[inline]
    pub fn wrap(&self, offset: usize) -> u8 {
        // len is a power of two <= 256, so the result always fits in a byte
        (offset & (self.cells.len() - 1)) as u8
    }

    /// The address after `addr`, wrapping at the end of memory.
    #[inline]
    pub fn next_addr(&self, addr: u8) -> u8 {
        if addr as usize + 1 == self.cells.len() {
            0
        } else {
            addr.wrapping_add(1)
        }
    }

    /// The address before `addr`, wrapping to the last cell.
    #[inline]
    pub fn prev_addr(&self, addr: u8) -> u8 {
        match addr {
            0 => (self.cells.len() - 1) as u8,
            _ => addr - 1,
        }
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a program into memory starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        let available = self.cells.len().saturating_sub(start_addr);
        if start_addr > self.cells.len() || program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start_addr..start_addr + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// The raw cell contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = (start + count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory address {addr:#04x} out of range (size {size})")]
    AddressOutOfRange { addr: u8, size: usize },

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },

    /// Requested memory size is unusable.
    #[error("invalid memory size {0} (must be a power of two, 1-256)")]
    InvalidSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();

        mem.write(10, 42).unwrap();
        assert_eq!(mem.read(10).unwrap(), 42);
        assert_eq!(mem.read(255).unwrap(), 0);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::with_size(64).unwrap();

        assert!(mem.read(63).is_ok());
        assert_eq!(
            mem.read(64),
            Err(MemoryError::AddressOutOfRange { addr: 64, size: 64 })
        );
        assert!(mem.write(200, 1).is_err());
    }

    #[test]
    fn test_memory_sizes() {
        assert!(Memory::with_size(1).is_ok());
        assert!(Memory::with_size(128).is_ok());
        assert_eq!(Memory::with_size(0), Err(MemoryError::InvalidSize(0)));
        assert_eq!(Memory::with_size(100), Err(MemoryError::InvalidSize(100)));
        assert_eq!(Memory::with_size(512), Err(MemoryError::InvalidSize(512)));
    }

    #[test]
    fn test_wrap() {
        let full = Memory::new();
        assert_eq!(full.wrap(256), 0);
        assert_eq!(full.wrap(257), 1);

        let small = Memory::with_size(16).unwrap();
        assert_eq!(small.wrap(17), 1);
        assert_eq!(small.wrap(15), 15);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.dump(0, 4), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::with_size(4).unwrap();
        let err = mem.load_program(0, &[0; 5]).unwrap_err();

        assert_eq!(err, MemoryError::ProgramTooLarge { size: 5, available: 4 });
    }

    #[test]
    fn test_load_program_past_end() {
        let mut mem = Memory::with_size(4).unwrap();

        assert_eq!(
            mem.load_program(10, &[]),
            Err(MemoryError::ProgramTooLarge { size: 0, available: 0 })
        );
        assert!(mem.load_program(4, &[]).is_ok());
        assert_eq!(mem.as_slice(), &[0; 4]);
    }

    #[test]
    fn test_neighbour_addresses() {
        let full = Memory::new();
        assert_eq!(full.prev_addr(0), 0xFF);
        assert_eq!(full.next_addr(0xFF), 0);
        assert_eq!(full.next_addr(0x10), 0x11);

        let small = Memory::with_size(64).unwrap();
        assert_eq!(small.prev_addr(0), 63);
        assert_eq!(small.next_addr(63), 0);
        assert_eq!(small.prev_addr(10), 9);
    }

    #[test]
    fn test_snapshot_validates_size() {
        let mut mem = Memory::with_size(8).unwrap();
        mem.write(3, 42).unwrap();
        let json = serde_json::to_string(&mem).unwrap();
        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, mem);

        let err = serde_json::from_str::<Memory>(r#"{"cells":[153,2,7]}"#).unwrap_err();
        assert!(err.to_string().contains("invalid memory size 3"));
        assert!(serde_json::from_str::<Memory>(r#"{"cells":[]}"#).is_err());
    }
}
