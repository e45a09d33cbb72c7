//! TRC3 memory subsystem.
//!
//! A single 2048-byte array seen two ways:
//! - linearly by the fetch unit, two bytes per instruction (`pc << 1`)
//! - through the page register for data, as 8 pages of 256 bytes
//!   (`(page << 8) + offset`)

use crate::isa::{word_from_bytes, MEMORY_BYTES};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of bytes in TRC3 memory.
pub const MEMORY_SIZE: usize = MEMORY_BYTES;

/// Mask for the 11-bit address bus.
const ADDRESS_MASK: usize = MEMORY_SIZE - 1;

/// TRC3 memory: 2048 bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a byte by linear address. Addresses wrap on the 11-bit bus.
    #[inline]
    pub fn read(&self, addr: usize) -> u8 {
        self.cells[addr & ADDRESS_MASK]
    }

    /// Write a byte by linear address. Addresses wrap on the 11-bit bus.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) {
        self.cells[addr & ADDRESS_MASK] = value;
    }

    /// Linear address of `offset` within `page`.
    ///
    /// An offset past 255 carries into the following page.
    #[inline]
    pub fn paged_address(page: u8, offset: u16) -> usize {
        (((page as usize) << 8) + offset as usize) & ADDRESS_MASK
    }

    /// Read a data byte through the page view.
    #[inline]
    pub fn read_paged(&self, page: u8, offset: u16) -> u8 {
        self.cells[Self::paged_address(page, offset)]
    }

    /// Write a data byte through the page view.
    #[inline]
    pub fn write_paged(&mut self, page: u8, offset: u16, value: u8) {
        self.cells[Self::paged_address(page, offset)] = value;
    }

    /// Fetch the instruction word in slot `pc`.
    pub fn fetch_word(&self, pc: u16) -> Result<u16, MemoryError> {
        let addr = (pc as usize) << 1;
        if addr + 1 >= MEMORY_SIZE {
            return Err(MemoryError::FetchOutOfRange(pc));
        }
        Ok(word_from_bytes(self.cells[addr], self.cells[addr + 1]))
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a binary image into memory starting at address 0.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                size: image.len(),
                available: MEMORY_SIZE,
            });
        }

        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("instruction fetch at slot {0} is past the end of memory")]
    FetchOutOfRange(u16),

    #[error("image of {size} bytes exceeds the {available}-byte address space")]
    ImageTooLarge { size: usize, available: usize },
}
