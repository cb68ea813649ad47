//! Bounds-checked access to the machine's memory.
//!
//! Every destination a loader computes comes from an untrusted file, so all
//! writes go through an `AddressSpace` that refuses anything outside the
//! memory it covers. Addresses are plain 32-bit integers, never pointers.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use crate::error::LoaderError;

pub trait AddressSpace {
    /// Succeeds if `length` bytes starting at `address` are all backed by
    /// this address space
    fn check_range(&self, address: u32, length: u32) -> Result<(), LoaderError>;

    fn read(&self, address: u32, buffer: &mut [u8]) -> Result<(), LoaderError>;

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), LoaderError>;

    fn fill(&mut self, address: u32, length: u32, value: u8) -> Result<(), LoaderError> {
        self.check_range(address, length)?;
        let block = [value; 256];
        let mut offset = 0;
        while offset < length {
            let count = (length - offset).min(block.len() as u32);
            self.write(address + offset, &block[..count as usize])?;
            offset += count;
        }
        Ok(())
    }

    fn read_u32_be(&self, address: u32) -> Result<u32, LoaderError> {
        let mut bytes = [0u8; 4];
        self.read(address, &mut bytes)?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn write_u32_be(&mut self, address: u32, value: u32) -> Result<(), LoaderError> {
        self.write(address, &value.to_be_bytes())
    }
}

/// A contiguous block of RAM starting at `base`, backed by an owned arena
pub struct Ram {
    base: u32,
    bytes: Vec<u8>,
}

impl Ram {
    pub fn new(base: u32, size: u32) -> Self {
        Self {
            base,
            bytes: vec![0; size as usize],
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Direct view of a range, used by diagnostics and tests
    pub fn slice(&self, address: u32, length: u32) -> Result<&[u8], LoaderError> {
        let range = self.arena_range(address, length)?;
        Ok(&self.bytes[range])
    }

    fn arena_range(&self, address: u32, length: u32) -> Result<Range<usize>, LoaderError> {
        let start = address
            .checked_sub(self.base)
            .ok_or(LoaderError::SegmentOutOfBounds)?;
        let end = start
            .checked_add(length)
            .ok_or(LoaderError::SegmentOutOfBounds)?;
        if end as usize > self.bytes.len() {
            return Err(LoaderError::SegmentOutOfBounds);
        }
        Ok(start as usize..end as usize)
    }
}

impl AddressSpace for Ram {
    fn check_range(&self, address: u32, length: u32) -> Result<(), LoaderError> {
        self.arena_range(address, length).map(|_| ())
    }

    fn read(&self, address: u32, buffer: &mut [u8]) -> Result<(), LoaderError> {
        let range = self.arena_range(address, buffer.len() as u32)?;
        buffer.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), LoaderError> {
        let range = self.arena_range(address, data.len() as u32)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn fill(&mut self, address: u32, length: u32, value: u8) -> Result<(), LoaderError> {
        let range = self.arena_range(address, length)?;
        self.bytes[range].fill(value);
        Ok(())
    }
}
