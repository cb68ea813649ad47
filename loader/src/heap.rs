use alloc::vec::Vec;

use crate::error::LoaderError;

/// Kernel memory allocator used for process images. Blocks are tagged with
/// the owning process id, and only that owner may release them.
pub trait Allocator {
    /// Returns the address of a block of at least `size` bytes, or None if
    /// no region is large enough
    fn alloc(&mut self, owner: u16, tag: u16, size: u32) -> Option<u32>;

    fn free(&mut self, owner: u16, address: u32) -> Result<(), LoaderError>;
}

const ALIGNMENT: u32 = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub address: u32,
    pub size: u32,
    pub owner: u16,
    pub tag: u16,
}

impl Block {
    fn end(&self) -> u32 {
        self.address + self.size
    }
}

/// First-fit allocator over a fixed address range. Live blocks are kept
/// sorted by address so the gaps between them are the free list.
pub struct BlockAllocator {
    start: u32,
    end: u32,
    blocks: Vec<Block>,
}

impl BlockAllocator {
    pub fn new(start: u32, size: u32) -> Self {
        let aligned_start = align_up(start).unwrap_or(start);
        Self {
            start: aligned_start,
            end: start.saturating_add(size),
            blocks: Vec::new(),
        }
    }

    pub fn allocated_bytes(&self) -> u32 {
        self.blocks.iter().map(|b| b.size).sum()
    }

    pub fn find(&self, address: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.address == address)
    }
}

impl Allocator for BlockAllocator {
    fn alloc(&mut self, owner: u16, tag: u16, size: u32) -> Option<u32> {
        if size == 0 {
            return None;
        }
        let size = align_up(size)?;
        let mut candidate = self.start;
        let mut insert_at = self.blocks.len();
        for (index, block) in self.blocks.iter().enumerate() {
            if block.address.checked_sub(candidate)? >= size {
                insert_at = index;
                break;
            }
            candidate = block.end();
        }
        if insert_at == self.blocks.len() {
            let remaining = self.end.checked_sub(candidate)?;
            if remaining < size {
                return None;
            }
        }
        self.blocks.insert(
            insert_at,
            Block {
                address: candidate,
                size,
                owner,
                tag,
            },
        );
        Some(candidate)
    }

    fn free(&mut self, owner: u16, address: u32) -> Result<(), LoaderError> {
        let index = self
            .blocks
            .iter()
            .position(|b| b.address == address)
            .ok_or(LoaderError::BadHandle)?;
        if self.blocks[index].owner != owner {
            return Err(LoaderError::BadHandle);
        }
        self.blocks.remove(index);
        Ok(())
    }
}

fn align_up(value: u32) -> Option<u32> {
    Some(value.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1))
}
