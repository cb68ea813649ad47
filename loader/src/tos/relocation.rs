//! The relocation table follows the symbol table. It starts with a long
//! giving the offset of the first fixup from the start of text (0 if there
//! are none), then a byte per fixup giving the distance from the previous
//! one. A byte of 1 advances 254 bytes without a fixup, and 0 ends the table.
//! Each fixup adds the text base to the big-endian long at that offset.

use crate::channel::{ByteStream, Channel};
use crate::error::LoaderError;
use crate::memory::AddressSpace;

/// Advance without patching
const SKIP: u8 = 1;
const SKIP_DISTANCE: u32 = 254;
const END: u8 = 0;

/// Where the program was loaded, and how much of it may be patched
#[derive(Clone, Copy, Debug)]
pub struct Image {
    pub text_base: u32,
    /// Length of text plus data
    pub len: u32,
}

impl Image {
    fn patch(&self, memory: &mut dyn AddressSpace, offset: u32) -> Result<(), LoaderError> {
        let end = offset.checked_add(4).ok_or(LoaderError::SegmentOutOfBounds)?;
        if end > self.len {
            return Err(LoaderError::SegmentOutOfBounds);
        }
        let address = self.text_base + offset;
        let value = memory.read_u32_be(address)?;
        memory.write_u32_be(address, value.wrapping_add(self.text_base))
    }
}

/// Apply the relocation table at the channel's current position. Returns the
/// number of longs patched.
pub fn relocate(
    channel: &mut Channel,
    memory: &mut dyn AddressSpace,
    image: Image,
) -> Result<usize, LoaderError> {
    let mut stream = ByteStream::new(channel);
    let mut offset = stream.next_u32_be()?;
    if offset == 0 {
        return Ok(0);
    }
    image.patch(memory, offset)?;
    let mut patched = 1;
    loop {
        let step = match stream.next_byte()? {
            END => break,
            SKIP => {
                offset = offset
                    .checked_add(SKIP_DISTANCE)
                    .ok_or(LoaderError::SegmentOutOfBounds)?;
                continue;
            }
            step => step,
        };
        offset = offset
            .checked_add(step as u32)
            .ok_or(LoaderError::SegmentOutOfBounds)?;
        image.patch(memory, offset)?;
        patched += 1;
    }
    Ok(patched)
}
