use bitflags::bitflags;

use crate::error::LoaderError;

/// `bra.s` over the header, used as the magic number
pub const MAGIC: u16 = 0x601a;

pub const HEADER_SIZE: usize = 28;

bitflags! {
    /// Loading hints from the program header
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ProgramFlags: u32 {
        /// Only the bss needs clearing, not the rest of the heap
        const FASTLOAD = 0x0001;
        /// Text and data may be loaded into alternate RAM
        const ALT_RAM_LOAD = 0x0002;
        /// Malloc requests may be satisfied from alternate RAM
        const ALT_RAM_MALLOC = 0x0004;
        /// Memory protection mode, two bits
        const PROTECTION = 0x0030;
        /// Text segment may be shared between instances
        const SHARED_TEXT = 0x0800;
    }
}

/// Fixed header at the start of every TOS executable. All fields are
/// big-endian on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramHeader {
    pub magic: u16,
    pub text_len: u32,
    pub data_len: u32,
    pub bss_len: u32,
    /// Length of the symbol table, which sits between data and the
    /// relocation table
    pub symbol_len: u32,
    pub reserved: u32,
    pub flags: ProgramFlags,
    /// Non-zero if the program needs no relocation
    pub absolute: u16,
}

impl ProgramHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self, LoaderError> {
        let word = |offset: usize| u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        let long = |offset: usize| {
            u32::from_be_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        let magic = word(0);
        if magic != MAGIC {
            return Err(LoaderError::BadBinary);
        }
        Ok(Self {
            magic,
            text_len: long(2),
            data_len: long(6),
            bss_len: long(10),
            symbol_len: long(14),
            reserved: long(18),
            flags: ProgramFlags::from_bits_retain(long(22)),
            absolute: word(26),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.magic.to_be_bytes());
        bytes[2..6].copy_from_slice(&self.text_len.to_be_bytes());
        bytes[6..10].copy_from_slice(&self.data_len.to_be_bytes());
        bytes[10..14].copy_from_slice(&self.bss_len.to_be_bytes());
        bytes[14..18].copy_from_slice(&self.symbol_len.to_be_bytes());
        bytes[18..22].copy_from_slice(&self.reserved.to_be_bytes());
        bytes[22..26].copy_from_slice(&self.flags.bits().to_be_bytes());
        bytes[26..28].copy_from_slice(&self.absolute.to_be_bytes());
        bytes
    }

    pub fn needs_relocation(&self) -> bool {
        self.absolute == 0
    }

    /// Combined length of text and data, the part of the image read from
    /// the file. None on overflow.
    pub fn image_len(&self) -> Option<u32> {
        self.text_len.checked_add(self.data_len)
    }
}
