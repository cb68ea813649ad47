use crate::error::LoaderError;
use crate::memory::AddressSpace;

pub const BASEPAGE_SIZE: u32 = 256;

/// Offset of the 128-byte command line image
pub const COMMAND_LINE_OFFSET: u32 = 0x80;

const LOW_TPA: usize = 0x00;
const HIGH_TPA: usize = 0x04;
const TEXT_BASE: usize = 0x08;
const TEXT_LEN: usize = 0x0c;
const DATA_BASE: usize = 0x10;
const DATA_LEN: usize = 0x14;
const BSS_BASE: usize = 0x18;
const BSS_LEN: usize = 0x1c;
const DTA: usize = 0x20;
const PARENT: usize = 0x24;
const STACK_TOP: usize = 0x28;
const ENVIRONMENT: usize = 0x2c;

/// The block a TOS program receives describing its own memory. It sits at
/// the start of the process's allocation, with the program right after it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Basepage {
    /// Start of the process's memory block (the basepage itself)
    pub low_tpa: u32,
    /// First address past the process's memory block
    pub high_tpa: u32,
    pub text_base: u32,
    pub text_len: u32,
    pub data_base: u32,
    pub data_len: u32,
    pub bss_base: u32,
    pub bss_len: u32,
    /// Disk transfer address, initially the command line buffer
    pub dta: u32,
    /// Basepage of the process that was running when this one loaded, or 0
    pub parent: u32,
    /// Top of the stack reserved above the bss
    pub stack_top: u32,
    pub environment: u32,
}

impl Basepage {
    pub fn to_bytes(&self) -> [u8; BASEPAGE_SIZE as usize] {
        let mut bytes = [0u8; BASEPAGE_SIZE as usize];
        let fields = [
            (LOW_TPA, self.low_tpa),
            (HIGH_TPA, self.high_tpa),
            (TEXT_BASE, self.text_base),
            (TEXT_LEN, self.text_len),
            (DATA_BASE, self.data_base),
            (DATA_LEN, self.data_len),
            (BSS_BASE, self.bss_base),
            (BSS_LEN, self.bss_len),
            (DTA, self.dta),
            (PARENT, self.parent),
            (STACK_TOP, self.stack_top),
            (ENVIRONMENT, self.environment),
        ];
        for (offset, value) in fields {
            bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        }
        bytes
    }

    /// Write the whole 256-byte block, leaving the reserved area and the
    /// command line empty
    pub fn write_to(&self, memory: &mut dyn AddressSpace, address: u32) -> Result<(), LoaderError> {
        memory.write(address, &self.to_bytes())
    }

    pub fn read_from(memory: &dyn AddressSpace, address: u32) -> Result<Self, LoaderError> {
        let mut bytes = [0u8; BASEPAGE_SIZE as usize];
        memory.read(address, &mut bytes)?;
        let long = |offset: usize| {
            u32::from_be_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        Ok(Self {
            low_tpa: long(LOW_TPA),
            high_tpa: long(HIGH_TPA),
            text_base: long(TEXT_BASE),
            text_len: long(TEXT_LEN),
            data_base: long(DATA_BASE),
            data_len: long(DATA_LEN),
            bss_base: long(BSS_BASE),
            bss_len: long(BSS_LEN),
            dta: long(DTA),
            parent: long(PARENT),
            stack_top: long(STACK_TOP),
            environment: long(ENVIRONMENT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Basepage, BASEPAGE_SIZE};
    use crate::memory::Ram;

    #[test]
    fn field_offsets() {
        let basepage = Basepage {
            low_tpa: 0x1000,
            high_tpa: 0x2000,
            text_base: 0x1100,
            text_len: 0x10,
            data_base: 0x1110,
            data_len: 0x20,
            bss_base: 0x1130,
            bss_len: 0x30,
            dta: 0x1080,
            parent: 0,
            stack_top: 0x1260,
            environment: 0x1260,
        };
        let bytes = basepage.to_bytes();
        assert_eq!(&bytes[0x00..0x04], &[0, 0, 0x10, 0x00]);
        assert_eq!(&bytes[0x08..0x0c], &[0, 0, 0x11, 0x00]);
        assert_eq!(&bytes[0x1c..0x20], &[0, 0, 0, 0x30]);
        assert_eq!(&bytes[0x20..0x24], &[0, 0, 0x10, 0x80]);
        assert_eq!(&bytes[0x2c..0x30], &[0, 0, 0x12, 0x60]);
        assert!(bytes[0x30..].iter().all(|b| *b == 0));

        let mut ram = Ram::new(0x1000, 0x1000);
        basepage.write_to(&mut ram, 0x1000).unwrap();
        assert_eq!(Basepage::read_from(&ram, 0x1000).unwrap(), basepage);
        assert_eq!(ram.slice(0x1000, BASEPAGE_SIZE).unwrap(), &bytes[..]);
    }
}
