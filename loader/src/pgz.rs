//! PGZ: a signature byte followed by a series of segments, each a
//! little-endian address, a little-endian length, and that many bytes of
//! data. `Z` files use 24-bit fields, `z` files use 32-bit fields. A segment
//! of length zero carries the entry point instead of data.

use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::log::TaggedLogger;
use crate::memory::AddressSpace;
use crate::registry::FileLoader;

const LOGGER: TaggedLogger = TaggedLogger::new("PGZ");

pub const SIGNATURE_24: u8 = b'Z';
pub const SIGNATURE_32: u8 = b'z';

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Signature,
    Address { index: usize, value: u32 },
    Count { address: u32, index: usize, value: u32 },
    Data { address: u32, remaining: u32 },
}

/// Incremental PGZ decoder. Bytes may be fed in arbitrarily sized pieces;
/// only the partially decoded field survives between calls.
pub struct PgzParser {
    state: State,
    field_width: usize,
    entry: Option<u32>,
    segments: usize,
}

impl PgzParser {
    pub fn new() -> Self {
        Self {
            state: State::Signature,
            field_width: 0,
            entry: None,
            segments: 0,
        }
    }

    pub fn feed(&mut self, bytes: &[u8], memory: &mut dyn AddressSpace) -> Result<(), LoaderError> {
        let mut offset = 0;
        while offset < bytes.len() {
            match self.state {
                State::Signature => {
                    self.field_width = match bytes[offset] {
                        SIGNATURE_24 => 3,
                        SIGNATURE_32 => 4,
                        _ => return Err(LoaderError::BadBinary),
                    };
                    self.state = State::Address { index: 0, value: 0 };
                    offset += 1;
                }
                State::Address { index, value } => {
                    let value = value | (bytes[offset] as u32) << (index * 8);
                    offset += 1;
                    self.state = if index + 1 == self.field_width {
                        State::Count {
                            address: value,
                            index: 0,
                            value: 0,
                        }
                    } else {
                        State::Address {
                            index: index + 1,
                            value,
                        }
                    };
                }
                State::Count {
                    address,
                    index,
                    value,
                } => {
                    let value = value | (bytes[offset] as u32) << (index * 8);
                    offset += 1;
                    if index + 1 < self.field_width {
                        self.state = State::Count {
                            address,
                            index: index + 1,
                            value,
                        };
                        continue;
                    }
                    self.state = State::Address { index: 0, value: 0 };
                    if value == 0 {
                        LOGGER.trace(format_args!("start address {:#010x}", address));
                        self.entry = Some(address);
                        continue;
                    }
                    LOGGER.trace(format_args!(
                        "segment {:#010x} length {:#x}",
                        address, value,
                    ));
                    memory.check_range(address, value)?;
                    self.segments += 1;
                    self.state = State::Data {
                        address,
                        remaining: value,
                    };
                }
                State::Data { address, remaining } => {
                    let available = (bytes.len() - offset).min(remaining as usize);
                    memory.write(address, &bytes[offset..offset + available])?;
                    offset += available;
                    let remaining = remaining - available as u32;
                    self.state = if remaining == 0 {
                        State::Address { index: 0, value: 0 }
                    } else {
                        State::Data {
                            address: address + available as u32,
                            remaining,
                        }
                    };
                }
            }
        }
        Ok(())
    }

    /// Call once the file is exhausted. The file must end on a segment
    /// boundary.
    pub fn finish(self) -> Result<Option<u32>, LoaderError> {
        match self.state {
            State::Address { index: 0, .. } => Ok(self.entry),
            _ => Err(LoaderError::BadBinary),
        }
    }

    pub fn segments(&self) -> usize {
        self.segments
    }
}

impl Default for PgzParser {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PgzLoader;

impl FileLoader for PgzLoader {
    fn name(&self) -> &'static str {
        "pgz"
    }

    fn load(
        &self,
        channel: &mut Channel,
        _destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        let mut parser = PgzParser::new();
        let mut chunk = channel.chunk_buffer();
        loop {
            let count = channel.read(&mut chunk)?;
            if count == 0 {
                break;
            }
            parser.feed(&chunk[..count], ctx.memory)?;
        }
        LOGGER.debug(format_args!("loaded {} segments", parser.segments()));
        parser.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{PgzLoader, PgzParser};
    use crate::error::LoaderError;
    use crate::memory::Ram;
    use crate::testing::Machine;

    fn segment24(address: u32, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&address.to_le_bytes()[..3]);
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes()[..3]);
        bytes.extend_from_slice(data);
        bytes
    }

    fn segment32(address: u32, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&address.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn load_24_bit() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x2000, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]));
        file.extend(segment24(0x2100, &[0xaa, 0xbb]));
        file.extend(segment24(0x2000, &[]));

        let mut machine = Machine::new(0x2000, 0x200);
        assert_eq!(machine.run(&PgzLoader, file, 0), Ok(Some(0x2000)));
        assert_eq!(
            machine.ram.slice(0x2000, 12).unwrap(),
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        );
        assert_eq!(machine.ram.slice(0x2100, 2).unwrap(), &[0xaa, 0xbb]);
    }

    #[test]
    fn load_32_bit() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut file = vec![b'z'];
        file.extend(segment32(0x0102_0000, &data));
        file.extend(segment32(0x0102_0010, &[]));

        let mut machine = Machine::new(0x0102_0000, 0x100);
        assert_eq!(machine.run(&PgzLoader, file, 0), Ok(Some(0x0102_0010)));
        assert_eq!(machine.ram.slice(0x0102_0000, 100).unwrap(), &data[..]);
    }

    #[test]
    fn start_only() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x1234, &[]));
        let mut machine = Machine::new(0x1000, 0x1000);
        assert_eq!(machine.run(&PgzLoader, file, 0), Ok(Some(0x1234)));
        assert!(machine.ram.slice(0x1000, 0x1000).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn last_start_wins() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x1100, &[]));
        file.extend(segment24(0x1200, &[]));
        let mut machine = Machine::new(0x1000, 0x1000);
        assert_eq!(machine.run(&PgzLoader, file, 0), Ok(Some(0x1200)));
    }

    #[test]
    fn no_start_record() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x1000, &[1]));
        let mut machine = Machine::new(0x1000, 0x10);
        assert_eq!(machine.run(&PgzLoader, file, 0), Ok(None));
        assert_eq!(machine.ram.slice(0x1000, 1).unwrap(), &[1]);
    }

    #[test]
    fn bad_signature() {
        let mut file = vec![b'P'];
        file.extend(segment24(0x1000, &[1]));
        let mut machine = Machine::new(0x1000, 0x10);
        assert_eq!(machine.run(&PgzLoader, file, 0), Err(LoaderError::BadBinary));
        assert_eq!(machine.ram.slice(0x1000, 1).unwrap(), &[0]);
        assert_eq!(machine.run(&PgzLoader, Vec::new(), 0), Err(LoaderError::BadBinary));
    }

    #[test]
    fn truncated_file() {
        let mut machine = Machine::new(0x1000, 0x100);
        let mut file = vec![b'Z'];
        file.extend(segment24(0x1000, &[1, 2, 3, 4]));
        file.truncate(file.len() - 1);
        assert_eq!(machine.run(&PgzLoader, file, 0), Err(LoaderError::BadBinary));

        let file = vec![b'z', 0, 0x10, 0, 0, 4];
        assert_eq!(machine.run(&PgzLoader, file, 0), Err(LoaderError::BadBinary));
    }

    #[test]
    fn segment_outside_memory() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x10fe, &[1, 2, 3, 4]));
        let mut machine = Machine::new(0x1000, 0x100);
        assert_eq!(
            machine.run(&PgzLoader, file, 0),
            Err(LoaderError::SegmentOutOfBounds),
        );
        // nothing of the segment is written
        assert_eq!(machine.ram.slice(0x10fe, 2).unwrap(), &[0, 0]);

        let mut file = vec![b'z'];
        file.extend(segment32(0xffff_fffe, &[1, 2, 3, 4]));
        assert_eq!(
            machine.run(&PgzLoader, file, 0),
            Err(LoaderError::SegmentOutOfBounds),
        );
    }

    #[test]
    fn fed_one_byte_at_a_time() {
        let mut file = vec![b'Z'];
        file.extend(segment24(0x40, &[9, 8, 7]));
        file.extend(segment24(0x44, &[]));
        let mut ram = Ram::new(0, 0x100);
        let mut parser = PgzParser::new();
        for byte in &file {
            parser.feed(core::slice::from_ref(byte), &mut ram).unwrap();
        }
        assert_eq!(parser.segments(), 1);
        assert_eq!(parser.finish(), Ok(Some(0x44)));
        assert_eq!(ram.slice(0x40, 3).unwrap(), &[9, 8, 7]);
    }
}
