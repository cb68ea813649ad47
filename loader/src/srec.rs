//! Motorola S-records. Each line is `S`, a record type digit, then hex pairs:
//! a byte count, the address, any data, and a checksum. The count covers
//! everything after itself. The checksum is the one's complement of the low
//! byte of the sum of the count, address and data bytes.

use alloc::vec::Vec;

use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::log::TaggedLogger;
use crate::memory::AddressSpace;
use crate::registry::FileLoader;

const LOGGER: TaggedLogger = TaggedLogger::new("SREC");

/// Longest line accepted, excluding the line ending
pub const MAX_LINE_LENGTH: usize = 600;

enum Record {
    /// Header and record counts: checked, then ignored
    Ignored,
    Data { address_len: usize },
    Start { address_len: usize },
}

impl Record {
    fn from_type(digit: u8) -> Option<Self> {
        match digit {
            b'0' | b'5' | b'6' => Some(Self::Ignored),
            b'1' => Some(Self::Data { address_len: 2 }),
            b'2' => Some(Self::Data { address_len: 3 }),
            b'3' => Some(Self::Data { address_len: 4 }),
            b'7' => Some(Self::Start { address_len: 4 }),
            b'8' => Some(Self::Start { address_len: 3 }),
            b'9' => Some(Self::Start { address_len: 2 }),
            _ => None,
        }
    }

    fn address_len(&self) -> usize {
        match self {
            Self::Ignored => 0,
            Self::Data { address_len } | Self::Start { address_len } => *address_len,
        }
    }
}

/// Line-oriented decoder fed with arbitrary pieces of the file. A line split
/// across two reads is reassembled before it is decoded.
pub struct SrecParser {
    line: Vec<u8>,
    entry: Option<u32>,
    data_records: usize,
}

impl SrecParser {
    pub fn new() -> Self {
        Self {
            line: Vec::with_capacity(MAX_LINE_LENGTH),
            entry: None,
            data_records: 0,
        }
    }

    pub fn feed(&mut self, bytes: &[u8], memory: &mut dyn AddressSpace) -> Result<(), LoaderError> {
        for &byte in bytes {
            if byte == b'\n' {
                self.end_line(memory)?;
                continue;
            }
            if self.line.len() >= MAX_LINE_LENGTH {
                return Err(LoaderError::BadBinary);
            }
            self.line.push(byte);
        }
        Ok(())
    }

    /// Decode whatever is left after the final newline and return the entry
    /// point, if the file had a start record
    pub fn finish(mut self, memory: &mut dyn AddressSpace) -> Result<Option<u32>, LoaderError> {
        self.end_line(memory)?;
        Ok(self.entry)
    }

    pub fn data_records(&self) -> usize {
        self.data_records
    }

    fn end_line(&mut self, memory: &mut dyn AddressSpace) -> Result<(), LoaderError> {
        let result = self.decode_line(memory);
        self.line.clear();
        result
    }

    fn decode_line(&mut self, memory: &mut dyn AddressSpace) -> Result<(), LoaderError> {
        let line = trim_ascii(&self.line);
        if line.is_empty() {
            return Ok(());
        }
        if line.len() < 4 || line[0] != b'S' {
            return Err(LoaderError::BadBinary);
        }
        let record = match Record::from_type(line[1]) {
            Some(record) => record,
            None => {
                LOGGER.trace(format_args!("skipping S{} record", line[1] as char));
                return Ok(());
            }
        };

        let mut decoded = [0u8; 256];
        let hex = &line[2..];
        if hex.len() % 2 != 0 {
            return Err(LoaderError::BadBinary);
        }
        let length = hex.len() / 2;
        if length > decoded.len() {
            return Err(LoaderError::BadBinary);
        }
        for (slot, pair) in decoded.iter_mut().zip(hex.chunks_exact(2)) {
            *slot = (hex_digit(pair[0])? << 4) | hex_digit(pair[1])?;
        }
        let decoded = &decoded[..length];

        // the count byte covers the address, data and checksum
        let count = decoded[0] as usize;
        if count + 1 != length || count < record.address_len() + 1 {
            return Err(LoaderError::BadBinary);
        }
        let (body, checksum) = decoded.split_at(length - 1);
        let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if !sum != checksum[0] {
            return Err(LoaderError::BadBinary);
        }

        let address_len = record.address_len();
        let address = body[1..1 + address_len]
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | *b as u32);
        let data = &body[1 + address_len..];
        match record {
            Record::Ignored => {}
            Record::Data { .. } => {
                memory.write(address, data)?;
                self.data_records += 1;
            }
            Record::Start { .. } => {
                LOGGER.trace(format_args!("start address {:#010x}", address));
                self.entry = Some(address);
            }
        }
        Ok(())
    }
}

impl Default for SrecParser {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_digit(c: u8) -> Result<u8, LoaderError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(LoaderError::BadBinary),
    }
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

pub struct SrecLoader;

impl FileLoader for SrecLoader {
    fn name(&self) -> &'static str {
        "srec"
    }

    fn load(
        &self,
        channel: &mut Channel,
        _destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        let mut parser = SrecParser::new();
        let mut chunk = channel.chunk_buffer();
        loop {
            let count = channel.read(&mut chunk)?;
            if count == 0 {
                break;
            }
            parser.feed(&chunk[..count], ctx.memory)?;
        }
        LOGGER.debug(format_args!("loaded {} data records", parser.data_records()));
        parser.finish(ctx.memory)
    }
}
