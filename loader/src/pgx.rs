//! PGX: a four byte signature naming the CPU, a big-endian load address, and
//! the program image. Execution starts at the load address.

use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::log::TaggedLogger;
use crate::registry::FileLoader;

const LOGGER: TaggedLogger = TaggedLogger::new("PGX");

/// Signature for 680x0 programs
pub const SIGNATURE: [u8; 4] = *b"PGX\x02";

pub const HEADER_SIZE: usize = 8;

pub struct PgxLoader;

impl FileLoader for PgxLoader {
    fn name(&self) -> &'static str {
        "pgx"
    }

    fn load(
        &self,
        channel: &mut Channel,
        _destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        let mut header = [0u8; HEADER_SIZE];
        channel.read_exact(&mut header).map_err(|e| match e {
            LoaderError::CannotRead => LoaderError::BadBinary,
            e => e,
        })?;
        if header[..4] != SIGNATURE {
            return Err(LoaderError::BadBinary);
        }
        let address = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        let mut chunk = channel.chunk_buffer();
        let mut cursor = address;
        loop {
            let count = channel.read(&mut chunk)?;
            if count == 0 {
                break;
            }
            ctx.memory.write(cursor, &chunk[..count])?;
            cursor = cursor
                .checked_add(count as u32)
                .ok_or(LoaderError::SegmentOutOfBounds)?;
        }
        LOGGER.debug(format_args!(
            "loaded {:#x} bytes at {:#010x}",
            cursor - address,
            address,
        ));
        Ok(Some(address))
    }
}
