use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::log::TaggedLogger;
use crate::registry::FileLoader;

const LOGGER: TaggedLogger = TaggedLogger::new("RAW");

/// Copies a file byte-for-byte to the requested destination. Used for
/// anything without a registered format; never produces an entry point.
pub struct RawLoader;

impl FileLoader for RawLoader {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn load(
        &self,
        channel: &mut Channel,
        destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        if destination == 0 {
            return Err(LoaderError::BadExtension);
        }
        let mut chunk = channel.chunk_buffer();
        let mut address = destination;
        loop {
            let count = channel.read(&mut chunk)?;
            if count == 0 {
                break;
            }
            ctx.memory.write(address, &chunk[..count])?;
            address = address
                .checked_add(count as u32)
                .ok_or(LoaderError::SegmentOutOfBounds)?;
        }
        LOGGER.debug(format_args!(
            "copied {:#x} bytes to {:#010x}",
            address - destination,
            destination,
        ));
        Ok(None)
    }
}
