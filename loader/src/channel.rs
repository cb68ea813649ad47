//! The byte-stream side of loading. Storage drivers expose open files as
//! channels; loaders only ever see them through a `Channel`, which bounds
//! every transfer to the platform's maximum transfer size.

use alloc::vec;
use alloc::vec::Vec;

use foenix_api::io::{Handle, IoError, SeekMethod, MAX_TRANSFER};

use crate::error::LoaderError;
use crate::memory::AddressSpace;

/// Read and seek on open channels
pub trait ChannelIo {
    /// Read up to `buffer.len()` bytes. Returns 0 at end of file.
    fn read(&mut self, handle: Handle, buffer: &mut [u8]) -> Result<usize, IoError>;

    /// Move the cursor, returning the new absolute position
    fn seek(&mut self, handle: Handle, method: SeekMethod) -> Result<u32, IoError>;
}

/// Opening and closing files by path. Provided by the mounted filesystem.
pub trait FileSystem: ChannelIo {
    fn open(&mut self, path: &str) -> Result<Handle, IoError>;

    fn close(&mut self, handle: Handle) -> Result<(), IoError>;
}

/// An open file as seen by a loader
pub struct Channel<'io> {
    io: &'io mut dyn ChannelIo,
    handle: Handle,
    chunk_size: usize,
}

impl<'io> Channel<'io> {
    pub fn new(io: &'io mut dyn ChannelIo, handle: Handle, chunk_size: usize) -> Self {
        Self {
            io,
            handle,
            chunk_size: chunk_size.clamp(1, MAX_TRANSFER),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Allocate a buffer sized for one transfer
    pub fn chunk_buffer(&self) -> Vec<u8> {
        vec![0; self.chunk_size]
    }

    /// A single bounded transfer. Returns 0 at end of file.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, LoaderError> {
        let len = buffer.len().min(self.chunk_size);
        let count = self.io.read(self.handle, &mut buffer[..len])?;
        Ok(count.min(len))
    }

    /// Fill the whole buffer, failing with `CannotRead` if the file ends first
    pub fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), LoaderError> {
        let mut filled = 0;
        while filled < buffer.len() {
            let count = self.read(&mut buffer[filled..])?;
            if count == 0 {
                return Err(LoaderError::CannotRead);
            }
            filled += count;
        }
        Ok(())
    }

    /// Stream `length` bytes from the file into memory at `address`, one
    /// transfer at a time
    pub fn copy_to(
        &mut self,
        memory: &mut dyn AddressSpace,
        address: u32,
        length: u32,
    ) -> Result<(), LoaderError> {
        memory.check_range(address, length)?;
        let mut chunk = self.chunk_buffer();
        let mut copied: u32 = 0;
        while copied < length {
            let want = ((length - copied) as usize).min(chunk.len());
            let count = self.read(&mut chunk[..want])?;
            if count == 0 {
                return Err(LoaderError::CannotRead);
            }
            memory.write(address + copied, &chunk[..count])?;
            copied += count as u32;
        }
        Ok(())
    }

    pub fn skip(&mut self, length: u32) -> Result<u32, LoaderError> {
        let delta = i32::try_from(length).map_err(|_| LoaderError::BadBinary)?;
        Ok(self.io.seek(self.handle, SeekMethod::Relative(delta))?)
    }

    pub fn rewind(&mut self) -> Result<(), LoaderError> {
        self.io.seek(self.handle, SeekMethod::Absolute(0))?;
        Ok(())
    }
}

/// Buffered single-byte reads on top of a channel, for tables that are
/// consumed a byte at a time
pub struct ByteStream<'c, 'io> {
    channel: &'c mut Channel<'io>,
    buffer: Vec<u8>,
    position: usize,
    filled: usize,
}

impl<'c, 'io> ByteStream<'c, 'io> {
    pub fn new(channel: &'c mut Channel<'io>) -> Self {
        let buffer = channel.chunk_buffer();
        Self {
            channel,
            buffer,
            position: 0,
            filled: 0,
        }
    }

    pub fn next_byte(&mut self) -> Result<u8, LoaderError> {
        if self.position == self.filled {
            self.filled = self.channel.read(&mut self.buffer)?;
            self.position = 0;
            if self.filled == 0 {
                return Err(LoaderError::CannotRead);
            }
        }
        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(byte)
    }

    pub fn next_u32_be(&mut self) -> Result<u32, LoaderError> {
        let mut bytes = [0u8; 4];
        for byte in bytes.iter_mut() {
            *byte = self.next_byte()?;
        }
        Ok(u32::from_be_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteStream, Channel};
    use crate::error::LoaderError;
    use crate::memory::Ram;
    use crate::testing::SliceIo;
    use foenix_api::io::{Handle, IoError, MAX_TRANSFER};

    #[test]
    fn transfers_are_bounded() {
        let mut io = SliceIo::new((0..100u8).collect());
        let mut channel = Channel::new(&mut io, Handle::new(1), 16);
        let mut buffer = [0u8; 64];
        assert_eq!(channel.read(&mut buffer).unwrap(), 16);
        assert_eq!(io.largest_request(), 16);

        let mut io = SliceIo::new(Vec::new());
        let channel = Channel::new(&mut io, Handle::new(1), 1 << 20);
        assert_eq!(channel.chunk_size(), MAX_TRANSFER);
    }

    #[test]
    fn short_reads() {
        let mut io = SliceIo::new(vec![1, 2, 3, 4, 5]).with_max_read(2);
        let mut channel = Channel::new(&mut io, Handle::new(1), 64);
        let mut buffer = [0u8; 4];
        channel.read_exact(&mut buffer).unwrap();
        assert_eq!(buffer, [1, 2, 3, 4]);
        assert_eq!(channel.read_exact(&mut buffer), Err(LoaderError::CannotRead));
    }

    #[test]
    fn copy_into_memory() {
        let data: Vec<u8> = (0..200u8).collect();
        let mut io = SliceIo::new(data.clone());
        let mut channel = Channel::new(&mut io, Handle::new(1), 7);
        let mut ram = Ram::new(0x100, 0x200);
        channel.copy_to(&mut ram, 0x110, 200).unwrap();
        assert_eq!(ram.slice(0x110, 200).unwrap(), &data[..]);

        let mut io = SliceIo::new(data);
        let mut channel = Channel::new(&mut io, Handle::new(1), 7);
        assert_eq!(
            channel.copy_to(&mut ram, 0x110, 201),
            Err(LoaderError::CannotRead),
        );
        assert_eq!(
            channel.copy_to(&mut ram, 0x2f0, 0x20),
            Err(LoaderError::SegmentOutOfBounds),
        );
    }

    #[test]
    fn errors_pass_through() {
        let mut io = SliceIo::new(vec![0; 8]).failing_with(IoError::OperationFailed);
        let mut channel = Channel::new(&mut io, Handle::new(1), 8);
        let mut buffer = [0u8; 4];
        assert_eq!(
            channel.read(&mut buffer),
            Err(LoaderError::Io(IoError::OperationFailed)),
        );
    }

    #[test]
    fn skip_and_stream_bytes() {
        let mut io = SliceIo::new(vec![9, 9, 9, 0, 0, 1, 2, 7]);
        let mut channel = Channel::new(&mut io, Handle::new(1), 3);
        assert_eq!(channel.skip(3).unwrap(), 3);
        let mut stream = ByteStream::new(&mut channel);
        assert_eq!(stream.next_u32_be().unwrap(), 0x0000_0102);
        assert_eq!(stream.next_byte().unwrap(), 7);
        assert_eq!(stream.next_byte(), Err(LoaderError::CannotRead));
    }
}
