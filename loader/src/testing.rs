//! In-memory channel and machine used by the unit tests

use foenix_api::io::{Handle, IoError, SeekMethod};

use crate::channel::{Channel, ChannelIo, FileSystem};
use crate::config::LoaderConfig;
use crate::context::LoadContext;
use crate::environment::Environment;
use crate::error::LoaderError;
use crate::heap::BlockAllocator;
use crate::memory::Ram;
use crate::process::ProcessManager;
use crate::registry::FileLoader;

pub struct SliceIo {
    data: Vec<u8>,
    cursor: u32,
    max_read: usize,
    largest_request: usize,
    delivered: usize,
    failure: Option<(usize, IoError)>,
    closed: usize,
}

impl SliceIo {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            cursor: 0,
            max_read: usize::MAX,
            largest_request: 0,
            delivered: 0,
            failure: None,
            closed: 0,
        }
    }

    /// Return at most `max` bytes per read, regardless of the request size
    pub fn with_max_read(mut self, max: usize) -> Self {
        self.max_read = max;
        self
    }

    /// Fail every read with `error`
    pub fn failing_with(self, error: IoError) -> Self {
        self.failing_after(0, error)
    }

    /// Deliver `bytes` bytes in total, then fail every read with `error`
    pub fn failing_after(mut self, bytes: usize, error: IoError) -> Self {
        self.failure = Some((bytes, error));
        self
    }

    /// Number of times the channel was closed
    pub fn closed(&self) -> usize {
        self.closed
    }

    pub fn largest_request(&self) -> usize {
        self.largest_request
    }
}

impl ChannelIo for SliceIo {
    fn read(&mut self, _handle: Handle, buffer: &mut [u8]) -> Result<usize, IoError> {
        let mut allowed = usize::MAX;
        if let Some((after, error)) = self.failure {
            if self.delivered >= after {
                return Err(error);
            }
            allowed = after - self.delivered;
        }
        self.largest_request = self.largest_request.max(buffer.len());
        let start = (self.cursor as usize).min(self.data.len());
        let count = buffer
            .len()
            .min(self.max_read)
            .min(allowed)
            .min(self.data.len() - start);
        buffer[..count].copy_from_slice(&self.data[start..start + count]);
        self.cursor += count as u32;
        self.delivered += count;
        Ok(count)
    }

    fn seek(&mut self, _handle: Handle, method: SeekMethod) -> Result<u32, IoError> {
        let position = method
            .from_current_position(self.cursor)
            .ok_or(IoError::SeekOutOfRange)?;
        self.cursor = position;
        Ok(position)
    }
}

impl FileSystem for SliceIo {
    fn open(&mut self, _path: &str) -> Result<Handle, IoError> {
        self.cursor = 0;
        Ok(Handle::new(3))
    }

    fn close(&mut self, _handle: Handle) -> Result<(), IoError> {
        self.closed += 1;
        Ok(())
    }
}

/// Memory, heap and process state for driving a loader in tests. The heap
/// covers the whole of RAM.
pub struct Machine {
    pub ram: Ram,
    pub heap: BlockAllocator,
    pub processes: ProcessManager,
    pub environment: Environment,
    pub config: LoaderConfig,
}

impl Machine {
    pub fn new(base: u32, size: u32) -> Self {
        let config = LoaderConfig::default();
        Self {
            ram: Ram::new(base, size),
            heap: BlockAllocator::new(base, size),
            processes: ProcessManager::new(config.max_nesting),
            environment: Environment::empty(),
            config,
        }
    }

    pub fn context(&mut self) -> LoadContext<'_> {
        LoadContext {
            memory: &mut self.ram,
            heap: &mut self.heap,
            processes: &mut self.processes,
            environment: &self.environment,
            config: &self.config,
        }
    }

    /// Load `data` with small, uneven transfers so records straddle chunks
    pub fn run(
        &mut self,
        loader: &dyn FileLoader,
        data: Vec<u8>,
        destination: u32,
    ) -> Result<Option<u32>, LoaderError> {
        let mut io = SliceIo::new(data).with_max_read(5);
        self.run_io(loader, &mut io, 16, destination)
    }

    pub fn run_io(
        &mut self,
        loader: &dyn FileLoader,
        io: &mut SliceIo,
        chunk_size: usize,
        destination: u32,
    ) -> Result<Option<u32>, LoaderError> {
        let mut channel = Channel::new(io, Handle::new(3), chunk_size);
        let mut ctx = self.context();
        loader.load(&mut channel, destination, &mut ctx)
    }
}
