#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod channel;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod exec;
pub mod heap;
pub mod log;
pub mod memory;
pub mod pgx;
pub mod pgz;
pub mod process;
pub mod raw;
pub mod registry;
pub mod srec;
pub mod tos;

#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelIo, FileSystem};
pub use config::LoaderConfig;
pub use context::LoadContext;
pub use environment::Environment;
pub use error::LoaderError;
pub use exec::ExecManager;
pub use heap::{Allocator, BlockAllocator};
pub use memory::{AddressSpace, Ram};
pub use process::{ExitSignal, ProcessManager, Termination};
pub use registry::{Extension, FileLoader, LoaderKind, LoaderRegistry};
