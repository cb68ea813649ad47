//! Atari TOS executables (.TOS, .PRG).
//!
//! The program is placed in a single block from the kernel allocator:
//!
//! | basepage | text | data | bss | stack | environment |
//!
//! The entry point handed back is the bootstrap trampoline rather than the
//! program itself. The trampoline picks up the running basepage, switches to
//! the reserved stack and installs the termination trap before jumping to
//! the text segment.

pub mod basepage;
pub mod header;
pub mod relocation;

use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::log::TaggedLogger;
use crate::registry::FileLoader;

use self::basepage::{Basepage, BASEPAGE_SIZE, COMMAND_LINE_OFFSET};
use self::header::{ProgramHeader, HEADER_SIZE};
use self::relocation::{relocate, Image};

const LOGGER: TaggedLogger = TaggedLogger::new("TOS");

/// Where everything goes within the process block
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub basepage: u32,
    pub text_base: u32,
    pub data_base: u32,
    pub bss_base: u32,
    pub stack_top: u32,
    pub environment: u32,
    pub end: u32,
}

impl Layout {
    /// Total bytes needed for a program, or None if it does not fit in the
    /// address space
    pub fn required_size(header: &ProgramHeader, stack_size: u32, env_size: u32) -> Option<u32> {
        BASEPAGE_SIZE
            .checked_add(header.text_len)?
            .checked_add(header.data_len)?
            .checked_add(header.bss_len)?
            .checked_add(stack_size)?
            .checked_add(env_size)
    }

    /// Lay out a block at `basepage`. Callers must have checked the total
    /// with `required_size` and that the block fits in memory.
    pub fn new(
        basepage: u32,
        header: &ProgramHeader,
        stack_size: u32,
        env_size: u32,
    ) -> Option<Self> {
        let text_base = basepage.checked_add(BASEPAGE_SIZE)?;
        let data_base = text_base.checked_add(header.text_len)?;
        let bss_base = data_base.checked_add(header.data_len)?;
        let stack_top = bss_base
            .checked_add(header.bss_len)?
            .checked_add(stack_size)?;
        let end = stack_top.checked_add(env_size)?;
        Some(Self {
            basepage,
            text_base,
            data_base,
            bss_base,
            stack_top,
            environment: stack_top,
            end,
        })
    }

    pub fn basepage(&self, header: &ProgramHeader, parent: u32) -> Basepage {
        Basepage {
            low_tpa: self.basepage,
            high_tpa: self.end,
            text_base: self.text_base,
            text_len: header.text_len,
            data_base: self.data_base,
            data_len: header.data_len,
            bss_base: self.bss_base,
            bss_len: header.bss_len,
            dta: self.basepage + COMMAND_LINE_OFFSET,
            parent,
            stack_top: self.stack_top,
            environment: self.environment,
        }
    }
}

pub struct TosLoader;

impl TosLoader {
    /// Everything after the allocation. Any error here leaves the block for
    /// the caller to release.
    fn build(
        channel: &mut Channel,
        ctx: &mut LoadContext,
        header: &ProgramHeader,
        layout: &Layout,
    ) -> Result<(), LoaderError> {
        let parent = ctx.processes.current().unwrap_or(0);
        let basepage = layout.basepage(header, parent);
        basepage.write_to(ctx.memory, layout.basepage)?;

        // bss and stack are contiguous
        ctx.memory
            .fill(layout.bss_base, layout.stack_top - layout.bss_base, 0)?;

        let env = ctx.environment.as_bytes();
        let env_size = (layout.end - layout.environment) as usize;
        ctx.memory.write(layout.environment, &env[..env_size])?;

        let image_len = header.image_len().ok_or(LoaderError::OutOfMemory)?;
        channel.copy_to(ctx.memory, layout.text_base, image_len)?;

        if header.symbol_len > 0 {
            channel.skip(header.symbol_len)?;
        }

        if header.needs_relocation() {
            let image = Image {
                text_base: layout.text_base,
                len: image_len,
            };
            let patched = relocate(channel, ctx.memory, image)?;
            LOGGER.debug(format_args!("applied {} relocations", patched));
        }

        ctx.processes.push(layout.basepage)
    }
}

impl FileLoader for TosLoader {
    fn name(&self) -> &'static str {
        "tos"
    }

    fn load(
        &self,
        channel: &mut Channel,
        _destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        channel.rewind()?;
        let mut bytes = [0u8; HEADER_SIZE];
        channel.read_exact(&mut bytes).map_err(|e| match e {
            LoaderError::CannotRead => LoaderError::BadBinary,
            e => e,
        })?;
        let header = ProgramHeader::parse(&bytes)?;
        LOGGER.trace(format_args!(
            "text {:#x} data {:#x} bss {:#x} symbols {:#x} flags {:?}",
            header.text_len, header.data_len, header.bss_len, header.symbol_len, header.flags,
        ));

        ctx.processes.ensure_capacity()?;

        let stack_size = ctx.config.stack_size;
        let env_size = ctx.environment.size();
        let total = Layout::required_size(&header, stack_size, env_size)
            .ok_or(LoaderError::OutOfMemory)?;
        let owner = ctx.config.process_id;
        let address = ctx
            .heap
            .alloc(owner, ctx.config.memory_tag, total)
            .ok_or(LoaderError::OutOfMemory)?;

        let result = match Layout::new(address, &header, stack_size, env_size) {
            Some(layout) => Self::build(channel, ctx, &header, &layout),
            None => Err(LoaderError::OutOfMemory),
        };
        if let Err(e) = result {
            LOGGER.error(format_args!("load failed ({}), releasing {:#010x}", e, address));
            if let Err(free_error) = ctx.heap.free(owner, address) {
                LOGGER.error(format_args!("could not release {:#010x}: {}", address, free_error));
            }
            return Err(e);
        }

        LOGGER.log(format_args!(
            "basepage at {:#010x}, text at {:#010x}",
            address,
            address + BASEPAGE_SIZE,
        ));
        Ok(Some(ctx.config.bootstrap_address))
    }
}
