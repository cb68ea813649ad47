use alloc::string::String;
use alloc::vec::Vec;

use foenix_api::io::MAX_TRANSFER;

use crate::channel::{Channel, FileSystem};
use crate::log::TaggedLogger;
use crate::registry::Extension;

const LOGGER: TaggedLogger = TaggedLogger::new("CONFIG");

/// Tunables for the loader subsystem
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    /// Largest single transfer requested from a channel
    pub chunk_size: usize,
    /// Stack reserved above the bss of every TOS process
    pub stack_size: u32,
    /// Number of loader registry slots
    pub max_loaders: usize,
    /// How many TOS programs may be nested at once
    pub max_nesting: usize,
    /// Entry returned for TOS programs; the trampoline at this address reads
    /// the current basepage and jumps into the program's text
    pub bootstrap_address: u32,
    /// Owner id used for process image allocations
    pub process_id: u16,
    /// Memory tag used for process image allocations
    pub memory_tag: u16,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_TRANSFER,
            stack_size: 256,
            max_loaders: 10,
            max_nesting: 8,
            bootstrap_address: 0x0000_1000,
            process_id: 0x601a,
            memory_tag: 1,
        }
    }
}

impl LoaderConfig {
    pub fn from_directives(directives: &[Directive]) -> Self {
        let mut config = Self::default();
        for directive in directives {
            config.apply(directive);
        }
        config
    }

    /// Fold a single directive into the config. Loader directives are
    /// handled by the registry and ignored here.
    pub fn apply(&mut self, directive: &Directive) {
        match directive {
            Directive::Stack(size) => self.stack_size = *size,
            Directive::Chunk(size) => self.chunk_size = (*size).clamp(1, MAX_TRANSFER),
            Directive::Trampoline(address) => self.bootstrap_address = *address,
            Directive::Nesting(depth) => self.max_nesting = *depth,
            Directive::Slots(count) => self.max_loaders = *count,
            Directive::Loader { .. } => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    /// Bind a file extension to a loader by name (raw, pgz, pgx, srec, tos)
    Loader { extension: Extension, kind: String },
    /// Stack size for TOS processes, in bytes
    Stack(u32),
    /// Maximum bytes per channel transfer
    Chunk(usize),
    /// Entry address handed back for TOS programs
    Trampoline(u32),
    /// Maximum depth of nested programs
    Nesting(usize),
    /// Number of loader registry slots
    Slots(usize),
}

/// Read and parse a config file such as `A:\LOADERS.CFG`. Any failure to
/// read it is logged and results in no directives.
pub fn read_config<F: FileSystem>(fs: &mut F, path: &str) -> Vec<Directive> {
    let handle = match fs.open(path) {
        Ok(handle) => handle,
        Err(e) => {
            LOGGER.log(format_args!("Failed to open {}: {:?}", path, e));
            return Vec::new();
        }
    };

    let mut contents = Vec::new();
    let read = {
        let mut channel = Channel::new(fs, handle, 512);
        let mut buf = channel.chunk_buffer();
        loop {
            match channel.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(count) => contents.extend_from_slice(&buf[..count]),
                Err(e) => break Err(e),
            }
        }
    };
    if let Err(e) = fs.close(handle) {
        LOGGER.error(format_args!("Failed to close {}: {:?}", path, e));
    }
    if let Err(e) = read {
        LOGGER.log(format_args!("Failed to read {}: {}", path, e));
        return Vec::new();
    }

    let text = match core::str::from_utf8(&contents) {
        Ok(s) => s,
        Err(_) => {
            LOGGER.log(format_args!("{} contains invalid UTF-8", path));
            return Vec::new();
        }
    };

    parse_config(text)
}

pub fn parse_config(text: &str) -> Vec<Directive> {
    let mut directives = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "loader" => {
                if parts.len() < 3 {
                    LOGGER.log(format_args!("Config: 'loader' missing args: {}", line));
                    continue;
                }
                let extension = Extension::new(parts[1]);
                if extension.is_empty() {
                    LOGGER.log(format_args!("Config: empty extension: {}", line));
                    continue;
                }
                directives.push(Directive::Loader {
                    extension,
                    kind: parts[2].to_ascii_lowercase(),
                });
            }
            "stack" => match parts.get(1).and_then(|s| parse_number(s)) {
                Some(size) => directives.push(Directive::Stack(size)),
                None => LOGGER.log(format_args!("Config: invalid stack size: {}", line)),
            },
            "chunk" => match parts.get(1).and_then(|s| parse_number(s)) {
                Some(size) if size > 0 => directives.push(Directive::Chunk(size as usize)),
                _ => LOGGER.log(format_args!("Config: invalid chunk size: {}", line)),
            },
            "trampoline" => match parts.get(1).and_then(|s| parse_hex(s)) {
                Some(address) => directives.push(Directive::Trampoline(address)),
                None => LOGGER.log(format_args!("Config: invalid address: {}", line)),
            },
            "nesting" => match parts.get(1).and_then(|s| parse_number(s)) {
                Some(depth) if depth > 0 => directives.push(Directive::Nesting(depth as usize)),
                _ => LOGGER.log(format_args!("Config: invalid nesting depth: {}", line)),
            },
            "slots" => match parts.get(1).and_then(|s| parse_number(s)) {
                Some(count) if count > 0 => directives.push(Directive::Slots(count as usize)),
                _ => LOGGER.log(format_args!("Config: invalid slot count: {}", line)),
            },
            _ => {
                LOGGER.log(format_args!("Config: unknown directive: {}", line));
            }
        }
    }

    directives
}

/// Decimal, or hex with a 0x prefix
fn parse_number(s: &str) -> Option<u32> {
    if s.starts_with("0x") || s.starts_with("0X") {
        parse_hex(s)
    } else {
        s.parse().ok()
    }
}

/// Hex with or without a 0x prefix
fn parse_hex(s: &str) -> Option<u32> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}
