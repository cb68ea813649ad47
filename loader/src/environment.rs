//! Environment blocks handed to TOS programs.
//!
//! A block is a run of NUL-terminated `NAME=VALUE` strings closed by an empty
//! string. Programs find the end by scanning 16-bit words for a zero word, so
//! the block is always padded to an even length.

use alloc::vec::Vec;

pub const EMPTY_ENVIRONMENT: [u8; 2] = [0, 0];

/// Size in bytes of the environment block at the start of `env`, including
/// the terminating zero word. None if no terminator is found.
pub fn environment_size(env: &[u8]) -> Option<u32> {
    env.chunks_exact(2)
        .position(|word| word == [0, 0])
        .map(|index| (index as u32 + 1) * 2)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    bytes: Vec<u8>,
}

impl Environment {
    pub fn empty() -> Self {
        Self {
            bytes: Vec::from(EMPTY_ENVIRONMENT),
        }
    }

    /// Build a block from individual strings. Empty strings would end the
    /// block early and are left out, as is anything after an embedded NUL.
    pub fn from_vars<'a, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bytes = Vec::new();
        for var in vars {
            let var = var.split('\0').next().unwrap_or("");
            if var.is_empty() {
                continue;
            }
            bytes.extend_from_slice(var.as_bytes());
            bytes.push(0);
        }
        bytes.push(0);
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the block as a program scanning it would measure it
    pub fn size(&self) -> u32 {
        environment_size(&self.bytes).unwrap_or(self.bytes.len() as u32)
    }

    /// Iterate over the individual strings in the block
    pub fn vars(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.split(|b| *b == 0).take_while(|s| !s.is_empty())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::empty()
    }
}
