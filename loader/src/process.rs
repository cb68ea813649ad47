//! Tracks which TOS programs are running. Programs nest: a parent loads a
//! child, the child runs to completion, and control returns to the parent.
//! The chain is a plain stack of basepage addresses.

use alloc::vec::Vec;

use crate::error::LoaderError;
use crate::heap::Allocator;

/// Receives the exit code of a process that has just terminated, so the
/// kernel can resume its parent
pub trait ExitSignal {
    fn process_exit(&mut self, code: u16);
}

/// Result of a termination
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Termination {
    pub exit_code: u16,
    /// Basepage of the process that ended
    pub terminated: u32,
    /// Basepage of the process that is running again, if any
    pub resumed: Option<u32>,
}

pub struct ProcessManager {
    chain: Vec<u32>,
    max_depth: usize,
}

impl ProcessManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            chain: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Basepage of the running process
    pub fn current(&self) -> Option<u32> {
        self.chain.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Basepages from the outermost program to the running one
    pub fn chain(&self) -> &[u32] {
        &self.chain
    }

    /// Fails if another process could not be started
    pub fn ensure_capacity(&self) -> Result<(), LoaderError> {
        if self.chain.len() >= self.max_depth {
            return Err(LoaderError::OutOfHandles);
        }
        Ok(())
    }

    pub fn push(&mut self, basepage: u32) -> Result<(), LoaderError> {
        self.ensure_capacity()?;
        self.chain.push(basepage);
        Ok(())
    }

    /// End the running process: release its memory block, make its parent
    /// current again, and report the exit code
    pub fn terminate(
        &mut self,
        heap: &mut dyn Allocator,
        owner: u16,
        exit_code: u16,
        signal: &mut dyn ExitSignal,
    ) -> Result<Termination, LoaderError> {
        let terminated = self.current().ok_or(LoaderError::BadHandle)?;
        heap.free(owner, terminated)?;
        self.chain.pop();
        signal.process_exit(exit_code);
        Ok(Termination {
            exit_code,
            terminated,
            resumed: self.current(),
        })
    }
}
