//! The exec module turns a path into a loaded program:
//! 1. Pick a loader from the file's extension, falling back to a raw copy
//!    when the caller supplied a destination
//! 2. Open the file and hand it to the loader through a bounded channel
//! 3. Close the file, whatever the loader's outcome
//!
//! It also owns the state shared between loads: the extension registry and
//! the chain of running TOS programs.

use alloc::vec::Vec;

use spin::mutex::Mutex;
use spin::rwlock::RwLock;

use crate::channel::{Channel, FileSystem};
use crate::config::{Directive, LoaderConfig};
use crate::context::LoadContext;
use crate::environment::Environment;
use crate::error::LoaderError;
use crate::heap::Allocator;
use crate::log::TaggedLogger;
use crate::memory::AddressSpace;
use crate::process::{ExitSignal, ProcessManager, Termination};
use crate::registry::{Extension, LoaderKind, LoaderRegistry};

const LOGGER: TaggedLogger = TaggedLogger::new("EXEC");

/// Characters that end a directory or drive component of a path
const PATH_SEPARATORS: [char; 3] = ['\\', '/', ':'];

/// Extension of the last component of `path`, if it has one
pub fn extension_of(path: &str) -> Option<Extension> {
    let name = path.rsplit(&PATH_SEPARATORS[..]).next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    let ext = Extension::new(ext);
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

pub struct ExecManager {
    registry: RwLock<LoaderRegistry>,
    processes: Mutex<ProcessManager>,
    environment: RwLock<Environment>,
    config: LoaderConfig,
}

impl ExecManager {
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        let registry = LoaderRegistry::with_builtin_loaders(config.max_loaders)?;
        Ok(Self {
            registry: RwLock::new(registry),
            processes: Mutex::new(ProcessManager::new(config.max_nesting)),
            environment: RwLock::new(Environment::empty()),
            config,
        })
    }

    /// Build a manager from parsed config directives. Loader bindings are
    /// applied on top of the built-in ones; bindings naming an unknown loader
    /// are logged and skipped.
    pub fn from_config(directives: &[Directive]) -> Result<Self, LoaderError> {
        let manager = Self::new(LoaderConfig::from_directives(directives))?;
        for directive in directives {
            if let Directive::Loader { extension, kind } = directive {
                match LoaderKind::from_name(kind) {
                    Some(kind) => manager.registry.write().register(*extension, kind)?,
                    None => {
                        LOGGER.log(format_args!("Unknown loader '{}' for {}", kind, extension));
                    }
                }
            }
        }
        Ok(manager)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Environment copied into every TOS program loaded from now on
    pub fn set_environment(&self, environment: Environment) {
        *self.environment.write() = environment;
    }

    pub fn register_loader(&self, extension: &str, kind: LoaderKind) -> Result<(), LoaderError> {
        let extension = Extension::new(extension);
        self.registry.write().register(extension, kind)?;
        LOGGER.debug(format_args!("{} files use the {} loader", extension, kind.name()));
        Ok(())
    }

    pub fn unregister_loader(&self, extension: &str) -> Option<LoaderKind> {
        self.registry.write().unregister(Extension::new(extension))
    }

    /// Pick the loader for a path. Files with no registered extension can
    /// only be copied verbatim, which needs a destination.
    pub fn resolve(&self, path: &str, destination: u32) -> Result<LoaderKind, LoaderError> {
        let registered = extension_of(path).and_then(|ext| self.registry.read().lookup(ext));
        match registered {
            Some(kind) => Ok(kind),
            None if destination != 0 => Ok(LoaderKind::Raw),
            None => Err(LoaderError::BadExtension),
        }
    }

    /// Load the file at `path`, returning its entry point if it is a program.
    /// A loader reporting an entry at address 0 yields None.
    pub fn load<F: FileSystem>(
        &self,
        fs: &mut F,
        memory: &mut dyn AddressSpace,
        heap: &mut dyn Allocator,
        path: &str,
        destination: u32,
    ) -> Result<Option<u32>, LoaderError> {
        let kind = self.resolve(path, destination).map_err(|e| {
            LOGGER.log(format_args!("No loader for {}", path));
            e
        })?;
        LOGGER.debug(format_args!("Loading {} with the {} loader", path, kind.name()));

        let handle = fs.open(path).map_err(|e| {
            LOGGER.log(format_args!("Failed to open {}: {:?}", path, e));
            LoaderError::from(e)
        })?;

        let result = {
            let environment = self.environment.read();
            let mut processes = self.processes.lock();
            let mut ctx = LoadContext {
                memory,
                heap,
                processes: &mut processes,
                environment: &environment,
                config: &self.config,
            };
            let mut channel = Channel::new(fs, handle, self.config.chunk_size);
            // address 0 is never executable
            kind.load(&mut channel, destination, &mut ctx)
                .map(|entry| entry.filter(|address| *address != 0))
        };

        if let Err(e) = fs.close(handle) {
            LOGGER.error(format_args!("Failed to close {}: {:?}", path, e));
        }

        match result {
            Ok(Some(entry)) => {
                LOGGER.log(format_args!("Loaded {}, entry {:#010x}", path, entry));
            }
            Ok(None) => {
                LOGGER.log(format_args!("Loaded {}", path));
            }
            Err(e) => {
                LOGGER.error(format_args!("Failed to load {}: {} ({})", path, e, e.code()));
            }
        }
        result
    }

    /// End the running TOS program and resume its parent
    pub fn terminate(
        &self,
        heap: &mut dyn Allocator,
        exit_code: u16,
        signal: &mut dyn ExitSignal,
    ) -> Result<Termination, LoaderError> {
        let termination =
            self.processes
                .lock()
                .terminate(heap, self.config.process_id, exit_code, signal)?;
        LOGGER.log(format_args!(
            "Process {:#010x} exited with {}",
            termination.terminated, termination.exit_code,
        ));
        Ok(termination)
    }

    /// Basepage of the running TOS program
    pub fn current_process(&self) -> Option<u32> {
        self.processes.lock().current()
    }

    pub fn process_depth(&self) -> usize {
        self.processes.lock().depth()
    }

    pub fn loaders(&self) -> Vec<(Extension, LoaderKind)> {
        self.registry.read().iter().collect()
    }
}
