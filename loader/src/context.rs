use crate::config::LoaderConfig;
use crate::environment::Environment;
use crate::heap::Allocator;
use crate::memory::AddressSpace;
use crate::process::ProcessManager;

/// Everything a loader may touch besides the file it is reading
pub struct LoadContext<'a> {
    pub memory: &'a mut dyn AddressSpace,
    pub heap: &'a mut dyn Allocator,
    pub processes: &'a mut ProcessManager,
    pub environment: &'a Environment,
    pub config: &'a LoaderConfig,
}
