/// Kernel channel number for an open file
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    pub fn new(handle: u32) -> Self {
        Handle(handle)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}
