pub mod cursor;
pub mod error;
pub mod handle;

pub use cursor::SeekMethod;
pub use error::IoError;
pub use handle::Handle;

/// Largest byte count a single channel transfer can move. Transfer sizes
/// cross the syscall boundary as a signed 16-bit value.
pub const MAX_TRANSFER: usize = i16::MAX as usize;
