use core::fmt;

use foenix_api::io::IoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderError {
    /// File contents do not match the format the loader expects
    BadBinary,
    /// The allocator could not satisfy the process image
    OutOfMemory,
    /// The file ended before a required field or segment was read
    CannotRead,
    /// No loader could be picked for the path
    BadExtension,
    /// A fixed-capacity table (loaders, running processes) is full
    OutOfHandles,
    /// A handle or memory block does not refer to anything live
    BadHandle,
    /// A computed destination falls outside the memory it targets
    SegmentOutOfBounds,
    /// Error reported by the underlying channel, passed through unchanged
    Io(IoError),
}

impl LoaderError {
    /// Negative status code returned across the syscall boundary
    pub fn code(&self) -> i16 {
        match self {
            Self::BadHandle => -2,
            Self::OutOfHandles => -3,
            Self::OutOfMemory => -4,
            Self::BadBinary => -5,
            Self::BadExtension => -6,
            Self::SegmentOutOfBounds => -7,
            Self::CannotRead => -21,
            Self::Io(e) => -32 - (u32::from(*e) & 0x1f) as i16,
        }
    }
}

impl From<IoError> for LoaderError {
    fn from(error: IoError) -> Self {
        Self::Io(error)
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadBinary => f.write_str("unrecognized binary format"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::CannotRead => f.write_str("unexpected end of file"),
            Self::BadExtension => f.write_str("no loader for file extension"),
            Self::OutOfHandles => f.write_str("out of handles"),
            Self::BadHandle => f.write_str("invalid handle"),
            Self::SegmentOutOfBounds => f.write_str("segment out of bounds"),
            Self::Io(e) => write!(f, "i/o error {:?}", e),
        }
    }
}
