#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IoError {
    // No enum value should be backed by a value of 0
    /// An error occurred within the file system
    FileSystemError = 1,
    /// A File or Directory with the given path does not exist
    NotFound,
    /// The channel used for IO is not currently open
    FileHandleInvalid,
    /// The channel used for IO is not the correct type for that operation
    FileHandleWrongType,
    /// An IO operation failed
    OperationFailed,
    /// Attempted a FS method that isn't supported by the driver
    UnsupportedOperation,
    /// Seek would move the cursor outside of the file
    SeekOutOfRange,
    /// Sent an invalid argument to an IO Op
    InvalidArgument,

    Unknown = 0xffffffff,
}

impl TryFrom<u32> for IoError {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Err(()),
            1 => Ok(Self::FileSystemError),
            2 => Ok(Self::NotFound),
            3 => Ok(Self::FileHandleInvalid),
            4 => Ok(Self::FileHandleWrongType),
            5 => Ok(Self::OperationFailed),
            6 => Ok(Self::UnsupportedOperation),
            7 => Ok(Self::SeekOutOfRange),
            8 => Ok(Self::InvalidArgument),
            _ => Ok(Self::Unknown),
        }
    }
}

impl From<IoError> for u32 {
    fn from(error: IoError) -> u32 {
        error as u32
    }
}
