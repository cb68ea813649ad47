#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekMethod {
    Absolute(u32),
    Relative(i32),
}

impl SeekMethod {
    /// Resolve the new cursor position. Returns None if the result would land
    /// before the start of the file or past the 32-bit range.
    pub fn from_current_position(&self, current: u32) -> Option<u32> {
        match self {
            SeekMethod::Absolute(pos) => Some(*pos),
            SeekMethod::Relative(off) => current.checked_add_signed(*off),
        }
    }

    pub fn encode(&self) -> (u32, u32) {
        match self {
            SeekMethod::Absolute(pos) => (1, *pos),
            SeekMethod::Relative(off) => (2, *off as u32),
        }
    }

    pub fn decode(method: u32, delta: u32) -> Option<Self> {
        match method {
            1 => Some(SeekMethod::Absolute(delta)),
            2 => Some(SeekMethod::Relative(delta as i32)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SeekMethod;

    #[test]
    fn resolve_positions() {
        assert_eq!(SeekMethod::Absolute(40).from_current_position(7), Some(40));
        assert_eq!(SeekMethod::Relative(12).from_current_position(28), Some(40));
        assert_eq!(SeekMethod::Relative(-8).from_current_position(8), Some(0));
        assert_eq!(SeekMethod::Relative(-9).from_current_position(8), None);
        assert_eq!(SeekMethod::Relative(1).from_current_position(u32::MAX), None);
    }

    #[test]
    fn syscall_encoding() {
        let (method, delta) = SeekMethod::Relative(-2).encode();
        assert_eq!(SeekMethod::decode(method, delta), Some(SeekMethod::Relative(-2)));
        let (method, delta) = SeekMethod::Absolute(0x1c).encode();
        assert_eq!(SeekMethod::decode(method, delta), Some(SeekMethod::Absolute(0x1c)));
        assert_eq!(SeekMethod::decode(3, 0), None);
    }
}
