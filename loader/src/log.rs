use core::fmt;

/// Logger that prefixes every line with a short subsystem tag. Output goes
/// through the `log` facade; the kernel (or a host test) decides where it
/// lands by installing a logger.
pub struct TaggedLogger {
    tag: &'static str,
}

impl TaggedLogger {
    pub const fn new(tag: &'static str) -> Self {
        TaggedLogger { tag }
    }

    pub fn log(&self, args: fmt::Arguments) {
        ::log::info!(target: self.tag, "{}: {}", self.tag, args);
    }

    pub fn debug(&self, args: fmt::Arguments) {
        ::log::debug!(target: self.tag, "{}: {}", self.tag, args);
    }

    pub fn trace(&self, args: fmt::Arguments) {
        ::log::trace!(target: self.tag, "{}: {}", self.tag, args);
    }

    pub fn error(&self, args: fmt::Arguments) {
        ::log::error!(target: self.tag, "{}: {}", self.tag, args);
    }
}
