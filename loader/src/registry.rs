//! Table mapping file extensions to the loader that understands them.

use alloc::vec::Vec;
use core::fmt;

use crate::channel::Channel;
use crate::context::LoadContext;
use crate::error::LoaderError;
use crate::pgx::PgxLoader;
use crate::pgz::PgzLoader;
use crate::raw::RawLoader;
use crate::srec::SrecLoader;
use crate::tos::TosLoader;

/// Longest extension the registry distinguishes
pub const MAX_EXTENSION: usize = 4;

/// A file extension, upper-cased and truncated to `MAX_EXTENSION` bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extension {
    bytes: [u8; MAX_EXTENSION],
    len: u8,
}

impl Extension {
    /// Normalise an extension. A leading `.` is dropped, and non-ASCII bytes
    /// are replaced so the result is always valid ASCII.
    pub fn new(ext: &str) -> Self {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        let mut bytes = [0u8; MAX_EXTENSION];
        let mut len = 0;
        for b in ext.bytes().take(MAX_EXTENSION) {
            bytes[len] = if b.is_ascii() { b.to_ascii_uppercase() } else { b'_' };
            len += 1;
        }
        Self {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({:?})", self.as_str())
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routine that can bring one kind of executable into memory.
///
/// `destination` is only meaningful to formats that carry no addresses of
/// their own. Returns the entry point, or None if the file was loaded but is
/// not something that can be run.
pub trait FileLoader: Sync {
    fn name(&self) -> &'static str;

    fn load(
        &self,
        channel: &mut Channel,
        destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError>;
}

#[derive(Clone, Copy)]
pub enum LoaderKind {
    Raw,
    Pgz,
    Pgx,
    Srec,
    Tos,
    Custom(&'static dyn FileLoader),
}

impl LoaderKind {
    /// Look up a built-in loader by the name used in config files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "raw" => Some(Self::Raw),
            "pgz" => Some(Self::Pgz),
            "pgx" => Some(Self::Pgx),
            "srec" => Some(Self::Srec),
            "tos" | "prg" => Some(Self::Tos),
            _ => None,
        }
    }

    pub fn loader(&self) -> &'static dyn FileLoader {
        match self {
            Self::Raw => &RawLoader,
            Self::Pgz => &PgzLoader,
            Self::Pgx => &PgxLoader,
            Self::Srec => &SrecLoader,
            Self::Tos => &TosLoader,
            Self::Custom(loader) => *loader,
        }
    }

    pub fn name(&self) -> &'static str {
        self.loader().name()
    }

    pub fn load(
        &self,
        channel: &mut Channel,
        destination: u32,
        ctx: &mut LoadContext,
    ) -> Result<Option<u32>, LoaderError> {
        self.loader().load(channel, destination, ctx)
    }
}

impl PartialEq for LoaderKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Raw, Self::Raw)
            | (Self::Pgz, Self::Pgz)
            | (Self::Pgx, Self::Pgx)
            | (Self::Srec, Self::Srec)
            | (Self::Tos, Self::Tos) => true,
            (Self::Custom(a), Self::Custom(b)) => core::ptr::addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Debug for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("Raw"),
            Self::Pgz => f.write_str("Pgz"),
            Self::Pgx => f.write_str("Pgx"),
            Self::Srec => f.write_str("Srec"),
            Self::Tos => f.write_str("Tos"),
            Self::Custom(loader) => write!(f, "Custom({})", loader.name()),
        }
    }
}

const BUILTIN_LOADERS: [(&str, LoaderKind); 8] = [
    ("PGZ", LoaderKind::Pgz),
    ("PGX", LoaderKind::Pgx),
    ("TOS", LoaderKind::Tos),
    ("PRG", LoaderKind::Tos),
    ("SREC", LoaderKind::Srec),
    ("S19", LoaderKind::Srec),
    ("S28", LoaderKind::Srec),
    ("S37", LoaderKind::Srec),
];

/// Fixed-capacity extension table
pub struct LoaderRegistry {
    slots: Vec<Option<(Extension, LoaderKind)>>,
}

impl LoaderRegistry {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize(capacity, None);
        Self { slots }
    }

    /// A registry with every format this crate understands registered
    pub fn with_builtin_loaders(capacity: usize) -> Result<Self, LoaderError> {
        let mut registry = Self::new(capacity);
        for (ext, kind) in BUILTIN_LOADERS {
            registry.register(Extension::new(ext), kind)?;
        }
        Ok(registry)
    }

    /// Bind `extension` to `kind`. Re-registering an extension replaces the
    /// previous binding in its existing slot.
    pub fn register(&mut self, extension: Extension, kind: LoaderKind) -> Result<(), LoaderError> {
        if extension.is_empty() {
            return Err(LoaderError::BadExtension);
        }
        let existing = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Some((ext, _)) if *ext == extension));
        let index = match existing {
            Some(index) => index,
            None => self
                .slots
                .iter()
                .position(|slot| slot.is_none())
                .ok_or(LoaderError::OutOfHandles)?,
        };
        self.slots[index] = Some((extension, kind));
        Ok(())
    }

    /// Remove a binding, returning the loader it pointed to
    pub fn unregister(&mut self, extension: Extension) -> Option<LoaderKind> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some((ext, _)) if *ext == extension))?;
        slot.take().map(|(_, kind)| kind)
    }

    pub fn lookup(&self, extension: Extension) -> Option<LoaderKind> {
        self.iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, kind)| kind)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Extension, LoaderKind)> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::{Extension, FileLoader, LoaderKind, LoaderRegistry};
    use crate::channel::Channel;
    use crate::context::LoadContext;
    use crate::error::LoaderError;

    struct Nothing;

    impl FileLoader for Nothing {
        fn name(&self) -> &'static str {
            "nothing"
        }

        fn load(
            &self,
            _channel: &mut Channel,
            _destination: u32,
            _ctx: &mut LoadContext,
        ) -> Result<Option<u32>, LoaderError> {
            Ok(None)
        }
    }

    static NOTHING: Nothing = Nothing;

    #[test]
    fn extensions_are_normalised() {
        assert_eq!(Extension::new("prg").as_str(), "PRG");
        assert_eq!(Extension::new(".pgz").as_str(), "PGZ");
        assert_eq!(Extension::new("srecord").as_str(), "SREC");
        assert_eq!(Extension::new("Prg"), Extension::new("PRG"));
        assert!(Extension::new("").is_empty());
        assert_eq!(Extension::new("é").as_str(), "__");
    }

    #[test]
    fn builtins() {
        let registry = LoaderRegistry::with_builtin_loaders(10).unwrap();
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.lookup(Extension::new("tos")), Some(LoaderKind::Tos));
        assert_eq!(registry.lookup(Extension::new("PRG")), Some(LoaderKind::Tos));
        assert_eq!(registry.lookup(Extension::new("s28")), Some(LoaderKind::Srec));
        assert_eq!(registry.lookup(Extension::new("pgz")), Some(LoaderKind::Pgz));
        assert_eq!(registry.lookup(Extension::new("BIN")), None);

        assert!(matches!(
            LoaderRegistry::with_builtin_loaders(4),
            Err(LoaderError::OutOfHandles),
        ));
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = LoaderRegistry::new(2);
        registry.register(Extension::new("BIN"), LoaderKind::Raw).unwrap();
        registry
            .register(Extension::new("bin"), LoaderKind::Custom(&NOTHING))
            .unwrap();
        assert_eq!(registry.len(), 1);
        let kind = registry.lookup(Extension::new("BIN")).unwrap();
        assert_eq!(kind, LoaderKind::Custom(&NOTHING));
        assert_eq!(kind.name(), "nothing");
    }

    #[test]
    fn overflow_keeps_prior_registrations() {
        let mut registry = LoaderRegistry::new(2);
        registry.register(Extension::new("A"), LoaderKind::Raw).unwrap();
        registry.register(Extension::new("B"), LoaderKind::Pgz).unwrap();
        assert_eq!(
            registry.register(Extension::new("C"), LoaderKind::Pgx),
            Err(LoaderError::OutOfHandles),
        );
        assert_eq!(registry.lookup(Extension::new("A")), Some(LoaderKind::Raw));
        assert_eq!(registry.lookup(Extension::new("B")), Some(LoaderKind::Pgz));
        assert_eq!(registry.lookup(Extension::new("C")), None);
    }

    #[test]
    fn unregister_frees_slot() {
        let mut registry = LoaderRegistry::new(1);
        registry.register(Extension::new("A"), LoaderKind::Raw).unwrap();
        assert_eq!(registry.unregister(Extension::new("a")), Some(LoaderKind::Raw));
        assert_eq!(registry.unregister(Extension::new("a")), None);
        registry.register(Extension::new("B"), LoaderKind::Pgz).unwrap();
        assert_eq!(registry.capacity(), 1);
    }

    #[test]
    fn empty_extension_rejected() {
        let mut registry = LoaderRegistry::new(4);
        assert_eq!(
            registry.register(Extension::new("."), LoaderKind::Raw),
            Err(LoaderError::BadExtension),
        );
    }

    #[test]
    fn kinds_by_name() {
        assert_eq!(LoaderKind::from_name("SREC"), Some(LoaderKind::Srec));
        assert_eq!(LoaderKind::from_name("prg"), Some(LoaderKind::Tos));
        assert_eq!(LoaderKind::from_name("elf"), None);
    }
}
