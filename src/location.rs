//! Search locations and the artifact construction seam.
//!
//! A resolver consults an ordered list of [`SearchLocation`]s for raw
//! definitions and hands a match to an [`ArtifactBuilder`]. Both sides are
//! opaque to the resolver core: locations yield bytes, builders turn bytes
//! into artifacts.
//!
//! Provided locations:
//! - [`MemoryLocation`] - name → bytes table, for embedding environments
//!   and tests
//! - [`DirLocation`] - maps dotted names to files under a root directory
//! - `ArchiveLocation` - same mapping inside a zip archive (feature
//!   `archive`)

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::base::SymbolName;
use crate::error::BoxedError;

// ============================================================================
// RAW DEFINITIONS
// ============================================================================

/// Raw definition bytes yielded by a search location.
///
/// The resolver never interprets the bytes; they are handed to the
/// [`ArtifactBuilder`] unchanged.
#[derive(Clone)]
pub struct RawDefinition {
    bytes: Arc<[u8]>,
}

impl RawDefinition {
    /// Wrap definition bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The definition bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the definition.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the definition is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RawDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDefinition")
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ============================================================================
// COLLABORATOR SEAMS
// ============================================================================

/// An ordered source of raw symbol definitions.
///
/// Locations are consulted in configured order; the first one that yields a
/// definition wins. A location that cannot read its backing store reports
/// absence rather than an error.
pub trait SearchLocation: Send + Sync {
    /// Human-readable identity for diagnostics.
    fn describe(&self) -> &str;

    /// Return the raw definition for `name`, or `None` if this location
    /// does not define it.
    fn find_definition(&self, name: &SymbolName) -> Option<RawDefinition>;
}

/// Turns a raw definition into a resolved artifact.
///
/// A failure here is a construction error: it is surfaced to the caller
/// immediately and never treated as absence.
pub trait ArtifactBuilder<A>: Send + Sync {
    /// Construct the artifact for `name` from its raw definition.
    fn construct(&self, name: &SymbolName, raw: RawDefinition) -> Result<A, BoxedError>;
}

// ============================================================================
// PROVIDED LOCATIONS
// ============================================================================

/// In-memory search location: a name → bytes table in insertion order.
pub struct MemoryLocation {
    label: String,
    defs: IndexMap<SymbolName, RawDefinition>,
}

impl MemoryLocation {
    /// Create an empty location with a diagnostic label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            defs: IndexMap::new(),
        }
    }

    /// Add or replace the definition for `name`.
    pub fn insert(&mut self, name: SymbolName, def: RawDefinition) {
        self.defs.insert(name, def);
    }

    /// Number of definitions held.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if the location holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl fmt::Debug for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLocation")
            .field("label", &self.label)
            .field("defs", &self.defs.len())
            .finish()
    }
}

impl SearchLocation for MemoryLocation {
    fn describe(&self) -> &str {
        &self.label
    }

    fn find_definition(&self, name: &SymbolName) -> Option<RawDefinition> {
        self.defs.get(name).cloned()
    }
}

/// Directory-backed search location.
///
/// `a.b.C` maps to `<root>/a/b/C.<extension>`. A name whose segments are
/// empty or contain path separators is treated as absent.
#[derive(Debug)]
pub struct DirLocation {
    root: PathBuf,
    extension: String,
    label: String,
}

impl DirLocation {
    /// Create a location over `root` looking for files with `extension`.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let root = root.into();
        let label = format!("dir:{}", root.display());
        Self {
            root,
            extension: extension.into(),
            label,
        }
    }

    fn path_for(&self, name: &SymbolName) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in name.segments() {
            if segment.is_empty() || segment.contains(['/', '\\']) {
                return None;
            }
            path.push(segment);
        }
        path.set_extension(&self.extension);
        Some(path)
    }
}

impl SearchLocation for DirLocation {
    fn describe(&self) -> &str {
        &self.label
    }

    fn find_definition(&self, name: &SymbolName) -> Option<RawDefinition> {
        let path = self.path_for(name)?;
        let bytes = std::fs::read(&path).ok()?;
        Some(RawDefinition::new(bytes))
    }
}

/// Archive-backed search location (zip).
///
/// `a.b.C` maps to the entry `a/b/C.<extension>`. The archive handle is
/// behind a mutex; zip reads require exclusive access.
#[cfg(feature = "archive")]
pub struct ArchiveLocation {
    label: String,
    extension: String,
    archive: parking_lot::Mutex<zip::ZipArchive<std::fs::File>>,
}

#[cfg(feature = "archive")]
impl ArchiveLocation {
    /// Open an archive on disk.
    pub fn open(
        path: impl AsRef<std::path::Path>,
        extension: impl Into<String>,
    ) -> Result<Self, crate::error::ResolveError> {
        use crate::error::ResolveError;

        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            ResolveError::InvalidArgument(format!("cannot open archive {}: {e}", path.display()))
        })?;
        let archive = zip::ZipArchive::new(file).map_err(|e| {
            ResolveError::InvalidArgument(format!("cannot read archive {}: {e}", path.display()))
        })?;
        Ok(Self {
            label: format!("archive:{}", path.display()),
            extension: extension.into(),
            archive: parking_lot::Mutex::new(archive),
        })
    }

    fn entry_for(&self, name: &SymbolName) -> Option<String> {
        let mut entry = String::new();
        for segment in name.segments() {
            if segment.is_empty() || segment.contains(['/', '\\']) {
                return None;
            }
            if !entry.is_empty() {
                entry.push('/');
            }
            entry.push_str(segment);
        }
        entry.push('.');
        entry.push_str(&self.extension);
        Some(entry)
    }
}

#[cfg(feature = "archive")]
impl fmt::Debug for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveLocation")
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(feature = "archive")]
impl SearchLocation for ArchiveLocation {
    fn describe(&self) -> &str {
        &self.label
    }

    fn find_definition(&self, name: &SymbolName) -> Option<RawDefinition> {
        use std::io::Read;

        let entry = self.entry_for(name)?;
        let mut archive = self.archive.lock();
        let mut file = archive.by_name(&entry).ok()?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes).ok()?;
        Some(RawDefinition::new(bytes))
    }
}
