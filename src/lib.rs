//! # symres
//!
//! Hierarchical symbol resolution with parent delegation and
//! identity-stable caching.
//!
//! A [`Resolver`] owns an ordered list of search locations and a cache of
//! everything it has resolved locally; anything absent locally (or
//! explicitly excluded) is delegated to its parent resolver. Resolvers
//! compose into linear chains of arbitrary depth.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! resolver  → exclusion policy, delegation, bulk preload
//!   ↓
//! local     → ordered location search + resolved cache
//!   ↓
//! flight    → per-name single-flight coordination
//!   ↓
//! location  → search-location and construction seams
//!   ↓
//! base      → primitives (SymbolName, LocationId)
//! ```
//!
//! A name that resolves locally constructs its artifact at most once, even
//! under concurrent lookups; repeated lookups return the identical `Arc`.
//! Lookups of different names never block each other.

/// Foundation types: SymbolName, LocationId
pub mod base;

/// Error types
pub mod error;

/// Per-name single-flight coordination
mod flight;

/// Local lookup worker: location search + resolved cache
mod local;

/// Search locations and the artifact construction seam
pub mod location;

/// Public-facing resolver and the upstream capability
pub mod resolver;

// Re-export the working surface
pub use base::{LocationId, SymbolName};
pub use error::{BoxedError, ResolveError};
#[cfg(feature = "archive")]
pub use location::ArchiveLocation;
pub use location::{ArtifactBuilder, DirLocation, MemoryLocation, RawDefinition, SearchLocation};
pub use resolver::{NoUpstream, Resolver, Upstream};
