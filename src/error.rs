//! Error types for symbol resolution.

use thiserror::Error;

use crate::base::{LocationId, SymbolName};

/// Boxed error produced by an artifact construction capability.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Resolution error type.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Bad input to a construction or mutation call. Fatal to the call,
    /// never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The name is absent from every tried local location and the full
    /// parent chain. Recoverable by the caller.
    #[error("symbol not found: {0}")]
    NotFound(SymbolName),

    /// A definition was found but could not be turned into an artifact.
    /// Surfaced immediately; later locations and the parent are not tried.
    #[error("cannot construct `{name}` from definition at {location}")]
    Construction {
        /// The name whose definition failed to construct.
        name: SymbolName,
        /// The search location that committed to the match.
        location: LocationId,
        /// The underlying construction failure.
        #[source]
        source: BoxedError,
    },
}

impl ResolveError {
    /// Check if this is a not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a construction failure.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }
}
