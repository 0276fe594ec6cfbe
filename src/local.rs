//! Local symbol lookup: ordered location search with an identity-stable cache.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::base::{LocationId, SymbolName};
use crate::error::ResolveError;
use crate::flight::FlightTable;
use crate::location::{ArtifactBuilder, RawDefinition, SearchLocation};
use crate::resolver::Upstream;

/// The locally-owned half of a resolver: ordered search locations plus the
/// resolved cache.
///
/// A lookup checks the cache, then searches the locations in configured
/// order (first match wins), then falls back to the shared parent. A local
/// miss is never surfaced to the caller; only a miss across the full parent
/// chain is.
///
/// The cache is monotonic: once a name resolves, every later lookup returns
/// the same `Arc`, even if the underlying location content changes.
pub(crate) struct LocalSource<A> {
    locations: Vec<Arc<dyn SearchLocation>>,
    builder: Arc<dyn ArtifactBuilder<A>>,
    parent: Arc<dyn Upstream<A>>,
    resolved: RwLock<IndexMap<SymbolName, Arc<A>>>,
    flights: FlightTable,
}

impl<A: Send + Sync> LocalSource<A> {
    pub(crate) fn new(
        locations: Vec<Arc<dyn SearchLocation>>,
        builder: Arc<dyn ArtifactBuilder<A>>,
        parent: Arc<dyn Upstream<A>>,
    ) -> Self {
        Self {
            locations,
            builder,
            parent,
            resolved: RwLock::new(IndexMap::new()),
            flights: FlightTable::new(),
        }
    }

    /// Look up `name` locally, falling back to the parent on a miss.
    pub(crate) fn lookup(&self, name: &SymbolName) -> Result<Arc<A>, ResolveError> {
        // Fast path: already resolved.
        if let Some(artifact) = self.resolved.read().get(name) {
            debug!(name = %name, "cache hit");
            return Ok(Arc::clone(artifact));
        }

        // Cold path: at most one lookup per name past this point.
        let _permit = self.flights.enter(name);

        // Another lookup may have resolved the name while we waited.
        if let Some(artifact) = self.resolved.read().get(name) {
            debug!(name = %name, "resolved while waiting");
            return Ok(Arc::clone(artifact));
        }

        match self.search(name) {
            Some((location, raw)) => {
                let artifact = self
                    .builder
                    .construct(name, raw)
                    .map(Arc::new)
                    .map_err(|source| ResolveError::Construction {
                        name: name.clone(),
                        location,
                        source,
                    })?;
                let mut resolved = self.resolved.write();
                let cached = resolved
                    .entry(name.clone())
                    .or_insert_with(|| Arc::clone(&artifact));
                Ok(Arc::clone(cached))
            }
            None => {
                debug!(name = %name, "not found locally, delegating to parent");
                self.parent.resolve(name.as_str())
            }
        }
    }

    /// First-match search over the configured locations.
    fn search(&self, name: &SymbolName) -> Option<(LocationId, RawDefinition)> {
        self.locations
            .iter()
            .enumerate()
            .find_map(|(index, location)| {
                let raw = location.find_definition(name)?;
                debug!(name = %name, location = location.describe(), "definition found");
                Some((LocationId::new(index as u32), raw))
            })
    }

    /// Names resolved locally so far, in resolution order.
    pub(crate) fn resolved_names(&self) -> Vec<SymbolName> {
        self.resolved.read().keys().cloned().collect()
    }

    /// Number of configured search locations.
    pub(crate) fn location_count(&self) -> usize {
        self.locations.len()
    }
}
