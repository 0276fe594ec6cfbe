//! Public-facing resolver: exclusion policy, delegation, caching discipline.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::debug;

use crate::base::SymbolName;
use crate::error::ResolveError;
use crate::local::LocalSource;
use crate::location::{ArtifactBuilder, SearchLocation};

// ============================================================================
// UPSTREAM CAPABILITY
// ============================================================================

/// Upstream resolution capability.
///
/// Anything a [`Resolver`] can delegate to: another resolver, a bridge into
/// the embedding environment, or [`NoUpstream`] at the root of a chain. The
/// handle is shared and non-owning; several resolvers may delegate to the
/// same upstream.
pub trait Upstream<A>: Send + Sync {
    /// Resolve `name`, returning the identity-stable artifact or an error.
    fn resolve(&self, name: &str) -> Result<Arc<A>, ResolveError>;
}

/// Terminal upstream for the root of a chain: every name is absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUpstream;

impl<A> Upstream<A> for NoUpstream {
    fn resolve(&self, name: &str) -> Result<Arc<A>, ResolveError> {
        Err(ResolveError::NotFound(SymbolName::new(name)?))
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// A hierarchical symbol resolver.
///
/// Each resolver owns an ordered list of search locations and a cache of
/// everything it has resolved locally; anything it cannot (or is told not
/// to) resolve is delegated to its parent. A resolver is itself an
/// [`Upstream`], so linear chains of arbitrary depth compose.
///
/// Lookup order for [`resolve`](Self::resolve), first match wins:
/// 1. names registered with [`add_exclusion`](Self::add_exclusion) go to the
///    parent without any local attempt and are never cached locally;
/// 2. the local resolved cache;
/// 3. the local search locations, in configured order;
/// 4. the parent.
///
/// A name that resolves locally is constructed at most once, even under
/// concurrent lookups; every call returns the identical `Arc`.
pub struct Resolver<A> {
    /// Forced-delegation names, in insertion order. Append-only.
    exclusions: RwLock<IndexSet<SymbolName>>,
    parent: Arc<dyn Upstream<A>>,
    local: LocalSource<A>,
}

impl<A: Send + Sync> fmt::Debug for Resolver<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("exclusions", &self.exclusions)
            .field("location_count", &self.local.location_count())
            .finish_non_exhaustive()
    }
}

impl<A: Send + Sync> Resolver<A> {
    /// Create a resolver over `locations` (searched in order), constructing
    /// artifacts with `builder` and delegating to `parent` whatever the
    /// locations cannot satisfy.
    ///
    /// Fails with `InvalidArgument` if `locations` is empty.
    pub fn new(
        locations: Vec<Arc<dyn SearchLocation>>,
        builder: Arc<dyn ArtifactBuilder<A>>,
        parent: Arc<dyn Upstream<A>>,
    ) -> Result<Self, ResolveError> {
        if locations.is_empty() {
            return Err(ResolveError::InvalidArgument(
                "search location list cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            exclusions: RwLock::new(IndexSet::new()),
            parent: Arc::clone(&parent),
            local: LocalSource::new(locations, builder, parent),
        })
    }

    /// Resolve a qualified name to its artifact.
    pub fn resolve(&self, name: &str) -> Result<Arc<A>, ResolveError> {
        let name = SymbolName::new(name)?;
        debug!(name = %name, "resolving");

        if self.exclusions.read().contains(&name) {
            debug!(name = %name, "excluded, delegating to parent");
            return self.parent.resolve(name.as_str());
        }

        match self.local.lookup(&name) {
            Err(ResolveError::NotFound(_)) => {
                debug!(name = %name, "lookup failed, delegating to parent");
                self.parent.resolve(name.as_str())
            }
            other => other,
        }
    }

    /// Force all lookups of `name` to delegate to the parent, skipping the
    /// local locations entirely.
    ///
    /// Idempotent; fails with `InvalidArgument` on an empty name.
    pub fn add_exclusion(&self, name: &str) -> Result<(), ResolveError> {
        let name = SymbolName::new(name)?;
        if self.exclusions.write().insert(name.clone()) {
            debug!(name = %name, "exclusion added");
        }
        Ok(())
    }

    /// The excluded names, in the order they were added.
    pub fn exclusions(&self) -> Vec<SymbolName> {
        self.exclusions.read().iter().cloned().collect()
    }

    /// Names resolved locally so far, in resolution order.
    pub fn resolved_names(&self) -> Vec<SymbolName> {
        self.local.resolved_names()
    }

    /// Number of configured search locations.
    pub fn location_count(&self) -> usize {
        self.local.location_count()
    }

    /// Resolve a batch of names in parallel.
    ///
    /// Every name goes through the same policy as [`resolve`](Self::resolve),
    /// and the at-most-once construction guarantee holds across the batch
    /// and any concurrent callers. Results are returned in input order.
    pub fn preload<S>(&self, names: &[S]) -> Vec<(String, Result<Arc<A>, ResolveError>)>
    where
        S: AsRef<str> + Sync,
    {
        names
            .par_iter()
            .map(|name| (name.as_ref().to_string(), self.resolve(name.as_ref())))
            .collect()
    }
}

impl<A: Send + Sync> Upstream<A> for Resolver<A> {
    fn resolve(&self, name: &str) -> Result<Arc<A>, ResolveError> {
        Resolver::resolve(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{MemoryLocation, RawDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Artifact {
        text: String,
    }

    struct TextBuilder;

    impl ArtifactBuilder<Artifact> for TextBuilder {
        fn construct(
            &self,
            _name: &SymbolName,
            raw: RawDefinition,
        ) -> Result<Artifact, crate::error::BoxedError> {
            Ok(Artifact {
                text: std::str::from_utf8(raw.bytes())?.to_string(),
            })
        }
    }

    /// Location wrapper that counts queries, for asserting a location was
    /// never consulted.
    struct Probed {
        inner: MemoryLocation,
        queries: Arc<AtomicUsize>,
    }

    impl SearchLocation for Probed {
        fn describe(&self) -> &str {
            self.inner.describe()
        }

        fn find_definition(&self, name: &SymbolName) -> Option<RawDefinition> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.find_definition(name)
        }
    }

    fn name(s: &str) -> SymbolName {
        SymbolName::new(s).unwrap()
    }

    fn memory(label: &str, defs: &[(&str, &str)]) -> Arc<dyn SearchLocation> {
        let mut loc = MemoryLocation::new(label);
        for (n, text) in defs {
            loc.insert(name(n), RawDefinition::new(text.as_bytes()));
        }
        Arc::new(loc)
    }

    fn resolver(locations: Vec<Arc<dyn SearchLocation>>) -> Resolver<Artifact> {
        Resolver::new(locations, Arc::new(TextBuilder), Arc::new(NoUpstream)).unwrap()
    }

    #[test]
    fn test_empty_locations_rejected() {
        let err = Resolver::<Artifact>::new(
            Vec::new(),
            Arc::new(TextBuilder),
            Arc::new(NoUpstream),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidArgument(_)));
    }

    #[test]
    fn test_exclusion_list_is_ordered_and_idempotent() {
        let resolver = resolver(vec![memory("a", &[])]);

        resolver.add_exclusion("b.B").unwrap();
        resolver.add_exclusion("a.A").unwrap();
        resolver.add_exclusion("b.B").unwrap();

        assert_eq!(resolver.exclusions(), vec![name("b.B"), name("a.A")]);
    }

    #[test]
    fn test_empty_exclusion_rejected() {
        let resolver = resolver(vec![memory("a", &[])]);
        let err = resolver.add_exclusion("").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidArgument(_)));
    }

    #[test]
    fn test_excluded_name_skips_local_search() {
        let queries = Arc::new(AtomicUsize::new(0));
        let mut inner = MemoryLocation::new("local");
        inner.insert(name("x"), RawDefinition::new(b"local-x".as_slice()));
        let probed = Arc::new(Probed {
            inner,
            queries: Arc::clone(&queries),
        });

        let resolver = resolver(vec![probed]);
        resolver.add_exclusion("x").unwrap();

        let err = resolver.resolve("x").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolver_chains_as_upstream() {
        let root = resolver(vec![memory("root", &[("shared.S", "from-root")])]);
        let child = Resolver::new(
            vec![memory("child", &[("child.C", "from-child")])],
            Arc::new(TextBuilder),
            Arc::new(root),
        )
        .unwrap();

        assert_eq!(child.resolve("child.C").unwrap().text, "from-child");
        assert_eq!(child.resolve("shared.S").unwrap().text, "from-root");
        assert!(child.resolve("absent.A").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delegated_names_are_not_cached_locally() {
        let root = resolver(vec![memory("root", &[("shared.S", "from-root")])]);
        let root = Arc::new(root);
        let child = Resolver::new(
            vec![memory("child", &[("child.C", "from-child")])],
            Arc::new(TextBuilder),
            Arc::clone(&root) as Arc<dyn Upstream<Artifact>>,
        )
        .unwrap();

        child.resolve("shared.S").unwrap();
        child.resolve("child.C").unwrap();

        assert_eq!(child.resolved_names(), vec![name("child.C")]);
        assert_eq!(root.resolved_names(), vec![name("shared.S")]);
    }

    #[test]
    fn test_preload_matches_resolve_identity() {
        let resolver = resolver(vec![memory("a", &[("x", "1"), ("y", "2")])]);

        let results = resolver.preload(&["x", "y", "missing"]);
        assert_eq!(results.len(), 3);

        let (ref n, ref x) = results[0];
        assert_eq!(n, "x");
        assert!(Arc::ptr_eq(x.as_ref().unwrap(), &resolver.resolve("x").unwrap()));
        assert!(results[2].1.as_ref().unwrap_err().is_not_found());
    }
}
