//! Library handle
//!
//! A handle owns the catalog of one library instance for the lifetime of a
//! scope activation. The catalog is never mutated after construction; a new
//! catalog means a new handle, which also means a fresh resolution cache.

use keyway_sdk::{LibraryInstance, LibraryScope};
use tracing::trace;

use crate::cache::{CacheStats, ResolutionCache, ShapeKey};
use crate::call::{CallArguments, ResolvedCall};
use crate::catalog::{Annotations, Catalog, LibraryKind};
use crate::coercion::CoercionRules;
use crate::config::EngineConfig;
use crate::error::{CatalogError, InvocationError, KeywordOutcome, ResolutionError};
use crate::introspector::Introspector;
use crate::invoker::{Invoker, KeywordResult};
use crate::resolver::{arity_candidates, Resolver};

/// An introspected library ready for calls
#[derive(Debug)]
pub struct LibraryHandle {
    catalog: Catalog,
    rules: CoercionRules,
    cache: Option<ResolutionCache>,
    trace_arguments: bool,
}

impl LibraryHandle {
    /// Introspect `instance` with the default configuration
    pub fn new(instance: &LibraryInstance) -> Result<Self, CatalogError> {
        Self::with_config(instance, &EngineConfig::default())
    }

    /// Introspect `instance` with `config`
    pub fn with_config(
        instance: &LibraryInstance,
        config: &EngineConfig,
    ) -> Result<Self, CatalogError> {
        let rules = config.coercion_rules();
        let catalog = Introspector::new(rules.clone()).introspect(instance)?;
        Ok(LibraryHandle {
            catalog,
            rules,
            cache: config.resolution.cache.then(ResolutionCache::new),
            trace_arguments: config.logging.trace_arguments,
        })
    }

    /// The catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Library name
    pub fn name(&self) -> &str {
        self.catalog.library()
    }

    /// Declared scope
    pub fn scope(&self) -> LibraryScope {
        self.catalog.scope()
    }

    /// Library kind
    pub fn kind(&self) -> LibraryKind {
        self.catalog.kind()
    }

    /// Printable names of all keywords, uncallable ones included
    pub fn keyword_names(&self) -> Vec<String> {
        self.catalog
            .operations()
            .iter()
            .map(|op| op.printable_name().to_string())
            .collect()
    }

    /// Choose the signature for a call
    pub fn resolve(&self, name: &str, args: &CallArguments) -> Result<ResolvedCall, ResolutionError> {
        let resolver = Resolver::new(&self.catalog, &self.rules);
        let Some(index) = self.catalog.position(name) else {
            return resolver.resolve(name, args);
        };
        let Some(operation) = self.catalog.operation(index) else {
            return resolver.resolve(name, args);
        };
        let count = args.positional.len();
        let has_named = args.has_named();
        match &self.cache {
            Some(cache) => {
                let key = ShapeKey {
                    operation: index,
                    positional: count,
                    has_named,
                };
                let candidates =
                    cache.get_or_insert_with(key, || arity_candidates(operation, count, has_named));
                resolver.select(operation, &candidates, args)
            }
            None => {
                let candidates = arity_candidates(operation, count, has_named);
                resolver.select(operation, &candidates, args)
            }
        }
    }

    /// Validate constructor arguments
    pub fn validate_init(&self, args: &CallArguments) -> Result<ResolvedCall, ResolutionError> {
        Resolver::new(&self.catalog, &self.rules).resolve_init(args)
    }

    /// Execute a resolved call
    pub fn invoke(&self, call: &ResolvedCall) -> Result<KeywordResult, InvocationError> {
        Invoker::new(self.catalog.library())
            .with_trace_arguments(self.trace_arguments)
            .invoke(call)
    }

    /// Resolve and execute
    pub fn run(&self, name: &str, args: &CallArguments) -> KeywordOutcome<KeywordResult> {
        if self.trace_arguments {
            trace!(
                library = %self.name(),
                keyword = %name,
                positional = args.positional.len(),
                named = args.named.len(),
                "running keyword"
            );
        }
        let call = self.resolve(name, args)?;
        Ok(self.invoke(&call)?)
    }

    /// Documentation and tags of a keyword
    pub fn annotations(&self, name: &str) -> Option<&Annotations> {
        self.catalog
            .lookup(name)
            .map(|op| self.catalog.annotations(op))
    }

    /// Documentation of a keyword
    pub fn documentation(&self, name: &str) -> Option<&str> {
        self.annotations(name).map(|a| a.doc.as_str())
    }

    /// Tags of a keyword
    pub fn tags(&self, name: &str) -> Option<&[String]> {
        self.annotations(name).map(|a| a.tags.as_slice())
    }

    /// Library documentation
    pub fn library_documentation(&self) -> &str {
        self.catalog.library_documentation()
    }

    /// Constructor documentation, empty when there is no public constructor
    pub fn init_documentation(&self) -> &str {
        self.catalog
            .init()
            .map(|init| self.catalog.annotations(init).doc.as_str())
            .unwrap_or_default()
    }

    /// Resolution cache counters, `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResolutionCache::stats)
    }
}
