//! Signature catalog
//!
//! The immutable per-handle table of operations and their signatures. Built
//! once by the introspector; the only interior mutability is write-once
//! memoization of lazily fetched documentation and tags.

use std::fmt;

use keyway_sdk::{Discovery, Execute, KeywordFn, KwResult, LibraryScope, ParamDecl, TypeKind};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::CatalogError;
use crate::name::normalize;

/// Reserved documentation name for the library itself
pub const INTRO_NAME: &str = "__intro__";

/// Reserved operation name for constructors
pub const INIT_NAME: &str = "__init__";

// ============================================================================
// Library kind
// ============================================================================

/// How a library exposes its operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// Public methods are keywords
    Static,
    /// The name-listing entry point picks which static methods are keywords
    Hybrid,
    /// Keywords are listed and executed through the discovery protocol
    Dynamic,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Static => write!(f, "static"),
            LibraryKind::Hybrid => write!(f, "hybrid"),
            LibraryKind::Dynamic => write!(f, "dynamic"),
        }
    }
}

// ============================================================================
// Signature
// ============================================================================

/// What executing a signature means
#[derive(Clone)]
pub enum SignatureOrigin {
    /// A declared static method
    Method(KeywordFn),
    /// The dynamic protocol's execute entry point
    Dynamic(Execute),
    /// A library constructor; only the session manager creates instances
    Constructor,
}

impl fmt::Debug for SignatureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureOrigin::Method(_) => write!(f, "Method(<fn>)"),
            SignatureOrigin::Dynamic(execute) => {
                write!(f, "Dynamic(named: {})", execute.supports_named())
            }
            SignatureOrigin::Constructor => write!(f, "Constructor"),
        }
    }
}

/// One concrete call shape of an operation.
///
/// Fixed parameters come first, then at most one variadic parameter (a
/// sequence collecting overflow positional values), then at most one
/// named-args sink (a mapping collecting named values).
#[derive(Debug, Clone)]
pub struct Signature {
    params: Vec<ParamDecl>,
    variadic: Option<ParamDecl>,
    named: Option<ParamDecl>,
    origin: SignatureOrigin,
}

impl Signature {
    /// Derive a signature from a declared parameter list.
    ///
    /// A trailing mapping parameter is the named-args sink; a sequence
    /// parameter trailing the remaining ones is variadic. Earlier sequences
    /// and mappings stay fixed parameters.
    pub fn from_params(
        operation: &str,
        mut params: Vec<ParamDecl>,
        origin: SignatureOrigin,
    ) -> Result<Self, CatalogError> {
        let named = match params.last() {
            Some(p) if p.kind.is_mapping() => params.pop(),
            _ => None,
        };
        let variadic = match params.last() {
            Some(p) if p.kind.is_sequence() => params.pop(),
            _ => None,
        };
        let signature = Signature {
            params,
            variadic,
            named,
            origin,
        };
        signature.check_defaults(operation)?;
        Ok(signature)
    }

    /// Assemble a signature from already classified parts
    pub fn from_parts(
        params: Vec<ParamDecl>,
        variadic: Option<ParamDecl>,
        named: Option<ParamDecl>,
        origin: SignatureOrigin,
    ) -> Self {
        Signature {
            params,
            variadic,
            named,
            origin,
        }
    }

    /// Signature of a dynamic keyword without an argument spec: anything
    /// positional, plus named values when `execute` can pass them.
    pub fn unchecked(execute: Execute) -> Self {
        Signature {
            params: Vec::new(),
            variadic: Some(ParamDecl::new("args", TypeKind::sequence())),
            named: execute
                .supports_named()
                .then(|| ParamDecl::new("kwargs", TypeKind::Mapping)),
            origin: SignatureOrigin::Dynamic(execute),
        }
    }

    fn check_defaults(&self, operation: &str) -> Result<(), CatalogError> {
        let mut seen_default = false;
        for param in &self.params {
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(CatalogError::InvalidSignature {
                    operation: operation.to_string(),
                    reason: format!(
                        "required parameter '{}' follows a parameter with a default",
                        param.name
                    ),
                });
            }
        }
        Ok(())
    }

    /// Fixed parameters
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Variadic parameter
    pub fn variadic(&self) -> Option<&ParamDecl> {
        self.variadic.as_ref()
    }

    /// Named-args sink
    pub fn named(&self) -> Option<&ParamDecl> {
        self.named.as_ref()
    }

    /// What executing this signature means
    pub fn origin(&self) -> &SignatureOrigin {
        &self.origin
    }

    /// Number of fixed parameters without defaults
    pub fn min_arity(&self) -> usize {
        self.params.iter().filter(|p| p.is_required()).count()
    }

    /// Number of fixed parameters
    pub fn max_fixed_arity(&self) -> usize {
        self.params.len()
    }

    /// Upper bound on positional values; `None` when variadic
    pub fn max_arity(&self) -> Option<usize> {
        match self.variadic {
            Some(_) => None,
            None => Some(self.params.len()),
        }
    }

    /// Whether `count` positional values fit
    pub fn accepts_count(&self, count: usize) -> bool {
        count >= self.min_arity() && self.max_arity().map_or(true, |max| count <= max)
    }

    /// Whether named values can be bound
    pub fn accepts_named(&self) -> bool {
        self.named.is_some()
    }

    /// Declared element type for overflow values, if any
    pub fn variadic_element(&self) -> Option<&TypeKind> {
        self.variadic.as_ref().and_then(|p| p.kind.element())
    }

    /// Render as `name(int, text=x, *int, **mapping)`
    pub fn describe(&self, name: &str) -> String {
        let mut parts: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!("{}={}", p.kind, default),
                None => p.kind.to_string(),
            })
            .collect();
        if let Some(variadic) = &self.variadic {
            match variadic.kind.element() {
                Some(elem) => parts.push(format!("*{}", elem)),
                None => parts.push("*any".to_string()),
            }
        }
        if self.named.is_some() {
            parts.push("**mapping".to_string());
        }
        format!("{}({})", name, parts.join(", "))
    }
}

// ============================================================================
// Operation
// ============================================================================

/// Documentation and tags of an operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// Documentation with any trailing `Tags:` line removed
    pub doc: String,
    /// Declared tags followed by tags from the documentation
    pub tags: Vec<String>,
    /// Fetch failures that degraded the annotations to empty
    pub failures: Vec<CatalogError>,
}

impl Annotations {
    /// Build from raw documentation and declared tags
    pub fn from_parts(raw_doc: &str, declared_tags: Vec<String>) -> Self {
        let (doc, doc_tags) = split_doc_tags(raw_doc);
        let mut tags = declared_tags;
        for tag in doc_tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Annotations {
            doc,
            tags,
            failures: Vec::new(),
        }
    }
}

/// Split a trailing `Tags: a, b` line off documentation
pub fn split_doc_tags(raw: &str) -> (String, Vec<String>) {
    let trimmed = raw.trim_end();
    let (body, last) = match trimmed.rfind('\n') {
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => ("", trimmed),
    };
    match last.trim_start().strip_prefix("Tags:") {
        Some(rest) => {
            let tags = rest
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            (body.trim_end().to_string(), tags)
        }
        None => (trimmed.to_string(), Vec::new()),
    }
}

/// Whether an operation can be called
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// Normal operation
    Callable,
    /// Registered, but every call fails with this reason
    Uncallable {
        /// Why the argument spec is unusable
        reason: String,
    },
}

/// A named operation with one or more signatures
#[derive(Debug)]
pub struct Operation {
    name: String,
    printable: String,
    signatures: Vec<Signature>,
    state: OperationState,
    declared: Annotations,
    lazy: bool,
    fetched: OnceCell<Annotations>,
}

impl Operation {
    /// Operation whose annotations are known up front
    pub(crate) fn new(
        name: impl Into<String>,
        printable: impl Into<String>,
        signatures: Vec<Signature>,
        declared: Annotations,
    ) -> Self {
        Operation {
            name: name.into(),
            printable: printable.into(),
            signatures,
            state: OperationState::Callable,
            declared,
            lazy: false,
            fetched: OnceCell::new(),
        }
    }

    /// Fetch annotations through the discovery protocol on first request
    pub(crate) fn with_lazy_annotations(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Mark as registered but uncallable
    pub(crate) fn uncallable(mut self, reason: impl Into<String>) -> Self {
        self.signatures.clear();
        self.state = OperationState::Uncallable {
            reason: reason.into(),
        };
        self
    }

    pub(crate) fn push_signature(&mut self, signature: Signature) {
        self.signatures.push(signature);
    }

    /// Declared name, as passed to the execute entry point
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable name
    pub fn printable_name(&self) -> &str {
        &self.printable
    }

    /// All signatures, overloads included
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Callability
    pub fn state(&self) -> &OperationState {
        &self.state
    }

    /// Whether calls can succeed
    pub fn is_callable(&self) -> bool {
        self.state == OperationState::Callable
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// All operations of one library instance
#[derive(Debug)]
pub struct Catalog {
    library: String,
    kind: LibraryKind,
    scope: LibraryScope,
    doc: String,
    operations: Vec<Operation>,
    index: FxHashMap<String, usize>,
    init: Option<Operation>,
    rejected: Vec<CatalogError>,
    discovery: Option<Discovery>,
    intro: OnceCell<String>,
}

impl Catalog {
    pub(crate) fn new(
        library: impl Into<String>,
        kind: LibraryKind,
        scope: LibraryScope,
        doc: Option<&str>,
        discovery: Option<Discovery>,
    ) -> Self {
        Catalog {
            library: library.into(),
            kind,
            scope,
            doc: doc.unwrap_or_default().to_string(),
            operations: Vec::new(),
            index: FxHashMap::default(),
            init: None,
            rejected: Vec::new(),
            discovery,
            intro: OnceCell::new(),
        }
    }

    /// Add an operation, or merge its signatures into an existing one whose
    /// name normalizes equally. Returns `false` if it was merged.
    pub(crate) fn insert(&mut self, operation: Operation) -> bool {
        let key = normalize(&operation.name);
        match self.index.get(&key) {
            Some(&idx) => {
                let existing = &mut self.operations[idx];
                for signature in operation.signatures {
                    existing.push_signature(signature);
                }
                false
            }
            None => {
                self.index.insert(key, self.operations.len());
                self.operations.push(operation);
                true
            }
        }
    }

    pub(crate) fn set_init(&mut self, init: Operation) {
        self.init = Some(init);
    }

    pub(crate) fn reject(&mut self, error: CatalogError) {
        self.rejected.push(error);
    }

    /// Library name
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Library kind
    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    /// Declared scope
    pub fn scope(&self) -> LibraryScope {
        self.scope
    }

    /// Whether dynamic calls can carry named values
    pub fn supports_named(&self) -> bool {
        self.discovery
            .as_ref()
            .and_then(|d| d.execute.as_ref())
            .is_some_and(|e| e.supports_named())
    }

    /// All operations in discovery order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operation by index
    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    /// Index of the operation addressed by `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize(name)).copied()
    }

    /// Operation addressed by `name`, ignoring case, spaces and underscores
    pub fn lookup(&self, name: &str) -> Option<&Operation> {
        self.position(name).map(|idx| &self.operations[idx])
    }

    /// Keywords the library listed but that could not be registered
    pub fn rejected(&self) -> &[CatalogError] {
        &self.rejected
    }

    /// The constructor operation, if any public constructor exists
    pub fn init(&self) -> Option<&Operation> {
        self.init.as_ref()
    }

    /// Total number of signatures across all operations
    pub fn signature_count(&self) -> usize {
        self.operations.iter().map(|op| op.signatures.len()).sum()
    }

    /// Library documentation. Dynamic libraries are asked for `__intro__`
    /// once; an empty or failed answer falls back to the declared doc.
    pub fn library_documentation(&self) -> &str {
        self.intro.get_or_init(|| {
            let fetched = self
                .discovery
                .as_ref()
                .and_then(|d| d.documentation.as_ref())
                .map(|doc| doc(INTRO_NAME))
                .and_then(|result| self.keep_annotation(INTRO_NAME, "documentation", result));
            match fetched {
                Some(doc) if !doc.is_empty() => doc,
                _ => self.doc.clone(),
            }
        })
    }

    /// Documentation and tags of `operation`, fetched on first request for
    /// dynamic operations.
    pub fn annotations<'a>(&self, operation: &'a Operation) -> &'a Annotations {
        if !operation.lazy {
            return &operation.declared;
        }
        operation
            .fetched
            .get_or_init(|| self.fetch_annotations(operation))
    }

    fn fetch_annotations(&self, operation: &Operation) -> Annotations {
        let Some(discovery) = &self.discovery else {
            return operation.declared.clone();
        };
        let mut failures = Vec::new();
        let raw_doc = match &discovery.documentation {
            Some(doc) => match doc(operation.name()) {
                Ok(doc) => doc,
                Err(e) => {
                    failures.push(self.annotation_failure(&operation.name, "documentation", e.message()));
                    String::new()
                }
            },
            None => String::new(),
        };
        let declared_tags = match &discovery.tags {
            Some(tags) => match tags(operation.name()) {
                Ok(tags) => tags,
                Err(e) => {
                    failures.push(self.annotation_failure(&operation.name, "tags", e.message()));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let raw_doc = if raw_doc.is_empty() {
            operation.declared.doc.as_str()
        } else {
            raw_doc.as_str()
        };
        let mut tags = operation.declared.tags.clone();
        tags.extend(declared_tags.into_iter().filter(|t| !operation.declared.tags.contains(t)));
        let mut annotations = Annotations::from_parts(raw_doc, tags);
        annotations.failures = failures;
        annotations
    }

    fn keep_annotation<T>(&self, name: &str, annotation: &'static str, result: KwResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.annotation_failure(name, annotation, e.message());
                None
            }
        }
    }

    fn annotation_failure(&self, name: &str, annotation: &'static str, reason: &str) -> CatalogError {
        let error = CatalogError::DocumentationRetrievalFailure {
            operation: name.to_string(),
            annotation,
            reason: reason.to_string(),
        };
        warn!(library = %self.library, keyword = %name, error = %error, "annotation unavailable");
        error
    }
}
