//! Library declarations
//!
//! A library instance is described to the engine as plain data: a table of
//! declared methods (the static surface), declared constructors, and an
//! optional discovery record implementing the dynamic protocol. The engine
//! classifies the instance once from that data; nothing is queried per call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::KwResult;
use crate::types::ParamDecl;
use crate::value::KwValue;

// ============================================================================
// Handler types
// ============================================================================

/// A static keyword implementation.
///
/// Receives the coerced positional values in declared order. When the
/// signature has a variadic parameter its values arrive collected in one
/// `KwValue::List`; a named-args sink arrives as one trailing `KwValue::Map`.
pub type KeywordFn = Arc<dyn Fn(&[KwValue]) -> KwResult<KwValue> + Send + Sync>;

/// Name-listing entry point of the dynamic protocol
pub type NamesFn = Arc<dyn Fn() -> KwResult<Vec<String>> + Send + Sync>;

/// Per-name entry point returning a list of strings (argument spec, types, tags)
pub type TextListFn = Arc<dyn Fn(&str) -> KwResult<Vec<String>> + Send + Sync>;

/// Per-name documentation entry point
pub type DocFn = Arc<dyn Fn(&str) -> KwResult<String> + Send + Sync>;

/// `execute(name, positional)`
pub type ExecuteFn = Arc<dyn Fn(&str, &[KwValue]) -> KwResult<KwValue> + Send + Sync>;

/// `execute(name, positional, named)`
pub type ExecuteNamedFn =
    Arc<dyn Fn(&str, &[KwValue], &BTreeMap<String, KwValue>) -> KwResult<KwValue> + Send + Sync>;

// ============================================================================
// Scope
// ============================================================================

/// Lifetime granularity of a library instance.
///
/// The session manager creates and drops instances per scope; the engine only
/// records the declared scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LibraryScope {
    /// One instance for the whole process
    Global,
    /// One instance per suite
    Suite,
    /// One instance per test
    #[default]
    Test,
}

impl LibraryScope {
    /// Parse a scope name, ignoring case, spaces and underscores.
    ///
    /// Unknown names fall back to `Test`.
    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "GLOBAL" => LibraryScope::Global,
            "SUITE" | "TESTSUITE" => LibraryScope::Suite,
            _ => LibraryScope::Test,
        }
    }
}

impl fmt::Display for LibraryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryScope::Global => write!(f, "GLOBAL"),
            LibraryScope::Suite => write!(f, "SUITE"),
            LibraryScope::Test => write!(f, "TEST"),
        }
    }
}

// ============================================================================
// Static surface
// ============================================================================

/// Accessibility of a declared callable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Exposed as a keyword
    Public,
    /// Never exposed
    Private,
    /// Never exposed
    Internal,
}

/// A declared method of a static library. Several methods may share a name;
/// each becomes one overload.
#[derive(Clone)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Accessibility
    pub visibility: Visibility,
    /// Declared parameters in order
    pub params: Vec<ParamDecl>,
    /// Documentation
    pub doc: Option<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Implementation
    pub handler: KeywordFn,
}

impl MethodDecl {
    /// Create a public method
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamDecl>,
        handler: impl Fn(&[KwValue]) -> KwResult<KwValue> + Send + Sync + 'static,
    ) -> Self {
        MethodDecl {
            name: name.into(),
            visibility: Visibility::Public,
            params,
            doc: None,
            tags: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Set the accessibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Set the tags
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this method may become a keyword
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public && !self.name.starts_with('_')
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .finish()
    }
}

/// A declared constructor of a library
#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    /// Accessibility
    pub visibility: Visibility,
    /// Declared parameters in order
    pub params: Vec<ParamDecl>,
    /// Documentation
    pub doc: Option<String>,
}

impl ConstructorDecl {
    /// Create a public constructor
    pub fn new(params: Vec<ParamDecl>) -> Self {
        ConstructorDecl {
            visibility: Visibility::Public,
            params,
            doc: None,
        }
    }

    /// Set the accessibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

// ============================================================================
// Dynamic protocol
// ============================================================================

/// Execute entry point of the dynamic protocol.
///
/// Which form a library provides is the only signal of named-argument
/// support.
#[derive(Clone)]
pub enum Execute {
    /// `execute(name, positional)`
    Positional(ExecuteFn),
    /// `execute(name, positional, named)`
    WithNamed(ExecuteNamedFn),
}

impl Execute {
    /// Wrap a positional-only entry point
    pub fn positional(
        execute: impl Fn(&str, &[KwValue]) -> KwResult<KwValue> + Send + Sync + 'static,
    ) -> Self {
        Execute::Positional(Arc::new(execute))
    }

    /// Wrap an entry point that also accepts named arguments
    pub fn named(
        execute: impl Fn(&str, &[KwValue], &BTreeMap<String, KwValue>) -> KwResult<KwValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Execute::WithNamed(Arc::new(execute))
    }

    /// Whether named arguments can be passed through
    pub fn supports_named(&self) -> bool {
        matches!(self, Execute::WithNamed(_))
    }
}

/// Capability record of the dynamic discovery protocol.
///
/// Only `list_names` is required. Missing optional entries mean:
/// - `argument_spec`: accept any arguments unchecked
/// - `argument_types`: every declared parameter is `Any`
/// - `documentation` / `tags`: empty
/// - `execute`: the listed names refer to static methods (hybrid library)
#[derive(Clone)]
pub struct Discovery {
    /// `listOperationNames()`
    pub list_names: NamesFn,
    /// `getArgumentSpec(name)`
    pub argument_spec: Option<TextListFn>,
    /// `getArgumentTypes(name)`
    pub argument_types: Option<TextListFn>,
    /// `getDocumentation(name)`
    pub documentation: Option<DocFn>,
    /// `getTags(name)`
    pub tags: Option<TextListFn>,
    /// `execute(...)`
    pub execute: Option<Execute>,
}

impl Discovery {
    /// Create a discovery record with only the name-listing entry point
    pub fn new(list_names: impl Fn() -> KwResult<Vec<String>> + Send + Sync + 'static) -> Self {
        Discovery {
            list_names: Arc::new(list_names),
            argument_spec: None,
            argument_types: None,
            documentation: None,
            tags: None,
            execute: None,
        }
    }

    /// Provide the positional-only execute entry point
    pub fn with_execute(
        mut self,
        execute: impl Fn(&str, &[KwValue]) -> KwResult<KwValue> + Send + Sync + 'static,
    ) -> Self {
        self.execute = Some(Execute::positional(execute));
        self
    }

    /// Provide the execute entry point that also accepts named arguments
    pub fn with_named_execute(
        mut self,
        execute: impl Fn(&str, &[KwValue], &BTreeMap<String, KwValue>) -> KwResult<KwValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.execute = Some(Execute::named(execute));
        self
    }

    /// Provide `getArgumentSpec`
    pub fn with_argument_spec(
        mut self,
        spec: impl Fn(&str) -> KwResult<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.argument_spec = Some(Arc::new(spec));
        self
    }

    /// Provide `getArgumentTypes`
    pub fn with_argument_types(
        mut self,
        types: impl Fn(&str) -> KwResult<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.argument_types = Some(Arc::new(types));
        self
    }

    /// Provide `getDocumentation`
    pub fn with_documentation(
        mut self,
        doc: impl Fn(&str) -> KwResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.documentation = Some(Arc::new(doc));
        self
    }

    /// Provide `getTags`
    pub fn with_tags(
        mut self,
        tags: impl Fn(&str) -> KwResult<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.tags = Some(Arc::new(tags));
        self
    }
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("argument_spec", &self.argument_spec.is_some())
            .field("argument_types", &self.argument_types.is_some())
            .field("documentation", &self.documentation.is_some())
            .field("tags", &self.tags.is_some())
            .field("named_execute", &self.execute.as_ref().map(Execute::supports_named))
            .finish()
    }
}

// ============================================================================
// Library instance
// ============================================================================

/// A live library instance as handed to the engine by the session manager.
#[derive(Debug, Clone)]
pub struct LibraryInstance {
    name: String,
    doc: Option<String>,
    scope: LibraryScope,
    methods: Vec<MethodDecl>,
    constructors: Vec<ConstructorDecl>,
    discovery: Option<Discovery>,
}

impl LibraryInstance {
    /// Create an empty library instance
    pub fn new(name: impl Into<String>) -> Self {
        LibraryInstance {
            name: name.into(),
            doc: None,
            scope: LibraryScope::default(),
            methods: Vec::new(),
            constructors: Vec::new(),
            discovery: None,
        }
    }

    /// Set the library documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Set the library scope
    pub fn with_scope(mut self, scope: LibraryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Declare a method
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Declare a public method from its parts
    pub fn keyword(
        self,
        name: impl Into<String>,
        params: Vec<ParamDecl>,
        handler: impl Fn(&[KwValue]) -> KwResult<KwValue> + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDecl::new(name, params, handler))
    }

    /// Declare a constructor
    pub fn constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Attach the dynamic discovery protocol
    pub fn with_discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Library name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Library documentation
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared scope
    pub fn scope(&self) -> LibraryScope {
        self.scope
    }

    /// Declared methods
    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[ConstructorDecl] {
        &self.constructors
    }

    /// Discovery protocol, if any
    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }
}
