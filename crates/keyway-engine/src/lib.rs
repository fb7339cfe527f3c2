//! Keyway Engine
//!
//! Keyword resolution and argument coercion between a loosely typed caller
//! and keyword libraries:
//! - **Introspection**: classify a library as static, hybrid or dynamic and
//!   build its signature catalog (`introspector`, `catalog`, `argspec`)
//! - **Resolution**: choose the overload a call executes and coerce its
//!   arguments (`resolver`, `coercion`, `cache`)
//! - **Invocation**: execute the chosen signature and normalize the outcome
//!   (`invoker`)
//! - **Handles**: per-scope ownership of a catalog (`handle`, `dispatch`)
//!
//! # Example
//!
//! ```rust,ignore
//! use keyway_engine::{CallArguments, LibraryHandle};
//! use keyway_sdk::{arg, KwValue, LibraryInstance, ParamDecl, TypeKind};
//!
//! let library = LibraryInstance::new("Math").keyword(
//!     "add",
//!     vec![ParamDecl::new("a", TypeKind::INT), ParamDecl::new("b", TypeKind::INT)],
//!     |args| Ok(KwValue::Int(arg::<i64>(args, 0)? + arg::<i64>(args, 1)?)),
//! );
//!
//! let handle = LibraryHandle::new(&library)?;
//! let result = handle.run("Add", &CallArguments::new(vec![KwValue::text("2"), KwValue::Int(3)]))?;
//! assert_eq!(result.display, "5");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Catalog
// ============================================================================

/// Dynamic argument spec parsing
pub mod argspec;

/// Signatures, operations and the per-library catalog
pub mod catalog;

/// Static/hybrid/dynamic classification and catalog building
pub mod introspector;

/// Keyword name normalization
pub mod name;

// ============================================================================
// Resolution and invocation
// ============================================================================

/// Per-handle resolution cache
pub mod cache;

/// Call arguments and resolved calls
pub mod call;

/// Value to declared type coercion
pub mod coercion;

/// Resolved call execution
pub mod invoker;

/// Signature selection
pub mod resolver;

// ============================================================================
// Handles, config and errors
// ============================================================================

/// Engine configuration
pub mod config;

/// Session manager and reporting seams
pub mod dispatch;

/// Error taxonomy
pub mod error;

/// Library handles
pub mod handle;

pub use argspec::{ArgSpec, ArgSpecError};
pub use cache::{CacheStats, ResolutionCache};
pub use call::{CallArguments, CallTarget, ResolvedCall};
pub use catalog::{
    Annotations, Catalog, LibraryKind, Operation, OperationState, Signature, SignatureOrigin,
    INIT_NAME, INTRO_NAME,
};
pub use coercion::{Coerced, CoercionError, CoercionRules, MatchRank};
pub use config::EngineConfig;
pub use dispatch::{Dispatcher, HandleProvider, OutcomeSink};
pub use error::{
    CandidateReport, CatalogError, ConfigError, InvocationError, InvocationFailure, KeywordError,
    KeywordOutcome, ResolutionError,
};
pub use handle::LibraryHandle;
pub use introspector::{classify, Introspector};
pub use invoker::{Invoker, KeywordResult};
pub use name::{normalize, printable_name};
pub use resolver::Resolver;
