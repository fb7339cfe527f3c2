//! Keyway SDK - Lightweight SDK for writing keyword libraries
//!
//! This crate provides the types a library author needs to expose keywords
//! to the keyway engine without depending on the engine itself: the value
//! model, declared parameter types, the failure type, and the declaration
//! table for static, hybrid and dynamic libraries.
//!
//! # Example
//!
//! ```ignore
//! use keyway_sdk::{arg, LibraryInstance, ParamDecl, ToKw, TypeKind};
//!
//! let library = LibraryInstance::new("Math")
//!     .keyword(
//!         "add",
//!         vec![ParamDecl::new("a", TypeKind::INT), ParamDecl::new("b", TypeKind::INT)],
//!         |args| Ok((arg::<i64>(args, 0)? + arg::<i64>(args, 1)?).to_kw()),
//!     );
//! ```

#![warn(missing_docs)]

pub mod convert;
pub mod error;
pub mod library;
pub mod types;
pub mod value;

pub use convert::{arg, FromKw, ToKw};
pub use error::{KeywordFailure, KwResult};
pub use library::{
    ConstructorDecl, DocFn, Discovery, Execute, ExecuteFn, ExecuteNamedFn, KeywordFn,
    LibraryInstance, LibraryScope, MethodDecl, NamesFn, TextListFn, Visibility,
};
pub use types::{FloatWidth, IntWidth, ParamDecl, TypeKind};
pub use value::{HostObject, KwValue};
