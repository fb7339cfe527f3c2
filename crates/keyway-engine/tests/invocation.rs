//! Integration tests for keyword invocation
//!
//! Argument packing for static methods, failure propagation, panics and
//! result normalization.

use std::error::Error;

use keyway_engine::{
    CallArguments, InvocationError, KeywordError, LibraryHandle, ResolutionError,
};
use keyway_sdk::{
    ConstructorDecl, HostObject, KeywordFailure, KwValue, LibraryInstance, ParamDecl, TypeKind,
};

#[derive(Debug)]
struct Socket;

impl HostObject for Socket {
    fn type_name(&self) -> &str {
        "Socket"
    }

    fn repr(&self) -> Result<String, String> {
        Err("socket is closed".to_string())
    }
}

fn library() -> LibraryInstance {
    LibraryInstance::new("Io")
        .keyword(
            "join",
            vec![
                ParamDecl::new("sep", TypeKind::Text),
                ParamDecl::new("parts", TypeKind::sequence_of(TypeKind::INT)),
            ],
            |args| {
                let sep: String = keyway_sdk::arg(args, 0)?;
                let parts: Vec<KwValue> = keyway_sdk::arg(args, 1)?;
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                Ok(KwValue::text(rendered.join(&sep)))
            },
        )
        .keyword("nothing", vec![], |_| Ok(KwValue::Null))
        .keyword("open socket", vec![], |_| Ok(KwValue::object(Socket)))
        .keyword("fail", vec![], |_| {
            Err(KeywordFailure::new("disk full")
                .with_kind("IOError")
                .with_source(std::io::Error::new(std::io::ErrorKind::Other, "ENOSPC")))
        })
        .keyword("fail quietly", vec![], |_| {
            Err(KeywordFailure::new("expected failure").suppress_name())
        })
        .keyword("explode", vec![], |_| panic!("boom"))
        .constructor(ConstructorDecl::new(vec![ParamDecl::new("root", TypeKind::Text)]))
}

#[test]
fn test_static_varargs_are_packed() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let args = CallArguments::new(vec![
        KwValue::text("-"),
        KwValue::text("1"),
        KwValue::Int(2),
        KwValue::text("3"),
    ]);
    let call = handle.resolve("join", &args).unwrap();
    assert_eq!(
        call.packed_arguments(),
        vec![
            KwValue::text("-"),
            KwValue::list(vec![KwValue::Int(1), KwValue::Int(2), KwValue::Int(3)])
        ]
    );
    assert_eq!(handle.invoke(&call).unwrap().display, "1-2-3");

    // No overflow still passes an empty list
    let result = handle.run("join", &CallArguments::new(vec![KwValue::text(",")])).unwrap();
    assert_eq!(result.display, "");
}

#[test]
fn test_null_return_is_empty_result() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let result = handle.run("nothing", &CallArguments::default()).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.display, "");
}

#[test]
fn test_unrepresentable_result_keeps_value() {
    let handle = LibraryHandle::new(&library()).unwrap();
    match handle.run("Open Socket", &CallArguments::default()).unwrap_err() {
        KeywordError::Invocation(InvocationError::UnrepresentableResult {
            operation,
            type_name,
            reason,
            value,
        }) => {
            assert_eq!(operation, "Open Socket");
            assert_eq!(type_name, "Socket");
            assert_eq!(reason, "socket is closed");
            assert_eq!(value.type_name(), "Socket");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_failure_propagates_with_cause() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let err = handle.run("fail", &CallArguments::default()).unwrap_err();
    let KeywordError::Invocation(InvocationError::Failure(failure)) = &err else {
        panic!("unexpected {:?}", err);
    };
    assert_eq!(failure.operation, "Fail");
    assert_eq!(failure.library, "Io");
    assert_eq!(failure.report(), "IOError: disk full");
    assert_eq!(
        err.to_string(),
        "keyword 'Fail' in library 'Io' failed: disk full"
    );
    let cause = failure.failure.source().map(ToString::to_string);
    assert_eq!(cause.as_deref(), Some("ENOSPC"));
}

#[test]
fn test_suppressed_name_reports_message_only() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let err = handle.run("fail_quietly", &CallArguments::default()).unwrap_err();
    let KeywordError::Invocation(InvocationError::Failure(failure)) = err else {
        panic!("expected invocation failure");
    };
    assert!(failure.is_name_suppressed());
    assert_eq!(failure.report(), "expected failure");
}

#[test]
fn test_panic_becomes_failure() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let err = handle.run("explode", &CallArguments::default()).unwrap_err();
    let KeywordError::Invocation(InvocationError::Failure(failure)) = err else {
        panic!("expected invocation failure");
    };
    assert_eq!(failure.failure.kind(), "Panic");
    assert_eq!(failure.message(), "keyword panicked: boom");

    // The handle stays usable
    assert!(handle.run("nothing", &CallArguments::default()).is_ok());
}

#[test]
fn test_init_is_validated_not_invoked() {
    let handle = LibraryHandle::new(&library()).unwrap();
    let call = handle
        .validate_init(&CallArguments::new(vec![KwValue::text("/tmp")]))
        .unwrap();
    let err = handle.invoke(&call).unwrap_err();
    let InvocationError::Failure(failure) = err else {
        panic!("expected invocation failure");
    };
    assert_eq!(failure.failure.kind(), "TypeError");

    assert!(matches!(
        handle.validate_init(&CallArguments::default()),
        Err(ResolutionError::ArgumentCountMismatch { .. })
    ));
}
