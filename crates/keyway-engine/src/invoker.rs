//! Invoker
//!
//! Executes a resolved call and normalizes what comes back. Static methods
//! receive the packed arguments (fixed values, one varargs list, one named
//! mapping); the dynamic execute entry point receives the flattened
//! positional values and, in its named form, the named mapping.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use keyway_sdk::{Execute, KeywordFailure, KwResult, KwValue};
use tracing::{debug, trace};

use crate::call::{CallTarget, ResolvedCall};
use crate::error::{InvocationError, InvocationFailure};

/// Normalized result of a successful call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeywordResult {
    /// Returned value; `None` when the keyword returned nothing
    pub value: Option<KwValue>,
    /// Text representation of the value, empty when there is none
    pub display: String,
}

impl KeywordResult {
    /// Result of a keyword that returned nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the keyword returned nothing
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// Executes resolved calls for one library
#[derive(Debug, Clone)]
pub struct Invoker<'a> {
    library: &'a str,
    trace_arguments: bool,
}

impl<'a> Invoker<'a> {
    /// Create an invoker
    pub fn new(library: &'a str) -> Self {
        Invoker {
            library,
            trace_arguments: true,
        }
    }

    /// Enable or disable argument and return value trace events
    pub fn with_trace_arguments(mut self, enabled: bool) -> Self {
        self.trace_arguments = enabled;
        self
    }

    /// Execute `call`
    pub fn invoke(&self, call: &ResolvedCall) -> Result<KeywordResult, InvocationError> {
        let outcome = match &call.target {
            CallTarget::Method(handler) => {
                let args = call.packed_arguments();
                self.trace_call(call, &args);
                guard(|| handler(args.as_slice()))
            }
            CallTarget::Dynamic { name, execute } => {
                let positional = call.flat_positional();
                self.trace_call(call, &positional);
                match execute {
                    Execute::Positional(execute) => guard(|| execute(name.as_str(), positional.as_slice())),
                    Execute::WithNamed(execute) => {
                        let named = call.named.clone().unwrap_or_default();
                        guard(|| execute(name.as_str(), positional.as_slice(), &named))
                    }
                }
            }
            CallTarget::Constructor => Err(KeywordFailure::new(
                "library instances are created by the session manager, not invoked",
            )
            .with_kind("TypeError")),
        };

        let value = outcome.map_err(|failure| {
            let failure = InvocationFailure::new(&call.printable, self.library, failure);
            debug!(
                library = %self.library,
                keyword = %call.printable,
                error = %failure.report(),
                "keyword failed"
            );
            failure
        })?;
        self.normalize(call, value)
    }

    fn normalize(&self, call: &ResolvedCall, value: KwValue) -> Result<KeywordResult, InvocationError> {
        if value.is_null() {
            return Ok(KeywordResult::empty());
        }
        match value.repr() {
            Ok(shown) => {
                if self.trace_arguments {
                    trace!(keyword = %call.printable, result = %shown, "return value");
                }
                Ok(KeywordResult {
                    value: Some(value),
                    display: shown,
                })
            }
            Err(reason) => Err(InvocationError::UnrepresentableResult {
                operation: call.printable.clone(),
                type_name: value.type_name().to_string(),
                reason,
                value,
            }),
        }
    }

    fn trace_call(&self, call: &ResolvedCall, args: &[KwValue]) {
        if self.trace_arguments {
            let rendered = args
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | ");
            trace!(keyword = %call.printable, arguments = %rendered, "arguments");
        }
    }
}

fn guard(call: impl FnOnce() -> KwResult<KwValue>) -> KwResult<KwValue> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(KeywordFailure::new(format!(
            "keyword panicked: {}",
            panic_message(payload.as_ref())
        ))
        .with_kind("Panic")),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::MatchRank;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn method(
        handler: impl Fn(&[KwValue]) -> KwResult<KwValue> + Send + Sync + 'static,
    ) -> CallTarget {
        CallTarget::Method(Arc::new(handler))
    }

    fn call(target: CallTarget, fixed: Vec<KwValue>) -> ResolvedCall {
        ResolvedCall {
            operation: "op".to_string(),
            printable: "Op".to_string(),
            signature: 0,
            description: "Op()".to_string(),
            target,
            fixed,
            varargs: None,
            named: None,
            ranks: vec![MatchRank::Exact],
        }
    }

    #[test]
    fn test_null_becomes_empty_result() {
        let target = method(|_| Ok(KwValue::Null));
        let result = Invoker::new("Lib").invoke(&call(target, vec![])).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.display, "");
    }

    #[test]
    fn test_value_and_display() {
        let target = method(|args| Ok(args[0].clone()));
        let result = Invoker::new("Lib")
            .invoke(&call(target, vec![KwValue::list(vec![KwValue::Int(1), KwValue::text("a")])]))
            .unwrap();
        assert_eq!(result.display, "[1, a]");
    }

    #[test]
    fn test_display_does_not_depend_on_tracing() {
        let target = method(|_| Ok(KwValue::Float(1.5)));
        for traced in [true, false] {
            let result = Invoker::new("Lib")
                .with_trace_arguments(traced)
                .invoke(&call(target.clone(), vec![]))
                .unwrap();
            assert_eq!(result.display, "1.5");
        }
    }

    #[test]
    fn test_failure_is_wrapped() {
        let target = method(|_| Err(KeywordFailure::new("nope").with_kind("ValueError")));
        let err = Invoker::new("Lib").invoke(&call(target, vec![])).unwrap_err();
        match err {
            InvocationError::Failure(failure) => {
                assert_eq!(failure.report(), "ValueError: nope");
                assert_eq!(failure.library, "Lib");
                assert_eq!(failure.operation, "Op");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_panic_is_caught() {
        let target = method(|_| panic!("exploded"));
        let err = Invoker::new("Lib").invoke(&call(target, vec![])).unwrap_err();
        match err {
            InvocationError::Failure(failure) => {
                assert_eq!(failure.message(), "keyword panicked: exploded");
                assert_eq!(failure.failure.kind(), "Panic");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_receives_flat_positional_and_named() {
        let execute = Execute::named(|name, positional, named| {
            Ok(KwValue::text(format!(
                "{}:{}:{}",
                name,
                positional.len(),
                named.len()
            )))
        });
        let mut resolved = call(
            CallTarget::Dynamic {
                name: "my kw".to_string(),
                execute,
            },
            vec![KwValue::Int(1)],
        );
        resolved.varargs = Some(vec![KwValue::Int(2), KwValue::Int(3)]);
        resolved.named = Some(BTreeMap::from([("a".to_string(), KwValue::Int(4))]));
        let result = Invoker::new("Dyn").invoke(&resolved).unwrap();
        assert_eq!(result.value, Some(KwValue::text("my kw:3:1")));
    }

    #[test]
    fn test_constructor_target_is_not_invocable() {
        let err = Invoker::new("Lib")
            .invoke(&call(CallTarget::Constructor, vec![]))
            .unwrap_err();
        assert!(matches!(err, InvocationError::Failure(_)));
    }
}
