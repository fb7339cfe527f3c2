//! Argument resolver
//!
//! Chooses the signature a call executes:
//!
//! 1. look the operation up by normalized name
//! 2. keep signatures whose arity accommodates the positional values and
//!    that have a sink if named values were supplied
//! 3. bind every survivor: coerce fixed values in declared order, coerce
//!    overflow values against the variadic element type, fill defaults
//! 4. rank each bound signature by the match rank of every positional value
//!    and pick the one that dominates all others position by position
//!
//! Anything not settled by per-position dominance is reported as ambiguous.

use std::collections::BTreeMap;

use keyway_sdk::{KwValue, TypeKind};
use tracing::{debug, trace};

use crate::call::{CallArguments, CallTarget, ResolvedCall};
use crate::catalog::{Catalog, Operation, OperationState, Signature, SignatureOrigin, INIT_NAME};
use crate::coercion::{CoercionRules, MatchRank};
use crate::error::{CandidateReport, ResolutionError};

/// Signature selection over one catalog
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    rules: &'a CoercionRules,
}

struct Binding {
    signature: usize,
    fixed: Vec<KwValue>,
    varargs: Option<Vec<KwValue>>,
    named: Option<BTreeMap<String, KwValue>>,
    ranks: Vec<MatchRank>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver
    pub fn new(catalog: &'a Catalog, rules: &'a CoercionRules) -> Self {
        Resolver { catalog, rules }
    }

    /// Resolve a call to the operation addressed by `name`
    pub fn resolve(&self, name: &str, args: &CallArguments) -> Result<ResolvedCall, ResolutionError> {
        let operation = self
            .catalog
            .lookup(name)
            .ok_or_else(|| ResolutionError::NoSuchOperation {
                library: self.catalog.library().to_string(),
                name: name.to_string(),
            })?;
        let candidates = arity_candidates(operation, args.positional.len(), args.has_named());
        self.select(operation, &candidates, args)
    }

    /// Validate constructor arguments against the `__init__` operation
    pub fn resolve_init(&self, args: &CallArguments) -> Result<ResolvedCall, ResolutionError> {
        let operation = self
            .catalog
            .init()
            .ok_or_else(|| ResolutionError::NoSuchOperation {
                library: self.catalog.library().to_string(),
                name: INIT_NAME.to_string(),
            })?;
        let candidates = arity_candidates(operation, args.positional.len(), args.has_named());
        self.select(operation, &candidates, args)
    }

    /// Pick among `candidates`, the arity-viable signature indices of
    /// `operation` for the shape of `args`.
    pub fn select(
        &self,
        operation: &Operation,
        candidates: &[usize],
        args: &CallArguments,
    ) -> Result<ResolvedCall, ResolutionError> {
        if let OperationState::Uncallable { reason } = operation.state() {
            return Err(ResolutionError::ArgumentSpecRetrievalFailure {
                operation: operation.printable_name().to_string(),
                reason: reason.clone(),
            });
        }
        if candidates.is_empty() {
            return Err(arity_error(operation, args));
        }

        let mut bound = Vec::with_capacity(candidates.len());
        let mut rejected: BTreeMap<usize, String> = BTreeMap::new();
        for &index in candidates {
            let Some(signature) = operation.signatures().get(index) else {
                continue;
            };
            match self.bind(index, signature, args) {
                Ok(binding) => bound.push(binding),
                Err(reason) => {
                    trace!(
                        keyword = %operation.printable_name(),
                        signature = %signature.describe(operation.printable_name()),
                        reason = %reason,
                        "signature rejected"
                    );
                    rejected.insert(index, reason);
                }
            }
        }

        if bound.is_empty() {
            return Err(coercion_failure(operation, args, rejected));
        }

        let maximal: Vec<usize> = (0..bound.len())
            .filter(|&i| {
                !bound
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && dominates(&other.ranks, &bound[i].ranks))
            })
            .collect();
        match maximal.as_slice() {
            [only] => {
                let winner = bound.swap_remove(*only);
                Ok(self.build_call(operation, winner))
            }
            _ => Err(ResolutionError::AmbiguousSignature {
                operation: operation.printable_name().to_string(),
                argument_types: args.value_types(),
                candidates: maximal
                    .iter()
                    .map(|&i| {
                        operation.signatures()[bound[i].signature]
                            .describe(operation.printable_name())
                    })
                    .collect(),
            }),
        }
    }

    fn bind(
        &self,
        index: usize,
        signature: &Signature,
        args: &CallArguments,
    ) -> Result<Binding, String> {
        let params = signature.params();
        let supplied = args.positional.len().min(params.len());
        let mut ranks = Vec::with_capacity(args.positional.len());
        let mut fixed = Vec::with_capacity(params.len());

        for (i, (value, param)) in args.positional.iter().zip(params).enumerate() {
            let coerced = self
                .rules
                .coerce(value, &param.kind)
                .map_err(|e| format!("argument {} '{}': {}", i + 1, param.name, e))?;
            ranks.push(coerced.rank);
            fixed.push(coerced.value);
        }
        for param in &params[supplied..] {
            match &param.default {
                Some(default) => fixed.push(default.clone()),
                None => return Err(format!("missing value for argument '{}'", param.name)),
            }
        }

        let overflow = &args.positional[supplied..];
        let varargs = match (signature.variadic(), signature.variadic_element(), overflow) {
            // A lone list fills a typed variadic element by element
            (Some(_), Some(elem), [KwValue::List(items)]) if spreads_into(elem) => {
                let mut values = Vec::with_capacity(items.len());
                let mut rank = MatchRank::Exact;
                for item in items {
                    let coerced = self.rules.coerce(item, elem).map_err(|e| {
                        format!("argument {} (varargs list): {}", supplied + 1, e)
                    })?;
                    rank = rank.min(coerced.rank);
                    values.push(coerced.value);
                }
                ranks.push(rank);
                Some(values)
            }
            (Some(_), elem, _) => {
                let mut values = Vec::with_capacity(overflow.len());
                for (i, value) in overflow.iter().enumerate() {
                    match elem {
                        Some(elem) => {
                            let coerced = self.rules.coerce(value, elem).map_err(|e| {
                                format!("argument {} (varargs): {}", supplied + i + 1, e)
                            })?;
                            ranks.push(coerced.rank);
                            values.push(coerced.value);
                        }
                        None => {
                            ranks.push(MatchRank::Exact);
                            values.push(value.clone());
                        }
                    }
                }
                Some(values)
            }
            (None, _, []) => None,
            (None, ..) => {
                return Err(format!("expected {} arguments, got {}", params.len(), args.positional.len()))
            }
        };

        let named = match signature.named() {
            Some(_) => Some(args.named.clone()),
            None if !args.has_named() => None,
            None => return Err("does not accept named arguments".to_string()),
        };

        Ok(Binding {
            signature: index,
            fixed,
            varargs,
            named,
            ranks,
        })
    }

    fn build_call(&self, operation: &Operation, winner: Binding) -> ResolvedCall {
        let signature = &operation.signatures()[winner.signature];
        let target = match signature.origin() {
            SignatureOrigin::Method(handler) => CallTarget::Method(handler.clone()),
            SignatureOrigin::Dynamic(execute) => CallTarget::Dynamic {
                name: operation.name().to_string(),
                execute: execute.clone(),
            },
            SignatureOrigin::Constructor => CallTarget::Constructor,
        };
        let description = signature.describe(operation.printable_name());
        debug!(
            library = %self.catalog.library(),
            keyword = %operation.printable_name(),
            signature = %description,
            "resolved signature"
        );
        ResolvedCall {
            operation: operation.name().to_string(),
            printable: operation.printable_name().to_string(),
            signature: winner.signature,
            description,
            target,
            fixed: winner.fixed,
            varargs: winner.varargs,
            named: winner.named,
            ranks: winner.ranks,
        }
    }
}

/// Indices of the signatures of `operation` that accept `count` positional
/// values (and named values, if `has_named`). Depends only on the catalog
/// and the call shape, so it may be cached per handle.
pub fn arity_candidates(operation: &Operation, count: usize, has_named: bool) -> Vec<usize> {
    operation
        .signatures()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.accepts_count(count) && (!has_named || s.accepts_named()))
        .map(|(i, _)| i)
        .collect()
}

/// `a` is at least as good as `b` everywhere and better somewhere
fn dominates(a: &[MatchRank], b: &[MatchRank]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| x >= y)
        && a.iter().zip(b).any(|(x, y)| x > y)
}

fn arity_description(signature: &Signature) -> String {
    let min = signature.min_arity();
    match signature.max_arity() {
        None => format!("at least {}", min),
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{} to {}", min, max),
    }
}

fn arity_error(operation: &Operation, args: &CallArguments) -> ResolutionError {
    let count = args.positional.len();
    if args.has_named() && operation.signatures().iter().any(|s| s.accepts_count(count)) {
        return ResolutionError::NamedArgumentsRejected {
            operation: operation.printable_name().to_string(),
            names: args.named.keys().cloned().collect(),
        };
    }
    let mut expected: Vec<String> = Vec::new();
    for signature in operation.signatures() {
        let description = arity_description(signature);
        if !expected.contains(&description) {
            expected.push(description);
        }
    }
    ResolutionError::ArgumentCountMismatch {
        operation: operation.printable_name().to_string(),
        expected: expected.join(" or "),
        got: count,
    }
}

fn coercion_failure(
    operation: &Operation,
    args: &CallArguments,
    mut rejected: BTreeMap<usize, String>,
) -> ResolutionError {
    let candidates = operation
        .signatures()
        .iter()
        .enumerate()
        .map(|(i, signature)| {
            let reason = rejected.remove(&i).unwrap_or_else(|| {
                if !signature.accepts_count(args.positional.len()) {
                    format!(
                        "expected {} arguments, got {}",
                        arity_description(signature),
                        args.positional.len()
                    )
                } else {
                    "does not accept named arguments".to_string()
                }
            });
            CandidateReport {
                signature: signature.describe(operation.printable_name()),
                reason,
            }
        })
        .collect();
    ResolutionError::ArgumentCoercionFailure {
        operation: operation.printable_name().to_string(),
        argument_types: args.value_types(),
        candidates,
    }
}

/// Whether a list argument should be spread over a variadic of this element type
fn spreads_into(elem: &TypeKind) -> bool {
    !matches!(elem, TypeKind::Any | TypeKind::Sequence(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspector::Introspector;
    use keyway_sdk::{LibraryInstance, ParamDecl};

    fn catalog(lib: LibraryInstance) -> Catalog {
        Introspector::default().introspect(&lib).unwrap()
    }

    fn noop(_: &[KwValue]) -> keyway_sdk::KwResult<KwValue> {
        Ok(KwValue::Null)
    }

    #[test]
    fn test_dominates() {
        use MatchRank::*;
        assert!(dominates(&[Exact, Exact], &[Exact, Converted]));
        assert!(!dominates(&[Exact, Converted], &[Converted, Exact]));
        assert!(!dominates(&[Exact], &[Exact]));
        assert!(!dominates(&[], &[]));
    }

    #[test]
    fn test_exact_beats_converted() {
        let cat = catalog(
            LibraryInstance::new("Lib")
                .keyword("f", vec![ParamDecl::new("a", TypeKind::INT)], noop)
                .keyword("f", vec![ParamDecl::new("a", TypeKind::Text)], noop),
        );
        let rules = CoercionRules::new();
        let resolver = Resolver::new(&cat, &rules);

        let call = resolver.resolve("f", &vec![KwValue::text("5")].into()).unwrap();
        assert_eq!(call.signature, 1);
        assert_eq!(call.fixed, vec![KwValue::text("5")]);

        let call = resolver.resolve("f", &vec![KwValue::Int(5)].into()).unwrap();
        assert_eq!(call.signature, 0);
    }

    #[test]
    fn test_crossed_conversions_are_ambiguous() {
        let cat = catalog(
            LibraryInstance::new("Lib")
                .keyword(
                    "f",
                    vec![ParamDecl::new("a", TypeKind::INT), ParamDecl::new("b", TypeKind::Text)],
                    noop,
                )
                .keyword(
                    "f",
                    vec![ParamDecl::new("a", TypeKind::Text), ParamDecl::new("b", TypeKind::INT)],
                    noop,
                ),
        );
        let rules = CoercionRules::new();
        let err = Resolver::new(&cat, &rules)
            .resolve("f", &vec![KwValue::text("1"), KwValue::text("2")].into())
            .unwrap_err();
        match err {
            ResolutionError::AmbiguousSignature { candidates, argument_types, .. } => {
                assert_eq!(candidates, vec!["F(int, text)", "F(text, int)"]);
                assert_eq!(argument_types, vec!["text", "text"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let cat = catalog(LibraryInstance::new("Lib").keyword(
            "greet",
            vec![
                ParamDecl::new("name", TypeKind::Text),
                ParamDecl::new("times", TypeKind::INT).with_default(1i64),
            ],
            noop,
        ));
        let rules = CoercionRules::new();
        let call = Resolver::new(&cat, &rules)
            .resolve("Greet", &vec![KwValue::text("x")].into())
            .unwrap();
        assert_eq!(call.fixed, vec![KwValue::text("x"), KwValue::Int(1)]);
        assert_eq!(call.ranks, vec![MatchRank::Exact]);
        assert!(call.varargs.is_none());
        assert!(call.named.is_none());
    }

    #[test]
    fn test_arity_errors() {
        let cat = catalog(
            LibraryInstance::new("Lib")
                .keyword("f", vec![ParamDecl::new("a", TypeKind::INT)], noop)
                .keyword(
                    "f",
                    vec![
                        ParamDecl::new("a", TypeKind::INT),
                        ParamDecl::new("b", TypeKind::INT),
                        ParamDecl::new("c", TypeKind::INT),
                    ],
                    noop,
                ),
        );
        let rules = CoercionRules::new();
        let resolver = Resolver::new(&cat, &rules);
        let err = resolver
            .resolve("f", &vec![KwValue::Int(1), KwValue::Int(2)].into())
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::ArgumentCountMismatch {
                operation: "F".to_string(),
                expected: "1 or 3".to_string(),
                got: 2,
            }
        );

        let err = resolver
            .resolve("f", &CallArguments::new(vec![KwValue::Int(1)]).with_named("x", 1i64))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NamedArgumentsRejected { ref names, .. } if names == &["x"]));
    }

    #[test]
    fn test_no_such_operation() {
        let cat = catalog(LibraryInstance::new("Lib"));
        let rules = CoercionRules::new();
        let err = Resolver::new(&cat, &rules)
            .resolve("missing", &CallArguments::default())
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoSuchOperation {
                library: "Lib".to_string(),
                name: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_variadic_and_sink_binding() {
        let cat = catalog(LibraryInstance::new("Lib").keyword(
            "log",
            vec![
                ParamDecl::new("level", TypeKind::Text),
                ParamDecl::new("parts", TypeKind::sequence_of(TypeKind::INT)),
                ParamDecl::new("options", TypeKind::Mapping),
            ],
            noop,
        ));
        let rules = CoercionRules::new();
        let args = CallArguments::new(vec![KwValue::text("INFO"), KwValue::text("1"), KwValue::Int(2)])
            .with_named("html", true);
        let call = Resolver::new(&cat, &rules).resolve("log", &args).unwrap();
        assert_eq!(call.varargs, Some(vec![KwValue::Int(1), KwValue::Int(2)]));
        assert_eq!(call.named.as_ref().unwrap().get("html"), Some(&KwValue::Bool(true)));
        assert_eq!(call.ranks, vec![MatchRank::Exact, MatchRank::Converted, MatchRank::Exact]);
    }

    #[test]
    fn test_lone_list_spreads_over_typed_variadic() {
        let rules = CoercionRules::new();
        let typed = catalog(LibraryInstance::new("Lib").keyword(
            "sum",
            vec![ParamDecl::new("numbers", TypeKind::sequence_of(TypeKind::INT))],
            noop,
        ));
        let list = CallArguments::new(vec![KwValue::list(vec![KwValue::text("1"), KwValue::Int(2)])]);
        let call = Resolver::new(&typed, &rules).resolve("sum", &list).unwrap();
        assert_eq!(call.varargs, Some(vec![KwValue::Int(1), KwValue::Int(2)]));
        assert_eq!(call.ranks, vec![MatchRank::Converted]);

        // Untyped elements take the list as one value
        let untyped = catalog(LibraryInstance::new("Lib").keyword(
            "sum",
            vec![ParamDecl::new("numbers", TypeKind::Sequence(None))],
            noop,
        ));
        let call = Resolver::new(&untyped, &rules).resolve("sum", &list).unwrap();
        assert_eq!(call.varargs, Some(list.positional.clone()));
    }

    #[test]
    fn test_init_resolution() {
        let cat = catalog(LibraryInstance::new("Lib").constructor(keyway_sdk::ConstructorDecl::new(vec![
            ParamDecl::new("port", TypeKind::INT),
        ])));
        let rules = CoercionRules::new();
        let call = Resolver::new(&cat, &rules)
            .resolve_init(&vec![KwValue::text("8080")].into())
            .unwrap();
        assert_eq!(call.fixed, vec![KwValue::Int(8080)]);
        assert!(matches!(call.target, CallTarget::Constructor));
    }
}
