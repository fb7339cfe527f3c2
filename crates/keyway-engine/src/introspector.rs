//! Library introspection
//!
//! Classifies a library instance once and builds its catalog:
//!
//! - static: every public method is a keyword, same-named methods are
//!   overloads
//! - hybrid: the name-listing entry point selects which static methods are
//!   keywords
//! - dynamic: names come from the discovery protocol and argument specs are
//!   fetched per name. A failing spec leaves that one keyword registered but
//!   uncallable. A `**kwargs` spec without a named-capable execute entry
//!   point rejects that keyword only.
//!
//! Dynamic and hybrid keywords keep the names the library lists.

use keyway_sdk::{ConstructorDecl, Discovery, Execute, LibraryInstance, MethodDecl, Visibility};
use tracing::{debug, error, warn};

use crate::argspec::{parse_types, ArgSpec};
use crate::catalog::{
    Annotations, Catalog, LibraryKind, Operation, OperationState, Signature, SignatureOrigin,
    INIT_NAME,
};
use crate::coercion::CoercionRules;
use crate::error::CatalogError;
use crate::name::printable_name;

/// Decide how a library exposes its keywords
pub fn classify(instance: &LibraryInstance) -> LibraryKind {
    match instance.discovery() {
        Some(discovery) if discovery.execute.is_some() => LibraryKind::Dynamic,
        Some(_) => LibraryKind::Hybrid,
        None => LibraryKind::Static,
    }
}

/// Builds catalogs from library instances
#[derive(Debug, Clone, Default)]
pub struct Introspector {
    rules: CoercionRules,
}

impl Introspector {
    /// Create an introspector; `rules` coerce dynamic default values
    pub fn new(rules: CoercionRules) -> Self {
        Introspector { rules }
    }

    /// Build the catalog of `instance`
    pub fn introspect(&self, instance: &LibraryInstance) -> Result<Catalog, CatalogError> {
        let kind = classify(instance);
        let mut catalog = Catalog::new(
            instance.name(),
            kind,
            instance.scope(),
            instance.doc(),
            instance.discovery().cloned(),
        );

        match (kind, instance.discovery()) {
            (LibraryKind::Dynamic, Some(discovery)) => {
                self.add_dynamic(&mut catalog, instance.name(), discovery)?
            }
            (LibraryKind::Hybrid, Some(discovery)) => {
                let names = list_names(instance.name(), discovery)?;
                add_hybrid(&mut catalog, instance, &names)?;
            }
            _ => {
                for method in instance.methods().iter().filter(|m| m.is_public()) {
                    add_method(&mut catalog, method, &printable_name(&method.name))?;
                }
            }
        }

        if let Some(init) = init_operation(instance.constructors(), kind)? {
            catalog.set_init(init);
        }

        debug!(
            library = %instance.name(),
            kind = %kind,
            keywords = catalog.operations().len(),
            signatures = catalog.signature_count(),
            "library introspected"
        );
        Ok(catalog)
    }

    fn add_dynamic(
        &self,
        catalog: &mut Catalog,
        library: &str,
        discovery: &Discovery,
    ) -> Result<(), CatalogError> {
        let Some(execute) = &discovery.execute else {
            return Ok(());
        };
        for name in list_names(library, discovery)? {
            if catalog.position(&name).is_some() {
                warn!(library = %library, keyword = %name, "duplicate keyword name skipped");
                continue;
            }
            let operation = match self.dynamic_operation(library, &name, discovery, execute) {
                Ok(operation) => operation,
                Err(e) => {
                    error!(library = %library, keyword = %name, error = %e, "keyword rejected");
                    catalog.reject(e);
                    continue;
                }
            };
            match operation.state() {
                OperationState::Uncallable { reason } => {
                    warn!(library = %library, keyword = %name, reason = %reason, "keyword registered as uncallable")
                }
                OperationState::Callable => debug!(library = %library, keyword = %name, "created keyword"),
            }
            catalog.insert(operation);
        }
        Ok(())
    }

    fn dynamic_operation(
        &self,
        library: &str,
        name: &str,
        discovery: &Discovery,
        execute: &Execute,
    ) -> Result<Operation, CatalogError> {
        let base = Operation::new(name, name, Vec::new(), Annotations::default())
            .with_lazy_annotations();

        let Some(get_spec) = &discovery.argument_spec else {
            let mut operation = base;
            operation.push_signature(Signature::unchecked(execute.clone()));
            return Ok(operation);
        };
        let entries = match get_spec(name) {
            Ok(entries) => entries,
            Err(e) => {
                return Ok(base.uncallable(format!(
                    "getting argument specification failed: {}",
                    e.message()
                )))
            }
        };
        let spec = match ArgSpec::parse(&entries) {
            Ok(spec) => spec,
            Err(e) => return Ok(base.uncallable(format!("invalid argument specification: {}", e))),
        };
        if spec.kwargs.is_some() && !execute.supports_named() {
            return Err(CatalogError::NamedArgumentsUnsupported {
                library: library.to_string(),
                operation: name.to_string(),
            });
        }
        let types = match &discovery.argument_types {
            None => Vec::new(),
            Some(get_types) => match get_types(name) {
                Ok(names) => match parse_types(&names) {
                    Ok(types) => types,
                    Err(e) => return Ok(base.uncallable(format!("invalid argument types: {}", e))),
                },
                Err(e) => {
                    return Ok(base.uncallable(format!(
                        "getting argument types failed: {}",
                        e.message()
                    )))
                }
            },
        };
        let params = match spec.to_params(&types, &self.rules) {
            Ok(params) => params,
            Err(e) => return Ok(base.uncallable(format!("invalid argument specification: {}", e))),
        };
        let mut operation = base;
        operation.push_signature(Signature::from_parts(
            params.params,
            params.variadic,
            params.named,
            SignatureOrigin::Dynamic(execute.clone()),
        ));
        Ok(operation)
    }
}

fn list_names(library: &str, discovery: &Discovery) -> Result<Vec<String>, CatalogError> {
    (discovery.list_names)().map_err(|e| CatalogError::KeywordNamesUnavailable {
        library: library.to_string(),
        reason: e.message().to_string(),
    })
}

fn add_hybrid(
    catalog: &mut Catalog,
    instance: &LibraryInstance,
    names: &[String],
) -> Result<(), CatalogError> {
    for name in names {
        let mut found = false;
        for method in instance
            .methods()
            .iter()
            .filter(|m| m.is_public() && &m.name == name)
        {
            add_method(catalog, method, name)?;
            found = true;
        }
        if !found {
            warn!(library = %instance.name(), keyword = %name, "listed keyword has no public method, skipped");
        }
    }
    Ok(())
}

fn add_method(catalog: &mut Catalog, method: &MethodDecl, shown: &str) -> Result<(), CatalogError> {
    let signature = Signature::from_params(
        &method.name,
        method.params.clone(),
        SignatureOrigin::Method(method.handler.clone()),
    )?;
    let annotations =
        Annotations::from_parts(method.doc.as_deref().unwrap_or_default(), method.tags.clone());
    let operation = Operation::new(
        &method.name,
        shown,
        vec![signature],
        annotations,
    );
    if catalog.insert(operation) {
        debug!(library = %catalog.library(), keyword = %method.name, "created keyword");
    } else {
        debug!(library = %catalog.library(), keyword = %method.name, "added overload");
    }
    Ok(())
}

/// Constructors as the `__init__` operation. No declared constructor means
/// an implicit one without parameters; only private ones means none.
fn init_operation(
    constructors: &[ConstructorDecl],
    kind: LibraryKind,
) -> Result<Option<Operation>, CatalogError> {
    let signatures: Vec<Signature> = if constructors.is_empty() {
        vec![Signature::from_parts(Vec::new(), None, None, SignatureOrigin::Constructor)]
    } else {
        constructors
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .map(|c| Signature::from_params(INIT_NAME, c.params.clone(), SignatureOrigin::Constructor))
            .collect::<Result<_, _>>()?
    };
    if signatures.is_empty() {
        return Ok(None);
    }
    let doc = constructors
        .iter()
        .filter(|c| c.visibility == Visibility::Public)
        .find_map(|c| c.doc.as_deref())
        .unwrap_or_default();
    let operation = Operation::new(INIT_NAME, INIT_NAME, signatures, Annotations::from_parts(doc, Vec::new()));
    Ok(Some(match kind {
        LibraryKind::Dynamic => operation.with_lazy_annotations(),
        _ => operation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyway_sdk::{KeywordFailure, KwValue, ParamDecl, TypeKind};

    fn introspect(instance: &LibraryInstance) -> Result<Catalog, CatalogError> {
        Introspector::default().introspect(instance)
    }

    #[test]
    fn test_classify() {
        let plain = LibraryInstance::new("A");
        let hybrid = LibraryInstance::new("B").with_discovery(Discovery::new(|| Ok(vec![])));
        let dynamic = LibraryInstance::new("C")
            .with_discovery(Discovery::new(|| Ok(vec![])).with_execute(|_, _| Ok(KwValue::Null)));
        assert_eq!(classify(&plain), LibraryKind::Static);
        assert_eq!(classify(&hybrid), LibraryKind::Hybrid);
        assert_eq!(classify(&dynamic), LibraryKind::Dynamic);
    }

    #[test]
    fn test_static_skips_non_public() {
        let lib = LibraryInstance::new("Lib")
            .keyword("visible", vec![], |_| Ok(KwValue::Null))
            .keyword("_hidden", vec![], |_| Ok(KwValue::Null))
            .method(
                MethodDecl::new("private_one", vec![], |_| Ok(KwValue::Null))
                    .with_visibility(Visibility::Private),
            );
        let catalog = introspect(&lib).unwrap();
        assert_eq!(catalog.operations().len(), 1);
        assert_eq!(catalog.operations()[0].printable_name(), "Visible");
    }

    #[test]
    fn test_static_doc_and_tags() {
        let lib = LibraryInstance::new("Lib").method(
            MethodDecl::new("tagged", vec![], |_| Ok(KwValue::Null))
                .with_doc("Does it.\nTags: b, c")
                .with_tags(["a", "b"]),
        );
        let catalog = introspect(&lib).unwrap();
        let annotations = catalog.annotations(catalog.lookup("tagged").unwrap());
        assert_eq!(annotations.doc, "Does it.");
        assert_eq!(annotations.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_hybrid_uses_listed_methods() {
        let lib = LibraryInstance::new("Hybrid")
            .keyword("listed", vec![], |_| Ok(KwValue::Null))
            .keyword("unlisted", vec![], |_| Ok(KwValue::Null))
            .with_discovery(Discovery::new(|| {
                Ok(vec!["listed".to_string(), "ghost".to_string()])
            }));
        let catalog = introspect(&lib).unwrap();
        assert_eq!(catalog.kind(), LibraryKind::Hybrid);
        assert!(catalog.lookup("listed").is_some());
        assert!(catalog.lookup("unlisted").is_none());
        assert!(catalog.lookup("ghost").is_none());
    }

    #[test]
    fn test_name_listing_failure_is_fatal() {
        let lib = LibraryInstance::new("Broken").with_discovery(
            Discovery::new(|| Err(KeywordFailure::new("no names")))
                .with_execute(|_, _| Ok(KwValue::Null)),
        );
        let err = introspect(&lib).unwrap_err();
        assert_eq!(
            err,
            CatalogError::KeywordNamesUnavailable {
                library: "Broken".to_string(),
                reason: "no names".to_string(),
            }
        );
    }

    #[test]
    fn test_dynamic_without_spec_accepts_anything() {
        let lib = LibraryInstance::new("Dyn").with_discovery(
            Discovery::new(|| Ok(vec!["Anything".to_string()]))
                .with_named_execute(|_, _, _| Ok(KwValue::Null)),
        );
        let catalog = introspect(&lib).unwrap();
        let op = catalog.lookup("anything").unwrap();
        assert_eq!(op.signatures().len(), 1);
        assert!(op.signatures()[0].accepts_count(7));
        assert!(op.signatures()[0].accepts_named());
    }

    #[test]
    fn test_kwargs_without_named_execute_rejects_only_that_keyword() {
        let lib = LibraryInstance::new("Dyn").with_discovery(
            Discovery::new(|| Ok(vec!["plain".to_string(), "options".to_string()]))
                .with_argument_spec(|name| {
                    Ok(match name {
                        "options" => vec!["a".to_string(), "**kw".to_string()],
                        _ => vec!["a".to_string()],
                    })
                })
                .with_execute(|_, _| Ok(KwValue::Null)),
        );
        let catalog = introspect(&lib).unwrap();
        assert!(catalog.lookup("plain").unwrap().is_callable());
        assert!(catalog.lookup("options").is_none());
        assert_eq!(
            catalog.rejected(),
            &[CatalogError::NamedArgumentsUnsupported {
                library: "Dyn".to_string(),
                operation: "options".to_string(),
            }]
        );
    }

    #[test]
    fn test_listed_names_are_kept_verbatim() {
        let dynamic = LibraryInstance::new("Dyn").with_discovery(
            Discovery::new(|| Ok(vec!["open_session".to_string()]))
                .with_execute(|_, _| Ok(KwValue::Null)),
        );
        let catalog = introspect(&dynamic).unwrap();
        assert_eq!(catalog.lookup("Open Session").unwrap().printable_name(), "open_session");

        let hybrid = LibraryInstance::new("Hyb")
            .keyword("closeSession", vec![], |_| Ok(KwValue::Null))
            .with_discovery(Discovery::new(|| Ok(vec!["closeSession".to_string()])));
        let catalog = introspect(&hybrid).unwrap();
        assert_eq!(catalog.operations()[0].printable_name(), "closeSession");
    }

    #[test]
    fn test_malformed_spec_is_uncallable() {
        let lib = LibraryInstance::new("Dyn").with_discovery(
            Discovery::new(|| Ok(vec!["bad".to_string(), "good".to_string()]))
                .with_argument_spec(|name| {
                    Ok(match name {
                        "bad" => vec!["a=1".to_string(), "b".to_string()],
                        _ => vec!["a".to_string()],
                    })
                })
                .with_execute(|_, _| Ok(KwValue::Null)),
        );
        let catalog = introspect(&lib).unwrap();
        assert!(!catalog.lookup("bad").unwrap().is_callable());
        assert!(catalog.lookup("good").unwrap().is_callable());
    }

    #[test]
    fn test_constructors_become_init() {
        let lib = LibraryInstance::new("Lib")
            .constructor(
                ConstructorDecl::new(vec![ParamDecl::new("host", TypeKind::Text)])
                    .with_doc("Connects."),
            )
            .constructor(
                ConstructorDecl::new(vec![]).with_visibility(Visibility::Private),
            );
        let catalog = introspect(&lib).unwrap();
        let init = catalog.init().unwrap();
        assert_eq!(init.signatures().len(), 1);
        assert_eq!(catalog.annotations(init).doc, "Connects.");

        let private_only = LibraryInstance::new("Lib").constructor(
            ConstructorDecl::new(vec![]).with_visibility(Visibility::Internal),
        );
        assert!(introspect(&private_only).unwrap().init().is_none());

        let implicit = LibraryInstance::new("Lib");
        let catalog = introspect(&implicit).unwrap();
        assert_eq!(catalog.init().unwrap().signatures()[0].max_arity(), Some(0));
    }
}
