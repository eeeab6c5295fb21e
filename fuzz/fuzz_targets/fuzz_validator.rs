#![no_main]

//! Fuzz target for graph validation
//!
//! Checks that validation never panics on arbitrary graphs and that its
//! report agrees with the diagnostics it handed the messager.

use arbitrary::Arbitrary;
use dependency_codegen::prelude::*;
use libfuzzer_sys::fuzz_target;

const TYPE_NAMES: [&str; 8] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta",
];

#[derive(Debug, Arbitrary)]
struct DepSpec {
    ty: u8,
    kind: u8,
    nullable: bool,
}

#[derive(Debug, Arbitrary)]
struct ProvisionSpec {
    ty: u8,
    scoped: bool,
    declared_scope: bool,
    nullable: bool,
    production: bool,
    deps: Vec<DepSpec>,
}

#[derive(Debug, Arbitrary)]
struct ValidatorSpec {
    provisions: Vec<ProvisionSpec>,
    entry_points: Vec<DepSpec>,
    production_component: bool,
}

fn type_ref(index: u8) -> TypeRef {
    TypeRef::declared(ClassName::new(
        "app",
        TYPE_NAMES[index as usize % TYPE_NAMES.len()],
    ))
}

fn request(spec: &DepSpec) -> DependencyRequest {
    let kind = match spec.kind % 3 {
        0 => RequestKind::Instance,
        1 => RequestKind::Provider,
        _ => RequestKind::Lazy,
    };
    let request = DependencyRequest::new(Key::of(type_ref(spec.ty)), kind);
    if spec.nullable {
        request.nullable()
    } else {
        request
    }
}

fuzz_target!(|spec: ValidatorSpec| {
    let declared_scope = Scope::new(ClassName::new("app", "DeclaredScope"));
    let undeclared_scope = Scope::new(ClassName::new("app", "UndeclaredScope"));

    let mut module = ModuleDescriptor::new(ClassName::new("app", "FuzzModule"));
    for (index, provision) in spec.provisions.iter().take(8).enumerate() {
        let scope = if !provision.scoped {
            None
        } else if provision.declared_scope {
            Some(declared_scope.clone())
        } else {
            Some(undeclared_scope.clone())
        };
        module = module.binding(ModuleBindingDecl::Provides {
            method: format!("provide{index}"),
            key: Key::of(type_ref(provision.ty)),
            scope,
            dependencies: provision.deps.iter().take(4).map(request).collect(),
            is_static: true,
            nullable: provision.nullable,
            multibinding: None,
            is_production: provision.production,
        });
    }

    let mut component = ComponentDescriptor::new(ClassName::new("app", "FuzzComponent"))
        .scope(declared_scope)
        .module(ClassName::new("app", "FuzzModule"));
    if spec.production_component {
        component = component.production();
    }
    for (index, entry) in spec.entry_points.iter().take(6).enumerate() {
        component = component.entry_point(EntryPoint::new(
            format!("entry{index}"),
            request(entry).key().ty().clone(),
        ));
    }

    let model = TypeModel::new().module(module.clone());
    let Ok(graph) = BindingGraphBuilder::build(&component, &model) else {
        return;
    };

    let messager = CollectingMessager::new();
    let report = validate(&graph, &messager);

    let diagnostics = messager.take();
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    assert_eq!(report.error_count, errors);
    assert_eq!(report.warning_count, warnings);

    // A graph with unresolved keys is never clean.
    if !graph.missing().is_empty() {
        assert!(!report.is_clean());
    }
});
