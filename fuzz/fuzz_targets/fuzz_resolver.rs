#![no_main]

//! Fuzz target for the binding graph builder
//!
//! Generates arbitrary declarative inputs and checks that resolution never
//! panics and is deterministic: two builds from the same spec produce the
//! same node sequence.

use arbitrary::Arbitrary;
use dependency_codegen::prelude::*;
use libfuzzer_sys::fuzz_target;

const TYPE_NAMES: [&str; 10] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa",
];

#[derive(Debug, Arbitrary)]
struct DepSpec {
    ty: u8,
    kind: u8,
}

#[derive(Debug, Arbitrary)]
struct InjectableSpec {
    ty: u8,
    scoped: bool,
    reusable: bool,
    deps: Vec<DepSpec>,
}

#[derive(Debug, Arbitrary)]
struct ProvisionSpec {
    ty: u8,
    is_static: bool,
    scoped: bool,
    deps: Vec<DepSpec>,
}

#[derive(Debug, Arbitrary)]
struct BindSpec {
    ty: u8,
    source: u8,
    scoped: bool,
}

#[derive(Debug, Arbitrary)]
struct GraphSpec {
    injectables: Vec<InjectableSpec>,
    provisions: Vec<ProvisionSpec>,
    binds: Vec<BindSpec>,
    entry_points: Vec<DepSpec>,
}

fn type_ref(index: u8) -> TypeRef {
    TypeRef::declared(ClassName::new("app", TYPE_NAMES[index as usize % TYPE_NAMES.len()]))
}

fn request(spec: &DepSpec) -> DependencyRequest {
    let kind = match spec.kind % 4 {
        0 => RequestKind::Instance,
        1 => RequestKind::Provider,
        2 => RequestKind::Lazy,
        _ => RequestKind::ProviderOfLazy,
    };
    DependencyRequest::new(Key::of(type_ref(spec.ty)), kind)
}

fn scope_for(scoped: bool, reusable: bool) -> Option<Scope> {
    if !scoped {
        None
    } else if reusable {
        Some(Scope::reusable())
    } else {
        Some(Scope::new(ClassName::new("app", "FuzzScope")))
    }
}

fn build_input(spec: &GraphSpec) -> (ComponentDescriptor, TypeModel) {
    let mut model = TypeModel::new();
    for injectable in spec.injectables.iter().take(8) {
        let mut builder = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", TYPE_NAMES[injectable.ty as usize % TYPE_NAMES.len()]),
            Visibility::Public,
        ));
        if let Some(scope) = scope_for(injectable.scoped, injectable.reusable) {
            builder = builder.scoped(scope);
        }
        for dep in injectable.deps.iter().take(4) {
            builder = builder.dependency(request(dep));
        }
        model = model.injectable(builder);
    }

    let mut module = ModuleDescriptor::new(ClassName::new("app", "FuzzModule")).abstract_module();
    for (index, provision) in spec.provisions.iter().take(8).enumerate() {
        module = module.binding(ModuleBindingDecl::Provides {
            method: format!("provide{index}"),
            key: Key::of(type_ref(provision.ty)),
            scope: scope_for(provision.scoped, false),
            dependencies: provision.deps.iter().take(4).map(request).collect(),
            is_static: provision.is_static,
            nullable: false,
            multibinding: None,
            is_production: false,
        });
    }
    for (index, bind) in spec.binds.iter().take(8).enumerate() {
        module = module.binding(ModuleBindingDecl::Binds {
            method: format!("bind{index}"),
            key: Key::of(type_ref(bind.ty)),
            source: DependencyRequest::new(
                Key::of(type_ref(bind.source)),
                RequestKind::Instance,
            ),
            scope: scope_for(bind.scoped, false),
            multibinding: None,
        });
    }
    model = model.module(module);

    let mut component = ComponentDescriptor::new(ClassName::new("app", "FuzzComponent"))
        .scope(Scope::new(ClassName::new("app", "FuzzScope")))
        .module(ClassName::new("app", "FuzzModule"));
    for (index, entry) in spec.entry_points.iter().take(6).enumerate() {
        let req = request(entry);
        let returned = match req.kind() {
            RequestKind::Provider => TypeRef::generic(
                dependency_codegen::key::well_known::PROVIDER.clone(),
                vec![req.key().ty().clone()],
            ),
            RequestKind::Lazy => TypeRef::generic(
                dependency_codegen::key::well_known::LAZY.clone(),
                vec![req.key().ty().clone()],
            ),
            _ => req.key().ty().clone(),
        };
        component = component.entry_point(EntryPoint::new(format!("entry{index}"), returned));
    }
    (component, model)
}

fuzz_target!(|spec: GraphSpec| {
    let (component, model) = build_input(&spec);

    let Ok(graph) = BindingGraphBuilder::build(&component, &model) else {
        return;
    };
    let Ok(again) = BindingGraphBuilder::build(&component, &model) else {
        return;
    };

    // Resolution is deterministic.
    let keys: Vec<String> = graph
        .nodes()
        .iter()
        .map(|n| n.binding.key().to_string())
        .collect();
    let keys_again: Vec<String> = again
        .nodes()
        .iter()
        .map(|n| n.binding.key().to_string())
        .collect();
    assert_eq!(keys, keys_again);

    // Every root either resolved or was recorded missing.
    for root in graph.roots() {
        if graph.resolve_request(&root.request).is_none() {
            assert!(graph.missing().contains(root.request.key()));
        }
    }

    // Cycle detection never panics and respects the restriction to
    // instance edges.
    for cycle in graph.instance_cycles() {
        assert!(!cycle.is_empty());
    }
});
