#![no_main]

//! Fuzz target for the full pipeline
//!
//! Drives arbitrary inputs through the driver in both emission modes and
//! checks the two cross-mode guarantees: emission is deterministic, and the
//! generated public surface is identical in default and fast-init mode.

use arbitrary::Arbitrary;
use dependency_codegen::prelude::*;
use libfuzzer_sys::fuzz_target;

const TYPE_NAMES: [&str; 8] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta",
];

#[derive(Debug, Arbitrary)]
struct DepSpec {
    ty: u8,
    provider: bool,
}

#[derive(Debug, Arbitrary)]
struct InjectableSpec {
    ty: u8,
    scoped: bool,
    deps: Vec<DepSpec>,
}

#[derive(Debug, Arbitrary)]
struct EmissionSpec {
    injectables: Vec<InjectableSpec>,
    entry_points: Vec<DepSpec>,
}

fn type_ref(index: u8) -> TypeRef {
    TypeRef::declared(ClassName::new(
        "app",
        TYPE_NAMES[index as usize % TYPE_NAMES.len()],
    ))
}

fn build_input(spec: &EmissionSpec) -> ProcessingInput {
    let scope = Scope::new(ClassName::new("app", "FuzzScope"));
    let mut model = TypeModel::new();
    for injectable in spec.injectables.iter().take(8) {
        let mut builder = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", TYPE_NAMES[injectable.ty as usize % TYPE_NAMES.len()]),
            Visibility::Public,
        ));
        if injectable.scoped {
            builder = builder.scoped(scope.clone());
        }
        for dep in injectable.deps.iter().take(3) {
            let kind = if dep.provider {
                RequestKind::Provider
            } else {
                RequestKind::Instance
            };
            builder = builder.dependency(DependencyRequest::new(Key::of(type_ref(dep.ty)), kind));
        }
        model = model.injectable(builder);
    }

    let mut component =
        ComponentDescriptor::new(ClassName::new("app", "FuzzComponent")).scope(scope);
    for (index, entry) in spec.entry_points.iter().take(5).enumerate() {
        let returned = if entry.provider {
            TypeRef::generic(
                dependency_codegen::key::well_known::PROVIDER.clone(),
                vec![type_ref(entry.ty)],
            )
        } else {
            type_ref(entry.ty)
        };
        component = component.entry_point(EntryPoint::new(format!("entry{index}"), returned));
    }

    ProcessingInput {
        components: vec![component],
        model,
    }
}

fn run(input: ProcessingInput, fast_init: bool) -> Option<Vec<SourceFile>> {
    let messager = CollectingMessager::new();
    let options = CompilerOptions::builder().fast_init(fast_init).build();
    match process_to_memory(input, options, &messager) {
        Ok((_, files)) => Some(files),
        Err(_) => None,
    }
}

fn public_surface(files: &[SourceFile]) -> Vec<String> {
    let mut names: Vec<String> = files
        .iter()
        .flat_map(|f| {
            f.type_spec
                .methods
                .iter()
                .filter(|m| {
                    m.modifiers
                        .contains(&dependency_codegen::ast::Modifier::Override)
                })
                .map(|m| m.name.clone())
        })
        .collect();
    names.sort();
    names
}

fuzz_target!(|spec: EmissionSpec| {
    let input = build_input(&spec);

    let Some(first) = run(input.clone(), false) else {
        return;
    };
    let second = run(input.clone(), false).expect("second run failed where first succeeded");
    assert_eq!(first, second, "emission must be deterministic");

    if let Some(fast) = run(input, true) {
        assert_eq!(
            public_surface(&first),
            public_surface(&fast),
            "modes must agree on the public surface"
        );
    }
});
