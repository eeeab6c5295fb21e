//! Instance supplier strategies
//!
//! Three mutually exclusive strategies hand a framework instance to the
//! component implementation:
//!
//! 1. a reference to a pre-generated static factory,
//! 2. a component provider field initialized in the initialize sequence,
//! 3. in fast-init mode, one switching-provider dispatcher per component
//!    covering many bindings through an integer id.
//!
//! Strategy choice is a pure function of (binding, mode); memoization
//! wrappers compose over whatever the strategy produced.

use crate::ast::Expr;
use crate::binding::{Binding, BindingKind, CachingKind};
use crate::config::CompilerOptions;
use crate::key::{well_known, ClassName, TypeRef};

/// Which supplier materializes the framework instance for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplierStrategy {
    StaticFactory,
    ProviderField,
    SwitchingProvider,
}

/// Choose the supplier for a binding.
///
/// Fast-init prefers the switching provider wherever it applies, then a
/// static factory, then a field; default mode never uses the dispatcher.
pub fn select_supplier(binding: &Binding, options: CompilerOptions) -> SupplierStrategy {
    if options.fast_init && uses_switching_provider(binding) {
        SupplierStrategy::SwitchingProvider
    } else if uses_static_factory_creation(binding, options.fast_init) {
        SupplierStrategy::StaticFactory
    } else {
        SupplierStrategy::ProviderField
    }
}

/// Whether the binding's framework instance can be a bare reference to its
/// pre-generated static `create()` factory: nothing captured per component,
/// no caching, and not fast-init for the class-loading kinds.
pub fn uses_static_factory_creation(binding: &Binding, fast_init: bool) -> bool {
    if !binding.dependencies().is_empty() || binding.scope().is_some() {
        return false;
    }
    match binding.kind() {
        BindingKind::MultiboundSet | BindingKind::MultiboundMap => true,
        BindingKind::Provision => !fast_init && !binding.requires_module_instance(),
        BindingKind::Injection => !fast_init,
        _ => false,
    }
}

/// Whether a binding participates in the switching-provider dispatcher in
/// fast-init mode.
pub fn uses_switching_provider(binding: &Binding) -> bool {
    match binding.kind() {
        // The backing instance already exists for these kinds; a dispatcher
        // case would only add indirection.
        BindingKind::AssistedInjection
        | BindingKind::BoundInstance
        | BindingKind::Component
        | BindingKind::ComponentDependency
        | BindingKind::Delegate
        | BindingKind::MembersInjector => false,
        // Empty aggregates are served by shared singleton factories.
        BindingKind::MultiboundSet | BindingKind::MultiboundMap | BindingKind::Optional => {
            !binding.dependencies().is_empty()
        }
        BindingKind::Injection
        | BindingKind::Provision
        | BindingKind::AssistedFactory
        | BindingKind::ComponentProvision
        | BindingKind::SubcomponentCreator
        | BindingKind::Production
        | BindingKind::ComponentProduction
        | BindingKind::MembersInjection => true,
    }
}

/// Compose the memoization wrapper a caching strength demands.
///
/// Double check gives publication-safe single-instance semantics; single
/// check only eventual single-instance without cross-thread publication.
/// Switching providers are not thread-safe on their own, so a scoped
/// dispatcher case always goes through one of these.
pub fn wrap_caching(caching: CachingKind, provider: Expr) -> Expr {
    match caching {
        CachingKind::None => provider,
        CachingKind::SingleCheck => {
            Expr::static_call(well_known::SINGLE_CHECK.clone(), "provider", vec![provider])
        }
        CachingKind::DoubleCheck => {
            Expr::static_call(well_known::DOUBLE_CHECK.clone(), "provider", vec![provider])
        }
    }
}

// =============================================================================
// Generated factory naming
// =============================================================================

/// Capitalize the first character of a method name.
fn capitalized(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Name of the pre-generated static factory type for a constructor-backed
/// type: `Foo_Factory`, flattening nesting.
pub fn constructor_factory_name(constructed: &ClassName) -> ClassName {
    constructed.peer(format!("{}_Factory", constructed.joined_simple_names()))
}

/// Name of the pre-generated factory for a module method:
/// `TestModule_ProvideStringFactory`.
pub fn module_method_factory_name(module: &ClassName, method: &str) -> ClassName {
    module.peer(format!(
        "{}_{}Factory",
        module.joined_simple_names(),
        capitalized(method)
    ))
}

/// Name of the pre-generated members injector for a type:
/// `Foo_MembersInjector`.
pub fn members_injector_name(target: &ClassName) -> ClassName {
    target.peer(format!("{}_MembersInjector", target.joined_simple_names()))
}

/// Name of the generated implementation of an assisted factory interface:
/// `JobFactory_Impl`.
pub fn assisted_factory_impl_name(factory: &ClassName) -> ClassName {
    factory.peer(format!("{}_Impl", factory.joined_simple_names()))
}

/// The static factory type for whatever a binding's payload names, when the
/// kind has one.
pub fn static_factory_name(binding: &Binding) -> Option<ClassName> {
    use crate::binding::BindingPayload;
    match binding.payload() {
        BindingPayload::Constructor { constructed, .. } => {
            Some(constructor_factory_name(constructed.name()))
        }
        BindingPayload::ModuleMethod { module, method, .. } => {
            Some(module_method_factory_name(module, method))
        }
        BindingPayload::AssistedFactory { factory, .. } => {
            Some(assisted_factory_impl_name(factory.name()))
        }
        BindingPayload::MembersTarget { target } => match target {
            TypeRef::Declared(d) => Some(members_injector_name(d.name())),
            TypeRef::Wildcard(_) => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingPayload, DependencyRequest, Scope};
    use crate::key::{Key, RequestKind};

    fn options(fast_init: bool) -> CompilerOptions {
        CompilerOptions::builder().fast_init(fast_init).build()
    }

    fn key(name: &str) -> Key {
        Key::of(TypeRef::declared(ClassName::new("app", name)))
    }

    fn provision(is_static: bool, deps: Vec<DependencyRequest>) -> Binding {
        Binding::new(
            key("Service"),
            BindingKind::Provision,
            "app",
            BindingPayload::ModuleMethod {
                module: ClassName::new("app", "M"),
                method: "provideService".into(),
                requires_module_instance: !is_static,
            },
        )
        .with_dependencies(deps)
    }

    #[test]
    fn test_static_factory_for_no_dep_static_provision() {
        let binding = provision(true, vec![]);
        assert!(uses_static_factory_creation(&binding, false));
        assert_eq!(
            select_supplier(&binding, options(false)),
            SupplierStrategy::StaticFactory
        );
        // Fast-init prefers the dispatcher even here.
        assert_eq!(
            select_supplier(&binding, options(true)),
            SupplierStrategy::SwitchingProvider
        );
    }

    #[test]
    fn test_provider_field_for_captured_dependencies() {
        let binding = provision(
            true,
            vec![DependencyRequest::new(key("Dep"), RequestKind::Provider)],
        );
        assert!(!uses_static_factory_creation(&binding, false));
        assert_eq!(
            select_supplier(&binding, options(false)),
            SupplierStrategy::ProviderField
        );
    }

    #[test]
    fn test_scoped_binding_never_static() {
        let binding = provision(true, vec![]).scoped(Some(Scope::reusable()));
        assert!(!uses_static_factory_creation(&binding, false));
    }

    #[test]
    fn test_module_instance_blocks_static_factory() {
        let binding = provision(false, vec![]);
        assert!(!uses_static_factory_creation(&binding, false));
    }

    #[test]
    fn test_switching_provider_exclusions() {
        let delegate = Binding::new(
            key("Iface"),
            BindingKind::Delegate,
            "app",
            BindingPayload::Delegate {
                source: key("Impl"),
                method: "bindIface".into(),
            },
        )
        .with_dependencies(vec![DependencyRequest::new(
            key("Impl"),
            RequestKind::Instance,
        )]);
        assert!(!uses_switching_provider(&delegate));
        assert_eq!(
            select_supplier(&delegate, options(true)),
            SupplierStrategy::ProviderField
        );

        let bound = Binding::new(
            key("Config"),
            BindingKind::BoundInstance,
            "app",
            BindingPayload::BoundInstance {
                parameter: "config".into(),
            },
        );
        assert!(!uses_switching_provider(&bound));
    }

    #[test]
    fn test_empty_aggregates_skip_dispatcher() {
        let empty_set = Binding::new(
            key("Plugins"),
            BindingKind::MultiboundSet,
            "app",
            BindingPayload::SetContributions {
                contributions: vec![],
            },
        );
        assert!(!uses_switching_provider(&empty_set));
        // An empty aggregate is still a static singleton factory.
        assert!(uses_static_factory_creation(&empty_set, true));

        let populated = Binding::new(
            key("Plugins"),
            BindingKind::MultiboundSet,
            "app",
            BindingPayload::SetContributions {
                contributions: vec![key("Plugin")],
            },
        )
        .with_dependencies(vec![DependencyRequest::new(
            key("Plugin"),
            RequestKind::Instance,
        )]);
        assert!(uses_switching_provider(&populated));
    }

    #[test]
    fn test_caching_wrappers() {
        let provider = Expr::var("fooProvider");
        assert_eq!(wrap_caching(CachingKind::None, provider.clone()), provider);

        let single = wrap_caching(CachingKind::SingleCheck, provider.clone());
        match &single {
            Expr::StaticCall { ty, method, .. } => {
                assert_eq!(ty.simple_name(), "SingleCheck");
                assert_eq!(method, "provider");
            }
            other => panic!("unexpected {other:?}"),
        }

        let double = wrap_caching(CachingKind::DoubleCheck, provider);
        match &double {
            Expr::StaticCall { ty, .. } => assert_eq!(ty.simple_name(), "DoubleCheck"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_factory_names() {
        assert_eq!(
            constructor_factory_name(&ClassName::new("app", "Foo")).canonical_name(),
            "app.Foo_Factory"
        );
        assert_eq!(
            module_method_factory_name(&ClassName::new("app", "TestModule"), "provideString")
                .canonical_name(),
            "app.TestModule_ProvideStringFactory"
        );
        assert_eq!(
            members_injector_name(&ClassName::new("app", "Outer").nested("Inner"))
                .canonical_name(),
            "app.Outer_Inner_MembersInjector"
        );
        assert_eq!(
            assisted_factory_impl_name(&ClassName::new("app", "JobFactory")).canonical_name(),
            "app.JobFactory_Impl"
        );
    }
}
