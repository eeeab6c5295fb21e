//! Request representation selection
//!
//! For every (binding, request kind) pair the emitter must choose between a
//! direct instance expression, inlined at the usage site, and a framework
//! instance expression that goes through a provider-like handle. The choice
//! is a pure function of the binding, the graph, and the emission mode.

use crate::binding::{Binding, BindingKind, CachingKind};
use crate::graph::BindingGraph;
use crate::key::RequestKind;

/// The two expression strategies for satisfying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    /// Construction or invocation inlined at the usage site.
    DirectInstance,
    /// The value is obtained through a provider-like handle.
    FrameworkInstance,
}

/// Select the representation for a request on a binding.
#[inline]
pub fn select(
    request_kind: RequestKind,
    binding: &Binding,
    graph: &BindingGraph,
    fast_init: bool,
) -> RepresentationKind {
    if uses_direct_instance(request_kind, binding, graph, fast_init) {
        RepresentationKind::DirectInstance
    } else {
        RepresentationKind::FrameworkInstance
    }
}

/// Whether a request is satisfied by a direct instance expression.
///
/// Only `Instance` and `Future` requests can be; members injectors and
/// assisted factories are always framework objects, assisted injection is
/// direct only in fast-init mode, and everything else is direct exactly when
/// it does not need caching.
pub fn uses_direct_instance(
    request_kind: RequestKind,
    binding: &Binding,
    graph: &BindingGraph,
    fast_init: bool,
) -> bool {
    if request_kind != RequestKind::Instance && request_kind != RequestKind::Future {
        return false;
    }
    match binding.kind() {
        // A members injector is handed out as a framework object wrapping
        // the generated injector, so there is no direct form to inline.
        BindingKind::MembersInjector => false,
        // An assisted factory is essentially a provider for its assisted
        // injection binding; it is always a framework instance.
        BindingKind::AssistedFactory => false,
        // Direct only under fast-init, so that dependencies are not forced
        // into providers there. The asymmetry with default mode is kept
        // deliberately.
        BindingKind::AssistedInjection => fast_init,
        _ => !needs_caching(binding, graph),
    }
}

/// Whether the component must cache the binding's value.
///
/// Scoped bindings need caching, except delegates whose scope is no
/// stronger than their target's.
pub fn needs_caching(binding: &Binding, graph: &BindingGraph) -> bool {
    if binding.scope().is_none() {
        return false;
    }
    if binding.kind() == BindingKind::Delegate {
        return is_delegate_scope_stronger_than_target(binding, graph);
    }
    true
}

/// Whether a delegate's declared scope is strictly stronger than the scope
/// of the binding it forwards to.
///
/// Strength order: unscoped < reusable (single-check) < any other named
/// scope (double-check). A delegate at the same strength as its target adds
/// no wrapper of its own.
pub fn is_delegate_scope_stronger_than_target(binding: &Binding, graph: &BindingGraph) -> bool {
    let Some(source) = binding.delegate_source() else {
        return false;
    };
    let target_caching = graph
        .resolve(source)
        .map(|id| graph.binding(id).caching())
        .unwrap_or(CachingKind::None);
    binding.caching() > target_caching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{DependencyRequest, Scope};
    use crate::decl::{
        ComponentDescriptor, EntryPoint, InjectableConstructor, ModuleBindingDecl,
        ModuleDescriptor, TypeModel,
    };
    use crate::graph::{BindingGraph, BindingGraphBuilder};
    use crate::key::{ClassName, DeclaredType, Key, Qualifier, TypeRef, Visibility};

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(ClassName::new("app", name))
    }

    fn q(name: &str) -> Qualifier {
        Qualifier::new(ClassName::new("app", name))
    }

    fn custom_scope() -> Scope {
        Scope::new(ClassName::new("app", "CustomScope"))
    }

    fn injectable(name: &str, scope: Option<Scope>) -> InjectableConstructor {
        let mut builder = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", name),
            Visibility::Public,
        ));
        if let Some(scope) = scope {
            builder = builder.scoped(scope);
        }
        builder
    }

    fn binds(method: &str, qualifier: &str, source: &str, scope: Option<Scope>) -> ModuleBindingDecl {
        ModuleBindingDecl::Binds {
            method: method.into(),
            key: Key::qualified(
                TypeRef::declared(ClassName::new("lang", "Object")),
                q(qualifier),
            ),
            source: DependencyRequest::new(Key::of(ty(source)), RequestKind::Instance),
            scope,
            multibinding: None,
        }
    }

    /// The three-way delegate fixture: a module binding `Object` to a
    /// double-check-scoped, a reusable, and an unscoped source, with the
    /// delegate scope parameterized.
    fn delegate_graph(delegate_scope: Option<Scope>) -> BindingGraph {
        let module = ModuleDescriptor::new(ClassName::new("app", "TestModule"))
            .abstract_module()
            .binding(binds(
                "regular",
                "RegularQ",
                "RegularScoped",
                delegate_scope.clone(),
            ))
            .binding(binds(
                "reusable",
                "ReusableQ",
                "ReusableScoped",
                delegate_scope.clone(),
            ))
            .binding(binds("unscoped", "UnscopedQ", "Unscoped", delegate_scope));
        let model = TypeModel::new()
            .module(module)
            .injectable(injectable("RegularScoped", Some(custom_scope())))
            .injectable(injectable("ReusableScoped", Some(Scope::reusable())))
            .injectable(injectable("Unscoped", None));
        let object = TypeRef::declared(ClassName::new("lang", "Object"));
        let component = ComponentDescriptor::new(ClassName::new("app", "TestComponent"))
            .scope(custom_scope())
            .module(ClassName::new("app", "TestModule"))
            .entry_point(EntryPoint::new("regular", object.clone()).qualified(q("RegularQ")))
            .entry_point(EntryPoint::new("reusable", object.clone()).qualified(q("ReusableQ")))
            .entry_point(EntryPoint::new("unscoped", object).qualified(q("UnscopedQ")));
        BindingGraphBuilder::build(&component, &model).unwrap()
    }

    fn delegate_binding<'g>(graph: &'g BindingGraph, qualifier: &str) -> &'g Binding {
        let object = TypeRef::declared(ClassName::new("lang", "Object"));
        let id = graph
            .resolve(&Key::qualified(object, q(qualifier)))
            .unwrap();
        graph.binding(id)
    }

    #[test]
    fn test_scoped_delegate_over_weaker_targets_needs_caching() {
        let graph = delegate_graph(Some(custom_scope()));

        // Same strength as the double-check target: no wrapper of its own.
        assert!(!needs_caching(delegate_binding(&graph, "RegularQ"), &graph));
        // Stronger than the reusable target: caches.
        assert!(needs_caching(delegate_binding(&graph, "ReusableQ"), &graph));
        // Stronger than the unscoped target: caches.
        assert!(needs_caching(delegate_binding(&graph, "UnscopedQ"), &graph));
    }

    #[test]
    fn test_reusable_delegate_only_caches_over_unscoped() {
        let graph = delegate_graph(Some(Scope::reusable()));

        assert!(!needs_caching(delegate_binding(&graph, "RegularQ"), &graph));
        assert!(!needs_caching(delegate_binding(&graph, "ReusableQ"), &graph));
        assert!(needs_caching(delegate_binding(&graph, "UnscopedQ"), &graph));
    }

    #[test]
    fn test_unscoped_delegate_never_caches() {
        let graph = delegate_graph(None);

        for qualifier in ["RegularQ", "ReusableQ", "UnscopedQ"] {
            assert!(!needs_caching(delegate_binding(&graph, qualifier), &graph));
        }
    }

    #[test]
    fn test_provider_requests_are_framework() {
        let graph = delegate_graph(None);
        let binding = delegate_binding(&graph, "UnscopedQ");
        assert_eq!(
            select(RequestKind::Provider, binding, &graph, false),
            RepresentationKind::FrameworkInstance
        );
        assert_eq!(
            select(RequestKind::Lazy, binding, &graph, false),
            RepresentationKind::FrameworkInstance
        );
        assert_eq!(
            select(RequestKind::Instance, binding, &graph, false),
            RepresentationKind::DirectInstance
        );
    }

    #[test]
    fn test_scoped_instance_request_is_framework() {
        let model = TypeModel::new()
            .injectable(injectable("Database", Some(custom_scope())));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .scope(custom_scope())
            .entry_point(EntryPoint::new("db", ty("Database")));
        let graph = BindingGraphBuilder::build(&component, &model).unwrap();
        let binding = graph.binding(graph.resolve(&Key::of(ty("Database"))).unwrap());

        assert!(needs_caching(binding, &graph));
        assert_eq!(
            select(RequestKind::Instance, binding, &graph, false),
            RepresentationKind::FrameworkInstance
        );
    }

    #[test]
    fn test_assisted_injection_direct_only_in_fast_init() {
        use crate::binding::AssistedParameter;
        use crate::decl::AssistedFactoryDescriptor;

        let assisted = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", "Job"),
            Visibility::Public,
        ))
        .assisted(AssistedParameter {
            name: "input".into(),
            ty: ty("Input"),
            is_assisted: true,
        });
        let model = TypeModel::new()
            .injectable(assisted)
            .assisted_factory(AssistedFactoryDescriptor {
                factory: DeclaredType::new(
                    ClassName::new("app", "JobFactory"),
                    Visibility::Public,
                ),
                method: "create".into(),
                target: Key::of(ty("Job")),
            });
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("factory", ty("JobFactory")));
        let graph = BindingGraphBuilder::build(&component, &model).unwrap();

        let job = graph.binding(graph.resolve(&Key::of(ty("Job"))).unwrap());
        assert_eq!(job.kind(), BindingKind::AssistedInjection);
        assert!(uses_direct_instance(RequestKind::Instance, job, &graph, true));
        assert!(!uses_direct_instance(
            RequestKind::Instance,
            job,
            &graph,
            false
        ));

        let factory = graph
            .binding(graph.resolve(&Key::of(ty("JobFactory"))).unwrap());
        assert_eq!(factory.kind(), BindingKind::AssistedFactory);
        // Assisted factories are framework instances in both modes.
        assert!(!uses_direct_instance(
            RequestKind::Instance,
            factory,
            &graph,
            true
        ));
        assert!(!uses_direct_instance(
            RequestKind::Instance,
            factory,
            &graph,
            false
        ));
    }
}
