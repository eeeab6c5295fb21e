//! Binding model
//!
//! A [`Binding`] is an immutable recipe mapping a [`Key`] to a construction
//! strategy: its kind, optional scope, ordered dependency requests, and a
//! kind-specific payload. Bindings are produced by the graph builder and
//! never mutated afterwards.

use std::fmt;

use crate::key::{AnnotationValue, ClassName, DeclaredType, Key, RequestKind, TypeRef};

// =============================================================================
// Scopes
// =============================================================================

/// Name of the distinguished scope that permits single-check caching.
pub const REUSABLE_SCOPE: &str = "Reusable";

/// A scope annotation token.
///
/// One scope is distinguished: the reusable scope, which permits weaker
/// (single-check) caching with no cross-thread publication guarantee. Every
/// other named scope demands double-check single-instance semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    annotation: ClassName,
}

impl Scope {
    #[inline]
    pub fn new(annotation: ClassName) -> Self {
        Self { annotation }
    }

    /// The distinguished reusable scope.
    #[inline]
    pub fn reusable() -> Self {
        Self {
            annotation: ClassName::new("di", REUSABLE_SCOPE),
        }
    }

    #[inline]
    pub fn annotation(&self) -> &ClassName {
        &self.annotation
    }

    #[inline]
    pub fn is_reusable(&self) -> bool {
        self.annotation.package() == "di" && self.annotation.simple_name() == REUSABLE_SCOPE
    }

    /// The caching strength this scope demands from emitted code.
    #[inline]
    pub fn caching(&self) -> CachingKind {
        if self.is_reusable() {
            CachingKind::SingleCheck
        } else {
            CachingKind::DoubleCheck
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation.simple_name())
    }
}

/// Strength of the memoization wrapper a binding's provider needs.
///
/// The ordering is meaningful: a delegate whose strength is greater than its
/// target's must add its own wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CachingKind {
    /// Fresh instance per request; no wrapper.
    None,
    /// Eventual single instance, no publication guarantee.
    SingleCheck,
    /// Publication-safe single instance.
    DoubleCheck,
}

/// The caching strength demanded by an optional scope.
#[inline]
pub fn caching_kind(scope: Option<&Scope>) -> CachingKind {
    scope.map(Scope::caching).unwrap_or(CachingKind::None)
}

// =============================================================================
// Binding kinds
// =============================================================================

/// The closed set of binding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Discovered from an injectable constructor.
    Injection,
    /// Provided by a module method.
    Provision,
    /// One key bound as another.
    Delegate,
    MultiboundSet,
    MultiboundMap,
    Optional,
    /// The component object itself.
    Component,
    /// A provision method on a component dependency.
    ComponentProvision,
    /// A component dependency object.
    ComponentDependency,
    /// An instance bound through the component creator.
    BoundInstance,
    SubcomponentCreator,
    AssistedInjection,
    AssistedFactory,
    MembersInjector,
    MembersInjection,
    Production,
    ComponentProduction,
}

impl BindingKind {
    /// Whether this kind produces a value asynchronously.
    #[inline]
    pub fn is_production(self) -> bool {
        matches!(self, BindingKind::Production | BindingKind::ComponentProduction)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindingKind::Injection => "injection",
            BindingKind::Provision => "provision",
            BindingKind::Delegate => "delegate",
            BindingKind::MultiboundSet => "multibound set",
            BindingKind::MultiboundMap => "multibound map",
            BindingKind::Optional => "optional",
            BindingKind::Component => "component",
            BindingKind::ComponentProvision => "component provision",
            BindingKind::ComponentDependency => "component dependency",
            BindingKind::BoundInstance => "bound instance",
            BindingKind::SubcomponentCreator => "subcomponent creator",
            BindingKind::AssistedInjection => "assisted injection",
            BindingKind::AssistedFactory => "assisted factory",
            BindingKind::MembersInjector => "members injector",
            BindingKind::MembersInjection => "members injection",
            BindingKind::Production => "production",
            BindingKind::ComponentProduction => "component production",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Dependency requests
// =============================================================================

/// One dependency of a binding: the key requested, how it is requested, and
/// whether the request tolerates a null value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRequest {
    key: Key,
    kind: RequestKind,
    nullable: bool,
}

impl DependencyRequest {
    #[inline]
    pub fn new(key: Key, kind: RequestKind) -> Self {
        Self {
            key,
            kind,
            nullable: false,
        }
    }

    /// Mark the request as accepting null.
    #[inline]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

// =============================================================================
// Kind-specific payloads
// =============================================================================

/// An assisted-injection constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistedParameter {
    pub name: String,
    pub ty: TypeRef,
    /// Caller-supplied at factory-method call time rather than injected.
    pub is_assisted: bool,
}

/// Kind-specific data carried by a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingPayload {
    /// An injectable or assisted-injectable constructor.
    Constructor {
        constructed: DeclaredType,
        assisted_parameters: Vec<AssistedParameter>,
    },
    /// A module provision or production method.
    ModuleMethod {
        module: ClassName,
        method: String,
        requires_module_instance: bool,
    },
    /// The source key a delegate forwards to, and the declaring method.
    Delegate { source: Key, method: String },
    /// Contribution keys for a multibound set, in declaration order.
    SetContributions { contributions: Vec<Key> },
    /// Map entries: (map key value, contribution key), in declaration order.
    MapContributions {
        entries: Vec<(AnnotationValue, Key)>,
    },
    /// Present contribution for a synthesized optional, if any.
    OptionalUnderlying { underlying: Option<DependencyRequest> },
    /// The component or component-dependency type an instance binding hands
    /// out, or a method on a component dependency.
    ComponentSource {
        source: ClassName,
        method: Option<String>,
    },
    /// A creator-bound instance, identified by its setter name.
    BoundInstance { parameter: String },
    /// The subcomponent a creator binding builds.
    Subcomponent { subcomponent: ClassName },
    /// An assisted factory: the factory type's single method and the
    /// assisted-injection key it constructs.
    AssistedFactory {
        factory: DeclaredType,
        method: String,
        target: Key,
    },
    /// The type whose members are injected.
    MembersTarget { target: TypeRef },
    /// No kind-specific data.
    None,
}

// =============================================================================
// Bindings
// =============================================================================

/// An immutable recipe mapping a key to a construction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    key: Key,
    kind: BindingKind,
    scope: Option<Scope>,
    dependencies: Vec<DependencyRequest>,
    /// Whether the produced value may itself be null.
    nullable: bool,
    /// Package the binding's declaration lives in.
    declaring_package: String,
    payload: BindingPayload,
}

impl Binding {
    pub fn new(
        key: Key,
        kind: BindingKind,
        declaring_package: impl Into<String>,
        payload: BindingPayload,
    ) -> Self {
        Self {
            key,
            kind,
            scope: None,
            dependencies: Vec::new(),
            nullable: false,
            declaring_package: declaring_package.into(),
            payload,
        }
    }

    /// Attach a scope.
    #[inline]
    pub fn scoped(mut self, scope: Option<Scope>) -> Self {
        self.scope = scope;
        self
    }

    /// Attach dependency requests, in declaration order.
    #[inline]
    pub fn with_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Mark the produced value as possibly null.
    #[inline]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    #[inline]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    #[inline]
    pub fn dependencies(&self) -> &[DependencyRequest] {
        &self.dependencies
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn declaring_package(&self) -> &str {
        &self.declaring_package
    }

    #[inline]
    pub fn payload(&self) -> &BindingPayload {
        &self.payload
    }

    /// The caching strength this binding's own scope demands.
    #[inline]
    pub fn caching(&self) -> CachingKind {
        caching_kind(self.scope.as_ref())
    }

    /// The delegate source key, when this is a delegate binding.
    #[inline]
    pub fn delegate_source(&self) -> Option<&Key> {
        match &self.payload {
            BindingPayload::Delegate { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether instantiation needs an instance of the declaring module.
    #[inline]
    pub fn requires_module_instance(&self) -> bool {
        matches!(
            &self.payload,
            BindingPayload::ModuleMethod {
                requires_module_instance: true,
                ..
            }
        )
    }

    /// The module type declaring this binding, if module-declared.
    #[inline]
    pub fn module(&self) -> Option<&ClassName> {
        match &self.payload {
            BindingPayload::ModuleMethod { module, .. } => Some(module),
            _ => None,
        }
    }

    /// Whether the binding's value type erasure is accessible from the
    /// given package. Inaccessible bindings force raw references plus
    /// unchecked casts at accessible return sites.
    #[inline]
    pub fn accessible_from(&self, package: &str) -> bool {
        self.key.ty().accessible_from(package)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} binding for {}", self.kind, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Visibility;

    fn key(name: &str) -> Key {
        Key::of(TypeRef::declared(ClassName::new("app", name)))
    }

    #[test]
    fn test_scope_caching_strength() {
        let singleton = Scope::new(ClassName::new("app", "Singleton"));
        let reusable = Scope::reusable();

        assert_eq!(singleton.caching(), CachingKind::DoubleCheck);
        assert_eq!(reusable.caching(), CachingKind::SingleCheck);
        assert_eq!(caching_kind(None), CachingKind::None);
        assert!(reusable.is_reusable());
        assert!(!singleton.is_reusable());
    }

    #[test]
    fn test_caching_strength_order() {
        assert!(CachingKind::DoubleCheck > CachingKind::SingleCheck);
        assert!(CachingKind::SingleCheck > CachingKind::None);
    }

    #[test]
    fn test_custom_scope_named_reusable_is_not_distinguished() {
        // Only the framework's token is the distinguished scope.
        let custom = Scope::new(ClassName::new("app", REUSABLE_SCOPE));
        assert!(!custom.is_reusable());
        assert_eq!(custom.caching(), CachingKind::DoubleCheck);
    }

    #[test]
    fn test_binding_accessors() {
        let dep = DependencyRequest::new(key("Database"), RequestKind::Provider);
        let binding = Binding::new(
            key("Service"),
            BindingKind::Provision,
            "app",
            BindingPayload::ModuleMethod {
                module: ClassName::new("app", "AppModule"),
                method: "provideService".into(),
                requires_module_instance: true,
            },
        )
        .scoped(Some(Scope::reusable()))
        .with_dependencies(vec![dep.clone()]);

        assert_eq!(binding.kind(), BindingKind::Provision);
        assert_eq!(binding.caching(), CachingKind::SingleCheck);
        assert_eq!(binding.dependencies(), &[dep]);
        assert!(binding.requires_module_instance());
        assert_eq!(
            binding.module().unwrap().canonical_name(),
            "app.AppModule"
        );
    }

    #[test]
    fn test_inaccessible_binding_detection() {
        let hidden = Key::of(TypeRef::declared_with(
            ClassName::new("other", "Subtype"),
            Visibility::PackagePrivate,
        ));
        let binding = Binding::new(
            hidden,
            BindingKind::Injection,
            "other",
            BindingPayload::Constructor {
                constructed: DeclaredType::new(
                    ClassName::new("other", "Subtype"),
                    Visibility::PackagePrivate,
                ),
                assisted_parameters: Vec::new(),
            },
        );
        assert!(binding.accessible_from("other"));
        assert!(!binding.accessible_from("app"));
    }
}
