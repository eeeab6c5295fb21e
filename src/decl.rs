//! Declarative input surface
//!
//! The source-language front-end owns parsing and annotation reading; it
//! hands the generator these descriptor values. Descriptors are plain data
//! with fluent constructors so tests (and front-ends) can assemble them
//! without ceremony.

use crate::binding::{AssistedParameter, DependencyRequest, Scope};
use crate::key::{AnnotationValue, ClassName, DeclaredType, Key, TypeRef, Visibility};

// =============================================================================
// Module declarations
// =============================================================================

/// Multibinding contribution annotation on a provision or bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultibindingAnnotation {
    IntoSet,
    /// Contributes every element of a returned set.
    ElementsIntoSet,
    /// Contributes a map entry under the given key value.
    IntoMap(AnnotationValue),
}

/// One binding declaration inside a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleBindingDecl {
    /// A provision method.
    Provides {
        method: String,
        key: Key,
        scope: Option<Scope>,
        dependencies: Vec<DependencyRequest>,
        /// Static methods never need a module instance.
        is_static: bool,
        nullable: bool,
        multibinding: Option<MultibindingAnnotation>,
        /// Produces asynchronously.
        is_production: bool,
    },
    /// A bind of one key as another.
    Binds {
        method: String,
        key: Key,
        source: DependencyRequest,
        scope: Option<Scope>,
        multibinding: Option<MultibindingAnnotation>,
    },
    /// Declares an optional binding that is present iff the underlying key
    /// is bound somewhere in the graph.
    BindsOptionalOf { key: Key },
    /// Declares an empty multibinding so the aggregate key always resolves.
    Multibinds { key: Key },
}

impl ModuleBindingDecl {
    /// The key this declaration contributes to or declares.
    pub fn key(&self) -> &Key {
        match self {
            ModuleBindingDecl::Provides { key, .. }
            | ModuleBindingDecl::Binds { key, .. }
            | ModuleBindingDecl::BindsOptionalOf { key }
            | ModuleBindingDecl::Multibinds { key } => key,
        }
    }

    /// The declaring method name, where one exists.
    pub fn method(&self) -> Option<&str> {
        match self {
            ModuleBindingDecl::Provides { method, .. }
            | ModuleBindingDecl::Binds { method, .. } => Some(method),
            _ => None,
        }
    }

    pub fn multibinding(&self) -> Option<&MultibindingAnnotation> {
        match self {
            ModuleBindingDecl::Provides { multibinding, .. }
            | ModuleBindingDecl::Binds { multibinding, .. } => multibinding.as_ref(),
            _ => None,
        }
    }
}

/// Visibility and arity facts about a module constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructorDescriptor {
    pub visibility: Visibility,
    pub parameter_count: usize,
}

/// A module type and its binding declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: ClassName,
    pub visibility: Visibility,
    pub is_abstract: bool,
    /// Nested inside another type with an implicit enclosing-instance
    /// reference; such modules cannot be constructed by generated code.
    pub is_inner: bool,
    pub constructors: Vec<ConstructorDescriptor>,
    pub bindings: Vec<ModuleBindingDecl>,
}

impl ModuleDescriptor {
    pub fn new(name: ClassName) -> Self {
        Self {
            name,
            visibility: Visibility::Public,
            is_abstract: false,
            is_inner: false,
            constructors: vec![ConstructorDescriptor {
                visibility: Visibility::Public,
                parameter_count: 0,
            }],
            bindings: Vec::new(),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn abstract_module(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn constructors(mut self, constructors: Vec<ConstructorDescriptor>) -> Self {
        self.constructors = constructors;
        self
    }

    pub fn binding(mut self, decl: ModuleBindingDecl) -> Self {
        self.bindings.push(decl);
        self
    }

    /// The package the module's declarations live in.
    #[inline]
    pub fn package(&self) -> &str {
        self.name.package()
    }

    /// Whether any declaration requires an instance of this module.
    pub fn requires_instance(&self) -> bool {
        !self.is_abstract
            && self.bindings.iter().any(|b| {
                matches!(
                    b,
                    ModuleBindingDecl::Provides {
                        is_static: false,
                        ..
                    }
                )
            })
    }
}

// =============================================================================
// Injectables and assisted types
// =============================================================================

/// A constructor discovered as injectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectableConstructor {
    pub constructed: DeclaredType,
    pub scope: Option<Scope>,
    /// Injected dependencies, in parameter order. Assisted parameters are
    /// listed separately and interleave by `assisted_parameters` order.
    pub dependencies: Vec<DependencyRequest>,
    pub assisted_parameters: Vec<AssistedParameter>,
}

impl InjectableConstructor {
    pub fn new(constructed: DeclaredType) -> Self {
        Self {
            constructed,
            scope: None,
            dependencies: Vec::new(),
            assisted_parameters: Vec::new(),
        }
    }

    pub fn scoped(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn dependency(mut self, request: DependencyRequest) -> Self {
        self.dependencies.push(request);
        self
    }

    pub fn assisted(mut self, parameter: AssistedParameter) -> Self {
        self.assisted_parameters.push(parameter);
        self
    }

    /// Whether any parameter is caller-assisted.
    #[inline]
    pub fn is_assisted(&self) -> bool {
        self.assisted_parameters.iter().any(|p| p.is_assisted)
    }
}

/// A factory type whose single abstract method builds an assisted type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistedFactoryDescriptor {
    pub factory: DeclaredType,
    pub method: String,
    pub target: Key,
}

/// A type with members that receive injection after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersInjectionDescriptor {
    pub target: DeclaredType,
    pub dependencies: Vec<DependencyRequest>,
}

// =============================================================================
// Components
// =============================================================================

/// A method on the component's public surface whose return type defines a
/// root request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub method: String,
    /// The declared return type, framework wrappers included.
    pub returned: TypeRef,
    pub qualifier: Option<crate::key::Qualifier>,
    pub nullable: bool,
}

impl EntryPoint {
    pub fn new(method: impl Into<String>, returned: TypeRef) -> Self {
        Self {
            method: method.into(),
            returned,
            qualifier: None,
            nullable: false,
        }
    }

    pub fn qualified(mut self, qualifier: crate::key::Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }
}

/// A provision method exposed by a component dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyProvision {
    pub method: String,
    pub key: Key,
    pub nullable: bool,
    pub is_production: bool,
}

/// A component dependency: another object whose provision methods become
/// bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDependencyDescriptor {
    pub ty: DeclaredType,
    pub provisions: Vec<DependencyProvision>,
}

/// An instance bound through a creator setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInstanceDecl {
    pub setter: String,
    pub key: Key,
    pub nullable: bool,
}

/// The component's declared creator (builder), if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorDescriptor {
    pub name: String,
    pub bound_instances: Vec<BoundInstanceDecl>,
}

impl CreatorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound_instances: Vec::new(),
        }
    }

    pub fn bound_instance(mut self, decl: BoundInstanceDecl) -> Self {
        self.bound_instances.push(decl);
        self
    }
}

/// A user-declared component root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub name: ClassName,
    pub is_production: bool,
    /// Scopes declared on the component, in declaration order.
    pub scopes: Vec<Scope>,
    /// Module types, resolved against the type model by the driver.
    pub modules: Vec<ClassName>,
    pub dependencies: Vec<ComponentDependencyDescriptor>,
    pub entry_points: Vec<EntryPoint>,
    pub subcomponents: Vec<ComponentDescriptor>,
    pub creator: Option<CreatorDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(name: ClassName) -> Self {
        Self {
            name,
            is_production: false,
            scopes: Vec::new(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            entry_points: Vec::new(),
            subcomponents: Vec::new(),
            creator: None,
        }
    }

    pub fn production(mut self) -> Self {
        self.is_production = true;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn module(mut self, module: ClassName) -> Self {
        self.modules.push(module);
        self
    }

    pub fn dependency(mut self, dependency: ComponentDependencyDescriptor) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_points.push(entry_point);
        self
    }

    pub fn subcomponent(mut self, subcomponent: ComponentDescriptor) -> Self {
        self.subcomponents.push(subcomponent);
        self
    }

    pub fn creator(mut self, creator: CreatorDescriptor) -> Self {
        self.creator = Some(creator);
        self
    }

    #[inline]
    pub fn package(&self) -> &str {
        self.name.package()
    }

    /// Whether `scope` is declared on this component.
    pub fn declares_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}

// =============================================================================
// Type model
// =============================================================================

/// Everything the front-end knows about the compilation unit: modules,
/// injectable constructors, assisted factories, and members-injected types.
///
/// The driver resolves a component's module names against this model and
/// defers the component when a module is not yet available.
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    pub modules: Vec<ModuleDescriptor>,
    pub injectables: Vec<InjectableConstructor>,
    pub assisted_factories: Vec<AssistedFactoryDescriptor>,
    pub members_injections: Vec<MembersInjectionDescriptor>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn injectable(mut self, injectable: InjectableConstructor) -> Self {
        self.injectables.push(injectable);
        self
    }

    pub fn assisted_factory(mut self, factory: AssistedFactoryDescriptor) -> Self {
        self.assisted_factories.push(factory);
        self
    }

    pub fn members_injection(mut self, descriptor: MembersInjectionDescriptor) -> Self {
        self.members_injections.push(descriptor);
        self
    }

    /// Register a module after construction; used by driver steps that
    /// synthesize modules between rounds.
    pub fn add_module(&mut self, module: ModuleDescriptor) {
        self.modules.push(module);
    }

    /// Look up a module by type name.
    pub fn find_module(&self, name: &ClassName) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == *name)
    }

    /// Look up an injectable constructor by the erased constructed type.
    pub fn injectable_for(&self, ty: &TypeRef) -> Option<&InjectableConstructor> {
        let erased = ty.erased();
        self.injectables
            .iter()
            .find(|i| TypeRef::Declared(i.constructed.clone()).erased() == erased)
    }

    /// Look up an assisted factory by the erased factory type.
    pub fn assisted_factory_for(&self, ty: &TypeRef) -> Option<&AssistedFactoryDescriptor> {
        let erased = ty.erased();
        self.assisted_factories
            .iter()
            .find(|f| TypeRef::Declared(f.factory.clone()).erased() == erased)
    }

    /// Look up a members-injection descriptor by the erased target type.
    pub fn members_injection_for(&self, ty: &TypeRef) -> Option<&MembersInjectionDescriptor> {
        let erased = ty.erased();
        self.members_injections
            .iter()
            .find(|m| TypeRef::Declared(m.target.clone()).erased() == erased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::RequestKind;

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(ClassName::new("app", name))
    }

    #[test]
    fn test_module_requires_instance() {
        let instance_module = ModuleDescriptor::new(ClassName::new("app", "M")).binding(
            ModuleBindingDecl::Provides {
                method: "provideDb".into(),
                key: Key::of(ty("Database")),
                scope: None,
                dependencies: Vec::new(),
                is_static: false,
                nullable: false,
                multibinding: None,
                is_production: false,
            },
        );
        assert!(instance_module.requires_instance());

        let static_module = ModuleDescriptor::new(ClassName::new("app", "S")).binding(
            ModuleBindingDecl::Provides {
                method: "provideDb".into(),
                key: Key::of(ty("Database")),
                scope: None,
                dependencies: Vec::new(),
                is_static: true,
                nullable: false,
                multibinding: None,
                is_production: false,
            },
        );
        assert!(!static_module.requires_instance());

        let binds_module = ModuleDescriptor::new(ClassName::new("app", "B"))
            .abstract_module()
            .binding(ModuleBindingDecl::Binds {
                method: "bind".into(),
                key: Key::of(ty("Iface")),
                source: DependencyRequest::new(Key::of(ty("Impl")), RequestKind::Instance),
                scope: None,
                multibinding: None,
            });
        assert!(!binds_module.requires_instance());
    }

    #[test]
    fn test_type_model_lookup_by_erasure() {
        let constructed = DeclaredType::new(ClassName::new("app", "Repo"), Visibility::Public);
        let model = TypeModel::new().injectable(InjectableConstructor::new(constructed));

        let generic = TypeRef::generic(ClassName::new("app", "Repo"), vec![ty("User")]);
        assert!(model.injectable_for(&generic).is_some());
        assert!(model.injectable_for(&ty("Missing")).is_none());
    }

    #[test]
    fn test_component_scope_declaration() {
        let scope = Scope::new(ClassName::new("app", "AppScope"));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .scope(scope.clone());
        assert!(component.declares_scope(&scope));
        assert!(!component.declares_scope(&Scope::reusable()));
    }
}
