//! Key and type model
//!
//! A [`Key`] is the canonical identity of a requested dependency: the
//! requested type, an optional qualifier annotation, and (for multibinding
//! contributions) a contribution identifier. Keys are the sole identity used
//! across the binding graph.
//!
//! The type model here is deliberately small: the front-end owns the real
//! language model and hands us [`TypeRef`] values that already carry the
//! visibility facts we need for accessibility decisions.

use std::fmt;

use once_cell::sync::Lazy;

use crate::diagnostics::{CodegenError, Result};

// =============================================================================
// Class names
// =============================================================================

/// Fully qualified name of a declared type: a package plus one or more
/// nested simple names.
///
/// # Examples
///
/// ```rust
/// use dependency_codegen::ClassName;
///
/// let inner = ClassName::new("app", "Outer").nested("Inner");
/// assert_eq!(inner.canonical_name(), "app.Outer.Inner");
/// assert_eq!(inner.simple_name(), "Inner");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName {
    package: String,
    simple_names: Vec<String>,
}

impl ClassName {
    /// Create a top-level class name.
    #[inline]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            simple_names: vec![name.into()],
        }
    }

    /// Create a name nested inside this one.
    #[inline]
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut simple_names = self.simple_names.clone();
        simple_names.push(name.into());
        Self {
            package: self.package.clone(),
            simple_names,
        }
    }

    /// The outermost enclosing type of this name.
    #[inline]
    pub fn top_level(&self) -> Self {
        Self {
            package: self.package.clone(),
            simple_names: vec![self.simple_names[0].clone()],
        }
    }

    /// A top-level sibling of this name's outermost type.
    #[inline]
    pub fn peer(&self, name: impl Into<String>) -> Self {
        Self {
            package: self.package.clone(),
            simple_names: vec![name.into()],
        }
    }

    /// The declaring package. Empty for the unnamed package.
    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The innermost simple name.
    #[inline]
    pub fn simple_name(&self) -> &str {
        self.simple_names.last().expect("at least one simple name")
    }

    /// All simple names, outermost first.
    #[inline]
    pub fn simple_names(&self) -> &[String] {
        &self.simple_names
    }

    /// Whether this names a nested type.
    #[inline]
    pub fn is_nested(&self) -> bool {
        self.simple_names.len() > 1
    }

    /// The simple names joined with underscores: `Outer_Inner`.
    ///
    /// This is the flattened form used for generated peer types.
    pub fn joined_simple_names(&self) -> String {
        self.simple_names.join("_")
    }

    /// The canonical dotted name, `pkg.Outer.Inner`.
    pub fn canonical_name(&self) -> String {
        if self.package.is_empty() {
            self.simple_names.join(".")
        } else {
            format!("{}.{}", self.package, self.simple_names.join("."))
        }
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

// =============================================================================
// Type references
// =============================================================================

/// Source visibility of a declared type or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    /// Visible only inside the declaring package.
    PackagePrivate,
    Private,
}

impl Visibility {
    /// Whether a member with this visibility declared in `declaring_package`
    /// can be referenced from `requesting_package`.
    #[inline]
    pub fn accessible_from(self, declaring_package: &str, requesting_package: &str) -> bool {
        match self {
            Visibility::Public => true,
            Visibility::PackagePrivate => declaring_package == requesting_package,
            Visibility::Private => false,
        }
    }
}

/// A declared (possibly generic) type together with its visibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    name: ClassName,
    args: Vec<TypeRef>,
    visibility: Visibility,
}

impl DeclaredType {
    #[inline]
    pub fn new(name: ClassName, visibility: Visibility) -> Self {
        Self {
            name,
            args: Vec::new(),
            visibility,
        }
    }

    /// Attach type arguments.
    #[inline]
    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    #[inline]
    pub fn name(&self) -> &ClassName {
        &self.name
    }

    #[inline]
    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this is the raw form of a generic type.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.args.is_empty()
    }
}

/// A reference to a type as it appears in a dependency request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Declared(DeclaredType),
    /// A wildcard with an optional upper bound.
    Wildcard(Option<Box<TypeRef>>),
}

impl TypeRef {
    /// A public declared type with no arguments.
    #[inline]
    pub fn declared(name: ClassName) -> Self {
        TypeRef::Declared(DeclaredType::new(name, Visibility::Public))
    }

    /// A declared type with explicit visibility.
    #[inline]
    pub fn declared_with(name: ClassName, visibility: Visibility) -> Self {
        TypeRef::Declared(DeclaredType::new(name, visibility))
    }

    /// A generic declared type.
    #[inline]
    pub fn generic(name: ClassName, args: Vec<TypeRef>) -> Self {
        TypeRef::Declared(DeclaredType::new(name, Visibility::Public).with_args(args))
    }

    /// The declared form, if this is not a wildcard.
    #[inline]
    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match self {
            TypeRef::Declared(d) => Some(d),
            TypeRef::Wildcard(_) => None,
        }
    }

    /// The erasure of this type: the raw declared type with all arguments
    /// dropped; wildcards erase to their bound.
    pub fn erased(&self) -> TypeRef {
        match self {
            TypeRef::Declared(d) => {
                TypeRef::Declared(DeclaredType::new(d.name.clone(), d.visibility))
            }
            TypeRef::Wildcard(Some(bound)) => bound.erased(),
            TypeRef::Wildcard(None) => TypeRef::declared(well_known::OBJECT.clone()),
        }
    }

    /// Strip wildcards from type arguments, keeping their bounds.
    ///
    /// Used when `ignore_provision_key_wildcards` is enabled so that
    /// `Set<? extends Foo>` and `Set<Foo>` resolve to the same key.
    pub fn without_wildcards(&self) -> TypeRef {
        match self {
            TypeRef::Declared(d) => {
                let args = d.args.iter().map(TypeRef::without_wildcards).collect();
                TypeRef::Declared(
                    DeclaredType::new(d.name.clone(), d.visibility).with_args(args),
                )
            }
            TypeRef::Wildcard(Some(bound)) => bound.without_wildcards(),
            TypeRef::Wildcard(None) => TypeRef::declared(well_known::OBJECT.clone()),
        }
    }

    /// Whether this type (and every type argument) can be referenced from
    /// `package`.
    pub fn accessible_from(&self, package: &str) -> bool {
        match self {
            TypeRef::Declared(d) => {
                d.visibility.accessible_from(d.name.package(), package)
                    && d.args.iter().all(|a| a.accessible_from(package))
            }
            TypeRef::Wildcard(Some(bound)) => bound.accessible_from(package),
            TypeRef::Wildcard(None) => true,
        }
    }

    /// Whether the erasure alone is accessible from `package`, ignoring
    /// type arguments. When only the erasure is accessible the emitter must
    /// fall back to a raw reference and an unchecked cast.
    pub fn erasure_accessible_from(&self, package: &str) -> bool {
        match self {
            TypeRef::Declared(d) => d.visibility.accessible_from(d.name.package(), package),
            TypeRef::Wildcard(Some(bound)) => bound.erasure_accessible_from(package),
            TypeRef::Wildcard(None) => true,
        }
    }

    /// `true` if this is a declared type named `name`, at any arity.
    #[inline]
    pub fn is_type_of(&self, name: &ClassName) -> bool {
        matches!(self, TypeRef::Declared(d) if d.name == *name)
    }

    /// The sole type argument of a known single-argument wrapper.
    pub fn unwrapped(&self, wrapper: &ClassName) -> Result<TypeRef> {
        match self {
            TypeRef::Declared(d) if d.name == *wrapper && d.args.len() == 1 => {
                Ok(d.args[0].clone())
            }
            _ => Err(CodegenError::internal(format!(
                "expected {wrapper}<T>, got {self}"
            ))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Declared(d) => {
                write!(f, "{}", d.name)?;
                if !d.args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in d.args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeRef::Wildcard(Some(bound)) => write!(f, "? extends {bound}"),
            TypeRef::Wildcard(None) => write!(f, "?"),
        }
    }
}

// =============================================================================
// Well-known framework types
// =============================================================================

/// Names of the runtime framework types referenced by emitted code.
pub mod well_known {
    use super::ClassName;
    use once_cell::sync::Lazy;

    macro_rules! name {
        ($ident:ident, $package:expr, $simple:expr) => {
            pub static $ident: Lazy<ClassName> =
                Lazy::new(|| ClassName::new($package, $simple));
        };
    }

    name!(OBJECT, "lang", "Object");
    name!(PROVIDER, "di", "Provider");
    name!(LAZY, "di", "Lazy");
    name!(PRODUCER, "di", "Producer");
    name!(PRODUCED, "di", "Produced");
    name!(MEMBERS_INJECTOR, "di", "MembersInjector");
    name!(SET, "util", "Set");
    name!(MAP, "util", "Map");
    name!(SETS, "util", "Sets");
    name!(MAPS, "util", "Maps");
    name!(OPTIONAL, "util", "Optional");
    name!(FUTURE, "concurrent", "ListenableFuture");

    name!(DOUBLE_CHECK, "di.internal", "DoubleCheck");
    name!(SINGLE_CHECK, "di.internal", "SingleCheck");
    name!(DELEGATE_FACTORY, "di.internal", "DelegateFactory");
    name!(INSTANCE_FACTORY, "di.internal", "InstanceFactory");
    name!(SET_FACTORY, "di.internal", "SetFactory");
    name!(MAP_FACTORY, "di.internal", "MapFactory");
    name!(PROVIDER_OF_LAZY, "di.internal", "ProviderOfLazy");
    name!(MEMBERS_INJECTORS, "di.internal", "MembersInjectors");
    name!(OPTIONAL_FACTORY, "di.internal", "OptionalFactory");
    name!(FUTURES, "concurrent", "Futures");
    name!(PRODUCERS, "di.producers.internal", "Producers");
}

// =============================================================================
// Aggregate type views
// =============================================================================

/// A view over a `Set<T>` type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetType(DeclaredType);

impl SetType {
    /// `true` if `ty` is a `Set` type.
    #[inline]
    pub fn is_set(ty: &TypeRef) -> bool {
        ty.is_type_of(&well_known::SET)
    }

    /// `true` if `key`'s type is a `Set` type.
    #[inline]
    pub fn is_set_key(key: &Key) -> bool {
        Self::is_set(key.ty())
    }

    /// View `ty` as a set.
    pub fn from(ty: &TypeRef) -> Result<Self> {
        match ty.as_declared() {
            Some(d) if Self::is_set(ty) => Ok(Self(d.clone())),
            _ => Err(CodegenError::internal(format!("{ty} must be a Set"))),
        }
    }

    /// `true` if this is the raw `Set` type.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.0.is_raw()
    }

    /// The element type.
    pub fn element_type(&self) -> Result<TypeRef> {
        self.0
            .args()
            .first()
            .cloned()
            .ok_or_else(|| CodegenError::internal("raw Set has no element type"))
    }

    /// `true` if the element type is `wrapper<T>` for the given wrapper.
    pub fn elements_are(&self, wrapper: &ClassName) -> bool {
        self.element_type()
            .map(|e| e.is_type_of(wrapper))
            .unwrap_or(false)
    }

    /// `T` when the element type is `wrapper<T>`; fails when it is not.
    pub fn unwrapped_element_type(&self, wrapper: &ClassName) -> Result<TypeRef> {
        self.element_type()?.unwrapped(wrapper)
    }
}

/// A view over a `Map<K, V>` type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapType(DeclaredType);

impl MapType {
    /// `true` if `ty` is a `Map` type.
    #[inline]
    pub fn is_map(ty: &TypeRef) -> bool {
        ty.is_type_of(&well_known::MAP)
    }

    /// `true` if `key`'s type is a `Map` type.
    #[inline]
    pub fn is_map_key(key: &Key) -> bool {
        Self::is_map(key.ty())
    }

    /// View `ty` as a map.
    pub fn from(ty: &TypeRef) -> Result<Self> {
        match ty.as_declared() {
            Some(d) if Self::is_map(ty) => Ok(Self(d.clone())),
            _ => Err(CodegenError::internal(format!("{ty} must be a Map"))),
        }
    }

    #[inline]
    pub fn is_raw(&self) -> bool {
        self.0.is_raw()
    }

    pub fn key_type(&self) -> Result<TypeRef> {
        self.0
            .args()
            .first()
            .cloned()
            .ok_or_else(|| CodegenError::internal("raw Map has no key type"))
    }

    pub fn value_type(&self) -> Result<TypeRef> {
        self.0
            .args()
            .get(1)
            .cloned()
            .ok_or_else(|| CodegenError::internal("raw Map has no value type"))
    }

    /// `true` if the value type is `wrapper<T>` for the given wrapper.
    pub fn values_are(&self, wrapper: &ClassName) -> bool {
        self.value_type()
            .map(|v| v.is_type_of(wrapper))
            .unwrap_or(false)
    }

    /// `T` when the value type is `wrapper<T>`; fails when it is not.
    pub fn unwrapped_value_type(&self, wrapper: &ClassName) -> Result<TypeRef> {
        self.value_type()?.unwrapped(wrapper)
    }
}

// =============================================================================
// Qualifiers and annotation values
// =============================================================================

/// A structured annotation member value.
///
/// Equality is structural; this is what makes qualifier identity include
/// member values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Type(TypeRef),
    EnumConst(ClassName, String),
    List(Vec<AnnotationValue>),
}

impl AnnotationValue {
    /// The value with type arguments erased on class-valued members.
    ///
    /// Map keys that compare equal after this erasure collide.
    pub fn erased(&self) -> AnnotationValue {
        match self {
            AnnotationValue::Type(ty) => AnnotationValue::Type(ty.erased()),
            AnnotationValue::List(values) => {
                AnnotationValue::List(values.iter().map(AnnotationValue::erased).collect())
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Bool(v) => write!(f, "{v}"),
            AnnotationValue::Int(v) => write!(f, "{v}"),
            AnnotationValue::Str(v) => write!(f, "{v:?}"),
            AnnotationValue::Type(v) => write!(f, "{v}"),
            AnnotationValue::EnumConst(ty, name) => write!(f, "{ty}.{name}"),
            AnnotationValue::List(values) => {
                write!(f, "{{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A qualifier annotation instance: the annotation type plus its member
/// values in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    annotation: ClassName,
    values: Vec<(String, AnnotationValue)>,
}

impl Qualifier {
    #[inline]
    pub fn new(annotation: ClassName) -> Self {
        Self {
            annotation,
            values: Vec::new(),
        }
    }

    /// Add a member value.
    #[inline]
    pub fn with_value(mut self, member: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.push((member.into(), value));
        self
    }

    #[inline]
    pub fn annotation(&self) -> &ClassName {
        &self.annotation
    }

    #[inline]
    pub fn values(&self) -> &[(String, AnnotationValue)] {
        &self.values
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation.simple_name())?;
        if !self.values.is_empty() {
            write!(f, "(")?;
            for (i, (member, value)) in self.values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{member}={value}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Identifies one multibinding contribution among many for the same
/// aggregate key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContributionIdentifier {
    module: ClassName,
    element: String,
}

impl ContributionIdentifier {
    #[inline]
    pub fn new(module: ClassName, element: impl Into<String>) -> Self {
        Self {
            module,
            element: element.into(),
        }
    }

    #[inline]
    pub fn module(&self) -> &ClassName {
        &self.module
    }

    #[inline]
    pub fn element(&self) -> &str {
        &self.element
    }
}

/// Canonical identity of a dependency: type + optional qualifier +
/// optional multibinding contribution slot.
///
/// Two keys are equal iff all three parts are equal; this is the only
/// identity the graph ever compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    ty: TypeRef,
    qualifier: Option<Qualifier>,
    multibinding_id: Option<ContributionIdentifier>,
}

impl Key {
    /// An unqualified key for a type.
    #[inline]
    pub fn of(ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: None,
            multibinding_id: None,
        }
    }

    /// A qualified key.
    #[inline]
    pub fn qualified(ty: TypeRef, qualifier: Qualifier) -> Self {
        Self {
            ty,
            qualifier: Some(qualifier),
            multibinding_id: None,
        }
    }

    /// This key tagged as an individual multibinding contribution.
    #[inline]
    pub fn with_contribution(mut self, id: ContributionIdentifier) -> Self {
        self.multibinding_id = Some(id);
        self
    }

    /// This key without its contribution tag: the aggregate key the
    /// contribution feeds.
    #[inline]
    pub fn without_contribution(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            multibinding_id: None,
        }
    }

    /// This key with its type replaced.
    #[inline]
    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: self.qualifier.clone(),
            multibinding_id: self.multibinding_id.clone(),
        }
    }

    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[inline]
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    #[inline]
    pub fn multibinding_id(&self) -> Option<&ContributionIdentifier> {
        self.multibinding_id.as_ref()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(q) = &self.qualifier {
            write!(f, "{q} ")?;
        }
        write!(f, "{}", self.ty)?;
        if let Some(id) = &self.multibinding_id {
            write!(f, " [{}#{}]", id.module.simple_name(), id.element)?;
        }
        Ok(())
    }
}

// =============================================================================
// Request kinds
// =============================================================================

/// How a dependency is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    /// The value itself.
    Instance,
    /// A factory callable on demand.
    Provider,
    /// A handle memoized on first call.
    Lazy,
    /// A provider of fresh lazy handles.
    ProviderOfLazy,
    /// An injector for already-constructed instances.
    MembersInjector,
    /// An asynchronous producer.
    Producer,
    /// An asynchronous result wrapper.
    Produced,
    /// An eager asynchronous value.
    Future,
}

impl RequestKind {
    /// All kinds, in a fixed order used for deterministic enumeration.
    pub const ALL: [RequestKind; 8] = [
        RequestKind::Instance,
        RequestKind::Provider,
        RequestKind::Lazy,
        RequestKind::ProviderOfLazy,
        RequestKind::MembersInjector,
        RequestKind::Producer,
        RequestKind::Produced,
        RequestKind::Future,
    ];

    /// Whether an edge carrying this kind breaks a dependency cycle.
    ///
    /// Only `Instance` edges require the dependency's value before the
    /// dependent can exist; every other kind is an indirection.
    #[inline]
    pub fn breaks_cycles(self) -> bool {
        self != RequestKind::Instance
    }

    /// The framework wrapper this kind wraps a value type in, if any.
    pub fn framework_wrapper(self) -> Option<&'static ClassName> {
        match self {
            RequestKind::Instance | RequestKind::Future => None,
            RequestKind::Provider => Some(&well_known::PROVIDER),
            RequestKind::Lazy => Some(&well_known::LAZY),
            RequestKind::ProviderOfLazy => Some(&well_known::PROVIDER),
            RequestKind::MembersInjector => Some(&well_known::MEMBERS_INJECTOR),
            RequestKind::Producer => Some(&well_known::PRODUCER),
            RequestKind::Produced => Some(&well_known::PRODUCED),
        }
    }

    /// Recognize a request kind from a wrapper type around a key's type,
    /// returning the kind and the unwrapped type.
    ///
    /// `Provider<Lazy<T>>` maps to [`RequestKind::ProviderOfLazy`].
    pub fn from_requested_type(ty: &TypeRef) -> (RequestKind, TypeRef) {
        static SINGLE_WRAPPERS: Lazy<Vec<(&'static ClassName, RequestKind)>> = Lazy::new(|| {
            vec![
                (&*well_known::LAZY, RequestKind::Lazy),
                (&*well_known::MEMBERS_INJECTOR, RequestKind::MembersInjector),
                (&*well_known::PRODUCER, RequestKind::Producer),
                (&*well_known::PRODUCED, RequestKind::Produced),
                (&*well_known::FUTURE, RequestKind::Future),
            ]
        });

        if let Ok(inner) = ty.unwrapped(&well_known::PROVIDER) {
            if let Ok(lazy_inner) = inner.unwrapped(&well_known::LAZY) {
                return (RequestKind::ProviderOfLazy, lazy_inner);
            }
            return (RequestKind::Provider, inner);
        }
        for (wrapper, kind) in SINGLE_WRAPPERS.iter() {
            if let Ok(inner) = ty.unwrapped(wrapper) {
                return (*kind, inner);
            }
        }
        (RequestKind::Instance, ty.clone())
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestKind::Instance => "instance",
            RequestKind::Provider => "provider",
            RequestKind::Lazy => "lazy",
            RequestKind::ProviderOfLazy => "provider-of-lazy",
            RequestKind::MembersInjector => "members-injector",
            RequestKind::Producer => "producer",
            RequestKind::Produced => "produced",
            RequestKind::Future => "future",
        };
        f.write_str(s)
    }
}
