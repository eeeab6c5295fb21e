//! Abstract source tree
//!
//! The value handed to the output sink: packages, type declarations, fields,
//! methods, statements, and type references. The generator never formats
//! text; pretty-printing belongs to the external writer behind
//! [`SourceSink`].
//!
//! Trees derive structural equality, which is what the determinism guarantee
//! is asserted against.

use std::collections::HashSet;

use crate::diagnostics::Result;
use crate::key::{ClassName, TypeRef};

// =============================================================================
// Type references in emitted code
// =============================================================================

/// A type reference as written in generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Declared { name: ClassName, args: Vec<TypeName> },
    /// An erased reference; used when the full type cannot be named from
    /// the generated file's package.
    Raw(ClassName),
    TypeVariable(String),
    Wildcard,
}

impl TypeName {
    /// A non-generic declared reference.
    #[inline]
    pub fn of(name: ClassName) -> Self {
        TypeName::Declared {
            name,
            args: Vec::new(),
        }
    }

    /// A generic declared reference.
    #[inline]
    pub fn generic(name: ClassName, args: Vec<TypeName>) -> Self {
        TypeName::Declared { name, args }
    }

    /// Convert a front-end type reference, assuming it is accessible.
    pub fn from_ref(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Declared(d) => TypeName::Declared {
                name: d.name().clone(),
                args: d.args().iter().map(TypeName::from_ref).collect(),
            },
            TypeRef::Wildcard(_) => TypeName::Wildcard,
        }
    }

    /// Convert a front-end type reference for use from `package`, falling
    /// back to the raw erasure when the full type cannot be named there.
    pub fn accessible_from(ty: &TypeRef, package: &str) -> Self {
        if ty.accessible_from(package) {
            return TypeName::from_ref(ty);
        }
        match ty.erased() {
            TypeRef::Declared(d) => TypeName::Raw(d.name().clone()),
            TypeRef::Wildcard(_) => TypeName::Wildcard,
        }
    }

    /// Whether this reference is raw.
    #[inline]
    pub fn is_raw(&self) -> bool {
        matches!(self, TypeName::Raw(_))
    }
}

// =============================================================================
// Expressions and statements
// =============================================================================

/// An expression in generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    This,
    Var(String),
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    StaticCall {
        ty: ClassName,
        method: String,
        args: Vec<Expr>,
    },
    New {
        ty: TypeName,
        args: Vec<Expr>,
    },
    /// A checked cast to a fully named type.
    Cast {
        ty: TypeName,
        expr: Box<Expr>,
    },
    /// An unchecked cast through a raw type, e.g. `(Provider) expr`.
    RawCast {
        ty: ClassName,
        expr: Box<Expr>,
    },
    /// A deferred computation, e.g. a provider body `() -> backend.db()`.
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    Bool(bool),
    Int(i64),
    Str(String),
    Null,
}

impl Expr {
    #[inline]
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    #[inline]
    pub fn field(receiver: Expr, field: impl Into<String>) -> Self {
        Expr::FieldAccess {
            receiver: Box::new(receiver),
            field: field.into(),
        }
    }

    #[inline]
    pub fn call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method: method.into(),
            args,
        }
    }

    #[inline]
    pub fn static_call(ty: ClassName, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::StaticCall {
            ty,
            method: method.into(),
            args,
        }
    }

    #[inline]
    pub fn new_instance(ty: TypeName, args: Vec<Expr>) -> Self {
        Expr::New { ty, args }
    }

    #[inline]
    pub fn cast(ty: TypeName, expr: Expr) -> Self {
        Expr::Cast {
            ty,
            expr: Box::new(expr),
        }
    }

    #[inline]
    pub fn raw_cast(ty: ClassName, expr: Expr) -> Self {
        Expr::RawCast {
            ty,
            expr: Box::new(expr),
        }
    }

    #[inline]
    pub fn lambda(params: Vec<String>, body: Expr) -> Self {
        Expr::Lambda {
            params,
            body: Box::new(body),
        }
    }
}

/// A statement in generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign { target: Expr, value: Expr },
    Expression(Expr),
    Return(Expr),
    Switch {
        subject: Expr,
        cases: Vec<(u32, Vec<Statement>)>,
        default: Vec<Statement>,
    },
    ThrowAssertion { detail: Expr },
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Static,
    Final,
    Override,
}

/// An annotation on a declaration, e.g. a warning suppression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSpec {
    pub ty: ClassName,
    pub value: Option<String>,
}

impl AnnotationSpec {
    /// `@SuppressWarnings(<token>)`.
    pub fn suppress_warnings(token: &str) -> Self {
        Self {
            ty: ClassName::new("lang", "SuppressWarnings"),
            value: Some(token.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeName,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<AnnotationSpec>,
    pub parameters: Vec<ParameterSpec>,
    /// Absent for constructors and void methods.
    pub return_type: Option<TypeName>,
    pub statements: Vec<Statement>,
    pub is_constructor: bool,
}

impl MethodSpec {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            statements: Vec::new(),
            is_constructor: false,
        }
    }

    pub fn constructor() -> Self {
        Self {
            name: "<init>".into(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            statements: Vec::new(),
            is_constructor: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A type declaration with its members and nested types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Vec<Modifier>,
    pub type_parameters: Vec<String>,
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub fields: Vec<FieldSpec>,
    pub methods: Vec<MethodSpec>,
    pub nested: Vec<TypeSpec>,
}

impl TypeSpec {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            modifiers: Vec::new(),
            type_parameters: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Find a nested type by name.
    pub fn nested_type(&self, name: &str) -> Option<&TypeSpec> {
        self.nested.iter().find(|t| t.name == name)
    }
}

/// One generated compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub package: String,
    pub type_spec: TypeSpec,
}

impl SourceFile {
    /// The canonical name of the file's top-level type.
    pub fn type_name(&self) -> ClassName {
        ClassName::new(self.package.clone(), self.type_spec.name.clone())
    }
}

// =============================================================================
// Output sink
// =============================================================================

/// Accepts generated source trees and persists them. Formatting and I/O are
/// entirely the sink's concern.
pub trait SourceSink {
    fn accept(&mut self, file: SourceFile) -> Result<()>;
}

/// A sink that keeps generated files in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<SourceFile>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a generated file by top-level type name.
    pub fn file(&self, canonical_name: &str) -> Option<&SourceFile> {
        self.files
            .iter()
            .find(|f| f.type_name().canonical_name() == canonical_name)
    }
}

impl SourceSink for MemorySink {
    fn accept(&mut self, file: SourceFile) -> Result<()> {
        self.files.push(file);
        Ok(())
    }
}

// =============================================================================
// Name allocation
// =============================================================================

/// Allocates unique member names by suffixing a counter on collision, so
/// that two distinct keys wanting `fooProvider` become `fooProvider` and
/// `fooProvider2`.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique name based on `base`.
    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{base}{counter}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Lower-camel-case form of a type's simple names, used to derive member
/// names from keys: `Outer.Inner` becomes `outerInner`.
pub fn lower_camel(parts: &[String]) -> String {
    let mut out = String::new();
    for part in parts {
        if out.is_empty() {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_lowercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{well_known, Visibility};

    #[test]
    fn test_name_allocator_suffixes() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("unscopedProvider"), "unscopedProvider");
        assert_eq!(names.allocate("unscopedProvider"), "unscopedProvider2");
        assert_eq!(names.allocate("unscopedProvider"), "unscopedProvider3");
        assert_eq!(names.allocate("other"), "other");
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel(&["Database".to_string()]), "database");
        assert_eq!(
            lower_camel(&["Outer".to_string(), "Inner".to_string()]),
            "outerInner"
        );
    }

    #[test]
    fn test_accessible_type_reference() {
        let visible = TypeRef::declared(ClassName::new("app", "Service"));
        assert_eq!(
            TypeName::accessible_from(&visible, "elsewhere"),
            TypeName::of(ClassName::new("app", "Service"))
        );

        let hidden = TypeRef::declared_with(
            ClassName::new("other", "Subtype"),
            Visibility::PackagePrivate,
        );
        assert_eq!(
            TypeName::accessible_from(&hidden, "app"),
            TypeName::Raw(ClassName::new("other", "Subtype"))
        );

        // A visible wrapper over a hidden argument also degrades to raw.
        let wrapped = TypeRef::generic(well_known::PROVIDER.clone(), vec![hidden]);
        assert_eq!(
            TypeName::accessible_from(&wrapped, "app"),
            TypeName::Raw(well_known::PROVIDER.clone())
        );
    }

    #[test]
    fn test_tree_lookup_helpers() {
        let mut spec = TypeSpec::class("DaggerAppComponent");
        spec.fields.push(FieldSpec {
            name: "dbProvider".into(),
            ty: TypeName::of(well_known::PROVIDER.clone()),
            modifiers: vec![Modifier::Private],
            annotations: vec![],
        });
        spec.methods.push(MethodSpec::method("db"));
        assert!(spec.field("dbProvider").is_some());
        assert!(spec.method("db").is_some());
        assert!(spec.field("missing").is_none());
    }
}
