//! # Armature Codegen - Compile-Time Dependency Injection for Rust Toolchains
//!
//! A code generator that turns declarative dependency-injection metadata
//! into self-contained component implementations. The front-end hands it a
//! type model (components, modules, injectable constructors, bindings,
//! multibindings, scopes, qualifiers, assisted factories, production
//! pipelines); it resolves a typed binding graph per component, validates
//! it, and emits an abstract source tree for the file writer.
//!
//! ## Features
//!
//! - 🔑 **Typed keys** - Canonical identity per (type, qualifier,
//!   contribution slot); the only identity used across the graph
//! - 🧭 **Worklist resolution** - Deterministic graph build with explicit
//!   source priority and subcomponent nesting
//! - ✅ **Whole-graph validation** - Missing and duplicate bindings, scope
//!   coherence, cycle legality, nullability, map-key collisions
//! - 🧩 **Two emission modes** - Per-binding factories by default, a
//!   switching-provider dispatcher under `fastInit`
//! - 🔒 **Scope-aware caching** - Double-check for strong scopes,
//!   single-check for the reusable scope
//! - 📦 **Deterministic output** - Identical inputs produce identical
//!   source trees, byte for byte
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! ```rust
//! use dependency_codegen::prelude::*;
//!
//! // The front-end describes an injectable type and a component root.
//! let model = TypeModel::new().injectable(InjectableConstructor::new(
//!     DeclaredType::new(ClassName::new("app", "Database"), Visibility::Public),
//! ));
//! let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
//!     .entry_point(EntryPoint::new(
//!         "db",
//!         TypeRef::declared(ClassName::new("app", "Database")),
//!     ));
//!
//! // The driver resolves, validates, and emits.
//! let messager = CollectingMessager::new();
//! let (summary, files) = process_to_memory(
//!     ProcessingInput { components: vec![component], model },
//!     CompilerOptions::default(),
//!     &messager,
//! )
//! .unwrap();
//!
//! assert_eq!(summary.generated, 1);
//! assert_eq!(
//!     files[0].type_name().canonical_name(),
//!     "app.DaggerAppComponent"
//! );
//! ```
//!
//! ## Pipeline
//!
//! Key model → binding model → graph builder → validator → representation
//! selector → instance suppliers → component builder → driver. Each stage
//! fully consumes its input and hands a value to the next; the pipeline is
//! single-threaded and carries no process-wide state.

pub mod ast;
pub mod binding;
pub mod component;
pub mod config;
pub mod context;
pub mod decl;
pub mod diagnostics;
pub mod driver;
pub mod graph;
pub mod key;
#[cfg(feature = "logging")]
pub mod logging;
pub mod proxies;
pub mod representation;
pub mod supplier;
pub mod validate;

pub use binding::{Binding, BindingKind, CachingKind, DependencyRequest, Scope};
pub use component::{emit, implementation_name, GENERATED_PREFIX};
pub use config::{CompilerOptions, CompilerOptionsBuilder};
pub use context::{CompilationContext, KeyInterner};
pub use decl::{
    ComponentDescriptor, EntryPoint, InjectableConstructor, ModuleBindingDecl, ModuleDescriptor,
    TypeModel,
};
pub use diagnostics::{
    CodegenError, CollectingMessager, Diagnostic, ErrorKind, Messager, Result, Severity,
};
pub use driver::{process_to_memory, Driver, ProcessingInput, ProcessingSummary};
pub use graph::{BindingGraph, BindingGraphBuilder, BindingId};
pub use key::{ClassName, DeclaredType, Key, Qualifier, RequestKind, TypeRef, Visibility};
pub use validate::{validate, ValidationReport};

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ast::{MemorySink, SourceFile, SourceSink};
    pub use crate::{
        Binding, BindingGraph, BindingGraphBuilder, BindingKind, ClassName, CodegenError,
        CollectingMessager, CompilerOptions, ComponentDescriptor, DeclaredType,
        DependencyRequest, Diagnostic, EntryPoint, ErrorKind, InjectableConstructor, Key,
        Messager, ModuleBindingDecl, ModuleDescriptor, ProcessingInput, Qualifier, RequestKind,
        Result, Scope, TypeModel, TypeRef, Visibility, process_to_memory, validate,
    };
}
