//! Component implementation building
//!
//! Aggregates everything a component needs into one source tree: provider
//! fields deduplicated per key, initialization statements in dependency
//! order, entry-point overrides, creator builders, nested subcomponent
//! implementations, and the fast-init switching-provider dispatcher.
//!
//! Provider-field initialization order falls out of demand-order recursion:
//! building a field's creation expression first builds the fields it uses.
//! A provider cycle (legal, because it traverses provider edges) is broken
//! with a two-phase `DelegateFactory` that is set up first and patched once
//! the real factory exists.

use std::collections::{HashMap, HashSet};

use ahash::RandomState;

use crate::ast::{
    lower_camel, AnnotationSpec, Expr, FieldSpec, MethodSpec, Modifier, NameAllocator,
    ParameterSpec, SourceFile, Statement, TypeKind, TypeName, TypeSpec,
};
use crate::binding::{Binding, BindingKind, BindingPayload, DependencyRequest};
use crate::config::CompilerOptions;
use crate::decl::{ComponentDescriptor, TypeModel};
use crate::diagnostics::{CodegenError, Result};
use crate::graph::{BindingGraph, BindingId};
use crate::key::{well_known, AnnotationValue, ClassName, Key, RequestKind, TypeRef};
use crate::proxies;
use crate::representation::{self, RepresentationKind};
use crate::supplier::{self, SupplierStrategy};

#[cfg(feature = "logging")]
use tracing::debug;

/// Prefix of generated component implementations.
pub const GENERATED_PREFIX: &str = "Dagger";

/// Name of the generated switching-provider dispatcher type.
pub const SWITCHING_PROVIDER: &str = "SwitchingProvider";

/// The implementation type generated for a component: `pkg.DaggerOuter_Inner`
/// for a component `pkg.Outer.Inner`.
pub fn implementation_name(component: &ClassName) -> ClassName {
    component.peer(format!(
        "{GENERATED_PREFIX}{}",
        component.joined_simple_names()
    ))
}

/// Emit the implementation source file for a validated component graph.
pub fn emit(
    graph: &BindingGraph,
    descriptor: &ComponentDescriptor,
    model: &TypeModel,
    options: CompilerOptions,
) -> Result<SourceFile> {
    let mut emitter = ComponentEmitter::new(graph, descriptor, model, options)?;
    emitter.emit_entry_points()?;
    emitter.seal()
}

/// An expression plus whether its static type is erased relative to the key
/// it satisfies. Erased expressions pick up a cast at accessible return
/// sites and are passed through uncast everywhere else.
#[derive(Debug, Clone)]
struct Emitted {
    expr: Expr,
    erased: bool,
}

impl Emitted {
    fn exact(expr: Expr) -> Self {
        Self {
            expr,
            erased: false,
        }
    }

    fn erased(expr: Expr) -> Self {
        Self { expr, erased: true }
    }
}

#[derive(Debug, Clone)]
struct ProviderField {
    name: String,
    raw: bool,
    /// Set while the field holds a `DelegateFactory` awaiting its patch.
    placeholder: bool,
}

/// Where generated expressions are being placed: which implementation, which
/// graph resolves keys, and what expression denotes that implementation
/// instance in the surrounding code.
#[derive(Clone)]
struct Ctx {
    impl_idx: usize,
    graph_idx: usize,
    recv: Expr,
}

struct ImplState<'a> {
    descriptor: &'a ComponentDescriptor,
    component: ClassName,
    name: String,
    self_field: String,
    parent: Option<usize>,
    parent_field: Option<String>,
    children: Vec<usize>,
    names: NameAllocator,
    /// Provider fields, in allocation order.
    fields: Vec<FieldSpec>,
    /// Constructor-stored fields: parent reference, modules, dependencies,
    /// bound instances.
    held_fields: Vec<FieldSpec>,
    provider_fields: HashMap<Key, ProviderField, RandomState>,
    in_progress: HashSet<Key, RandomState>,
    init_statements: Vec<Statement>,
    entry_methods: Vec<MethodSpec>,
    module_fields: Vec<(ClassName, String)>,
    dep_fields: Vec<(ClassName, String)>,
    /// (setter, field name, field type)
    bound_fields: Vec<(String, String, TypeName)>,
    switch_ids: HashMap<Key, u32, RandomState>,
    switch_cases: Vec<(u32, Binding, Expr)>,
    next_switch_id: u32,
    sealed: Option<TypeSpec>,
}

impl<'a> ImplState<'a> {
    fn module_field(&self, module: &ClassName) -> Option<&str> {
        self.module_fields
            .iter()
            .find(|(name, _)| name == module)
            .map(|(_, field)| field.as_str())
    }

    fn dep_field(&self, dependency: &ClassName) -> Option<&str> {
        self.dep_fields
            .iter()
            .find(|(name, _)| name == dependency)
            .map(|(_, field)| field.as_str())
    }

    fn bound_field(&self, setter: &str) -> Option<&str> {
        self.bound_fields
            .iter()
            .find(|(name, _, _)| name == setter)
            .map(|(_, field, _)| field.as_str())
    }
}

pub struct ComponentEmitter<'a> {
    options: CompilerOptions,
    model: &'a TypeModel,
    package: String,
    graphs: Vec<&'a BindingGraph>,
    impls: Vec<ImplState<'a>>,
    by_component: HashMap<ClassName, usize, RandomState>,
}

impl<'a> ComponentEmitter<'a> {
    pub fn new(
        graph: &'a BindingGraph,
        descriptor: &'a ComponentDescriptor,
        model: &'a TypeModel,
        options: CompilerOptions,
    ) -> Result<Self> {
        let mut emitter = ComponentEmitter {
            options,
            model,
            package: graph.package().to_string(),
            graphs: Vec::new(),
            impls: Vec::new(),
            by_component: HashMap::default(),
        };
        emitter.collect(graph, descriptor, None)?;
        emitter.collect_module_fields();
        Ok(emitter)
    }

    fn collect(
        &mut self,
        graph: &'a BindingGraph,
        descriptor: &'a ComponentDescriptor,
        parent: Option<usize>,
    ) -> Result<usize> {
        if graph.component() != &descriptor.name {
            return Err(CodegenError::internal(format!(
                "graph for {} does not match descriptor {}",
                graph.component(),
                descriptor.name
            )));
        }
        let index = self.impls.len();
        let name = if parent.is_none() {
            implementation_name(&descriptor.name).simple_name().to_string()
        } else {
            format!("{}Impl", descriptor.name.joined_simple_names())
        };
        let self_field = lower_camel(&[descriptor.name.joined_simple_names(), "Impl".into()]);

        let mut state = ImplState {
            descriptor,
            component: descriptor.name.clone(),
            name,
            self_field,
            parent,
            parent_field: None,
            children: Vec::new(),
            names: NameAllocator::new(),
            fields: Vec::new(),
            held_fields: Vec::new(),
            provider_fields: HashMap::default(),
            in_progress: HashSet::default(),
            init_statements: Vec::new(),
            entry_methods: Vec::new(),
            module_fields: Vec::new(),
            dep_fields: Vec::new(),
            bound_fields: Vec::new(),
            switch_ids: HashMap::default(),
            switch_cases: Vec::new(),
            next_switch_id: 0,
            sealed: None,
        };

        if let Some(parent_idx) = parent {
            let parent_self = self.impls[parent_idx].self_field.clone();
            let parent_ty =
                TypeName::of(ClassName::new("", self.impls[parent_idx].name.clone()));
            let field = state.names.allocate(&parent_self);
            state.held_fields.push(FieldSpec {
                name: field.clone(),
                ty: parent_ty,
                modifiers: vec![Modifier::Private, Modifier::Final],
                annotations: vec![],
            });
            state.parent_field = Some(field);
        }

        for dependency in &descriptor.dependencies {
            let simple: Vec<String> = dependency.ty.name().simple_names().to_vec();
            let field = state.names.allocate(&lower_camel(&simple));
            state.held_fields.push(FieldSpec {
                name: field.clone(),
                ty: TypeName::of(dependency.ty.name().clone()),
                modifiers: vec![Modifier::Private, Modifier::Final],
                annotations: vec![],
            });
            state.dep_fields.push((dependency.ty.name().clone(), field));
        }

        if let Some(creator) = &descriptor.creator {
            for bound in &creator.bound_instances {
                let field = state.names.allocate(&bound.setter);
                let ty = TypeName::accessible_from(bound.key.ty(), &self.package);
                state.held_fields.push(FieldSpec {
                    name: field.clone(),
                    ty: ty.clone(),
                    modifiers: vec![Modifier::Private, Modifier::Final],
                    annotations: vec![],
                });
                state.bound_fields.push((bound.setter.clone(), field, ty));
            }
        }

        self.by_component.insert(descriptor.name.clone(), index);
        self.graphs.push(graph);
        self.impls.push(state);

        let mut children = Vec::new();
        for (subgraph, sub_descriptor) in
            graph.subgraphs().iter().zip(&descriptor.subcomponents)
        {
            let child = self.collect(subgraph, sub_descriptor, Some(index))?;
            children.push(child);
        }
        self.impls[index].children = children;
        Ok(index)
    }

    /// Modules whose bindings need an instance get a field on the owning
    /// implementation, discovered by scanning every graph so that a module
    /// used only from a subcomponent still lands on its declaring owner.
    fn collect_module_fields(&mut self) {
        for graph in &self.graphs {
            for node in graph.nodes() {
                if !node.binding.requires_module_instance() {
                    continue;
                }
                let Some(module) = node.binding.module().cloned() else {
                    continue;
                };
                let Some(&owner) = self.by_component.get(&node.owner) else {
                    continue;
                };
                let state = &mut self.impls[owner];
                if state.module_field(&module).is_some() {
                    continue;
                }
                let simple: Vec<String> = module.simple_names().to_vec();
                let field = state.names.allocate(&lower_camel(&simple));
                state.held_fields.push(FieldSpec {
                    name: field.clone(),
                    ty: TypeName::of(module.clone()),
                    modifiers: vec![Modifier::Private, Modifier::Final],
                    annotations: vec![],
                });
                state.module_fields.push((module, field));
            }
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    fn emit_entry_points(&mut self) -> Result<()> {
        for index in 0..self.impls.len() {
            let graph = self.graphs[index];
            let roots: Vec<_> = graph.roots().to_vec();

            #[cfg(feature = "logging")]
            debug!(component = %graph.component(), roots = roots.len(), "emitting entry points");

            for root in roots {
                let ctx = Ctx {
                    impl_idx: index,
                    graph_idx: index,
                    recv: Expr::This,
                };
                let id = graph.resolve_request(&root.request).ok_or_else(|| {
                    CodegenError::internal(format!(
                        "entry point {} of {} has no resolved binding for {}",
                        root.method,
                        graph.component(),
                        root.request.key()
                    ))
                })?;
                let kind = root.request.kind();
                let emitted = self.request_expr(&ctx, id, kind)?;

                let declared = requested_type(kind, root.request.key());
                let return_type = TypeName::accessible_from(&declared, &self.package);
                let expr = if emitted.erased && !return_type.is_raw() {
                    match kind {
                        RequestKind::Instance | RequestKind::Future => {
                            Expr::cast(return_type.clone(), emitted.expr)
                        }
                        other => {
                            let wrapper = other
                                .framework_wrapper()
                                .cloned()
                                .unwrap_or_else(|| well_known::PROVIDER.clone());
                            Expr::raw_cast(wrapper, emitted.expr)
                        }
                    }
                } else {
                    emitted.expr
                };

                let mut method = MethodSpec::method(&root.method);
                method.modifiers = vec![Modifier::Public, Modifier::Override];
                method.return_type = Some(return_type);
                method.statements.push(Statement::Return(expr));
                self.impls[index].entry_methods.push(method);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Request representations
    // =========================================================================

    fn request_expr(&mut self, ctx: &Ctx, id: BindingId, kind: RequestKind) -> Result<Emitted> {
        let graph = self.graphs[ctx.graph_idx];
        let binding = graph.binding(id).clone();

        match representation::select(kind, &binding, graph, self.options.fast_init) {
            RepresentationKind::DirectInstance => {
                let direct = self.direct_expr(ctx, &binding)?;
                Ok(self.finish_instance(kind, direct))
            }
            RepresentationKind::FrameworkInstance => {
                if kind == RequestKind::MembersInjector {
                    return self.members_injector_expr(ctx, &binding);
                }
                let framework = self.framework_expr(ctx, &binding)?;
                Ok(match kind {
                    RequestKind::Provider => framework,
                    RequestKind::Instance | RequestKind::Future => {
                        let value = Emitted {
                            expr: Expr::call(framework.expr, "get", vec![]),
                            erased: framework.erased,
                        };
                        self.finish_instance(kind, value)
                    }
                    RequestKind::Lazy => Emitted {
                        expr: Expr::static_call(
                            well_known::DOUBLE_CHECK.clone(),
                            "lazy",
                            vec![framework.expr],
                        ),
                        erased: framework.erased,
                    },
                    RequestKind::ProviderOfLazy => Emitted {
                        expr: Expr::static_call(
                            well_known::PROVIDER_OF_LAZY.clone(),
                            "create",
                            vec![framework.expr],
                        ),
                        erased: framework.erased,
                    },
                    RequestKind::Producer => Emitted {
                        expr: Expr::static_call(
                            well_known::PRODUCERS.clone(),
                            "producerFromProvider",
                            vec![framework.expr],
                        ),
                        erased: framework.erased,
                    },
                    RequestKind::Produced => Emitted {
                        expr: Expr::static_call(
                            well_known::PRODUCED.clone(),
                            "successful",
                            vec![Expr::call(framework.expr, "get", vec![])],
                        ),
                        erased: framework.erased,
                    },
                    RequestKind::MembersInjector => unreachable!("handled above"),
                })
            }
        }
    }

    fn finish_instance(&self, kind: RequestKind, value: Emitted) -> Emitted {
        if kind == RequestKind::Future {
            Emitted {
                expr: Expr::static_call(
                    well_known::FUTURES.clone(),
                    "immediateFuture",
                    vec![value.expr],
                ),
                erased: value.erased,
            }
        } else {
            value
        }
    }

    /// The members injector object for a members-injection binding.
    fn members_injector_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        let factory = supplier::static_factory_name(binding).ok_or_else(|| {
            CodegenError::internal(format!("{binding} has no members injector type"))
        })?;
        let mut args = Vec::new();
        for dep in binding.dependencies().to_vec() {
            args.push(self.dependency_framework_expr(ctx, &dep)?.expr);
        }
        Ok(Emitted::exact(Expr::static_call(factory, "create", args)))
    }

    /// A provider-typed expression for a dependency request, used as a
    /// factory argument.
    fn dependency_framework_expr(
        &mut self,
        ctx: &Ctx,
        dep: &DependencyRequest,
    ) -> Result<Emitted> {
        let graph = self.graphs[ctx.graph_idx];
        let id = graph.resolve_request(dep).ok_or_else(|| {
            CodegenError::internal(format!("unresolved dependency {}", dep.key()))
        })?;
        if dep.kind() == RequestKind::MembersInjector {
            let binding = graph.binding(id).clone();
            let injector = self.members_injector_expr(ctx, &binding)?;
            return Ok(Emitted {
                expr: Expr::static_call(
                    well_known::INSTANCE_FACTORY.clone(),
                    "create",
                    vec![injector.expr],
                ),
                erased: injector.erased,
            });
        }
        let binding = graph.binding(id).clone();
        self.framework_expr(ctx, &binding)
    }

    // =========================================================================
    // Framework instances
    // =========================================================================

    fn framework_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        let graph = self.graphs[ctx.graph_idx];

        // An uncached delegate contributes no provider of its own: requests
        // borrow the target's provider and adjust the type at the use site.
        if binding.kind() == BindingKind::Delegate
            && !representation::needs_caching(binding, graph)
        {
            let source = binding
                .delegate_source()
                .cloned()
                .ok_or_else(|| CodegenError::internal(format!("{binding} has no source")))?;
            let target = graph.resolve(&source).ok_or_else(|| {
                CodegenError::internal(format!("{binding} forwards to unresolved {source}"))
            })?;
            let target_binding = graph.binding(target).clone();
            let inner = self.framework_expr(ctx, &target_binding)?;
            return Ok(Emitted::erased(inner.expr));
        }

        match supplier::select_supplier(binding, self.options) {
            SupplierStrategy::StaticFactory => self.static_factory_expr(binding),
            SupplierStrategy::ProviderField | SupplierStrategy::SwitchingProvider => {
                let (owner, name, raw) = self.ensure_provider_field(ctx, binding)?;
                let access = self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
                Ok(Emitted {
                    expr: Expr::field(access, name),
                    erased: raw,
                })
            }
        }
    }

    /// An inline reference to the binding's pre-generated static factory.
    fn static_factory_expr(&self, binding: &Binding) -> Result<Emitted> {
        let erased = !binding.key().ty().accessible_from(&self.package);
        let expr = match binding.kind() {
            BindingKind::MultiboundSet => {
                Expr::static_call(well_known::SET_FACTORY.clone(), "empty", vec![])
            }
            BindingKind::MultiboundMap => {
                Expr::static_call(well_known::MAP_FACTORY.clone(), "empty", vec![])
            }
            _ => {
                let factory = supplier::static_factory_name(binding).ok_or_else(|| {
                    CodegenError::internal(format!("{binding} has no static factory"))
                })?;
                Expr::static_call(factory, "create", vec![])
            }
        };
        Ok(Emitted { expr, erased })
    }

    /// Get or create the provider field for a binding on its owning
    /// implementation. Returns (owner, field name, raw-ness).
    fn ensure_provider_field(
        &mut self,
        ctx: &Ctx,
        binding: &Binding,
    ) -> Result<(usize, String, bool)> {
        let graph = self.graphs[ctx.graph_idx];
        let owner_component = graph
            .resolve_request(&DependencyRequest::new(
                binding.key().clone(),
                provider_space_kind(binding),
            ))
            .map(|id| graph.node(id).owner.clone())
            .unwrap_or_else(|| self.impls[ctx.impl_idx].component.clone());
        let owner = *self
            .by_component
            .get(&owner_component)
            .unwrap_or(&ctx.impl_idx);

        let key = self.canonical_key(binding.key());
        let raw = !binding.key().ty().accessible_from(&self.package);

        if let Some(existing) = self.impls[owner].provider_fields.get(&key) {
            return Ok((owner, existing.name.clone(), existing.raw));
        }

        // Re-entry through a provider cycle: set up a DelegateFactory now;
        // the real factory patches it once built.
        if self.impls[owner].in_progress.contains(&key) {
            let name = self.allocate_provider_field(owner, binding, raw);
            self.impls[owner].init_statements.push(Statement::Assign {
                target: Expr::field(Expr::This, name.clone()),
                value: Expr::new_instance(
                    TypeName::of(well_known::DELEGATE_FACTORY.clone()),
                    vec![],
                ),
            });
            self.impls[owner].provider_fields.insert(
                key,
                ProviderField {
                    name: name.clone(),
                    raw,
                    placeholder: true,
                },
            );
            return Ok((owner, name, raw));
        }
        self.impls[owner].in_progress.insert(key.clone());

        let owner_ctx = Ctx {
            impl_idx: owner,
            graph_idx: ctx.graph_idx,
            recv: Expr::This,
        };
        let creation = if self.options.fast_init && supplier::uses_switching_provider(binding) {
            self.switching_provider_expr(&owner_ctx, binding)?
        } else {
            self.factory_creation_expr(&owner_ctx, binding)?
        };
        let wrapped = if representation::needs_caching(binding, graph) {
            supplier::wrap_caching(binding.caching(), creation.expr)
        } else {
            creation.expr
        };

        self.impls[owner].in_progress.remove(&key);

        // A cycle partner may have materialized the field meanwhile.
        if let Some(existing) = self.impls[owner].provider_fields.get_mut(&key) {
            if existing.placeholder {
                existing.placeholder = false;
                let name = existing.name.clone();
                self.impls[owner]
                    .init_statements
                    .push(Statement::Expression(Expr::static_call(
                        well_known::DELEGATE_FACTORY.clone(),
                        "setDelegate",
                        vec![Expr::field(Expr::This, name.clone()), wrapped],
                    )));
                return Ok((owner, name, raw));
            }
            let name = existing.name.clone();
            return Ok((owner, name, raw));
        }

        let name = self.allocate_provider_field(owner, binding, raw);
        self.impls[owner].init_statements.push(Statement::Assign {
            target: Expr::field(Expr::This, name.clone()),
            value: wrapped,
        });
        self.impls[owner].provider_fields.insert(
            key,
            ProviderField {
                name: name.clone(),
                raw,
                placeholder: false,
            },
        );
        Ok((owner, name, raw))
    }

    fn allocate_provider_field(&mut self, owner: usize, binding: &Binding, raw: bool) -> String {
        let base = format!("{}Provider", field_base_name(binding));
        let state = &mut self.impls[owner];
        let name = state.names.allocate(&base);
        let (ty, annotations) = if raw {
            (
                TypeName::Raw(well_known::PROVIDER.clone()),
                vec![AnnotationSpec::suppress_warnings("rawtypes")],
            )
        } else {
            (
                TypeName::generic(
                    well_known::PROVIDER.clone(),
                    vec![TypeName::from_ref(binding.key().ty())],
                ),
                vec![],
            )
        };
        state.fields.push(FieldSpec {
            name: name.clone(),
            ty,
            modifiers: vec![Modifier::Private],
            annotations,
        });
        name
    }

    /// The default-mode creation expression for a binding's provider.
    fn factory_creation_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        let graph = self.graphs[ctx.graph_idx];
        let expr = match binding.kind() {
            BindingKind::Injection | BindingKind::Provision | BindingKind::Production => {
                let factory = supplier::static_factory_name(binding).ok_or_else(|| {
                    CodegenError::internal(format!("{binding} has no factory type"))
                })?;
                let mut args = Vec::new();
                if binding.requires_module_instance() {
                    args.push(self.module_instance_expr(ctx, binding)?);
                }
                for dep in binding.dependencies().to_vec() {
                    args.push(self.dependency_framework_expr(ctx, &dep)?.expr);
                }
                if binding.kind() == BindingKind::Production
                    && self.options.write_producer_name_in_token
                {
                    if let BindingPayload::ModuleMethod { method, .. } = binding.payload() {
                        args.push(Expr::Str(method.clone()));
                    }
                }
                Expr::static_call(factory, "create", args)
            }
            BindingKind::Delegate => {
                let source = binding
                    .delegate_source()
                    .cloned()
                    .ok_or_else(|| CodegenError::internal(format!("{binding} has no source")))?;
                let target = graph.resolve(&source).ok_or_else(|| {
                    CodegenError::internal(format!("{binding} forwards to unresolved {source}"))
                })?;
                let target_binding = graph.binding(target).clone();
                let inner = self.framework_expr(ctx, &target_binding)?;
                Expr::raw_cast(well_known::PROVIDER.clone(), inner.expr)
            }
            BindingKind::MultiboundSet => {
                let mut args = Vec::new();
                for dep in binding.dependencies().to_vec() {
                    args.push(self.dependency_framework_expr(ctx, &dep)?.expr);
                }
                Expr::static_call(well_known::SET_FACTORY.clone(), "create", args)
            }
            BindingKind::MultiboundMap => {
                let BindingPayload::MapContributions { entries } = binding.payload() else {
                    return Err(CodegenError::internal(format!(
                        "{binding} has no map contributions"
                    )));
                };
                let entries = entries.clone();
                let mut chain = Expr::static_call(
                    well_known::MAP_FACTORY.clone(),
                    "builder",
                    vec![Expr::Int(entries.len() as i64)],
                );
                for (map_key, contribution) in entries {
                    let dep = DependencyRequest::new(contribution, RequestKind::Instance);
                    let provider = self.dependency_framework_expr(ctx, &dep)?;
                    chain = Expr::call(
                        chain,
                        "put",
                        vec![annotation_value_expr(&map_key), provider.expr],
                    );
                }
                Expr::call(chain, "build", vec![])
            }
            BindingKind::Optional => match binding.dependencies().first().cloned() {
                Some(underlying) => {
                    let provider = self.dependency_framework_expr(ctx, &underlying)?;
                    Expr::static_call(
                        well_known::OPTIONAL_FACTORY.clone(),
                        "of",
                        vec![provider.expr],
                    )
                }
                None => Expr::static_call(
                    well_known::INSTANCE_FACTORY.clone(),
                    "create",
                    vec![Expr::static_call(well_known::OPTIONAL.clone(), "empty", vec![])],
                ),
            },
            BindingKind::Component => Expr::static_call(
                well_known::INSTANCE_FACTORY.clone(),
                "create",
                vec![ctx.recv.clone()],
            ),
            BindingKind::ComponentDependency => {
                let value = self.direct_expr(ctx, binding)?;
                Expr::static_call(
                    well_known::INSTANCE_FACTORY.clone(),
                    "create",
                    vec![value.expr],
                )
            }
            BindingKind::ComponentProvision | BindingKind::ComponentProduction => {
                let value = self.direct_expr(ctx, binding)?;
                Expr::lambda(vec![], value.expr)
            }
            BindingKind::BoundInstance => {
                let value = self.direct_expr(ctx, binding)?;
                Expr::static_call(
                    well_known::INSTANCE_FACTORY.clone(),
                    "create",
                    vec![value.expr],
                )
            }
            BindingKind::SubcomponentCreator => {
                let value = self.direct_expr(ctx, binding)?;
                Expr::lambda(vec![], value.expr)
            }
            BindingKind::AssistedFactory => self.assisted_factory_expr(ctx, binding, "create")?,
            BindingKind::MembersInjector | BindingKind::MembersInjection => {
                let injector = self.members_injector_target_expr(ctx, binding)?;
                Expr::static_call(
                    well_known::INSTANCE_FACTORY.clone(),
                    "create",
                    vec![injector],
                )
            }
            BindingKind::AssistedInjection => {
                return Err(CodegenError::internal(format!(
                    "{binding} cannot supply a plain provider; it is constructed by its assisted factory"
                )));
            }
        };
        Ok(Emitted::exact(expr))
    }

    /// The fast-init dispatcher reference for a binding, assigning its id on
    /// first demand.
    fn switching_provider_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        let owner = ctx.impl_idx;
        let key = self.canonical_key(binding.key());

        let existing = self.impls[owner].switch_ids.get(&key).copied();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.impls[owner].next_switch_id;
                self.impls[owner].next_switch_id += 1;
                self.impls[owner].switch_ids.insert(key, id);

                let self_field = self.impls[owner].self_field.clone();
                let case_ctx = Ctx {
                    impl_idx: owner,
                    graph_idx: ctx.graph_idx,
                    recv: Expr::var(self_field),
                };
                let case_expr = self.uncached_instance_expr(&case_ctx, binding)?;
                self.impls[owner]
                    .switch_cases
                    .push((id, binding.clone(), case_expr.expr));
                id
            }
        };

        let type_arg = if binding.key().ty().accessible_from(&self.package) {
            TypeName::from_ref(binding.key().ty())
        } else {
            TypeName::of(well_known::OBJECT.clone())
        };
        Ok(Emitted::exact(Expr::new_instance(
            TypeName::generic(ClassName::new("", SWITCHING_PROVIDER), vec![type_arg]),
            vec![ctx.recv.clone(), Expr::Int(id as i64)],
        )))
    }

    /// A fresh-instance expression for a dispatcher case: construction with
    /// no caching wrapper, whatever the binding's scope says.
    fn uncached_instance_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        match binding.kind() {
            BindingKind::AssistedFactory => {
                Ok(Emitted::exact(self.assisted_factory_expr(
                    ctx,
                    binding,
                    "newInstance",
                )?))
            }
            BindingKind::MembersInjection | BindingKind::MembersInjector => {
                let injector = self.members_injector_target_expr(ctx, binding)?;
                Ok(Emitted::exact(injector))
            }
            _ => self.direct_expr(ctx, binding),
        }
    }

    /// Direct instance construction for a binding.
    fn direct_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Emitted> {
        let graph = self.graphs[ctx.graph_idx];
        Ok(match binding.payload().clone() {
            BindingPayload::Constructor {
                constructed,
                assisted_parameters,
            } => {
                let mut args = Vec::new();
                for dep in binding.dependencies().to_vec() {
                    let id = graph.resolve_request(&dep).ok_or_else(|| {
                        CodegenError::internal(format!("unresolved dependency {}", dep.key()))
                    })?;
                    args.push(self.request_expr(ctx, id, dep.kind())?.expr);
                }
                for parameter in &assisted_parameters {
                    if parameter.is_assisted {
                        args.push(Expr::var(&parameter.name));
                    }
                }
                let ty = TypeRef::Declared(constructed.clone());
                if ty.accessible_from(&self.package) {
                    Emitted::exact(Expr::new_instance(TypeName::from_ref(&ty), args))
                } else {
                    let factory = supplier::constructor_factory_name(constructed.name());
                    Emitted::erased(Expr::static_call(factory, "newInstance", args))
                }
            }
            BindingPayload::ModuleMethod { module, method, requires_module_instance } => {
                let mut args = Vec::new();
                for dep in binding.dependencies().to_vec() {
                    let id = graph.resolve_request(&dep).ok_or_else(|| {
                        CodegenError::internal(format!("unresolved dependency {}", dep.key()))
                    })?;
                    args.push(self.request_expr(ctx, id, dep.kind())?.expr);
                }
                let erased = !binding.key().ty().accessible_from(&self.package);
                if requires_module_instance {
                    let receiver = self.module_instance_expr(ctx, binding)?;
                    Emitted {
                        expr: Expr::call(receiver, method, args),
                        erased,
                    }
                } else {
                    let factory = supplier::module_method_factory_name(&module, &method);
                    Emitted {
                        expr: Expr::static_call(factory, method, args),
                        erased,
                    }
                }
            }
            BindingPayload::Delegate { source, .. } => {
                let target = graph.resolve(&source).ok_or_else(|| {
                    CodegenError::internal(format!("{binding} forwards to unresolved {source}"))
                })?;
                self.request_expr(ctx, target, RequestKind::Instance)?
            }
            BindingPayload::SetContributions { .. } => {
                let mut args = Vec::new();
                for dep in binding.dependencies().to_vec() {
                    let id = graph.resolve_request(&dep).ok_or_else(|| {
                        CodegenError::internal(format!("unresolved dependency {}", dep.key()))
                    })?;
                    args.push(self.request_expr(ctx, id, RequestKind::Instance)?.expr);
                }
                Emitted::exact(Expr::static_call(well_known::SETS.clone(), "of", args))
            }
            BindingPayload::MapContributions { entries } => {
                let mut args = Vec::new();
                for (map_key, contribution) in entries {
                    args.push(annotation_value_expr(&map_key));
                    let dep = DependencyRequest::new(contribution, RequestKind::Instance);
                    let id = graph.resolve_request(&dep).ok_or_else(|| {
                        CodegenError::internal(format!("unresolved dependency {}", dep.key()))
                    })?;
                    args.push(self.request_expr(ctx, id, RequestKind::Instance)?.expr);
                }
                Emitted::exact(Expr::static_call(well_known::MAPS.clone(), "of", args))
            }
            BindingPayload::OptionalUnderlying { underlying } => match underlying {
                Some(dep) => {
                    let id = graph.resolve_request(&dep).ok_or_else(|| {
                        CodegenError::internal(format!("unresolved dependency {}", dep.key()))
                    })?;
                    let value = self.request_expr(ctx, id, RequestKind::Instance)?;
                    Emitted::exact(Expr::static_call(
                        well_known::OPTIONAL.clone(),
                        "of",
                        vec![value.expr],
                    ))
                }
                None => Emitted::exact(Expr::static_call(
                    well_known::OPTIONAL.clone(),
                    "empty",
                    vec![],
                )),
            },
            BindingPayload::ComponentSource { source, method } => {
                let owner = *self
                    .by_component
                    .get(&self.owner_of(ctx, binding))
                    .unwrap_or(&ctx.impl_idx);
                match method {
                    Some(method) => {
                        let field = self.impls[owner]
                            .dep_field(&source)
                            .ok_or_else(|| {
                                CodegenError::internal(format!(
                                    "{binding} has no stored dependency {source}"
                                ))
                            })?
                            .to_string();
                        let access = self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
                        Emitted::exact(Expr::call(Expr::field(access, field), method, vec![]))
                    }
                    None => {
                        if source == self.impls[owner].component {
                            // The component object itself.
                            Emitted::exact(self.impl_path(
                                ctx.impl_idx,
                                owner,
                                ctx.recv.clone(),
                            )?)
                        } else {
                            let field = self.impls[owner]
                                .dep_field(&source)
                                .ok_or_else(|| {
                                    CodegenError::internal(format!(
                                        "{binding} has no stored dependency {source}"
                                    ))
                                })?
                                .to_string();
                            let access =
                                self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
                            Emitted::exact(Expr::field(access, field))
                        }
                    }
                }
            }
            BindingPayload::BoundInstance { parameter } => {
                let owner = *self
                    .by_component
                    .get(&self.owner_of(ctx, binding))
                    .unwrap_or(&ctx.impl_idx);
                let field = self.impls[owner]
                    .bound_field(&parameter)
                    .ok_or_else(|| {
                        CodegenError::internal(format!(
                            "{binding} has no stored instance for setter {parameter}"
                        ))
                    })?
                    .to_string();
                let access = self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
                Emitted::exact(Expr::field(access, field))
            }
            BindingPayload::Subcomponent { subcomponent } => {
                let owner = *self
                    .by_component
                    .get(&self.owner_of(ctx, binding))
                    .unwrap_or(&ctx.impl_idx);
                let builder = creator_impl_name(&subcomponent);
                let access = self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
                Emitted::exact(Expr::new_instance(
                    TypeName::of(ClassName::new("", builder)),
                    vec![access],
                ))
            }
            BindingPayload::AssistedFactory { .. } | BindingPayload::MembersTarget { .. } => {
                return Err(CodegenError::internal(format!(
                    "{binding} is always a framework instance"
                )));
            }
            BindingPayload::None => {
                return Err(CodegenError::internal(format!(
                    "{binding} has no construction strategy"
                )));
            }
        })
    }

    /// `JobFactory_Impl.create(Job_Factory.create(deps...))`, or
    /// `newInstance` for the unwrapped dispatcher form.
    fn assisted_factory_expr(
        &mut self,
        ctx: &Ctx,
        binding: &Binding,
        method: &str,
    ) -> Result<Expr> {
        let BindingPayload::AssistedFactory { factory, target, .. } = binding.payload().clone()
        else {
            return Err(CodegenError::internal(format!(
                "{binding} is not an assisted factory"
            )));
        };
        let graph = self.graphs[ctx.graph_idx];
        let target_id = graph.resolve(&target).ok_or_else(|| {
            CodegenError::internal(format!("{binding} constructs unresolved {target}"))
        })?;
        let target_binding = graph.binding(target_id).clone();
        let target_factory = supplier::static_factory_name(&target_binding).ok_or_else(|| {
            CodegenError::internal(format!("{target_binding} has no factory type"))
        })?;
        let mut args = Vec::new();
        for dep in target_binding.dependencies().to_vec() {
            args.push(self.dependency_framework_expr(ctx, &dep)?.expr);
        }
        let inner = Expr::static_call(target_factory, "create", args);
        Ok(Expr::static_call(
            supplier::assisted_factory_impl_name(factory.name()),
            method,
            vec![inner],
        ))
    }

    /// `Foo_MembersInjector.create(deps...)` for a members binding.
    fn members_injector_target_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Expr> {
        let graph = self.graphs[ctx.graph_idx];
        match binding.kind() {
            BindingKind::MembersInjection => {
                let injector = self.members_injector_expr(ctx, binding)?;
                Ok(injector.expr)
            }
            BindingKind::MembersInjector => {
                // The wrapper binding forwards to the members-injection
                // binding of its target type.
                let dep = binding.dependencies().first().cloned().ok_or_else(|| {
                    CodegenError::internal(format!("{binding} has no injection target"))
                })?;
                let id = graph.resolve_request(&dep).ok_or_else(|| {
                    CodegenError::internal(format!("unresolved target {}", dep.key()))
                })?;
                let target = graph.binding(id).clone();
                let injector = self.members_injector_expr(ctx, &target)?;
                Ok(injector.expr)
            }
            _ => Err(CodegenError::internal(format!(
                "{binding} is not a members injector"
            ))),
        }
    }

    /// Expression for the module instance a binding needs, via its stored
    /// field on the owning implementation.
    fn module_instance_expr(&mut self, ctx: &Ctx, binding: &Binding) -> Result<Expr> {
        let module = binding
            .module()
            .cloned()
            .ok_or_else(|| CodegenError::internal(format!("{binding} names no module")))?;
        let owner = *self
            .by_component
            .get(&self.owner_of(ctx, binding))
            .unwrap_or(&ctx.impl_idx);
        let field = self.impls[owner]
            .module_field(&module)
            .ok_or_else(|| {
                CodegenError::internal(format!("no module field for {module} on {owner}"))
            })?
            .to_string();
        let access = self.impl_path(ctx.impl_idx, owner, ctx.recv.clone())?;
        Ok(Expr::field(access, field))
    }

    /// The component that owns a binding's emitted state, looked up in the
    /// resolving graph.
    fn owner_of(&self, ctx: &Ctx, binding: &Binding) -> ClassName {
        let graph = self.graphs[ctx.graph_idx];
        graph
            .resolve(binding.key())
            .map(|id| graph.node(id).owner.clone())
            .unwrap_or_else(|| self.impls[ctx.impl_idx].component.clone())
    }

    /// Chain of parent-field accesses from one implementation to an
    /// enclosing one.
    fn impl_path(&self, from: usize, to: usize, recv: Expr) -> Result<Expr> {
        let mut current = from;
        let mut expr = recv;
        while current != to {
            let state = &self.impls[current];
            let (parent, field) = match (&state.parent, &state.parent_field) {
                (Some(parent), Some(field)) => (*parent, field.clone()),
                _ => {
                    return Err(CodegenError::internal(format!(
                        "{} is not reachable from {}",
                        self.impls[to].component, self.impls[from].component
                    )));
                }
            };
            expr = Expr::field(expr, field);
            current = parent;
        }
        Ok(expr)
    }

    fn canonical_key(&self, key: &Key) -> Key {
        if self.options.ignore_provision_key_wildcards {
            key.with_type(key.ty().without_wildcards())
        } else {
            key.clone()
        }
    }

    // =========================================================================
    // Sealing
    // =========================================================================

    /// Assemble every implementation into the root source file. Children
    /// seal first so parents can embed them.
    fn seal(&mut self) -> Result<SourceFile> {
        for index in (0..self.impls.len()).rev() {
            let spec = self.seal_one(index)?;
            self.impls[index].sealed = Some(spec);
        }
        let root = self.impls[0]
            .sealed
            .take()
            .ok_or_else(|| CodegenError::internal("root implementation was not sealed"))?;
        Ok(SourceFile {
            package: self.package.clone(),
            type_spec: root,
        })
    }

    fn seal_one(&mut self, index: usize) -> Result<TypeSpec> {
        let is_root = self.impls[index].parent.is_none();
        let component = self.impls[index].component.clone();
        let name = self.impls[index].name.clone();

        let mut spec = TypeSpec::class(&name);
        spec.kind = TypeKind::Class;
        spec.modifiers = if is_root {
            vec![Modifier::Public, Modifier::Final]
        } else {
            vec![Modifier::Private, Modifier::Final, Modifier::Static]
        };
        spec.interfaces.push(TypeName::of(component.clone()));

        spec.fields.extend(self.impls[index].held_fields.clone());
        spec.fields.extend(self.impls[index].fields.clone());

        // Constructor: store parameters, then run the initialize sequence.
        let mut constructor = MethodSpec::constructor();
        constructor.modifiers = vec![Modifier::Private];
        for field in &self.impls[index].held_fields {
            constructor.parameters.push(ParameterSpec {
                name: field.name.clone(),
                ty: field.ty.clone(),
            });
            constructor.statements.push(Statement::Assign {
                target: Expr::field(Expr::This, field.name.clone()),
                value: Expr::var(field.name.clone()),
            });
        }
        let has_init = !self.impls[index].init_statements.is_empty();
        if has_init {
            constructor
                .statements
                .push(Statement::Expression(Expr::call(
                    Expr::This,
                    "initialize",
                    vec![],
                )));
        }
        spec.methods.push(constructor);

        if has_init {
            let mut initialize = MethodSpec::method("initialize");
            initialize.modifiers = vec![Modifier::Private];
            initialize.annotations = vec![AnnotationSpec::suppress_warnings("unchecked")];
            initialize.statements = self.impls[index].init_statements.clone();
            spec.methods.push(initialize);
        }

        if is_root {
            self.add_root_factory_methods(index, &mut spec)?;
        }

        spec.methods.extend(self.impls[index].entry_methods.clone());

        // Builders for subcomponents with declared creators live on the
        // parent, next to the child implementations they construct.
        let children = self.impls[index].children.clone();
        for child in children {
            if self.impls[child].descriptor.creator.is_some() {
                let builder = self.creator_builder(index, child)?;
                spec.nested.push(builder);
            }
            let child_spec = self.impls[child].sealed.take().ok_or_else(|| {
                CodegenError::internal(format!(
                    "subcomponent {} sealed out of order",
                    self.impls[child].component
                ))
            })?;
            spec.nested.push(child_spec);
        }

        if is_root {
            if let Some(builder) = self.root_builder(index)? {
                spec.nested.insert(0, builder);
            }
        }

        if !self.impls[index].switch_cases.is_empty() {
            spec.nested.push(self.switching_provider_type(index)?);
        }

        Ok(spec)
    }

    /// `builder()` and, when modules allow it, `create()` on the root.
    fn add_root_factory_methods(&mut self, index: usize, spec: &mut TypeSpec) -> Result<()> {
        let name = self.impls[index].name.clone();
        if self.impls[index].descriptor.creator.is_some()
            || !self.impls[index].dep_fields.is_empty()
            || !self.impls[index].module_fields.is_empty()
        {
            let mut builder = MethodSpec::method("builder");
            builder.modifiers = vec![Modifier::Public, Modifier::Static];
            builder.return_type = Some(TypeName::of(ClassName::new("", "Builder")));
            builder.statements.push(Statement::Return(Expr::new_instance(
                TypeName::of(ClassName::new("", "Builder")),
                vec![],
            )));
            spec.methods.push(builder);
        }

        // create() instantiates modules itself, routing through constructor
        // proxies where visibility demands it.
        if self.impls[index].dep_fields.is_empty()
            && self.impls[index].bound_fields.is_empty()
        {
            let mut args = Vec::new();
            let mut constructible = true;
            for (module, _) in self.impls[index].module_fields.clone() {
                match self.model.find_module(&module) {
                    Some(descriptor)
                        if descriptor
                            .constructors
                            .iter()
                            .any(|c| c.parameter_count == 0) =>
                    {
                        args.push(proxies::new_module_instance(descriptor, &self.package));
                    }
                    _ => {
                        constructible = false;
                        break;
                    }
                }
            }
            if constructible {
                let mut create = MethodSpec::method("create");
                create.modifiers = vec![Modifier::Public, Modifier::Static];
                create.return_type = Some(TypeName::of(ClassName::new("", name.clone())));
                create.statements.push(Statement::Return(Expr::new_instance(
                    TypeName::of(ClassName::new("", name)),
                    args,
                )));
                spec.methods.push(create);
            }
        }
        Ok(())
    }

    /// The root builder: a setter per stored module, dependency, and bound
    /// instance, and a build() handing them to the private constructor.
    fn root_builder(&mut self, index: usize) -> Result<Option<TypeSpec>> {
        let state = &self.impls[index];
        if state.module_fields.is_empty()
            && state.dep_fields.is_empty()
            && state.bound_fields.is_empty()
            && state.descriptor.creator.is_none()
        {
            return Ok(None);
        }

        let mut builder = TypeSpec::class("Builder");
        builder.modifiers = vec![Modifier::Public, Modifier::Static, Modifier::Final];

        let mut build_args = Vec::new();
        for field in &state.held_fields {
            builder.fields.push(FieldSpec {
                name: field.name.clone(),
                ty: field.ty.clone(),
                modifiers: vec![Modifier::Private],
                annotations: vec![],
            });
            let mut setter = MethodSpec::method(&field.name);
            setter.modifiers = vec![Modifier::Public];
            setter.parameters.push(ParameterSpec {
                name: field.name.clone(),
                ty: field.ty.clone(),
            });
            setter.return_type = Some(TypeName::of(ClassName::new("", "Builder")));
            setter.statements.push(Statement::Assign {
                target: Expr::field(Expr::This, field.name.clone()),
                value: Expr::var(field.name.clone()),
            });
            setter.statements.push(Statement::Return(Expr::This));
            builder.methods.push(setter);
            build_args.push(Expr::field(Expr::This, field.name.clone()));
        }

        let mut build = MethodSpec::method("build");
        build.modifiers = vec![Modifier::Public];
        build.return_type = Some(TypeName::of(state.component.clone()));
        build.statements.push(Statement::Return(Expr::new_instance(
            TypeName::of(ClassName::new("", state.name.clone())),
            build_args,
        )));
        builder.methods.push(build);
        Ok(Some(builder))
    }

    /// The creator implementation for a subcomponent with a declared
    /// creator: setters for bound instances, build() constructing the child.
    fn creator_builder(&mut self, parent: usize, child: usize) -> Result<TypeSpec> {
        let child_state = &self.impls[child];
        let descriptor = child_state.descriptor;
        let creator = descriptor
            .creator
            .as_ref()
            .ok_or_else(|| CodegenError::internal("creator_builder without creator"))?;

        let builder_name = creator_impl_name(&descriptor.name);
        let mut spec = TypeSpec::class(&builder_name);
        spec.modifiers = vec![Modifier::Private, Modifier::Static, Modifier::Final];
        spec.interfaces.push(TypeName::of(
            descriptor.name.nested(creator.name.clone()),
        ));

        let parent_field = self.impls[parent].self_field.clone();
        let parent_ty = TypeName::of(ClassName::new("", self.impls[parent].name.clone()));
        spec.fields.push(FieldSpec {
            name: parent_field.clone(),
            ty: parent_ty.clone(),
            modifiers: vec![Modifier::Private, Modifier::Final],
            annotations: vec![],
        });

        let mut constructor = MethodSpec::constructor();
        constructor.parameters.push(ParameterSpec {
            name: parent_field.clone(),
            ty: parent_ty,
        });
        constructor.statements.push(Statement::Assign {
            target: Expr::field(Expr::This, parent_field.clone()),
            value: Expr::var(parent_field.clone()),
        });
        spec.methods.push(constructor);

        for (setter, _, ty) in child_state.bound_fields.clone() {
            spec.fields.push(FieldSpec {
                name: setter.clone(),
                ty: ty.clone(),
                modifiers: vec![Modifier::Private],
                annotations: vec![],
            });
            let mut method = MethodSpec::method(&setter);
            method.modifiers = vec![Modifier::Public, Modifier::Override];
            method.parameters.push(ParameterSpec {
                name: setter.clone(),
                ty,
            });
            method.return_type = Some(TypeName::of(ClassName::new("", builder_name.clone())));
            method.statements.push(Statement::Assign {
                target: Expr::field(Expr::This, setter.clone()),
                value: Expr::var(setter.clone()),
            });
            method.statements.push(Statement::Return(Expr::This));
            spec.methods.push(method);
        }

        // build(): arguments follow the child's constructor order exactly:
        // parent reference, bound instances, then module instances.
        let mut args = vec![Expr::field(Expr::This, parent_field)];
        for (setter, _, _) in self.impls[child].bound_fields.clone() {
            args.push(Expr::field(Expr::This, setter));
        }
        for (module, _) in self.impls[child].module_fields.clone() {
            let expr = match self.model.find_module(&module) {
                Some(descriptor) => proxies::new_module_instance(descriptor, &self.package),
                None => Expr::new_instance(TypeName::of(module), vec![]),
            };
            args.push(expr);
        }
        let mut build = MethodSpec::method("build");
        build.modifiers = vec![Modifier::Public, Modifier::Override];
        build.return_type = Some(TypeName::of(descriptor.name.clone()));
        build.statements.push(Statement::Return(Expr::new_instance(
            TypeName::of(ClassName::new("", self.impls[child].name.clone())),
            args,
        )));
        spec.methods.push(build);
        Ok(spec)
    }

    /// The per-component dispatcher: one nested type, one integer id, one
    /// switch.
    fn switching_provider_type(&mut self, index: usize) -> Result<TypeSpec> {
        let state = &mut self.impls[index];
        state.switch_cases.sort_by_key(|(id, _, _)| *id);
        for (position, (id, binding, _)) in state.switch_cases.iter().enumerate() {
            if *id as usize != position {
                return Err(CodegenError::internal(format!(
                    "dispatcher id {id} for {binding} does not match its case position"
                )));
            }
        }

        let mut spec = TypeSpec::class(SWITCHING_PROVIDER);
        spec.modifiers = vec![Modifier::Private, Modifier::Static, Modifier::Final];
        spec.type_parameters = vec!["T".into()];
        spec.interfaces.push(TypeName::generic(
            well_known::PROVIDER.clone(),
            vec![TypeName::TypeVariable("T".into())],
        ));

        let impl_ty = TypeName::of(ClassName::new("", state.name.clone()));
        spec.fields.push(FieldSpec {
            name: state.self_field.clone(),
            ty: impl_ty.clone(),
            modifiers: vec![Modifier::Private, Modifier::Final],
            annotations: vec![],
        });
        spec.fields.push(FieldSpec {
            name: "id".into(),
            ty: TypeName::TypeVariable("int".into()),
            modifiers: vec![Modifier::Private, Modifier::Final],
            annotations: vec![],
        });

        let mut constructor = MethodSpec::constructor();
        constructor.parameters.push(ParameterSpec {
            name: state.self_field.clone(),
            ty: impl_ty,
        });
        constructor.parameters.push(ParameterSpec {
            name: "id".into(),
            ty: TypeName::TypeVariable("int".into()),
        });
        for name in [state.self_field.clone(), "id".to_string()] {
            constructor.statements.push(Statement::Assign {
                target: Expr::field(Expr::This, name.clone()),
                value: Expr::var(name),
            });
        }
        spec.methods.push(constructor);

        let cases = state
            .switch_cases
            .iter()
            .map(|(id, _, expr)| {
                (
                    *id,
                    vec![Statement::Return(Expr::cast(
                        TypeName::TypeVariable("T".into()),
                        expr.clone(),
                    ))],
                )
            })
            .collect();
        let mut get = MethodSpec::method("get");
        get.modifiers = vec![Modifier::Public, Modifier::Override];
        get.annotations = vec![AnnotationSpec::suppress_warnings("unchecked")];
        get.return_type = Some(TypeName::TypeVariable("T".into()));
        get.statements.push(Statement::Switch {
            subject: Expr::field(Expr::This, "id"),
            cases,
            default: vec![Statement::ThrowAssertion {
                detail: Expr::field(Expr::This, "id"),
            }],
        });
        spec.methods.push(get);
        Ok(spec)
    }
}

/// The nested builder type generated for a subcomponent creator.
fn creator_impl_name(subcomponent: &ClassName) -> String {
    format!("{}Builder", subcomponent.joined_simple_names())
}

/// The resolution space a binding's provider field is deduplicated in.
fn provider_space_kind(binding: &Binding) -> RequestKind {
    if binding.kind() == BindingKind::MembersInjection {
        RequestKind::MembersInjector
    } else {
        RequestKind::Provider
    }
}

/// Base member name for a binding's provider field.
fn field_base_name(binding: &Binding) -> String {
    match binding.payload() {
        BindingPayload::Constructor { constructed, .. } => {
            lower_camel(constructed.name().simple_names())
        }
        BindingPayload::ModuleMethod { method, .. } => lower_camel(&[method.clone()]),
        BindingPayload::Delegate { method, .. } => lower_camel(&[method.clone()]),
        BindingPayload::BoundInstance { parameter } => lower_camel(&[parameter.clone()]),
        BindingPayload::Subcomponent { subcomponent } => {
            lower_camel(&[subcomponent.joined_simple_names(), "Builder".into()])
        }
        BindingPayload::ComponentSource { source, method } => match method {
            Some(method) => lower_camel(&[method.clone()]),
            None => lower_camel(source.simple_names()),
        },
        BindingPayload::AssistedFactory { factory, .. } => {
            lower_camel(factory.name().simple_names())
        }
        BindingPayload::MembersTarget { target } => match target.as_declared() {
            Some(d) => lower_camel(&[d.name().joined_simple_names(), "MembersInjector".into()]),
            None => "membersInjector".into(),
        },
        _ => match binding.key().ty().as_declared() {
            Some(d) => lower_camel(d.name().simple_names()),
            None => "value".into(),
        },
    }
}

/// The declared type a request kind presents for a key, wrappers included.
fn requested_type(kind: RequestKind, key: &Key) -> TypeRef {
    let ty = key.ty().clone();
    match kind {
        RequestKind::Instance => ty,
        RequestKind::ProviderOfLazy => TypeRef::generic(
            well_known::PROVIDER.clone(),
            vec![TypeRef::generic(well_known::LAZY.clone(), vec![ty])],
        ),
        other => match other.framework_wrapper() {
            Some(wrapper) => TypeRef::generic(wrapper.clone(), vec![ty]),
            None => TypeRef::generic(well_known::FUTURE.clone(), vec![ty]),
        },
    }
}

/// A literal expression for a map key value.
fn annotation_value_expr(value: &AnnotationValue) -> Expr {
    match value {
        AnnotationValue::Bool(v) => Expr::Bool(*v),
        AnnotationValue::Int(v) => Expr::Int(*v),
        AnnotationValue::Str(v) => Expr::Str(v.clone()),
        AnnotationValue::Type(ty) => match ty.as_declared() {
            Some(d) => Expr::field(Expr::var(d.name().canonical_name()), "class"),
            None => Expr::Null,
        },
        AnnotationValue::EnumConst(ty, name) => {
            Expr::field(Expr::var(ty.canonical_name()), name.clone())
        }
        AnnotationValue::List(values) => Expr::static_call(
            ClassName::new("util", "Lists"),
            "of",
            values.iter().map(annotation_value_expr).collect(),
        ),
    }
}
