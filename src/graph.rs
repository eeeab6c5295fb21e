//! Binding graph construction
//!
//! Worklist-driven resolution of every key reachable from a component's
//! entry points into a rooted graph of bindings. Nodes live in an arena and
//! are addressed by stable integer handles; edges carry the request kind of
//! the dependency they satisfy, which is what later makes cycle legality
//! decidable.
//!
//! Resolution priority for each popped key:
//!
//! 1. explicit declarations (module provisions and binds, bound instances,
//!    component-dependency provisions, the component objects themselves,
//!    subcomponent creators), innermost component first
//! 2. constructor-injectable types and assisted factories
//! 3. multibinding synthesis from collected contributions
//! 4. optional synthesis
//! 5. (covered by 1 walking outward) the ancestor's exported declarations

use std::collections::VecDeque;
use std::collections::{HashMap, HashSet};

use ahash::RandomState;

use crate::binding::{
    Binding, BindingKind, BindingPayload, DependencyRequest, Scope,
};
use crate::decl::{
    AssistedFactoryDescriptor, BoundInstanceDecl, ComponentDescriptor, DependencyProvision,
    InjectableConstructor, ModuleBindingDecl, ModuleDescriptor, MultibindingAnnotation,
    TypeModel,
};
use crate::diagnostics::{CodegenError, Result};
use crate::key::{
    well_known, AnnotationValue, ClassName, ContributionIdentifier, Key, RequestKind, TypeRef,
};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Graph data
// =============================================================================

/// Stable handle of a binding node within one graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

impl BindingId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A binding plus the component that owns its emitted state.
///
/// A binding resolved from an ancestor's declarations is owned by that
/// ancestor when it carries ancestor state (a scope declared there, a module
/// instance, a bound instance); otherwise the requesting component re-owns
/// it.
#[derive(Debug, Clone)]
pub struct BindingNode {
    pub binding: Binding,
    pub owner: ClassName,
}

/// A dependency edge: `source` requires `target` with the given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: BindingId,
    pub target: BindingId,
    pub kind: RequestKind,
}

/// An entry-point request rooted at a component method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRequest {
    pub method: String,
    pub request: DependencyRequest,
}

/// Conflicting declarations for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDeclaration {
    pub key: Key,
    pub declarations: Vec<String>,
}

/// A rooted dependency graph for one component, with subgraphs for its
/// subcomponents.
#[derive(Debug, Clone)]
pub struct BindingGraph {
    component: ClassName,
    is_production: bool,
    declared_scopes: Vec<Scope>,
    /// Scopes declared on this component or any enclosing one.
    available_scopes: Vec<Scope>,
    nodes: Vec<BindingNode>,
    by_key: HashMap<Key, BindingId, RandomState>,
    members_injection_by_key: HashMap<Key, BindingId, RandomState>,
    edges: Vec<Edge>,
    roots: Vec<RootRequest>,
    missing: Vec<Key>,
    duplicates: Vec<DuplicateDeclaration>,
    subgraphs: Vec<BindingGraph>,
}

impl BindingGraph {
    #[inline]
    pub fn component(&self) -> &ClassName {
        &self.component
    }

    #[inline]
    pub fn package(&self) -> &str {
        self.component.package()
    }

    #[inline]
    pub fn is_production(&self) -> bool {
        self.is_production
    }

    #[inline]
    pub fn declared_scopes(&self) -> &[Scope] {
        &self.declared_scopes
    }

    #[inline]
    pub fn available_scopes(&self) -> &[Scope] {
        &self.available_scopes
    }

    #[inline]
    pub fn nodes(&self) -> &[BindingNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: BindingId) -> &BindingNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.nodes[id.index()].binding
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn roots(&self) -> &[RootRequest] {
        &self.roots
    }

    #[inline]
    pub fn missing(&self) -> &[Key] {
        &self.missing
    }

    #[inline]
    pub fn duplicates(&self) -> &[DuplicateDeclaration] {
        &self.duplicates
    }

    #[inline]
    pub fn subgraphs(&self) -> &[BindingGraph] {
        &self.subgraphs
    }

    /// Whether every reachable key resolved to exactly one binding.
    #[inline]
    pub fn is_fully_resolved(&self) -> bool {
        self.missing.is_empty() && self.duplicates.is_empty()
    }

    /// Resolve a key to its binding handle.
    #[inline]
    pub fn resolve(&self, key: &Key) -> Option<BindingId> {
        self.by_key.get(key).copied()
    }

    /// Resolve a members-injection target type to its binding handle.
    #[inline]
    pub fn resolve_members_injection(&self, key: &Key) -> Option<BindingId> {
        self.members_injection_by_key.get(key).copied()
    }

    /// Resolve a dependency request, honoring its kind's resolution space.
    pub fn resolve_request(&self, request: &DependencyRequest) -> Option<BindingId> {
        if request.kind() == RequestKind::MembersInjector {
            self.resolve_members_injection(request.key())
        } else {
            self.resolve(request.key())
        }
    }

    /// All handles, in resolution (arena) order.
    pub fn ids(&self) -> impl Iterator<Item = BindingId> + '_ {
        (0..self.nodes.len() as u32).map(BindingId)
    }

    /// Cycles in which every edge carries an `Instance` request.
    ///
    /// Each returned cycle is a node sequence in arena order of discovery;
    /// cycles reachable only through a non-instance edge never appear here,
    /// which is exactly the legality rule: a cycle is fatal iff it shows up
    /// in this restriction.
    pub fn instance_cycles(&self) -> Vec<Vec<BindingId>> {
        let n = self.nodes.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            if !edge.kind.breaks_cycles() {
                adjacency[edge.source.index()].push(edge.target.index());
            }
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color = vec![Color::White; n];
        let mut cycles: Vec<Vec<BindingId>> = Vec::new();
        let mut seen: HashSet<Vec<u32>> = HashSet::new();
        let mut path: Vec<usize> = Vec::new();

        fn dfs(
            node: usize,
            adjacency: &[Vec<usize>],
            color: &mut [Color],
            path: &mut Vec<usize>,
            cycles: &mut Vec<Vec<BindingId>>,
            seen: &mut HashSet<Vec<u32>>,
        ) {
            color[node] = Color::Gray;
            path.push(node);
            for &next in &adjacency[node] {
                match color[next] {
                    Color::Gray => {
                        let start = path.iter().position(|&p| p == next).unwrap_or(0);
                        let cycle: Vec<BindingId> =
                            path[start..].iter().map(|&p| BindingId(p as u32)).collect();
                        let mut signature: Vec<u32> = cycle.iter().map(|id| id.0).collect();
                        signature.sort_unstable();
                        if seen.insert(signature) {
                            cycles.push(cycle);
                        }
                    }
                    Color::White => {
                        dfs(next, adjacency, color, path, cycles, seen);
                    }
                    Color::Black => {}
                }
            }
            path.pop();
            color[node] = Color::Black;
        }

        for start in 0..n {
            if color[start] == Color::White {
                dfs(
                    start,
                    &adjacency,
                    &mut color,
                    &mut path,
                    &mut cycles,
                    &mut seen,
                );
            }
        }
        cycles
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Per-component lexical frame of explicit declarations.
struct Frame<'a> {
    component: &'a ComponentDescriptor,
    /// Non-multibinding provisions and binds, keyed by declared key.
    explicit: HashMap<Key, Vec<(&'a ModuleDescriptor, &'a ModuleBindingDecl)>, RandomState>,
    /// Aggregate set key -> contributing declarations.
    set_contributions:
        HashMap<Key, Vec<(&'a ModuleDescriptor, &'a ModuleBindingDecl)>, RandomState>,
    /// Aggregate map key -> (map key value, contributing declaration).
    map_contributions: HashMap<
        Key,
        Vec<(AnnotationValue, &'a ModuleDescriptor, &'a ModuleBindingDecl)>,
        RandomState,
    >,
    /// Underlying keys declared optional.
    optional_decls: HashSet<Key, RandomState>,
    /// Aggregate keys declared to exist even when empty.
    multibinds: HashSet<Key, RandomState>,
    bound_instances: HashMap<Key, &'a BoundInstanceDecl, RandomState>,
    dependency_objects: HashMap<Key, ClassName, RandomState>,
    dependency_provisions: HashMap<Key, (ClassName, &'a DependencyProvision), RandomState>,
    component_key: Key,
    subcomponent_creators: HashMap<Key, ClassName, RandomState>,
}

impl<'a> Frame<'a> {
    fn new(component: &'a ComponentDescriptor, model: &'a TypeModel) -> Result<Self> {
        let mut modules = Vec::new();
        for name in &component.modules {
            let module = model.find_module(name).ok_or_else(|| {
                CodegenError::internal(format!(
                    "module {name} of component {} is not in the type model",
                    component.name
                ))
            })?;
            modules.push(module);
        }

        let mut frame = Frame {
            component,
            explicit: HashMap::default(),
            set_contributions: HashMap::default(),
            map_contributions: HashMap::default(),
            optional_decls: HashSet::default(),
            multibinds: HashSet::default(),
            bound_instances: HashMap::default(),
            dependency_objects: HashMap::default(),
            dependency_provisions: HashMap::default(),
            component_key: Key::of(TypeRef::declared(component.name.clone())),
            subcomponent_creators: HashMap::default(),
        };

        for module in modules {
            for decl in &module.bindings {
                match decl {
                    ModuleBindingDecl::Provides { key, multibinding, .. }
                    | ModuleBindingDecl::Binds { key, multibinding, .. } => {
                        match multibinding {
                            None => frame
                                .explicit
                                .entry(key.clone())
                                .or_default()
                                .push((module, decl)),
                            Some(MultibindingAnnotation::IntoSet) => {
                                let aggregate = key.with_type(TypeRef::generic(
                                    well_known::SET.clone(),
                                    vec![key.ty().clone()],
                                ));
                                frame
                                    .set_contributions
                                    .entry(aggregate)
                                    .or_default()
                                    .push((module, decl));
                            }
                            Some(MultibindingAnnotation::ElementsIntoSet) => {
                                // The declared key is already the aggregate set.
                                frame
                                    .set_contributions
                                    .entry(key.clone())
                                    .or_default()
                                    .push((module, decl));
                            }
                            Some(MultibindingAnnotation::IntoMap(map_key)) => {
                                let aggregate = key.with_type(TypeRef::generic(
                                    well_known::MAP.clone(),
                                    vec![map_key_type(map_key), key.ty().clone()],
                                ));
                                frame
                                    .map_contributions
                                    .entry(aggregate)
                                    .or_default()
                                    .push((map_key.clone(), module, decl));
                            }
                        }
                    }
                    ModuleBindingDecl::BindsOptionalOf { key } => {
                        frame.optional_decls.insert(key.clone());
                    }
                    ModuleBindingDecl::Multibinds { key } => {
                        frame.multibinds.insert(key.clone());
                    }
                }
            }
        }

        for dependency in &component.dependencies {
            let dep_name = dependency.ty.name().clone();
            frame.dependency_objects.insert(
                Key::of(TypeRef::Declared(dependency.ty.clone())),
                dep_name.clone(),
            );
            for provision in &dependency.provisions {
                frame
                    .dependency_provisions
                    .insert(provision.key.clone(), (dep_name.clone(), provision));
            }
        }

        if let Some(creator) = &component.creator {
            for bound in &creator.bound_instances {
                frame.bound_instances.insert(bound.key.clone(), bound);
            }
        }

        for sub in &component.subcomponents {
            if let Some(creator) = &sub.creator {
                let creator_type = sub.name.nested(creator.name.clone());
                frame
                    .subcomponent_creators
                    .insert(Key::of(TypeRef::declared(creator_type)), sub.name.clone());
            }
        }

        Ok(frame)
    }
}

/// The declared type of a map key value.
fn map_key_type(value: &AnnotationValue) -> TypeRef {
    match value {
        AnnotationValue::Bool(_) => TypeRef::declared(ClassName::new("lang", "Boolean")),
        AnnotationValue::Int(_) => TypeRef::declared(ClassName::new("lang", "Integer")),
        AnnotationValue::Str(_) => TypeRef::declared(ClassName::new("lang", "String")),
        AnnotationValue::Type(_) => TypeRef::declared(ClassName::new("lang", "Class")),
        AnnotationValue::EnumConst(ty, _) => TypeRef::declared(ty.clone()),
        AnnotationValue::List(_) => TypeRef::declared(well_known::OBJECT.clone()),
    }
}

/// Which resolution rule matched a key.
enum Source<'a> {
    Explicit {
        frame: usize,
        decls: Vec<(&'a ModuleDescriptor, &'a ModuleBindingDecl)>,
    },
    Injectable(&'a InjectableConstructor),
    AssistedFactory(&'a AssistedFactoryDescriptor),
    MultiboundSet {
        contributions: Vec<(&'a ModuleDescriptor, &'a ModuleBindingDecl)>,
    },
    MultiboundMap {
        entries: Vec<(AnnotationValue, &'a ModuleDescriptor, &'a ModuleBindingDecl)>,
    },
    Optional {
        underlying: Key,
    },
    BoundInstance {
        frame: usize,
        decl: &'a BoundInstanceDecl,
    },
    DependencyObject {
        frame: usize,
        dependency: ClassName,
    },
    DependencyMethod {
        frame: usize,
        dependency: ClassName,
        provision: &'a DependencyProvision,
    },
    ComponentObject {
        frame: usize,
    },
    SubcomponentCreator {
        frame: usize,
        subcomponent: ClassName,
    },
    MembersInjectorObject {
        target: TypeRef,
    },
}

/// Builds [`BindingGraph`]s from component declarations and the type model.
pub struct BindingGraphBuilder<'a> {
    model: &'a TypeModel,
    frames: Vec<Frame<'a>>,
}

impl<'a> BindingGraphBuilder<'a> {
    /// Build the graph for a root component and, recursively, all of its
    /// subcomponents.
    pub fn build(component: &'a ComponentDescriptor, model: &'a TypeModel) -> Result<BindingGraph> {
        let mut builder = BindingGraphBuilder {
            model,
            frames: Vec::new(),
        };
        builder.build_component(component)
    }

    fn build_component(&mut self, component: &'a ComponentDescriptor) -> Result<BindingGraph> {
        self.frames.push(Frame::new(component, self.model)?);

        #[cfg(feature = "logging")]
        debug!(component = %component.name, depth = self.frames.len(), "building binding graph");

        let available_scopes: Vec<Scope> = self
            .frames
            .iter()
            .flat_map(|f| f.component.scopes.iter().cloned())
            .collect();

        let mut graph = BindingGraph {
            component: component.name.clone(),
            is_production: component.is_production,
            declared_scopes: component.scopes.clone(),
            available_scopes,
            nodes: Vec::new(),
            by_key: HashMap::default(),
            members_injection_by_key: HashMap::default(),
            edges: Vec::new(),
            roots: Vec::new(),
            missing: Vec::new(),
            duplicates: Vec::new(),
            subgraphs: Vec::new(),
        };

        // Seed the worklist with every entry-point request, in declaration
        // order so that node handles are deterministic.
        let mut queue: VecDeque<DependencyRequest> = VecDeque::new();
        for entry_point in &component.entry_points {
            let (kind, unwrapped) = RequestKind::from_requested_type(&entry_point.returned);
            let key = match &entry_point.qualifier {
                Some(q) => Key::qualified(unwrapped, q.clone()),
                None => Key::of(unwrapped),
            };
            let mut request = DependencyRequest::new(key, kind);
            if entry_point.nullable {
                request = request.nullable();
            }
            graph.roots.push(RootRequest {
                method: entry_point.method.clone(),
                request: request.clone(),
            });
            queue.push_back(request);
        }

        let mut missing_seen: HashSet<Key, RandomState> = HashSet::default();
        while let Some(request) = queue.pop_front() {
            let key = request.key().clone();
            let members_space = request.kind() == RequestKind::MembersInjector;
            let already = if members_space {
                graph.members_injection_by_key.contains_key(&key)
            } else {
                graph.by_key.contains_key(&key)
            };
            if already {
                continue;
            }

            #[cfg(feature = "logging")]
            trace!(key = %key, kind = %request.kind(), "resolving");

            if members_space {
                match self.model.members_injection_for(key.ty()) {
                    Some(descriptor) => {
                        let binding = Binding::new(
                            key.clone(),
                            BindingKind::MembersInjection,
                            descriptor.target.name().package(),
                            BindingPayload::MembersTarget {
                                target: TypeRef::Declared(descriptor.target.clone()),
                            },
                        )
                        .with_dependencies(descriptor.dependencies.clone());
                        let id = BindingId(graph.nodes.len() as u32);
                        for dep in binding.dependencies() {
                            queue.push_back(dep.clone());
                        }
                        graph.nodes.push(BindingNode {
                            binding,
                            owner: component.name.clone(),
                        });
                        graph.members_injection_by_key.insert(key, id);
                    }
                    None => {
                        if missing_seen.insert(key.clone()) {
                            graph.missing.push(key);
                        }
                    }
                }
                continue;
            }

            match self.find_source(&key) {
                Some(source) => {
                    let produced = self.materialize(&key, source, &mut graph)?;
                    for (binding_key, node) in produced {
                        let id = BindingId(graph.nodes.len() as u32);
                        for dep in node.binding.dependencies() {
                            queue.push_back(dep.clone());
                        }
                        graph.nodes.push(node);
                        graph.by_key.insert(binding_key, id);
                    }
                }
                None => {
                    if missing_seen.insert(key.clone()) {
                        graph.missing.push(key);
                    }
                }
            }
        }

        // Edges can only be recorded once both endpoints exist.
        let mut edges = Vec::new();
        for (index, node) in graph.nodes.iter().enumerate() {
            let source = BindingId(index as u32);
            for dep in node.binding.dependencies() {
                if let Some(target) = graph.resolve_request(dep) {
                    edges.push(Edge {
                        source,
                        target,
                        kind: dep.kind(),
                    });
                }
            }
        }
        graph.edges = edges;

        for sub in &component.subcomponents {
            let subgraph = self.build_component(sub)?;
            graph.subgraphs.push(subgraph);
        }

        self.frames.pop();
        Ok(graph)
    }

    /// Locate the binding source for a key, in priority order.
    fn find_source(&self, key: &Key) -> Option<Source<'a>> {
        // (1) explicit declarations, innermost frame first.
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if let Some(decls) = frame.explicit.get(key) {
                return Some(Source::Explicit {
                    frame: index,
                    decls: decls.clone(),
                });
            }
            if let Some(&decl) = frame.bound_instances.get(key) {
                return Some(Source::BoundInstance { frame: index, decl });
            }
            if let Some((dependency, provision)) = frame.dependency_provisions.get(key) {
                return Some(Source::DependencyMethod {
                    frame: index,
                    dependency: dependency.clone(),
                    provision: *provision,
                });
            }
            if let Some(dependency) = frame.dependency_objects.get(key) {
                return Some(Source::DependencyObject {
                    frame: index,
                    dependency: dependency.clone(),
                });
            }
            if frame.component_key == *key {
                return Some(Source::ComponentObject { frame: index });
            }
            if let Some(subcomponent) = frame.subcomponent_creators.get(key) {
                return Some(Source::SubcomponentCreator {
                    frame: index,
                    subcomponent: subcomponent.clone(),
                });
            }
        }

        // (2) constructor-injectable types and assisted factories.
        if key.qualifier().is_none() {
            if let Ok(target) = key.ty().unwrapped(&well_known::MEMBERS_INJECTOR) {
                return Some(Source::MembersInjectorObject { target });
            }
            if let Some(factory) = self.model.assisted_factory_for(key.ty()) {
                return Some(Source::AssistedFactory(factory));
            }
            if let Some(injectable) = self.model.injectable_for(key.ty()) {
                return Some(Source::Injectable(injectable));
            }
        }

        // (3) multibinding synthesis, contributions gathered across frames.
        let set_contributions: Vec<_> = self
            .frames
            .iter()
            .flat_map(|f| f.set_contributions.get(key).into_iter().flatten())
            .cloned()
            .collect();
        let declared_multibind = self.frames.iter().any(|f| f.multibinds.contains(key));
        if !set_contributions.is_empty()
            || (declared_multibind && key.ty().is_type_of(&well_known::SET))
        {
            return Some(Source::MultiboundSet {
                contributions: set_contributions,
            });
        }
        let map_entries: Vec<_> = self
            .frames
            .iter()
            .flat_map(|f| f.map_contributions.get(key).into_iter().flatten())
            .cloned()
            .collect();
        if !map_entries.is_empty() || (declared_multibind && key.ty().is_type_of(&well_known::MAP))
        {
            return Some(Source::MultiboundMap {
                entries: map_entries,
            });
        }

        // (4) optional synthesis.
        if let Ok(inner) = key.ty().unwrapped(&well_known::OPTIONAL) {
            let underlying = key.with_type(inner);
            if self
                .frames
                .iter()
                .any(|f| f.optional_decls.contains(&underlying))
            {
                return Some(Source::Optional { underlying });
            }
        }

        None
    }

    /// Turn a matched source into bindings. Most sources yield exactly one;
    /// multibinding synthesis also yields one node per contribution.
    fn materialize(
        &self,
        key: &Key,
        source: Source<'a>,
        graph: &mut BindingGraph,
    ) -> Result<Vec<(Key, BindingNode)>> {
        let current = self.frames.last().expect("at least one frame");
        let current_component = current.component.name.clone();

        Ok(match source {
            Source::Explicit { frame, decls } => {
                if decls.len() > 1 && !equivalent_delegates(&decls) {
                    graph.duplicates.push(DuplicateDeclaration {
                        key: key.clone(),
                        declarations: decls
                            .iter()
                            .map(|(module, decl)| {
                                format!(
                                    "{}#{}",
                                    module.name,
                                    decl.method().unwrap_or("<declaration>")
                                )
                            })
                            .collect(),
                    });
                }
                let (module, decl) = decls[0];
                let binding = self.declaration_binding(key.clone(), module, decl);
                let owner = self.owner_for(&binding, frame);
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::Injectable(injectable) => {
                let kind = if injectable.is_assisted() {
                    BindingKind::AssistedInjection
                } else {
                    BindingKind::Injection
                };
                let binding = Binding::new(
                    key.clone(),
                    kind,
                    injectable.constructed.name().package(),
                    BindingPayload::Constructor {
                        constructed: injectable.constructed.clone(),
                        assisted_parameters: injectable.assisted_parameters.clone(),
                    },
                )
                .scoped(injectable.scope.clone())
                .with_dependencies(injectable.dependencies.clone());
                let owner = self.scope_owner(binding.scope());
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::AssistedFactory(factory) => {
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::AssistedFactory,
                    factory.factory.name().package(),
                    BindingPayload::AssistedFactory {
                        factory: factory.factory.clone(),
                        method: factory.method.clone(),
                        target: factory.target.clone(),
                    },
                )
                .with_dependencies(vec![DependencyRequest::new(
                    factory.target.clone(),
                    RequestKind::Provider,
                )]);
                vec![(
                    key.clone(),
                    BindingNode {
                        binding,
                        owner: current_component,
                    },
                )]
            }
            Source::MultiboundSet { contributions } => {
                let mut produced = Vec::new();
                let mut contribution_keys = Vec::new();
                for (module, decl) in contributions {
                    let tagged = decl.key().clone().with_contribution(
                        ContributionIdentifier::new(
                            module.name.clone(),
                            decl.method().unwrap_or("<declaration>"),
                        ),
                    );
                    let binding = self.declaration_binding(tagged.clone(), module, decl);
                    let owner = self.owner_for(&binding, self.frames.len() - 1);
                    contribution_keys.push(tagged.clone());
                    produced.push((tagged, BindingNode { binding, owner }));
                }
                let dependencies = contribution_keys
                    .iter()
                    .map(|k| DependencyRequest::new(k.clone(), RequestKind::Instance))
                    .collect();
                let aggregate = Binding::new(
                    key.clone(),
                    BindingKind::MultiboundSet,
                    current.component.package(),
                    BindingPayload::SetContributions {
                        contributions: contribution_keys,
                    },
                )
                .with_dependencies(dependencies);
                produced.push((
                    key.clone(),
                    BindingNode {
                        binding: aggregate,
                        owner: current_component,
                    },
                ));
                produced
            }
            Source::MultiboundMap { entries } => {
                let mut produced = Vec::new();
                let mut map_entries = Vec::new();
                let mut dependencies = Vec::new();
                for (map_key, module, decl) in entries {
                    let tagged = decl.key().clone().with_contribution(
                        ContributionIdentifier::new(
                            module.name.clone(),
                            decl.method().unwrap_or("<declaration>"),
                        ),
                    );
                    let binding = self.declaration_binding(tagged.clone(), module, decl);
                    let owner = self.owner_for(&binding, self.frames.len() - 1);
                    dependencies.push(DependencyRequest::new(
                        tagged.clone(),
                        RequestKind::Instance,
                    ));
                    map_entries.push((map_key, tagged.clone()));
                    produced.push((tagged, BindingNode { binding, owner }));
                }
                let aggregate = Binding::new(
                    key.clone(),
                    BindingKind::MultiboundMap,
                    current.component.package(),
                    BindingPayload::MapContributions {
                        entries: map_entries,
                    },
                )
                .with_dependencies(dependencies);
                produced.push((
                    key.clone(),
                    BindingNode {
                        binding: aggregate,
                        owner: current_component,
                    },
                ));
                produced
            }
            Source::Optional { underlying } => {
                let present = self.find_source(&underlying).is_some();
                let underlying_request = present
                    .then(|| DependencyRequest::new(underlying, RequestKind::Instance));
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::Optional,
                    current.component.package(),
                    BindingPayload::OptionalUnderlying {
                        underlying: underlying_request.clone(),
                    },
                )
                .with_dependencies(underlying_request.into_iter().collect());
                vec![(
                    key.clone(),
                    BindingNode {
                        binding,
                        owner: current_component,
                    },
                )]
            }
            Source::BoundInstance { frame, decl } => {
                let owner = self.frames[frame].component.name.clone();
                let mut binding = Binding::new(
                    key.clone(),
                    BindingKind::BoundInstance,
                    self.frames[frame].component.package(),
                    BindingPayload::BoundInstance {
                        parameter: decl.setter.clone(),
                    },
                );
                if decl.nullable {
                    binding = binding.nullable();
                }
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::DependencyObject { frame, dependency } => {
                let owner = self.frames[frame].component.name.clone();
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::ComponentDependency,
                    self.frames[frame].component.package(),
                    BindingPayload::ComponentSource {
                        source: dependency,
                        method: None,
                    },
                );
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::DependencyMethod {
                frame,
                dependency,
                provision,
            } => {
                let owner = self.frames[frame].component.name.clone();
                let kind = if provision.is_production {
                    BindingKind::ComponentProduction
                } else {
                    BindingKind::ComponentProvision
                };
                let mut binding = Binding::new(
                    key.clone(),
                    kind,
                    self.frames[frame].component.package(),
                    BindingPayload::ComponentSource {
                        source: dependency,
                        method: Some(provision.method.clone()),
                    },
                );
                if provision.nullable {
                    binding = binding.nullable();
                }
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::ComponentObject { frame } => {
                let owner = self.frames[frame].component.name.clone();
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::Component,
                    self.frames[frame].component.package(),
                    BindingPayload::ComponentSource {
                        source: owner.clone(),
                        method: None,
                    },
                );
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::SubcomponentCreator {
                frame,
                subcomponent,
            } => {
                let owner = self.frames[frame].component.name.clone();
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::SubcomponentCreator,
                    self.frames[frame].component.package(),
                    BindingPayload::Subcomponent { subcomponent },
                );
                vec![(key.clone(), BindingNode { binding, owner })]
            }
            Source::MembersInjectorObject { target } => {
                let binding = Binding::new(
                    key.clone(),
                    BindingKind::MembersInjector,
                    current.component.package(),
                    BindingPayload::MembersTarget {
                        target: target.clone(),
                    },
                )
                .with_dependencies(vec![DependencyRequest::new(
                    Key::of(target),
                    RequestKind::MembersInjector,
                )]);
                vec![(
                    key.clone(),
                    BindingNode {
                        binding,
                        owner: current_component,
                    },
                )]
            }
        })
    }

    /// Binding for a module declaration, under the given (possibly
    /// contribution-tagged) key.
    fn declaration_binding(
        &self,
        key: Key,
        module: &ModuleDescriptor,
        decl: &ModuleBindingDecl,
    ) -> Binding {
        match decl {
            ModuleBindingDecl::Provides {
                method,
                scope,
                dependencies,
                is_static,
                nullable,
                is_production,
                ..
            } => {
                let kind = if *is_production {
                    BindingKind::Production
                } else {
                    BindingKind::Provision
                };
                let mut binding = Binding::new(
                    key,
                    kind,
                    module.package(),
                    BindingPayload::ModuleMethod {
                        module: module.name.clone(),
                        method: method.clone(),
                        requires_module_instance: !*is_static && !module.is_abstract,
                    },
                )
                .scoped(scope.clone())
                .with_dependencies(dependencies.clone());
                if *nullable {
                    binding = binding.nullable();
                }
                binding
            }
            ModuleBindingDecl::Binds {
                method,
                source,
                scope,
                ..
            } => Binding::new(
                key,
                BindingKind::Delegate,
                module.package(),
                BindingPayload::Delegate {
                    source: source.key().clone(),
                    method: method.clone(),
                },
            )
            .scoped(scope.clone())
            .with_dependencies(vec![source.clone()]),
            ModuleBindingDecl::BindsOptionalOf { .. } | ModuleBindingDecl::Multibinds { .. } => {
                // These declarations never materialize directly; resolution
                // reaches them only through synthesis.
                Binding::new(
                    key,
                    BindingKind::Optional,
                    module.package(),
                    BindingPayload::None,
                )
            }
        }
    }

    /// The component that owns a binding resolved at `frame`.
    fn owner_for(&self, binding: &Binding, frame: usize) -> ClassName {
        let declaring = &self.frames[frame];
        let requesting = self.frames.last().expect("at least one frame");
        let carries_frame_state = binding.scope().is_some() || binding.requires_module_instance();
        if carries_frame_state {
            declaring.component.name.clone()
        } else {
            requesting.component.name.clone()
        }
    }

    /// The innermost component declaring `scope`, defaulting to the current
    /// component; the validator reports undeclared scopes separately.
    fn scope_owner(&self, scope: Option<&Scope>) -> ClassName {
        if let Some(scope) = scope {
            for frame in self.frames.iter().rev() {
                if frame.component.declares_scope(scope) {
                    return frame.component.name.clone();
                }
            }
        }
        self.frames
            .last()
            .expect("at least one frame")
            .component
            .name
            .clone()
    }
}

/// Duplicate binds of the same key are tolerated when they are structurally
/// equivalent delegates.
fn equivalent_delegates(decls: &[(&ModuleDescriptor, &ModuleBindingDecl)]) -> bool {
    let mut shape: Option<(&Key, Option<&Scope>)> = None;
    for (_, decl) in decls {
        match decl {
            ModuleBindingDecl::Binds { source, scope, .. } => {
                let this = (source.key(), scope.as_ref());
                match shape {
                    None => shape = Some(this),
                    Some(existing) if existing == this => {}
                    Some(_) => return false,
                }
            }
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{ComponentDependencyDescriptor, CreatorDescriptor, EntryPoint};
    use crate::key::{DeclaredType, Qualifier, Visibility};

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(ClassName::new("app", name))
    }

    fn provides(method: &str, key: Key, deps: Vec<DependencyRequest>) -> ModuleBindingDecl {
        ModuleBindingDecl::Provides {
            method: method.into(),
            key,
            scope: None,
            dependencies: deps,
            is_static: true,
            nullable: false,
            multibinding: None,
            is_production: false,
        }
    }

    fn injectable(name: &str, deps: Vec<DependencyRequest>) -> InjectableConstructor {
        let mut builder = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", name),
            Visibility::Public,
        ));
        for dep in deps {
            builder = builder.dependency(dep);
        }
        builder
    }

    fn graph_for(component: ComponentDescriptor, model: TypeModel) -> BindingGraph {
        BindingGraphBuilder::build(&component, &model).unwrap()
    }

    #[test]
    fn test_resolves_injectable_chain() {
        let model = TypeModel::new()
            .injectable(injectable("Database", vec![]))
            .injectable(injectable(
                "Repo",
                vec![DependencyRequest::new(
                    Key::of(ty("Database")),
                    RequestKind::Instance,
                )],
            ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("repo", ty("Repo")));

        let graph = graph_for(component, model);
        assert!(graph.is_fully_resolved());
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 1);

        let repo = graph.resolve(&Key::of(ty("Repo"))).unwrap();
        assert_eq!(graph.binding(repo).kind(), BindingKind::Injection);
    }

    #[test]
    fn test_explicit_beats_injectable() {
        let module = ModuleDescriptor::new(ClassName::new("app", "M"))
            .binding(provides("provideDb", Key::of(ty("Database")), vec![]));
        let model = TypeModel::new()
            .module(module)
            .injectable(injectable("Database", vec![]));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M"))
            .entry_point(EntryPoint::new("db", ty("Database")));

        let graph = graph_for(component, model);
        let id = graph.resolve(&Key::of(ty("Database"))).unwrap();
        assert_eq!(graph.binding(id).kind(), BindingKind::Provision);
    }

    #[test]
    fn test_missing_binding_recorded() {
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("db", ty("Database")));
        let graph = graph_for(component, TypeModel::new());
        assert!(!graph.is_fully_resolved());
        assert_eq!(graph.missing(), &[Key::of(ty("Database"))]);
    }

    #[test]
    fn test_duplicate_bindings_flagged() {
        let m1 = ModuleDescriptor::new(ClassName::new("app", "M1"))
            .binding(provides("provideDb", Key::of(ty("Database")), vec![]));
        let m2 = ModuleDescriptor::new(ClassName::new("app", "M2"))
            .binding(provides("alsoDb", Key::of(ty("Database")), vec![]));
        let model = TypeModel::new().module(m1).module(m2);
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M1"))
            .module(ClassName::new("app", "M2"))
            .entry_point(EntryPoint::new("db", ty("Database")));

        let graph = graph_for(component, model);
        assert_eq!(graph.duplicates().len(), 1);
        assert_eq!(graph.duplicates()[0].declarations.len(), 2);
    }

    #[test]
    fn test_equivalent_delegates_tolerated() {
        let binds = |method: &str| ModuleBindingDecl::Binds {
            method: method.into(),
            key: Key::of(ty("Iface")),
            source: DependencyRequest::new(Key::of(ty("Impl")), RequestKind::Instance),
            scope: None,
            multibinding: None,
        };
        let m1 = ModuleDescriptor::new(ClassName::new("app", "M1"))
            .abstract_module()
            .binding(binds("a"));
        let m2 = ModuleDescriptor::new(ClassName::new("app", "M2"))
            .abstract_module()
            .binding(binds("b"));
        let model = TypeModel::new()
            .module(m1)
            .module(m2)
            .injectable(injectable("Impl", vec![]));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M1"))
            .module(ClassName::new("app", "M2"))
            .entry_point(EntryPoint::new("iface", ty("Iface")));

        let graph = graph_for(component, model);
        assert!(graph.duplicates().is_empty());
    }

    #[test]
    fn test_set_multibinding_aggregation() {
        let contribution = |module: &str, method: &str| {
            ModuleDescriptor::new(ClassName::new("app", module)).binding(
                ModuleBindingDecl::Provides {
                    method: method.into(),
                    key: Key::of(ty("Plugin")),
                    scope: None,
                    dependencies: vec![],
                    is_static: true,
                    nullable: false,
                    multibinding: Some(MultibindingAnnotation::IntoSet),
                    is_production: false,
                },
            )
        };
        let model = TypeModel::new()
            .module(contribution("M1", "pluginOne"))
            .module(contribution("M2", "pluginTwo"));
        let set_key = Key::of(TypeRef::generic(
            well_known::SET.clone(),
            vec![ty("Plugin")],
        ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M1"))
            .module(ClassName::new("app", "M2"))
            .entry_point(EntryPoint::new("plugins", set_key.ty().clone()));

        let graph = graph_for(component, model);
        assert!(graph.is_fully_resolved());
        let aggregate = graph.resolve(&set_key).unwrap();
        let binding = graph.binding(aggregate);
        assert_eq!(binding.kind(), BindingKind::MultiboundSet);
        assert_eq!(binding.dependencies().len(), 2);
        // Contributions are distinct nodes with tagged keys.
        assert_eq!(graph.nodes().len(), 3);
    }

    #[test]
    fn test_map_multibinding_aggregation() {
        let module = ModuleDescriptor::new(ClassName::new("app", "M"))
            .binding(ModuleBindingDecl::Provides {
                method: "first".into(),
                key: Key::of(ty("Handler")),
                scope: None,
                dependencies: vec![],
                is_static: true,
                nullable: false,
                multibinding: Some(MultibindingAnnotation::IntoMap(AnnotationValue::Str(
                    "a".into(),
                ))),
                is_production: false,
            })
            .binding(ModuleBindingDecl::Provides {
                method: "second".into(),
                key: Key::of(ty("Handler")),
                scope: None,
                dependencies: vec![],
                is_static: true,
                nullable: false,
                multibinding: Some(MultibindingAnnotation::IntoMap(AnnotationValue::Str(
                    "b".into(),
                ))),
                is_production: false,
            });
        let map_key = Key::of(TypeRef::generic(
            well_known::MAP.clone(),
            vec![
                TypeRef::declared(ClassName::new("lang", "String")),
                ty("Handler"),
            ],
        ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M"))
            .entry_point(EntryPoint::new("handlers", map_key.ty().clone()));

        let graph = graph_for(component, TypeModel::new().module(module));
        let binding = graph.binding(graph.resolve(&map_key).unwrap());
        assert_eq!(binding.kind(), BindingKind::MultiboundMap);
        match binding.payload() {
            BindingPayload::MapContributions { entries } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0, AnnotationValue::Str("a".into()));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_optional_synthesis() {
        let module = ModuleDescriptor::new(ClassName::new("app", "M"))
            .abstract_module()
            .binding(ModuleBindingDecl::BindsOptionalOf {
                key: Key::of(ty("Cache")),
            });
        let optional_key = Key::of(TypeRef::generic(
            well_known::OPTIONAL.clone(),
            vec![ty("Cache")],
        ));

        // Absent: no binding for Cache anywhere.
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M"))
            .entry_point(EntryPoint::new("cache", optional_key.ty().clone()));
        let graph = graph_for(component.clone(), TypeModel::new().module(module.clone()));
        let binding = graph.binding(graph.resolve(&optional_key).unwrap());
        assert_eq!(binding.kind(), BindingKind::Optional);
        assert!(binding.dependencies().is_empty());

        // Present: Cache is injectable.
        let model = TypeModel::new()
            .module(module)
            .injectable(injectable("Cache", vec![]));
        let graph = graph_for(component, model);
        let binding = graph.binding(graph.resolve(&optional_key).unwrap());
        assert_eq!(binding.dependencies().len(), 1);
    }

    #[test]
    fn test_component_and_dependency_bindings() {
        let dep_ty = DeclaredType::new(ClassName::new("app", "Backend"), Visibility::Public);
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .dependency(ComponentDependencyDescriptor {
                ty: dep_ty.clone(),
                provisions: vec![DependencyProvision {
                    method: "database".into(),
                    key: Key::of(ty("Database")),
                    nullable: false,
                    is_production: false,
                }],
            })
            .entry_point(EntryPoint::new("db", ty("Database")))
            .entry_point(EntryPoint::new("backend", ty("Backend")))
            .entry_point(EntryPoint::new("self", ty("AppComponent")));

        let graph = graph_for(component, TypeModel::new());
        assert!(graph.is_fully_resolved());

        let db = graph.binding(graph.resolve(&Key::of(ty("Database"))).unwrap());
        assert_eq!(db.kind(), BindingKind::ComponentProvision);
        let backend = graph.binding(graph.resolve(&Key::of(ty("Backend"))).unwrap());
        assert_eq!(backend.kind(), BindingKind::ComponentDependency);
        let this = graph.binding(graph.resolve(&Key::of(ty("AppComponent"))).unwrap());
        assert_eq!(this.kind(), BindingKind::Component);
    }

    #[test]
    fn test_bound_instance() {
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .creator(
                CreatorDescriptor::new("Builder").bound_instance(BoundInstanceDecl {
                    setter: "config".into(),
                    key: Key::of(ty("Config")),
                    nullable: false,
                }),
            )
            .entry_point(EntryPoint::new("config", ty("Config")));

        let graph = graph_for(component, TypeModel::new());
        let binding = graph.binding(graph.resolve(&Key::of(ty("Config"))).unwrap());
        assert_eq!(binding.kind(), BindingKind::BoundInstance);
    }

    #[test]
    fn test_subcomponent_graph_inherits_and_shadows() {
        let parent_scope = Scope::new(ClassName::new("app", "AppScope"));
        let parent_module = ModuleDescriptor::new(ClassName::new("app", "ParentModule"))
            .binding(ModuleBindingDecl::Provides {
                method: "provideDb".into(),
                key: Key::of(ty("Database")),
                scope: Some(parent_scope.clone()),
                dependencies: vec![],
                is_static: true,
                nullable: false,
                multibinding: None,
                is_production: false,
            });
        let sub = ComponentDescriptor::new(ClassName::new("app", "SessionComponent"))
            .creator(CreatorDescriptor::new("Builder"))
            .entry_point(EntryPoint::new("db", ty("Database")));
        let creator_key = Key::of(TypeRef::declared(
            ClassName::new("app", "SessionComponent").nested("Builder"),
        ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .scope(parent_scope)
            .module(ClassName::new("app", "ParentModule"))
            .subcomponent(sub)
            .entry_point(EntryPoint::new("session", creator_key.ty().clone()));

        let graph = graph_for(component, TypeModel::new().module(parent_module));
        assert!(graph.is_fully_resolved());

        let creator = graph.binding(graph.resolve(&creator_key).unwrap());
        assert_eq!(creator.kind(), BindingKind::SubcomponentCreator);

        // The subgraph resolves Database from the ancestor frame, owned by
        // the ancestor because the binding is scoped there.
        assert_eq!(graph.subgraphs().len(), 1);
        let subgraph = &graph.subgraphs()[0];
        let db = subgraph.resolve(&Key::of(ty("Database"))).unwrap();
        assert_eq!(
            subgraph.node(db).owner.canonical_name(),
            "app.AppComponent"
        );
        assert_eq!(subgraph.available_scopes().len(), 1);
        assert!(subgraph.declared_scopes().is_empty());
    }

    #[test]
    fn test_unscoped_ancestor_binding_reowned_by_subcomponent() {
        let parent_module = ModuleDescriptor::new(ClassName::new("app", "ParentModule"))
            .binding(provides("provideDb", Key::of(ty("Database")), vec![]));
        let sub = ComponentDescriptor::new(ClassName::new("app", "SessionComponent"))
            .creator(CreatorDescriptor::new("Builder"))
            .entry_point(EntryPoint::new("db", ty("Database")));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "ParentModule"))
            .subcomponent(sub)
            .entry_point(EntryPoint::new(
                "session",
                TypeRef::declared(ClassName::new("app", "SessionComponent").nested("Builder")),
            ));

        let graph = graph_for(component, TypeModel::new().module(parent_module));
        let subgraph = &graph.subgraphs()[0];
        let db = subgraph.resolve(&Key::of(ty("Database"))).unwrap();
        assert_eq!(
            subgraph.node(db).owner.canonical_name(),
            "app.SessionComponent"
        );
    }

    #[test]
    fn test_instance_cycle_detected() {
        let model = TypeModel::new()
            .injectable(injectable(
                "A",
                vec![DependencyRequest::new(
                    Key::of(ty("B")),
                    RequestKind::Instance,
                )],
            ))
            .injectable(injectable(
                "B",
                vec![DependencyRequest::new(
                    Key::of(ty("A")),
                    RequestKind::Instance,
                )],
            ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("a", ty("A")));

        let graph = graph_for(component, model);
        let cycles = graph.instance_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_provider_edge_breaks_cycle() {
        let model = TypeModel::new()
            .injectable(injectable(
                "A",
                vec![DependencyRequest::new(
                    Key::of(ty("B")),
                    RequestKind::Instance,
                )],
            ))
            .injectable(injectable(
                "B",
                vec![DependencyRequest::new(
                    Key::of(ty("A")),
                    RequestKind::Provider,
                )],
            ));
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("a", ty("A")));

        let graph = graph_for(component, model);
        assert!(graph.instance_cycles().is_empty());
    }

    #[test]
    fn test_delegate_chain_onto_itself_is_a_cycle() {
        // Binds with qualifiers forming a loop of identical types; every
        // edge is an Instance request, so no indirection applies.
        let q = |name: &str| Qualifier::new(ClassName::new("app", name));
        let module = ModuleDescriptor::new(ClassName::new("app", "M"))
            .abstract_module()
            .binding(ModuleBindingDecl::Binds {
                method: "first".into(),
                key: Key::qualified(ty("Service"), q("First")),
                source: DependencyRequest::new(
                    Key::qualified(ty("Service"), q("Second")),
                    RequestKind::Instance,
                ),
                scope: None,
                multibinding: None,
            })
            .binding(ModuleBindingDecl::Binds {
                method: "second".into(),
                key: Key::qualified(ty("Service"), q("Second")),
                source: DependencyRequest::new(
                    Key::qualified(ty("Service"), q("First")),
                    RequestKind::Instance,
                ),
                scope: None,
                multibinding: None,
            });
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .module(ClassName::new("app", "M"))
            .entry_point(
                EntryPoint::new("service", ty("Service")).qualified(q("First")),
            );

        let graph = graph_for(component, TypeModel::new().module(module));
        assert_eq!(graph.instance_cycles().len(), 1);
    }

    #[test]
    fn test_members_injector_object_request() {
        use crate::decl::MembersInjectionDescriptor;

        let target = DeclaredType::new(ClassName::new("app", "Activity"), Visibility::Public);
        let model = TypeModel::new()
            .injectable(injectable("Database", vec![]))
            .members_injection(MembersInjectionDescriptor {
                target: target.clone(),
                dependencies: vec![DependencyRequest::new(
                    Key::of(ty("Database")),
                    RequestKind::Provider,
                )],
            });
        let injector_ty = TypeRef::generic(
            well_known::MEMBERS_INJECTOR.clone(),
            vec![ty("Activity")],
        );
        let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
            .entry_point(EntryPoint::new("injector", injector_ty));

        let graph = graph_for(component, model);
        assert!(graph.is_fully_resolved());
        // Root request unwraps to a members-injector request on the target.
        assert_eq!(
            graph.roots()[0].request.kind(),
            RequestKind::MembersInjector
        );
        let id = graph
            .resolve_members_injection(&Key::of(ty("Activity")))
            .unwrap();
        assert_eq!(graph.binding(id).kind(), BindingKind::MembersInjection);
    }

    #[test]
    fn test_deterministic_node_order() {
        let build = || {
            let model = TypeModel::new()
                .injectable(injectable("Database", vec![]))
                .injectable(injectable(
                    "Repo",
                    vec![DependencyRequest::new(
                        Key::of(ty("Database")),
                        RequestKind::Instance,
                    )],
                ))
                .injectable(injectable(
                    "Service",
                    vec![DependencyRequest::new(
                        Key::of(ty("Repo")),
                        RequestKind::Instance,
                    )],
                ));
            let component = ComponentDescriptor::new(ClassName::new("app", "AppComponent"))
                .entry_point(EntryPoint::new("service", ty("Service")))
                .entry_point(EntryPoint::new("repo", ty("Repo")));
            graph_for(component, model)
        };
        let a = build();
        let b = build();
        let keys_a: Vec<String> = a.nodes().iter().map(|n| n.binding.key().to_string()).collect();
        let keys_b: Vec<String> = b.nodes().iter().map(|n| n.binding.key().to_string()).collect();
        assert_eq!(keys_a, keys_b);
    }
}
