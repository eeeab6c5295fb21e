//! Binding graph validation
//!
//! Each check surfaces a distinct [`ErrorKind`]. Diagnostics are collected
//! per component and reported through the messager; any error-severity
//! diagnostic makes the component ineligible for emission.

use crate::binding::BindingKind;
use crate::diagnostics::{Diagnostic, ErrorKind, Messager};
use crate::graph::{BindingGraph, BindingId};
use crate::key::RequestKind;

#[cfg(feature = "logging")]
use tracing::debug;

/// Outcome of validating one component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Error-severity diagnostics, root component and subcomponents included.
    pub error_count: usize,
    /// Warning-severity diagnostics.
    pub warning_count: usize,
}

impl ValidationReport {
    /// Whether the component may be emitted.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

/// Validate a graph and all of its subgraphs, reporting every problem.
pub fn validate(graph: &BindingGraph, messager: &dyn Messager) -> ValidationReport {
    let mut report = ValidationReport {
        error_count: 0,
        warning_count: 0,
    };
    validate_one(graph, messager, &mut report);
    for subgraph in graph.subgraphs() {
        let sub_report = validate(subgraph, messager);
        report.error_count += sub_report.error_count;
        report.warning_count += sub_report.warning_count;
    }

    #[cfg(feature = "logging")]
    debug!(
        component = %graph.component(),
        errors = report.error_count,
        warnings = report.warning_count,
        "validated"
    );

    report
}

fn validate_one(graph: &BindingGraph, messager: &dyn Messager, report: &mut ValidationReport) {
    let component = graph.component().canonical_name();
    let mut emit = |diagnostic: Diagnostic| {
        if diagnostic.is_error() {
            report.error_count += 1;
        } else {
            report.warning_count += 1;
        }
        messager.report(diagnostic);
    };

    check_declaration(graph, &component, &mut emit);
    check_missing(graph, &component, &mut emit);
    check_duplicates(graph, &component, &mut emit);
    check_cycles(graph, &component, &mut emit);
    check_scopes(graph, &component, &mut emit);
    check_assisted_usage(graph, &component, &mut emit);
    check_production(graph, &component, &mut emit);
    check_nullability(graph, &component, &mut emit);
    check_map_keys(graph, &component, &mut emit);
    check_exposure(graph, &component, &mut emit);
}

fn check_declaration(
    graph: &BindingGraph,
    component: &str,
    emit: &mut impl FnMut(Diagnostic),
) {
    let mut seen_methods = Vec::new();
    for root in graph.roots() {
        if seen_methods.contains(&&root.method) {
            emit(Diagnostic::error(
                ErrorKind::InvalidComponentDeclaration,
                component,
                format!("entry point method {} is declared twice", root.method),
            ));
        } else {
            seen_methods.push(&root.method);
        }
    }
    let scopes = graph.declared_scopes();
    for (index, scope) in scopes.iter().enumerate() {
        if scopes[..index].contains(scope) {
            emit(Diagnostic::error(
                ErrorKind::InvalidComponentDeclaration,
                component,
                format!("scope {scope} is declared twice on the component"),
            ));
        }
    }
}

fn check_missing(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    for key in graph.missing() {
        emit(Diagnostic::error(
            ErrorKind::MissingBinding,
            component,
            format!("no binding found for {key}"),
        ));
    }
}

fn check_duplicates(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    for duplicate in graph.duplicates() {
        emit(Diagnostic::error(
            ErrorKind::DuplicateBinding,
            component,
            format!(
                "{} is bound multiple times: {}",
                duplicate.key,
                duplicate.declarations.join(", ")
            ),
        ));
    }
}

fn check_cycles(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    for cycle in graph.instance_cycles() {
        let path: Vec<String> = cycle
            .iter()
            .map(|&id| graph.binding(id).key().to_string())
            .collect();
        emit(Diagnostic::error(
            ErrorKind::DependencyCycle,
            component,
            format!("dependency cycle without indirection: {}", path.join(" -> ")),
        ));
    }
}

fn check_scopes(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    for id in graph.ids() {
        let node = graph.node(id);
        // Bindings owned by an ancestor are validated against that
        // ancestor's graph.
        if node.owner != *graph.component() {
            continue;
        }
        if let Some(scope) = node.binding.scope() {
            if scope.is_reusable() {
                continue;
            }
            if !graph.available_scopes().contains(scope) {
                emit(Diagnostic::error(
                    ErrorKind::ScopeNotOnComponent,
                    component,
                    format!(
                        "{} uses scope {scope}, which is not declared on the component or any enclosing component",
                        node.binding
                    ),
                ));
            }
        }
    }
}

fn check_assisted_usage(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    let is_assisted = |id: BindingId| graph.binding(id).kind() == BindingKind::AssistedInjection;

    for root in graph.roots() {
        if let Some(id) = graph.resolve_request(&root.request) {
            if is_assisted(id) {
                emit(Diagnostic::error(
                    ErrorKind::IncompatibleAssistedUsage,
                    component,
                    format!(
                        "entry point {} requests an assisted-injection type directly; request its assisted factory instead",
                        root.method
                    ),
                ));
            }
        }
    }
    for edge in graph.edges() {
        if is_assisted(edge.target)
            && graph.binding(edge.source).kind() != BindingKind::AssistedFactory
        {
            emit(Diagnostic::error(
                ErrorKind::IncompatibleAssistedUsage,
                component,
                format!(
                    "{} requests {} without going through its assisted factory",
                    graph.binding(edge.source),
                    graph.binding(edge.target).key()
                ),
            ));
        }
    }
}

fn check_production(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    if graph.is_production() {
        return;
    }
    for id in graph.ids() {
        let binding = graph.binding(id);
        if binding.kind().is_production() {
            emit(Diagnostic::error(
                ErrorKind::ProductionInNonProductionComponent,
                component,
                format!("{binding} may only be used in a production component"),
            ));
        }
    }
    for root in graph.roots() {
        if matches!(
            root.request.kind(),
            RequestKind::Producer | RequestKind::Produced
        ) {
            emit(Diagnostic::error(
                ErrorKind::ProductionInNonProductionComponent,
                component,
                format!(
                    "entry point {} makes an asynchronous request on a non-production component",
                    root.method
                ),
            ));
        }
    }
}

fn check_nullability(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    let mut check = |request: &crate::binding::DependencyRequest, context: String| {
        if request.kind() != RequestKind::Instance || request.is_nullable() {
            return;
        }
        if let Some(target) = graph.resolve_request(request) {
            if graph.binding(target).is_nullable() {
                emit(Diagnostic::error(
                    ErrorKind::NullableToNonNullable,
                    component,
                    format!(
                        "{} is nullable but {context} requests it as non-nullable",
                        request.key()
                    ),
                ));
            }
        }
    };
    for root in graph.roots() {
        check(&root.request, format!("entry point {}", root.method));
    }
    for id in graph.ids() {
        let binding = graph.binding(id).clone();
        for dep in binding.dependencies() {
            check(dep, format!("{binding}"));
        }
    }
}

fn check_map_keys(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    use crate::binding::BindingPayload;

    for id in graph.ids() {
        let binding = graph.binding(id);
        let BindingPayload::MapContributions { entries } = binding.payload() else {
            continue;
        };
        for (index, (map_key, contribution)) in entries.iter().enumerate() {
            for (earlier_key, earlier_contribution) in &entries[..index] {
                if earlier_key.erased() != map_key.erased() {
                    continue;
                }
                if earlier_key == map_key && earlier_contribution == contribution {
                    emit(Diagnostic::warning(
                        ErrorKind::MultibindingMapKeyCollision,
                        component,
                        format!(
                            "map key {map_key} contributed twice by identical declarations"
                        ),
                    ));
                } else {
                    emit(Diagnostic::error(
                        ErrorKind::MultibindingMapKeyCollision,
                        component,
                        format!(
                            "map key {map_key} of {} collides with an earlier contribution",
                            binding.key()
                        ),
                    ));
                }
            }
        }
    }
}

fn check_exposure(graph: &BindingGraph, component: &str, emit: &mut impl FnMut(Diagnostic)) {
    for root in graph.roots() {
        if !root
            .request
            .key()
            .ty()
            .erasure_accessible_from(graph.package())
        {
            emit(Diagnostic::error(
                ErrorKind::InaccessibleBindingExposure,
                component,
                format!(
                    "entry point {} exposes {}, which is not accessible from package {}",
                    root.method,
                    root.request.key(),
                    graph.package()
                ),
            ));
        }
    }
}
