//! Driver
//!
//! Walks the declared component roots, invokes the pipeline stages in
//! order, and reports diagnostics. Processing is round-based: a component
//! whose inputs are not yet available (a module that another step still has
//! to generate) is deferred to the next round; a terminal round that still
//! has deferred entries is an error.

use std::collections::HashSet;

use crate::ast::{SourceFile, SourceSink};
use crate::component;
use crate::config::CompilerOptions;
use crate::context::CompilationContext;
use crate::decl::{ComponentDescriptor, ModuleBindingDecl, ModuleDescriptor, TypeModel};
use crate::diagnostics::{CodegenError, Messager, Result};
use crate::graph::BindingGraphBuilder;
use crate::key::{ClassName, Key, TypeRef, Visibility, well_known};
use crate::proxies;
use crate::validate;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Everything handed to one compilation: the component roots and the type
/// model behind them.
#[derive(Debug, Clone, Default)]
pub struct ProcessingInput {
    pub components: Vec<ComponentDescriptor>,
    pub model: TypeModel,
}

/// What a compilation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Source files handed to the sink.
    pub generated: usize,
    /// Rounds that deferred at least one component.
    pub deferred_rounds: usize,
    /// Components skipped because validation failed.
    pub failed_components: Vec<ClassName>,
    /// Distinct keys resolved across all graphs.
    pub keys_seen: usize,
}

/// Monitor hook type contributed by synthesized production monitoring
/// modules.
fn production_monitor_type() -> TypeRef {
    TypeRef::declared(ClassName::new("di.producers", "ProductionMonitor"))
}

/// Name of the monitoring module synthesized for a production component.
pub fn monitoring_module_name(component: &ClassName) -> ClassName {
    component.peer(format!(
        "{}_MonitoringModule",
        component.joined_simple_names()
    ))
}

/// The compilation driver.
pub struct Driver<'a> {
    options: CompilerOptions,
    messager: &'a dyn Messager,
}

/// Rewrites diagnostic messages into the experimental format. Only the
/// text changes; severities, kinds, and counts are untouched, so knob
/// state cannot alter a validation outcome.
struct ExperimentalMessageFormat<'m> {
    inner: &'m dyn Messager,
}

impl Messager for ExperimentalMessageFormat<'_> {
    fn report(&self, mut diagnostic: crate::diagnostics::Diagnostic) {
        if let Some(kind) = diagnostic.kind {
            diagnostic.message = format!("[{kind}] {}", diagnostic.message);
        }
        self.inner.report(diagnostic);
    }
}

enum Outcome {
    Generated(usize),
    /// Deferred to the next round; `progressed` is set when the deferral
    /// itself produced a new input (a generated module), which keeps the
    /// round loop alive.
    Deferred {
        reason: &'static str,
        progressed: bool,
    },
    Failed,
}

impl<'a> Driver<'a> {
    pub fn new(options: CompilerOptions, messager: &'a dyn Messager) -> Self {
        Self { options, messager }
    }

    /// Run every stage for every root, writing generated files to the sink.
    ///
    /// A component with fatal diagnostics is skipped and recorded; it does
    /// not abort the others. Deferred components are retried as long as a
    /// round makes progress.
    pub fn process(
        &self,
        input: ProcessingInput,
        sink: &mut dyn SourceSink,
    ) -> Result<ProcessingSummary> {
        let mut context = CompilationContext::new(self.options);
        let mut model = input.model;
        let mut pending = input.components;
        let mut summary = ProcessingSummary {
            generated: 0,
            deferred_rounds: 0,
            failed_components: Vec::new(),
            keys_seen: 0,
        };
        let mut emitted_proxies: HashSet<String> = HashSet::new();

        loop {
            let mut deferred = Vec::new();
            let mut progressed = false;

            for descriptor in pending {
                match self.process_component(
                    &descriptor,
                    &mut model,
                    &mut context,
                    sink,
                    &mut emitted_proxies,
                )? {
                    Outcome::Generated(count) => {
                        summary.generated += count;
                        progressed = true;
                    }
                    Outcome::Deferred {
                        reason,
                        progressed: deferred_progress,
                    } => {
                        self.messager.note(
                            &descriptor.name.canonical_name(),
                            &format!("deferred to a later round: {reason}"),
                        );
                        progressed |= deferred_progress;
                        deferred.push(descriptor);
                    }
                    Outcome::Failed => {
                        summary.failed_components.push(descriptor.name.clone());
                        progressed = true;
                    }
                }
            }

            if deferred.is_empty() {
                break;
            }
            summary.deferred_rounds += 1;
            if !progressed {
                let missing: Vec<String> = deferred
                    .iter()
                    .map(|d| d.name.canonical_name())
                    .collect();
                for descriptor in &deferred {
                    self.messager.error(
                        crate::diagnostics::ErrorKind::InvalidComponentDeclaration,
                        &descriptor.name.canonical_name(),
                        "inputs were still unavailable in the final round",
                    );
                }
                return Err(CodegenError::UnresolvedInputs {
                    missing: missing.join(", "),
                });
            }
            pending = deferred;
        }

        summary.keys_seen = context.interner.len();

        #[cfg(feature = "logging")]
        info!(
            generated = summary.generated,
            failed = summary.failed_components.len(),
            keys = summary.keys_seen,
            "compilation finished"
        );

        Ok(summary)
    }

    fn process_component(
        &self,
        descriptor: &ComponentDescriptor,
        model: &mut TypeModel,
        context: &mut CompilationContext,
        sink: &mut dyn SourceSink,
        emitted_proxies: &mut HashSet<String>,
    ) -> Result<Outcome> {
        #[cfg(feature = "logging")]
        debug!(component = %descriptor.name, "processing component");

        // Production components get a synthesized monitoring module; its
        // generation is a round boundary, like any generated input.
        let descriptor = if descriptor.is_production {
            let module_name = monitoring_module_name(&descriptor.name);
            if model.find_module(&module_name).is_none() {
                model.add_module(self.generate_monitoring_module(&module_name));
                self.messager.note(
                    &descriptor.name.canonical_name(),
                    "generated the production monitoring module",
                );
                return Ok(Outcome::Deferred {
                    reason: "its monitoring module was just generated",
                    progressed: true,
                });
            }
            let mut with_monitoring = descriptor.clone();
            with_monitoring.modules.push(module_name);
            with_monitoring
        } else {
            descriptor.clone()
        };

        if first_unavailable_module(&descriptor, model).is_some() {
            return Ok(Outcome::Deferred {
                reason: "a required module is not available yet",
                progressed: false,
            });
        }

        let graph = BindingGraphBuilder::build(&descriptor, model)?;
        for root in graph.roots() {
            context.interner.intern(root.request.key());
        }

        let experimental;
        let messager: &dyn Messager = if self.options.experimental_error_messages {
            experimental = ExperimentalMessageFormat {
                inner: self.messager,
            };
            &experimental
        } else {
            self.messager
        };
        let report = validate::validate(&graph, messager);
        if !report.is_clean() {
            // Emission is skipped for this component; the diagnostics are
            // already with the messager.
            return Ok(Outcome::Failed);
        }

        let mut count = 0;
        let file = component::emit(&graph, &descriptor, model, self.options)?;
        sink.accept(file)?;
        count += 1;

        // Constructor proxies for every module the component tree touches.
        for module_name in all_module_names(&descriptor) {
            let Some(module) = model.find_module(&module_name) else {
                continue;
            };
            if let Some(proxy) = proxies::generate_proxy(module) {
                let proxy_name = proxy.type_name().canonical_name();
                if emitted_proxies.insert(proxy_name) {
                    sink.accept(proxy)?;
                    count += 1;
                }
            }
        }

        Ok(Outcome::Generated(count))
    }

    /// An abstract module declaring the (initially empty) monitor
    /// multibinding for a production component.
    fn generate_monitoring_module(&self, name: &ClassName) -> ModuleDescriptor {
        let monitor_set = Key::of(TypeRef::generic(
            well_known::SET.clone(),
            vec![production_monitor_type()],
        ));
        ModuleDescriptor {
            name: name.clone(),
            visibility: Visibility::Public,
            is_abstract: true,
            is_inner: false,
            constructors: vec![],
            bindings: vec![ModuleBindingDecl::Multibinds { key: monitor_set }],
        }
    }
}

/// The first module name a component tree needs that the model cannot
/// provide yet.
fn first_unavailable_module(
    descriptor: &ComponentDescriptor,
    model: &TypeModel,
) -> Option<ClassName> {
    for name in all_module_names(descriptor) {
        if model.find_module(&name).is_none() {
            return Some(name);
        }
    }
    None
}

/// Every module name declared by a component or its subcomponents, in
/// declaration order.
fn all_module_names(descriptor: &ComponentDescriptor) -> Vec<ClassName> {
    let mut names = descriptor.modules.clone();
    for sub in &descriptor.subcomponents {
        names.extend(all_module_names(sub));
    }
    names
}

/// Convenience entry point: process with collected output.
pub fn process_to_memory(
    input: ProcessingInput,
    options: CompilerOptions,
    messager: &dyn Messager,
) -> Result<(ProcessingSummary, Vec<SourceFile>)> {
    let mut sink = crate::ast::MemorySink::new();
    let driver = Driver::new(options, messager);
    let summary = driver.process(input, &mut sink)?;
    Ok((summary, sink.files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MemorySink;
    use crate::decl::{ConstructorDescriptor, EntryPoint, InjectableConstructor};
    use crate::diagnostics::CollectingMessager;
    use crate::key::DeclaredType;

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(ClassName::new("app", name))
    }

    fn injectable(name: &str) -> InjectableConstructor {
        InjectableConstructor::new(DeclaredType::new(
            ClassName::new("app", name),
            Visibility::Public,
        ))
    }

    fn simple_input() -> ProcessingInput {
        ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "AppComponent",
            ))
            .entry_point(EntryPoint::new("db", ty("Database")))],
            model: TypeModel::new().injectable(injectable("Database")),
        }
    }

    #[test]
    fn test_generates_component_implementation() {
        let messager = CollectingMessager::new();
        let (summary, files) =
            process_to_memory(simple_input(), CompilerOptions::default(), &messager).unwrap();

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.deferred_rounds, 0);
        assert!(summary.failed_components.is_empty());
        assert_eq!(summary.keys_seen, 1);
        assert_eq!(
            files[0].type_name().canonical_name(),
            "app.DaggerAppComponent"
        );
        assert!(!messager.has_errors());
    }

    #[test]
    fn test_validation_failure_skips_emission_but_not_others() {
        let broken = ComponentDescriptor::new(ClassName::new("app", "BrokenComponent"))
            .entry_point(EntryPoint::new("missing", ty("Missing")));
        let mut input = simple_input();
        input.components.insert(0, broken);

        let messager = CollectingMessager::new();
        let (summary, files) =
            process_to_memory(input, CompilerOptions::default(), &messager).unwrap();

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.failed_components.len(), 1);
        assert_eq!(
            summary.failed_components[0].canonical_name(),
            "app.BrokenComponent"
        );
        assert_eq!(files.len(), 1);
        assert!(messager.has_errors());
    }

    #[test]
    fn test_missing_module_defers_then_errors() {
        let input = ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "AppComponent",
            ))
            .module(ClassName::new("app", "NeverGenerated"))
            .entry_point(EntryPoint::new("db", ty("Database")))],
            model: TypeModel::new(),
        };
        let messager = CollectingMessager::new();
        let error =
            process_to_memory(input, CompilerOptions::default(), &messager).unwrap_err();
        assert!(matches!(error, CodegenError::UnresolvedInputs { .. }));
        assert!(messager.has_errors());
    }

    #[test]
    fn test_production_component_gets_monitoring_module() {
        let monitor_set = TypeRef::generic(
            well_known::SET.clone(),
            vec![production_monitor_type()],
        );
        let input = ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "PipelineComponent",
            ))
            .production()
            .entry_point(EntryPoint::new("monitors", monitor_set))],
            model: TypeModel::new(),
        };
        let messager = CollectingMessager::new();
        let (summary, files) =
            process_to_memory(input, CompilerOptions::default(), &messager).unwrap();

        // Round one generates the module and defers; round two emits.
        assert_eq!(summary.deferred_rounds, 1);
        assert_eq!(summary.generated, 1);
        assert_eq!(
            files[0].type_name().canonical_name(),
            "app.DaggerPipelineComponent"
        );
        assert!(!messager.has_errors());
    }

    #[test]
    fn test_module_proxy_emitted_alongside_component() {
        let module = ModuleDescriptor::new(ClassName::new("lib", "HiddenModule"))
            .constructors(vec![ConstructorDescriptor {
                visibility: Visibility::PackagePrivate,
                parameter_count: 0,
            }])
            .binding(ModuleBindingDecl::Provides {
                method: "provideDb".into(),
                key: Key::of(ty("Database")),
                scope: None,
                dependencies: vec![],
                is_static: false,
                nullable: false,
                multibinding: None,
                is_production: false,
            });
        let input = ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "AppComponent",
            ))
            .module(ClassName::new("lib", "HiddenModule"))
            .entry_point(EntryPoint::new("db", ty("Database")))],
            model: TypeModel::new().module(module),
        };
        let messager = CollectingMessager::new();
        let (summary, files) =
            process_to_memory(input, CompilerOptions::default(), &messager).unwrap();

        assert_eq!(summary.generated, 2);
        let names: Vec<String> = files
            .iter()
            .map(|f| f.type_name().canonical_name())
            .collect();
        assert!(names.contains(&"app.DaggerAppComponent".to_string()));
        assert!(names.contains(&"lib.HiddenModule_Proxy".to_string()));
    }

    #[test]
    fn test_deterministic_output_across_runs() {
        let run = || {
            let messager = CollectingMessager::new();
            let (_, files) =
                process_to_memory(simple_input(), CompilerOptions::default(), &messager)
                    .unwrap();
            files
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_fast_init_knob_does_not_change_validation() {
        let broken = ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "BrokenComponent",
            ))
            .entry_point(EntryPoint::new("missing", ty("Missing")))],
            model: TypeModel::new(),
        };

        let run = |options: CompilerOptions| {
            let messager = CollectingMessager::new();
            let (summary, _) = process_to_memory(broken.clone(), options, &messager).unwrap();
            (summary.failed_components.len(), messager.error_count())
        };
        let default_mode = run(CompilerOptions::default());
        let fast_init = run(CompilerOptions::builder().fast_init(true).build());
        assert_eq!(default_mode, fast_init);
    }

    #[test]
    fn test_experimental_messages_change_text_not_outcome() {
        let broken = ProcessingInput {
            components: vec![ComponentDescriptor::new(ClassName::new(
                "app",
                "BrokenComponent",
            ))
            .entry_point(EntryPoint::new("missing", ty("Missing")))],
            model: TypeModel::new(),
        };

        let plain = CollectingMessager::new();
        process_to_memory(broken.clone(), CompilerOptions::default(), &plain).unwrap();
        let experimental = CollectingMessager::new();
        let options = CompilerOptions::builder()
            .experimental_error_messages(true)
            .build();
        process_to_memory(broken, options, &experimental).unwrap();

        assert_eq!(plain.error_count(), experimental.error_count());
        let plain_diagnostics = plain.take();
        let experimental_diagnostics = experimental.take();
        assert_ne!(
            plain_diagnostics[0].message,
            experimental_diagnostics[0].message
        );
        assert!(experimental_diagnostics[0]
            .message
            .starts_with("[missing binding]"));
    }

    #[test]
    fn test_driver_reuses_sink_across_components() {
        let mut input = simple_input();
        input.components.push(
            ComponentDescriptor::new(ClassName::new("app", "OtherComponent"))
                .entry_point(EntryPoint::new("db", ty("Database"))),
        );
        let messager = CollectingMessager::new();
        let driver = Driver::new(CompilerOptions::default(), &messager);
        let mut sink = MemorySink::new();
        let summary = driver.process(input, &mut sink).unwrap();
        assert_eq!(summary.generated, 2);
        assert!(sink.file("app.DaggerAppComponent").is_some());
        assert!(sink.file("app.DaggerOtherComponent").is_some());
    }
}
