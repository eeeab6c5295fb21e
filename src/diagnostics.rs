//! Diagnostics and error types
//!
//! Validation problems are reported through the [`Messager`] interface as
//! [`Diagnostic`] values carrying a severity, an optional originating
//! element, and a message. Hard failures of the generator itself (internal
//! inconsistencies, sink failures) are [`CodegenError`] values propagated
//! with `?`.

use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

use crate::key::ClassName;

/// Errors that abort the current operation of the code generator.
#[derive(Error, Debug, Clone)]
pub enum CodegenError {
    /// An internal inconsistency, e.g. a dispatcher id that was never
    /// assigned or a supplier asked for an expression of the wrong kind.
    #[error("internal error: {0}")]
    Internal(String),

    /// A component had fatal diagnostics; its emission was skipped.
    #[error("component {component} had {count} error(s); emission skipped")]
    ComponentFailed { component: String, count: usize },

    /// Entries were still deferred when the terminal round ended.
    #[error("inputs unavailable after final round: {missing}")]
    UnresolvedInputs { missing: String },

    /// A driver knob could not be parsed.
    #[error("invalid option {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    /// The output sink refused a generated file.
    #[error("failed to write {file}: {reason}")]
    Sink { file: String, reason: String },
}

impl CodegenError {
    /// Create an internal-inconsistency error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a component-failed error.
    #[inline]
    pub fn component_failed(component: &ClassName, count: usize) -> Self {
        Self::ComponentFailed {
            component: component.canonical_name(),
            count,
        }
    }

    /// Create an invalid-option error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, CodegenError>;

// =============================================================================
// Diagnostic model
// =============================================================================

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

/// The distinct kinds of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingBinding,
    DuplicateBinding,
    DependencyCycle,
    ScopeNotOnComponent,
    IncompatibleAssistedUsage,
    ProductionInNonProductionComponent,
    NullableToNonNullable,
    MultibindingMapKeyCollision,
    InvalidComponentDeclaration,
    InaccessibleBindingExposure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::MissingBinding => "missing binding",
            ErrorKind::DuplicateBinding => "duplicate binding",
            ErrorKind::DependencyCycle => "dependency cycle",
            ErrorKind::ScopeNotOnComponent => "scope not declared on component",
            ErrorKind::IncompatibleAssistedUsage => "incompatible assisted usage",
            ErrorKind::ProductionInNonProductionComponent => {
                "production binding in non-production component"
            }
            ErrorKind::NullableToNonNullable => "nullable bound to non-nullable request",
            ErrorKind::MultibindingMapKeyCollision => "duplicate map key",
            ErrorKind::InvalidComponentDeclaration => "invalid component declaration",
            ErrorKind::InaccessibleBindingExposure => "inaccessible binding exposed",
        })
    }
}

/// One reported problem: a severity, the validation kind when applicable,
/// the originating element, and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: Option<ErrorKind>,
    /// Canonical name of the element the problem is attached to.
    pub element: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// A validation error of a specific kind.
    #[inline]
    pub fn error(kind: ErrorKind, element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: Some(kind),
            element: Some(element.into()),
            message: message.into(),
        }
    }

    /// A warning that does not suppress emission.
    #[inline]
    pub fn warning(
        kind: ErrorKind,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind: Some(kind),
            element: Some(element.into()),
            message: message.into(),
        }
    }

    /// An informational note.
    #[inline]
    pub fn note(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            kind: None,
            element: Some(element.into()),
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(kind) = &self.kind {
            write!(f, " [{kind}]")?;
        }
        if let Some(element) = &self.element {
            write!(f, " at {element}")?;
        }
        write!(f, ": {}", self.message)
    }
}

// =============================================================================
// Messager
// =============================================================================

/// Write-only diagnostic sink. Any stage may report through it.
pub trait Messager: Send + Sync {
    /// Report a diagnostic.
    fn report(&self, diagnostic: Diagnostic);

    /// Convenience: report an error of a given kind.
    fn error(&self, kind: ErrorKind, element: &str, message: &str) {
        self.report(Diagnostic::error(kind, element, message));
    }

    /// Convenience: report a warning of a given kind.
    fn warning(&self, kind: ErrorKind, element: &str, message: &str) {
        self.report(Diagnostic::warning(kind, element, message));
    }

    /// Convenience: report a note.
    fn note(&self, element: &str, message: &str) {
        self.report(Diagnostic::note(element, message));
    }
}

/// A messager that collects diagnostics in memory, in report order.
///
/// # Examples
///
/// ```rust
/// use dependency_codegen::{CollectingMessager, Diagnostic, ErrorKind, Messager};
///
/// let messager = CollectingMessager::new();
/// messager.report(Diagnostic::error(
///     ErrorKind::MissingBinding,
///     "app.AppComponent",
///     "no binding for app.Database",
/// ));
///
/// assert!(messager.has_errors());
/// assert_eq!(messager.take().len(), 1);
/// ```
#[derive(Default)]
pub struct CollectingMessager {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingMessager {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any error-severity diagnostic has been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.lock().iter().any(Diagnostic::is_error)
    }

    /// Number of error-severity diagnostics reported so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.is_error())
            .count()
    }

    /// Snapshot of everything reported so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Drain all collected diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}

impl Messager for CollectingMessager {
    fn report(&self, diagnostic: Diagnostic) {
        #[cfg(feature = "logging")]
        tracing::debug!(diagnostic = %diagnostic, "reported");

        self.diagnostics.lock().push(diagnostic);
    }
}

impl fmt::Debug for CollectingMessager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectingMessager")
            .field("count", &self.diagnostics.lock().len())
            .finish()
    }
}
