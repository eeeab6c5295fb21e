//! Compiler options
//!
//! The enumerated driver knobs. Every knob's effect is scoped to code
//! emission; none of them changes a validation outcome.

use crate::diagnostics::{CodegenError, Result};

/// Emission configuration.
///
/// # Examples
///
/// ```rust
/// use dependency_codegen::CompilerOptions;
///
/// let options = CompilerOptions::builder().fast_init(true).build();
/// assert!(options.fast_init);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompilerOptions {
    /// Emit switching-provider dispatchers instead of one factory class per
    /// binding.
    pub fast_init: bool,
    /// Hand generated trees to a formatting writer.
    pub format_generated_source: bool,
    /// Include the producer method name in emitted production tokens.
    pub write_producer_name_in_token: bool,
    /// Use the experimental diagnostic message format.
    pub experimental_error_messages: bool,
    /// Treat provision keys as equal modulo wildcards when deduplicating
    /// emitted members.
    pub ignore_provision_key_wildcards: bool,
}

impl CompilerOptions {
    /// Start building a configuration.
    #[inline]
    pub fn builder() -> CompilerOptionsBuilder {
        CompilerOptionsBuilder::default()
    }

    /// Parse options from processor-style `key=value` arguments.
    ///
    /// Unknown keys are rejected; values must be `true` or `false`.
    pub fn from_args<'a>(args: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut builder = CompilerOptionsBuilder::default();
        for (key, value) in args {
            let enabled = match value {
                "true" => true,
                "false" => false,
                other => {
                    return Err(CodegenError::invalid_option(
                        key,
                        format!("expected true or false, got {other:?}"),
                    ));
                }
            };
            builder = match key {
                "fastInit" => builder.fast_init(enabled),
                "formatGeneratedSource" => builder.format_generated_source(enabled),
                "writeProducerNameInToken" => builder.write_producer_name_in_token(enabled),
                "experimentalDaggerErrorMessages" => builder.experimental_error_messages(enabled),
                "ignoreProvisionKeyWildcards" => builder.ignore_provision_key_wildcards(enabled),
                other => {
                    return Err(CodegenError::invalid_option(other, "unknown option"));
                }
            };
        }
        Ok(builder.build())
    }
}

/// Fluent builder for [`CompilerOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerOptionsBuilder {
    options: CompilerOptions,
}

impl CompilerOptionsBuilder {
    pub fn fast_init(mut self, enabled: bool) -> Self {
        self.options.fast_init = enabled;
        self
    }

    pub fn format_generated_source(mut self, enabled: bool) -> Self {
        self.options.format_generated_source = enabled;
        self
    }

    pub fn write_producer_name_in_token(mut self, enabled: bool) -> Self {
        self.options.write_producer_name_in_token = enabled;
        self
    }

    pub fn experimental_error_messages(mut self, enabled: bool) -> Self {
        self.options.experimental_error_messages = enabled;
        self
    }

    pub fn ignore_provision_key_wildcards(mut self, enabled: bool) -> Self {
        self.options.ignore_provision_key_wildcards = enabled;
        self
    }

    pub fn build(self) -> CompilerOptions {
        self.options
    }
}
