use std::fmt;
use std::sync::Arc;

use typeconv_api::converter::guard;
use typeconv_api::{
    ConvertContext, Converter, ConverterSource, Diagnostic, FromValue, Resolver, Type, Typed,
    Value,
};

use crate::config::EngineConfig;
use crate::discovery::{self, DiscoveryReport};
use crate::error::ConversionError;
use crate::fallback;
use crate::registry::{ConverterRegistry, Origin};
use crate::specialize;

/// Result of a non-throwing conversion.
///
/// On failure `value` is the default for the requested type and `errors`
/// holds every diagnostic, innermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub value: Value,
    pub success: bool,
    pub errors: Vec<Diagnostic>,
}

impl Conversion {
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// The conversion engine: a registry filled once by discovery and grown on
/// demand by specialization and fallback.
///
/// Safe to share across threads. Every entry point takes `&self`.
pub struct Engine {
    registry: ConverterRegistry,
    config: EngineConfig,
    report: DiscoveryReport,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    pub fn discovery_report(&self) -> &DiscoveryReport {
        &self.report
    }

    /// Every registry key with its origin, sorted by key.
    pub fn registered_types(&self) -> Vec<(Type, Origin)> {
        self.registry.snapshot()
    }

    /// Converter for `ty`, computing and caching it on a miss.
    ///
    /// Closed generics go to their factory first. Classes and primitives
    /// without a converter get a fallback over an ancestor. Interfaces,
    /// generic definitions, open instances and parameters resolve only if
    /// something is registered for them directly.
    pub fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
        if let Some(converter) = self.registry.converter(ty) {
            return Some(converter);
        }
        if ty.is_closed_generic() {
            if let Some(entry) = specialize::specialize(&self.registry, ty) {
                return entry.converter();
            }
        }
        if ty.is_interface() || ty.contains_generic_parameters() {
            tracing::debug!(ty = %ty, "no converter and no fallback for this kind of type");
            return None;
        }
        fallback::resolve(&self.registry, ty)
    }

    /// Convert without raising. Never panics on converter misbehaviour.
    pub fn try_convert(&self, input: &Value, output: &Type) -> Conversion {
        let mut ctx = ConvertContext::new(self, self.config.max_depth);
        match ctx.attempt(input, output) {
            Ok(value) => Conversion {
                value,
                success: true,
                errors: ctx.into_errors(),
            },
            Err(diag) => {
                ctx.push(diag);
                let errors = ctx.into_errors();
                tracing::trace!(ty = %output, errors = errors.len(), "conversion failed");
                Conversion {
                    value: Value::default_for(output),
                    success: false,
                    errors,
                }
            }
        }
    }

    /// Convert, raising the accumulated diagnostics on failure.
    pub fn convert(&self, input: &Value, output: &Type) -> Result<Value, ConversionError> {
        let result = self.try_convert(input, output);
        if result.success {
            Ok(result.value)
        } else {
            Err(ConversionError::new(output, input, result.errors))
        }
    }

    /// Convert, returning `fallback` on failure.
    pub fn convert_or(&self, input: &Value, output: &Type, fallback: Value) -> Value {
        let result = self.try_convert(input, output);
        if result.success { result.value } else { fallback }
    }

    /// Convert into a Rust type. `None` on failure.
    pub fn try_to<T: Typed + FromValue>(&self, input: &Value) -> Option<T> {
        self.to(input).ok()
    }

    /// Convert into a Rust type, raising on failure.
    ///
    /// Converters for strings, lists, mappings and records pass `Null` input
    /// through. [`try_convert`](Self::try_convert) reports that as a success,
    /// but `String` or `Vec<T>` cannot hold it and this fails with a cast
    /// diagnostic. Ask for `Option<T>` to get `None` instead.
    pub fn to<T: Typed + FromValue>(&self, input: &Value) -> Result<T, ConversionError> {
        let ty = T::type_of();
        let value = self.convert(input, &ty)?;
        T::from_value(value).ok_or_else(|| {
            ConversionError::new(
                &ty,
                input,
                vec![Diagnostic::cast(
                    &ty,
                    format!("converter for '{ty}' produced an incompatible value"),
                )],
            )
        })
    }

    /// Convert into a Rust type, returning `fallback` on failure.
    pub fn to_or<T: Typed + FromValue>(&self, input: &Value, fallback: T) -> T {
        self.try_to(input).unwrap_or(fallback)
    }

    /// Run every discovered converter's one-time initialization hook.
    fn initialize_converters(&self) {
        for (ty, converter) in self.registry.direct_converters() {
            if let Err(e) = guard("during initialization", || converter.initialize(self)) {
                tracing::warn!(ty = %ty, error = %e, "converter initialization failed");
            }
        }
    }
}

impl Resolver for Engine {
    fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
        Engine::resolve(self, ty)
    }
}

/// Collects configuration and converter sources, then runs discovery.
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    sources: Vec<Arc<dyn ConverterSource>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source(self, source: impl ConverterSource + 'static) -> Self {
        self.add_source(Arc::new(source))
    }

    pub fn add_source(mut self, source: Arc<dyn ConverterSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Add the primitive and composite converter sources.
    #[cfg(feature = "builtins")]
    pub fn with_builtins(mut self) -> Self {
        self.sources.extend(crate::builtin_sources());
        self
    }

    pub fn build(self) -> Engine {
        let registry = ConverterRegistry::new();
        let report = discovery::discover(&registry, &self.sources, &self.config.discovery);
        let engine = Engine {
            registry,
            config: self.config,
            report,
        };
        engine.initialize_converters();
        tracing::info!(
            converters = engine.report.converters,
            factories = engine.report.factories,
            shadowed = engine.report.shadowed,
            skipped = engine.report.errors.len(),
            "converter registry ready"
        );
        engine
    }
}
