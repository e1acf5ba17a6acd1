use std::sync::Arc;

use typeconv_api::converter::guard;
use typeconv_api::{
    Converter, ConverterSource, GenericConverterFactory, PluginError, Registrations, Type,
};

use crate::config::DiscoveryConfig;
use crate::error::EngineError;
use crate::fallback::ObjectConverter;
use crate::registry::{ConverterRegistry, Entry, Offer, Origin};

/// Outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Sources whose registrations were applied, in order.
    pub loaded: Vec<String>,
    /// Sources left out by configuration.
    pub excluded: Vec<String>,
    /// Sources that failed, were named but missing, or registered a plugin
    /// that panicked while being described. Never fatal.
    pub errors: Vec<EngineError>,
    /// Types holding a discovered converter, the top type included.
    pub converters: usize,
    /// Generic definitions holding a factory.
    pub factories: usize,
    /// Registrations that lost a type to one of higher or equal priority.
    pub shadowed: usize,
    /// Registrations dropped because their declaration was unusable.
    pub rejected: usize,
}

/// Fill `registry` from `sources`.
///
/// The top-type converter goes in first. Each allowed source then registers
/// into a scratch set; if it fails or panics, the set is discarded and the
/// next source runs. Surviving entries are offered to the registry in
/// source order, so equal priorities keep the earliest registration.
pub(crate) fn discover(
    registry: &ConverterRegistry,
    sources: &[Arc<dyn ConverterSource>],
    config: &DiscoveryConfig,
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    registry.offer(
        Type::object(),
        Entry::for_converter(Arc::new(ObjectConverter::new()), Origin::Direct, i32::MIN, false),
    );
    report.converters = 1;

    if let Some(include) = &config.include {
        for name in include {
            if !sources.iter().any(|s| s.name() == name) {
                let err = EngineError::UnknownSource(name.clone());
                tracing::error!(error = %err, "discovery error");
                report.errors.push(err);
            }
        }
    }

    for source in sources {
        let name = source.name().to_owned();
        if !config.allows(&name) {
            tracing::debug!(source = %name, "converter source excluded by configuration");
            report.excluded.push(name);
            continue;
        }

        let registrations = match collect(source.as_ref()) {
            Ok(r) => r,
            Err(error) => {
                let err = EngineError::Discovery { source_name: name, error };
                tracing::error!(error = %err, "discovery error, skipping source");
                report.errors.push(err);
                continue;
            }
        };

        apply(registry, &name, &registrations, &mut report);
        tracing::info!(source = %name, registrations = registrations.len(), "loaded converter source");
        report.loaded.push(name);
    }

    report
}

fn collect(source: &dyn ConverterSource) -> Result<Registrations, PluginError> {
    let mut out = Registrations::new();
    guard("during registration", || source.register(&mut out))??;
    Ok(out)
}

/// What discovery needs to know about a converter, read once.
struct ConverterDecl {
    output: Type,
    entry: Entry,
}

fn describe_converter(converter: &Arc<dyn Converter>) -> Result<ConverterDecl, PluginError> {
    guard("while describing a converter", || ConverterDecl {
        output: converter.output_type().clone(),
        entry: Entry::for_converter(
            converter.clone(),
            Origin::Direct,
            converter.priority(),
            converter.ignore_inherit(),
        ),
    })
}

/// What discovery needs to know about a factory, read once.
struct FactoryDecl {
    declared: Type,
    params: usize,
    /// `None` when the declaration is inconsistent.
    definition: Option<Type>,
    entry: Entry,
}

fn describe_factory(factory: &Arc<dyn GenericConverterFactory>) -> Result<FactoryDecl, PluginError> {
    guard("while describing a generic factory", || {
        let declared = factory.output_type().clone();
        let params = factory.type_params();
        FactoryDecl {
            definition: factory_key(&declared, params),
            declared,
            params,
            entry: Entry::for_factory(factory.clone(), factory.priority()),
        }
    })
}

fn apply(
    registry: &ConverterRegistry,
    source: &str,
    registrations: &Registrations,
    report: &mut DiscoveryReport,
) {
    for converter in registrations.converters() {
        let decl = match describe_converter(converter) {
            Ok(decl) => decl,
            Err(error) => {
                let err = EngineError::Discovery { source_name: source.to_owned(), error };
                tracing::error!(error = %err, "discovery error, skipping converter");
                report.errors.push(err);
                continue;
            }
        };
        let ty = decl.output;
        if ty.contains_generic_parameters() {
            tracing::warn!(
                source = %source,
                ty = %ty,
                "converter declares an open output type, register a factory instead"
            );
            report.rejected += 1;
            continue;
        }
        let priority = decl.entry.priority;
        match registry.offer(ty.clone(), decl.entry) {
            Offer::Added => report.converters += 1,
            Offer::Replaced => report.shadowed += 1,
            Offer::Shadowed => {
                tracing::debug!(source = %source, ty = %ty, priority, "converter shadowed by an earlier registration");
                report.shadowed += 1;
                continue;
            }
        }
        tracing::trace!(source = %source, ty = %ty, priority, "registered converter");
    }

    for factory in registrations.factories() {
        let decl = match describe_factory(factory) {
            Ok(decl) => decl,
            Err(error) => {
                let err = EngineError::Discovery { source_name: source.to_owned(), error };
                tracing::error!(error = %err, "discovery error, skipping factory");
                report.errors.push(err);
                continue;
            }
        };
        let Some(definition) = decl.definition else {
            tracing::debug!(
                source = %source,
                ty = %decl.declared,
                params = decl.params,
                "skipping factory with a mismatched generic signature"
            );
            report.rejected += 1;
            continue;
        };
        match registry.offer(definition.clone(), decl.entry) {
            Offer::Added => report.factories += 1,
            Offer::Replaced => report.shadowed += 1,
            Offer::Shadowed => {
                tracing::debug!(source = %source, ty = %definition, "factory shadowed by an earlier registration");
                report.shadowed += 1;
                continue;
            }
        }
        tracing::trace!(source = %source, ty = %definition, "registered generic factory");
    }
}

/// Definition a factory is filed under, if its declaration is consistent.
///
/// The declared output must still contain generic parameters, and the
/// factory's own parameter count must match the definition's arity.
fn factory_key(declared: &Type, params: usize) -> Option<Type> {
    if !declared.contains_generic_parameters() {
        return None;
    }
    let definition = if declared.is_generic_definition() {
        declared.clone()
    } else {
        declared.generic_definition()?.clone()
    };
    (params == definition.arity()).then_some(definition)
}
