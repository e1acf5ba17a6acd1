use typeconv_api::converter::guard;
use typeconv_api::{GenericConverterFactory, PluginError, Type};

use crate::registry::{ConverterRegistry, Entry, Origin};

/// Ask the factory registered for the definition of `closed` for a
/// converter, and cache it under `closed`.
///
/// Returns `None` when no factory is registered or the factory fails; the
/// caller then falls through to inheritance.
pub(crate) fn specialize(registry: &ConverterRegistry, closed: &Type) -> Option<Entry> {
    let definition = closed.generic_definition()?;
    let factory = registry.factory(definition)?;

    let created = guard("in a generic factory", || -> Result<Entry, PluginError> {
        let converter = factory.create(closed)?;
        if converter.output_type() != closed {
            tracing::warn!(
                ty = %closed,
                produced = %converter.output_type(),
                "generic factory produced a converter for another type"
            );
        }
        let priority = converter.priority();
        let ignore_inherit = converter.ignore_inherit();
        Ok(Entry::for_converter(converter, Origin::Specialized, priority, ignore_inherit))
    });
    let entry = match created {
        Ok(Ok(entry)) => entry,
        Ok(Err(e)) | Err(e) => {
            tracing::warn!(ty = %closed, error = %e, "generic factory failed");
            return None;
        }
    };

    tracing::debug!(ty = %closed, definition = %definition, "specialized generic converter");
    Some(registry.publish(closed.clone(), entry))
}
