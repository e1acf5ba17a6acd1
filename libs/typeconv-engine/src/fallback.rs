use std::sync::Arc;

use typeconv_api::{ConvertContext, Converter, Diagnostic, Type, Value, invoke};

use crate::registry::{ConverterRegistry, Entry, Origin};
use crate::specialize;

/// Converter for the top type. Registered before discovery so the terminal
/// fallback always has something to adapt; any source may override it.
pub struct ObjectConverter {
    ty: Type,
}

impl ObjectConverter {
    pub fn new() -> Self {
        Self { ty: Type::object() }
    }
}

impl Default for ObjectConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for ObjectConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        input: &Value,
        _output: &Type,
    ) -> Result<Value, Diagnostic> {
        Ok(input.clone())
    }
}

/// Serves a type with no converter of its own through an ancestor's.
///
/// The ancestor converter is asked for the descendant type; whatever it
/// returns must be an instance of the descendant or the call fails.
pub struct FallbackAdapter {
    output: Type,
    ancestor: Type,
    inner: Arc<dyn Converter>,
}

impl FallbackAdapter {
    pub fn new(output: Type, ancestor: Type, inner: Arc<dyn Converter>) -> Self {
        Self { output, ancestor, inner }
    }

    pub fn ancestor(&self) -> &Type {
        &self.ancestor
    }
}

impl Converter for FallbackAdapter {
    fn output_type(&self) -> &Type {
        &self.output
    }

    fn try_convert(
        &self,
        ctx: &mut ConvertContext<'_>,
        input: &Value,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        let value = invoke(self.inner.as_ref(), ctx, input, output)?;
        if value.is_instance_of(output) {
            return Ok(value);
        }
        Err(Diagnostic::cast(
            output,
            format!(
                "converter for '{}' produced {} which is not a '{output}'",
                self.ancestor,
                value.kind_name()
            ),
        ))
    }
}

/// Find the converter entry a fallback for `ty` should adapt.
///
/// Bases are tried nearest first, then interfaces in ancestry order, then
/// the top type. Only converters that were registered or specialized count;
/// fallbacks cached for ancestors are ignored so the answer does not depend
/// on lookup history. Entries flagged `ignore_inherit` are skipped.
fn select_ancestor(registry: &ConverterRegistry, ty: &Type) -> Option<(Type, Entry)> {
    let ancestry = ty.ancestry();
    let candidates = ancestry.bases.iter().chain(ancestry.interfaces.iter());
    for ancestor in candidates {
        let entry = match registry.declared(ancestor) {
            Some(e) => Some(e),
            None if ancestor.is_closed_generic() => specialize::specialize(registry, ancestor),
            None => None,
        };
        match entry {
            Some(e) if e.ignore_inherit => {
                tracing::trace!(ty = %ty, ancestor = %ancestor, "ancestor converter opts out of inheritance");
            }
            Some(e) => return Some((ancestor.clone(), e)),
            None => {}
        }
    }

    let object = Type::object();
    registry.get(&object).map(|e| (object, e))
}

/// Synthesize and cache a fallback adapter for `ty`.
pub(crate) fn resolve(registry: &ConverterRegistry, ty: &Type) -> Option<Arc<dyn Converter>> {
    let Some((ancestor, inner)) = select_ancestor(registry, ty) else {
        tracing::error!(ty = %ty, "no converter for the top type, cannot build fallback");
        return None;
    };
    let converter = inner.converter()?;
    tracing::debug!(ty = %ty, ancestor = %ancestor, "synthesized fallback converter");
    let adapter: Arc<dyn Converter> =
        Arc::new(FallbackAdapter::new(ty.clone(), ancestor.clone(), converter));
    let entry = Entry::for_converter(adapter, Origin::Fallback { ancestor }, inner.priority, false);
    registry.publish(ty.clone(), entry).converter()
}
