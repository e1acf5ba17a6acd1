use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::context::ConvertContext;
use crate::error::{Diagnostic, FailureKind, PluginError};
use crate::types::Type;
use crate::value::Value;

/// A converter plugin: produces values of one output type from any input.
///
/// `output` passed to [`try_convert`](Converter::try_convert) is the type the
/// caller asked for. It equals [`output_type`](Converter::output_type) for a
/// direct hit, and is a descendant of it when the engine reuses this
/// converter for a subtype with no converter of its own.
pub trait Converter: Send + Sync {
    fn output_type(&self) -> &Type;

    /// Higher wins when two converters target the same type.
    fn priority(&self) -> i32 {
        0
    }

    /// Opt out of being reused for descendant types.
    fn ignore_inherit(&self) -> bool {
        false
    }

    /// Called once after discovery, when the whole registry is visible.
    fn initialize(&self, _resolver: &dyn Resolver) {}

    fn try_convert(
        &self,
        ctx: &mut ConvertContext<'_>,
        input: &Value,
        output: &Type,
    ) -> Result<Value, Diagnostic>;
}

/// Produces converters for closed instances of a generic definition.
///
/// Registered under the definition of [`output_type`](Self::output_type);
/// [`create`](Self::create) runs at most once per closed type.
pub trait GenericConverterFactory: Send + Sync {
    /// Declared open output, e.g. `Mapping<K, V>` or the bare definition.
    fn output_type(&self) -> &Type;

    /// Number of generic parameters the factory itself is declared with.
    fn type_params(&self) -> usize;

    fn priority(&self) -> i32 {
        0
    }

    fn create(&self, closed: &Type) -> Result<Arc<dyn Converter>, PluginError>;
}

/// Lookup handle a context carries back to the engine.
pub trait Resolver {
    /// Cache-or-compute the converter for `ty`.
    fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>>;
}

/// Run `converter`, turning a panic into a [`FailureKind::Panic`] diagnostic.
pub fn invoke(
    converter: &dyn Converter,
    ctx: &mut ConvertContext<'_>,
    input: &Value,
    output: &Type,
) -> Result<Value, Diagnostic> {
    match catch_unwind(AssertUnwindSafe(|| converter.try_convert(ctx, input, output))) {
        Ok(result) => result,
        Err(payload) => Err(Diagnostic::new(
            FailureKind::Panic,
            output,
            format!(
                "converter for '{output}' panicked: {}",
                panic_message(payload.as_ref())
            ),
        )),
    }
}

/// Run a plugin callback outside of conversion, turning a panic into a
/// [`PluginError`] describing `what` the callback was doing.
pub fn guard<T>(what: &str, f: impl FnOnce() -> T) -> Result<T, PluginError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        PluginError::plugin(format!("panicked {what}: {}", panic_message(payload.as_ref())))
    })
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
