//! Converters for container and record types.
//!
//! `List<T>` and `Mapping<K, V>` are served by generic factories that build
//! one converter per closed type. [`RecordConverter`] is registered by
//! applications for their own class types.

mod list;
mod mapping;
mod record;

pub use list::{ListConverter, ListFactory};
pub use mapping::{MappingConverter, MappingFactory};
pub use record::RecordConverter;

use typeconv_api::{ConverterSource, PluginError, Registrations};

/// Registers the `List<>` and `Mapping<,>` factories.
pub struct CompositeSource;

impl ConverterSource for CompositeSource {
    fn name(&self) -> &str {
        "composite"
    }

    fn register(&self, out: &mut Registrations) -> Result<(), PluginError> {
        out.factory(ListFactory::new()).factory(MappingFactory::new());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use typeconv_api::{
        ConvertContext, Converter, ConverterSource, Diagnostic, GenericConverterFactory,
        Registrations, Resolver, Type, Value, invoke,
    };
    use typeconv_converter_primitives::PrimitivesSource;

    use crate::CompositeSource;

    /// Primitive converters plus composite factories, without caching.
    pub struct Local(Registrations);

    impl Local {
        pub fn new() -> Self {
            let mut out = Registrations::new();
            PrimitivesSource.register(&mut out).unwrap();
            CompositeSource.register(&mut out).unwrap();
            Self(out)
        }

        pub fn with(mut self, converter: impl Converter + 'static) -> Self {
            self.0.converter(converter);
            self
        }

        pub fn convert(&self, input: impl Into<Value>, ty: &Type) -> (Result<Value, Diagnostic>, Vec<Diagnostic>) {
            let converter = self.resolve(ty).unwrap();
            let mut ctx = ConvertContext::new(self, 8);
            let result = invoke(converter.as_ref(), &mut ctx, &input.into(), ty);
            (result, ctx.into_errors())
        }
    }

    impl Resolver for Local {
        fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
            if let Some(c) = self.0.converters().iter().find(|c| c.output_type() == ty) {
                return Some(c.clone());
            }
            let definition = ty.generic_definition()?;
            let factory = self.0.factories().iter().find(|f| f.output_type() == definition)?;
            factory.create(ty).ok()
        }
    }
}
