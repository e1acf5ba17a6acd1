//! Converters for the built-in scalar types.
//!
//! Strings are parsed (decimal, or hexadecimal with a `0x` / `&h` prefix),
//! booleans map to 1 / 0, numbers are range-checked, and byte strings of
//! exactly the target width are read little-endian.

mod boolean;
mod number;
mod string;

pub use boolean::BoolConverter;
pub use number::{FloatConverter, IntConverter};
pub use string::StringConverter;

use typeconv_api::{ConverterSource, PluginError, Registrations, Type};

/// Registers a converter for every primitive type.
pub struct PrimitivesSource;

impl ConverterSource for PrimitivesSource {
    fn name(&self) -> &str {
        "primitives"
    }

    fn register(&self, out: &mut Registrations) -> Result<(), PluginError> {
        out.converter(StringConverter::new())
            .converter(BoolConverter::new())
            .converter(IntConverter::new(Type::i8(), i8::MIN.into(), i8::MAX.into(), 1))
            .converter(IntConverter::new(Type::i16(), i16::MIN.into(), i16::MAX.into(), 2))
            .converter(IntConverter::new(Type::i32(), i32::MIN.into(), i32::MAX.into(), 4))
            .converter(IntConverter::new(Type::i64(), i64::MIN.into(), i64::MAX.into(), 8))
            .converter(IntConverter::new(Type::u8(), 0, u8::MAX.into(), 1))
            .converter(IntConverter::new(Type::u16(), 0, u16::MAX.into(), 2))
            .converter(IntConverter::new(Type::u32(), 0, u32::MAX.into(), 4))
            .converter(IntConverter::new(Type::u64(), 0, u64::MAX.into(), 8))
            .converter(FloatConverter::single())
            .converter(FloatConverter::double());
        Ok(())
    }
}

/// Strip a `0x` / `&h` prefix, returning the hex digits.
pub(crate) fn hex_digits(text: &str) -> Option<&str> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("&h"))
        .or_else(|| text.strip_prefix("&H"))?;
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use typeconv_api::{
        ConvertContext, Converter, ConverterSource, Diagnostic, Registrations, Resolver, Type,
        Value, invoke,
    };

    use crate::PrimitivesSource;

    /// Resolves exact output types against the primitive converters.
    pub struct Local(Registrations);

    impl Local {
        pub fn new() -> Self {
            let mut out = Registrations::new();
            PrimitivesSource.register(&mut out).unwrap();
            Self(out)
        }

        pub fn convert(&self, input: impl Into<Value>, ty: &Type) -> Result<Value, Diagnostic> {
            let converter = self.resolve(ty).unwrap();
            let mut ctx = ConvertContext::new(self, 8);
            invoke(converter.as_ref(), &mut ctx, &input.into(), ty)
        }
    }

    impl Resolver for Local {
        fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
            self.0.converters().iter().find(|c| c.output_type() == ty).cloned()
        }
    }
}
