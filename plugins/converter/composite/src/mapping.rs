use std::sync::Arc;

use typeconv_api::{
    ConvertContext, Converter, Diagnostic, GenericConverterFactory, PluginError, Type, Value,
};

/// Builds a [`MappingConverter`] for each closed `Mapping<K, V>`.
pub struct MappingFactory {
    ty: Type,
}

impl MappingFactory {
    pub fn new() -> Self {
        Self { ty: Type::mapping_definition() }
    }
}

impl Default for MappingFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericConverterFactory for MappingFactory {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn type_params(&self) -> usize {
        2
    }

    fn create(&self, closed: &Type) -> Result<Arc<dyn Converter>, PluginError> {
        match closed.generic_args() {
            [key, value] => Ok(Arc::new(MappingConverter::new(
                closed.clone(),
                key.clone(),
                value.clone(),
            ))),
            args => Err(PluginError::plugin(format!(
                "Mapping takes two type arguments, '{closed}' has {}",
                args.len()
            ))),
        }
    }
}

/// Converts mappings and records entry by entry, keeping entry order.
pub struct MappingConverter {
    ty: Type,
    key: Type,
    value: Type,
}

impl MappingConverter {
    pub fn new(ty: Type, key: Type, value: Type) -> Self {
        Self { ty, key, value }
    }

    fn convert_entries<'a>(
        &self,
        ctx: &mut ConvertContext<'_>,
        entries: impl Iterator<Item = (Value, &'a Value)>,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        let mut out = Vec::new();
        for (key, value) in entries {
            let Some(k) = ctx.convert(&key, &self.key) else {
                return Err(Diagnostic::nested(
                    output,
                    format!("key {key} could not be converted to '{}'", self.key),
                ));
            };
            let Some(v) = ctx.convert(value, &self.value) else {
                return Err(Diagnostic::nested(
                    output,
                    format!("value for key {key} could not be converted to '{}'", self.value),
                ));
            };
            out.push((k, v));
        }
        Ok(Value::Map(out))
    }
}

impl Converter for MappingConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn try_convert(
        &self,
        ctx: &mut ConvertContext<'_>,
        input: &Value,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        match input {
            Value::Null => Ok(Value::Null),
            Value::Map(entries) => {
                self.convert_entries(ctx, entries.iter().map(|(k, v)| (k.clone(), v)), output)
            }
            Value::Record(record) => self.convert_entries(
                ctx,
                record.fields().iter().map(|(name, v)| (Value::from(name.as_str()), v)),
                output,
            ),
            other => Err(Diagnostic::unsupported(
                output,
                format!("cannot convert {} to '{output}'", other.kind_name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use typeconv_api::{FailureKind, Record, TypeBuilder};

    use super::*;
    use crate::testing::Local;

    #[test]
    fn converts_keys_and_values_in_order() {
        let local = Local::new();
        let ty = Type::mapping(Type::i32(), Type::string());
        let input = Value::Map(vec![
            (Value::from("2"), Value::Int(20)),
            (Value::from("1"), Value::Bool(true)),
        ]);
        let (result, _) = local.convert(input, &ty);
        assert_eq!(
            result,
            Ok(Value::Map(vec![
                (Value::Int(2), Value::from("20")),
                (Value::Int(1), Value::from("true")),
            ]))
        );
    }

    #[test]
    fn records_read_as_field_maps() {
        let local = Local::new();
        let point = TypeBuilder::class("Point").build().unwrap();
        let record = Record::new(point).with("x", "1").with("y", 2i64);
        let (result, _) = local.convert(record, &Type::mapping(Type::string(), Type::f64()));
        assert_eq!(
            result,
            Ok(Value::Map(vec![
                (Value::from("x"), Value::Float(1.0)),
                (Value::from("y"), Value::Float(2.0)),
            ]))
        );
    }

    #[test]
    fn bad_value_names_its_key() {
        let local = Local::new();
        let ty = Type::mapping(Type::string(), Type::u8());
        let input = Value::Map(vec![(Value::from("a"), Value::Int(-1))]);
        let (result, errors) = local.convert(input, &ty);
        let outer = result.unwrap_err();
        assert_eq!(outer.kind(), FailureKind::Nested);
        assert!(outer.message().contains("\"a\""));
        assert_eq!(errors[0].kind(), FailureKind::Overflow);
    }

    #[test]
    fn sequences_are_unsupported() {
        let local = Local::new();
        let (result, _) = local.convert(Value::Seq(Vec::new()), &Type::mapping(Type::string(), Type::i32()));
        assert_eq!(result.unwrap_err().kind(), FailureKind::Unsupported);
    }
}
