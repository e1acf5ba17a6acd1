use std::sync::Arc;

use typeconv_api::{
    ConvertContext, Converter, Diagnostic, GenericConverterFactory, PluginError, Type, Value,
};

/// Builds a [`ListConverter`] for each closed `List<T>`.
pub struct ListFactory {
    ty: Type,
}

impl ListFactory {
    pub fn new() -> Self {
        Self { ty: Type::list_definition() }
    }
}

impl Default for ListFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericConverterFactory for ListFactory {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn type_params(&self) -> usize {
        1
    }

    fn create(&self, closed: &Type) -> Result<Arc<dyn Converter>, PluginError> {
        match closed.generic_args() {
            [elem] => Ok(Arc::new(ListConverter::new(closed.clone(), elem.clone()))),
            args => Err(PluginError::plugin(format!(
                "List takes one type argument, '{closed}' has {}",
                args.len()
            ))),
        }
    }
}

/// Converts sequences element by element.
///
/// Strings are split on commas, byte strings become one element per byte,
/// and any other scalar becomes a one-element list.
pub struct ListConverter {
    ty: Type,
    elem: Type,
}

impl ListConverter {
    pub fn new(ty: Type, elem: Type) -> Self {
        Self { ty, elem }
    }

    fn convert_items<'a>(
        &self,
        ctx: &mut ConvertContext<'_>,
        items: impl Iterator<Item = &'a Value>,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        let mut out = Vec::new();
        for (index, item) in items.enumerate() {
            let Some(value) = ctx.convert(item, &self.elem) else {
                return Err(Diagnostic::nested(
                    output,
                    format!("element {index} could not be converted to '{}'", self.elem),
                ));
            };
            out.push(value);
        }
        Ok(Value::Seq(out))
    }
}

impl Converter for ListConverter {
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
            Value::Seq(items) => self.convert_items(ctx, items.iter(), output),
            Value::Str(s) if s.trim().is_empty() => Ok(Value::Seq(Vec::new())),
            Value::Str(s) => {
                let parts: Vec<Value> = s.split(',').map(|p| Value::from(p.trim())).collect();
                self.convert_items(ctx, parts.iter(), output)
            }
            Value::Bytes(bytes) => {
                let parts: Vec<Value> = bytes.iter().map(|b| Value::UInt(u64::from(*b))).collect();
                self.convert_items(ctx, parts.iter(), output)
            }
            Value::Map(_) | Value::Opaque(_) => Err(Diagnostic::unsupported(
                output,
                format!("cannot convert {} to '{output}'", input.kind_name()),
            )),
            scalar => self.convert_items(ctx, std::iter::once(scalar), output),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use typeconv_api::FailureKind;

    use super::*;
    use crate::testing::Local;

    #[test]
    fn converts_each_element() {
        let local = Local::new();
        let ty = Type::list(Type::i32());
        let input = Value::Seq(vec![Value::from("1"), Value::Int(2), Value::Float(3.0)]);
        let (result, errors) = local.convert(input, &ty);
        assert_eq!(result, Ok(Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])));
        assert!(errors.is_empty());
    }

    #[test]
    fn strings_split_on_commas() {
        let local = Local::new();
        let (result, _) = local.convert("1, 2,3", &Type::list(Type::u8()));
        assert_eq!(result, Ok(Value::Seq(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])));
        let (result, _) = local.convert("", &Type::list(Type::u8()));
        assert_eq!(result, Ok(Value::Seq(Vec::new())));
    }

    #[test]
    fn scalar_becomes_singleton() {
        let local = Local::new();
        let (result, _) = local.convert(true, &Type::list(Type::string()));
        assert_eq!(result, Ok(Value::Seq(vec![Value::from("true")])));
    }

    #[test]
    fn element_failure_leaves_a_chain() {
        let local = Local::new();
        let ty = Type::list(Type::i32());
        let (result, errors) = local.convert(Value::Seq(vec![Value::Int(1), Value::from("x")]), &ty);
        let outer = result.unwrap_err();
        assert_eq!(outer.kind(), FailureKind::Nested);
        assert_eq!(outer.output(), "List<i32>");
        assert!(outer.message().contains("element 1"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), FailureKind::Parse);
    }

    #[test]
    fn factory_rejects_wrong_arity() {
        let factory = ListFactory::new();
        let wrong = Type::mapping(Type::string(), Type::i32());
        assert!(factory.create(&wrong).is_err());
    }
}
