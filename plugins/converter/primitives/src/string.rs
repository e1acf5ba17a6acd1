use typeconv_api::{ConvertContext, Converter, Diagnostic, Type, Value};

/// Anything to `string`. Containers and records render as JSON; byte
/// strings must be valid UTF-8.
pub struct StringConverter {
    ty: Type,
}

impl StringConverter {
    pub fn new() -> Self {
        Self { ty: Type::string() }
    }
}

impl Default for StringConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for StringConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        input: &Value,
        _output: &Type,
    ) -> Result<Value, Diagnostic> {
        let text = match input {
            Value::Null => return Ok(Value::Null),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bytes(bytes) => String::from_utf8(bytes.clone()).map_err(|e| {
                Diagnostic::parse(&self.ty, format!("bytes are not valid UTF-8: {e}"))
            })?,
            Value::Seq(_) | Value::Map(_) | Value::Record(_) => input.to_json().to_string(),
            Value::Opaque(_) => {
                return Err(Diagnostic::unsupported(&self.ty, "opaque values have no text form"));
            }
        };
        Ok(Value::Str(text))
    }
}
