use typeconv_api::{ConvertContext, Converter, Diagnostic, Type, Value};

const TRUE_WORDS: &[&str] = &["true", "yes", "y", "on", "t"];
const FALSE_WORDS: &[&str] = &["false", "no", "n", "off", "f"];

/// Anything scalar to `bool`. Numbers are true when non-zero; strings accept
/// the usual words case-insensitively, then fall back to numbers.
pub struct BoolConverter {
    ty: Type,
}

impl BoolConverter {
    pub fn new() -> Self {
        Self { ty: Type::bool() }
    }

    fn parse(&self, text: &str) -> Result<bool, Diagnostic> {
        let word = text.trim().to_ascii_lowercase();
        if TRUE_WORDS.contains(&word.as_str()) {
            return Ok(true);
        }
        if FALSE_WORDS.contains(&word.as_str()) {
            return Ok(false);
        }
        if let Ok(n) = word.parse::<f64>() {
            if !n.is_nan() {
                return Ok(n != 0.0);
            }
        }
        Err(Diagnostic::parse(&self.ty, format!("'{text}' is not a valid bool")))
    }
}

impl Default for BoolConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for BoolConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        input: &Value,
        _output: &Type,
    ) -> Result<Value, Diagnostic> {
        let b = match input {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) if !f.is_nan() => *f != 0.0,
            Value::Str(s) => self.parse(s)?,
            Value::Bytes(bytes) if bytes.len() == 1 => bytes[0] != 0,
            other => {
                return Err(Diagnostic::unsupported(
                    &self.ty,
                    format!("cannot convert {} to bool", other.kind_name()),
                ));
            }
        };
        Ok(Value::Bool(b))
    }
}

#[cfg(test)]
mod tests {
    use typeconv_api::FailureKind;

    use super::*;
    use crate::testing::Local;

    #[test]
    fn words_and_numbers() {
        let local = Local::new();
        let ty = Type::bool();
        for yes in ["true", " Yes ", "ON", "1", "2.5"] {
            assert_eq!(local.convert(yes, &ty), Ok(Value::Bool(true)), "{yes}");
        }
        for no in ["false", "No", "off", "0", "0.0"] {
            assert_eq!(local.convert(no, &ty), Ok(Value::Bool(false)), "{no}");
        }
        assert_eq!(local.convert(7i64, &ty), Ok(Value::Bool(true)));
        assert_eq!(local.convert(0u64, &ty), Ok(Value::Bool(false)));
    }

    #[test]
    fn rejects_garbage_and_null() {
        let local = Local::new();
        let ty = Type::bool();
        assert_eq!(local.convert("maybe", &ty).unwrap_err().kind(), FailureKind::Parse);
        assert_eq!(local.convert("NaN", &ty).unwrap_err().kind(), FailureKind::Parse);
        assert_eq!(local.convert(Value::Null, &ty).unwrap_err().kind(), FailureKind::Unsupported);
    }
}
