use typeconv_api::{ConvertContext, Converter, Diagnostic, Record, Type, Value};

/// Builds records of a class type from mappings or other records.
///
/// Registered for one class, it also serves that class's descendants unless
/// [`with_ignore_inherit`](Self::with_ignore_inherit) is set: the record produced has
/// the type that was asked for and every field that type declares or
/// inherits. Fields missing from the input are left out; input entries with
/// no matching field are ignored.
pub struct RecordConverter {
    ty: Type,
    priority: i32,
    ignore_inherit: bool,
}

impl RecordConverter {
    pub fn new(ty: Type) -> Self {
        Self { ty, priority: 0, ignore_inherit: false }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ignore_inherit(mut self, ignore: bool) -> Self {
        self.ignore_inherit = ignore;
        self
    }
}

fn lookup<'a>(input: &'a Value, name: &str) -> Option<&'a Value> {
    match input {
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(name))
            .or_else(|| {
                entries
                    .iter()
                    .find(|(k, _)| k.as_str().is_some_and(|k| k.eq_ignore_ascii_case(name)))
            })
            .map(|(_, v)| v),
        Value::Record(record) => record.get(name),
        _ => None,
    }
}

impl Converter for RecordConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn ignore_inherit(&self) -> bool {
        self.ignore_inherit
    }

    fn try_convert(
        &self,
        ctx: &mut ConvertContext<'_>,
        input: &Value,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        match input {
            Value::Null => return Ok(Value::Null),
            Value::Map(_) | Value::Record(_) => {}
            other => {
                return Err(Diagnostic::unsupported(
                    output,
                    format!("cannot build '{output}' from {}", other.kind_name()),
                ));
            }
        }

        let mut record = Record::new(output.clone());
        for field in output.all_fields() {
            let Some(raw) = lookup(input, &field.name) else {
                tracing::trace!(ty = %output, field = %field.name, "field missing from input");
                continue;
            };
            let Some(value) = ctx.convert(raw, &field.ty) else {
                return Err(Diagnostic::nested(
                    output,
                    format!("field '{}' could not be converted to '{}'", field.name, field.ty),
                ));
            };
            record.set(field.name, value);
        }
        Ok(Value::Record(record))
    }
}
