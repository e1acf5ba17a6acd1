use std::sync::Arc;

use crate::converter::{Converter, Resolver, invoke};
use crate::error::{Diagnostic, FailureKind};
use crate::typed::{FromValue, Typed};
use crate::types::Type;
use crate::value::Value;

/// Nesting limit used when the engine configuration does not set one.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Per-call conversion state.
///
/// Created for each top-level conversion and owned by it. Converters use it
/// for nested lookups and to leave diagnostics behind; nothing here is
/// shared between calls.
pub struct ConvertContext<'r> {
    resolver: &'r dyn Resolver,
    errors: Vec<Diagnostic>,
    depth: usize,
    max_depth: usize,
}

impl<'r> ConvertContext<'r> {
    pub fn new(resolver: &'r dyn Resolver, max_depth: usize) -> Self {
        Self {
            resolver,
            errors: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    pub fn resolve(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
        self.resolver.resolve(ty)
    }

    /// Converter for the descriptor of `T`.
    pub fn get<T: Typed>(&self) -> Option<Arc<dyn Converter>> {
        self.resolve(&T::type_of())
    }

    /// Current nesting depth (1 inside a top-level converter).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve and run the converter for `output`, one level deeper.
    ///
    /// The failure is returned, not recorded.
    pub fn attempt(&mut self, input: &Value, output: &Type) -> Result<Value, Diagnostic> {
        if self.depth >= self.max_depth {
            return Err(Diagnostic::new(
                FailureKind::Depth,
                output,
                format!("nesting exceeds {} levels", self.max_depth),
            ));
        }
        let converter = self.resolve(output).ok_or_else(|| {
            Diagnostic::unsupported(output, format!("no converter resolves for '{output}'"))
        })?;

        self.depth += 1;
        let result = invoke(converter.as_ref(), self, input, output);
        self.depth -= 1;
        result
    }

    /// Nested conversion. On failure the diagnostic is recorded and `None`
    /// returned, so the caller can add its own frame and bail out.
    pub fn convert(&mut self, input: &Value, output: &Type) -> Option<Value> {
        match self.attempt(input, output) {
            Ok(value) => Some(value),
            Err(diag) => {
                self.errors.push(diag);
                None
            }
        }
    }

    /// Nested conversion into a Rust type.
    pub fn convert_to<T: Typed + FromValue>(&mut self, input: &Value) -> Option<T> {
        let ty = T::type_of();
        let value = self.convert(input, &ty)?;
        match T::from_value(value) {
            Some(v) => Some(v),
            None => {
                self.errors.push(Diagnostic::cast(
                    &ty,
                    format!("converter for '{ty}' produced an incompatible value"),
                ));
                None
            }
        }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.errors.push(diag);
    }

    /// Diagnostics accumulated so far, oldest first.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolves every type to a converter that recurses into itself.
    struct Recursive;

    struct Deepening;

    impl Converter for Deepening {
        fn output_type(&self) -> &Type {
            static TY: once_cell::sync::Lazy<Type> = once_cell::sync::Lazy::new(Type::object);
            &TY
        }

        fn try_convert(
            &self,
            ctx: &mut ConvertContext<'_>,
            input: &Value,
            output: &Type,
        ) -> Result<Value, Diagnostic> {
            ctx.convert(input, output)
                .ok_or_else(|| Diagnostic::nested(output, format!("level {}", ctx.depth())))
        }
    }

    impl Resolver for Recursive {
        fn resolve(&self, _ty: &Type) -> Option<Arc<dyn Converter>> {
            Some(Arc::new(Deepening))
        }
    }

    struct Nothing;

    impl Resolver for Nothing {
        fn resolve(&self, _ty: &Type) -> Option<Arc<dyn Converter>> {
            None
        }
    }

    #[test]
    fn depth_limit_turns_runaway_recursion_into_diagnostics() {
        let resolver = Recursive;
        let mut ctx = ConvertContext::new(&resolver, 4);
        assert_eq!(ctx.convert(&Value::Null, &Type::object()), None);
        assert_eq!(ctx.depth(), 0);

        let kinds: Vec<FailureKind> = ctx.errors().iter().map(Diagnostic::kind).collect();
        assert_eq!(kinds[0], FailureKind::Depth);
        assert!(kinds[1..].iter().all(|k| *k == FailureKind::Nested));
        // One depth failure plus one frame per level.
        assert_eq!(kinds.len(), 5);
    }

    #[test]
    fn unresolvable_type_is_a_diagnostic() {
        let resolver = Nothing;
        let mut ctx = ConvertContext::new(&resolver, DEFAULT_MAX_DEPTH);
        assert_eq!(ctx.convert_to::<i32>(&Value::Int(1)), None);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].kind(), FailureKind::Unsupported);
        assert_eq!(ctx.errors()[0].output(), "i32");
    }
}
