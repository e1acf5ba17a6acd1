use typeconv_api::{Diagnostic, PluginError, Type, Value};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("converter source '{source_name}' failed: {error}")]
    Discovery {
        source_name: String,
        error: PluginError,
    },

    #[error("converter source '{0}' is not available")]
    UnknownSource(String),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Discovery`, context is added to the inner `PluginError`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::Discovery { source_name, error } => EngineError::Discovery {
                source_name,
                error: error.with_context(ctx),
            },
            other => other,
        }
    }
}

/// Raised by the throwing conversion entry points.
///
/// Carries the requested type, a rendering of the input, and every
/// diagnostic the attempt left behind, innermost first.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot convert {input} to '{output}': {}", render_chain(.diagnostics))]
pub struct ConversionError {
    pub output: String,
    pub input: String,
    pub diagnostics: Vec<Diagnostic>,
}

const INPUT_PREVIEW: usize = 64;

impl ConversionError {
    pub fn new(output: &Type, input: &Value, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            output: output.key().to_owned(),
            input: preview(input),
            diagnostics,
        }
    }

    /// The outermost failure.
    pub fn cause(&self) -> Option<&Diagnostic> {
        self.diagnostics.last()
    }
}

fn preview(input: &Value) -> String {
    let text = input.to_string();
    if text.chars().count() <= INPUT_PREVIEW {
        return text;
    }
    let cut: String = text.chars().take(INPUT_PREVIEW).collect();
    format!("{cut}...")
}

fn render_chain(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "no diagnostics".to_owned();
    }
    diagnostics
        .iter()
        .rev()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_outermost_first() {
        let err = ConversionError::new(
            &Type::i32(),
            &Value::from("x"),
            vec![
                Diagnostic::parse(&Type::i32(), "inner"),
                Diagnostic::nested(&Type::list(Type::i32()), "outer"),
            ],
        );
        assert_eq!(
            err.to_string(),
            "cannot convert \"x\" to 'i32': List<i32>: outer; i32: inner"
        );
        assert_eq!(err.cause().map(Diagnostic::message), Some("outer"));
    }

    #[test]
    fn long_inputs_are_truncated() {
        let err = ConversionError::new(&Type::i32(), &Value::from("y".repeat(200)), Vec::new());
        assert!(err.input.ends_with("..."));
        assert_eq!(err.input.chars().count(), INPUT_PREVIEW + 3);
    }
}
