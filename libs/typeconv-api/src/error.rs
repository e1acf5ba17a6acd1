use std::fmt;

use crate::types::Type;

// ---------------------------------------------------------------------------
// PluginError — discovery and factory failures
// ---------------------------------------------------------------------------

/// Category of a plugin error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid plugin configuration or declaration.
    Config,
    /// The plugin could not produce what it was asked for.
    Plugin,
    /// Logical error (not found, invalid state, generic).
    Logic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Plugin => f.write_str("plugin"),
            ErrorKind::Logic => f.write_str("logic"),
        }
    }
}

/// Error returned by source registration and generic factories.
///
/// Never crosses into a conversion result: the engine logs it and moves on.
#[derive(Clone, PartialEq, Eq)]
pub struct PluginError {
    kind: ErrorKind,
    message: String,
}

impl PluginError {
    /// Generic logic error (default kind).
    pub fn new(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Logic, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn plugin(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Plugin, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the original kind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Debug for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PluginError {}

// ---------------------------------------------------------------------------
// Diagnostic — one entry of a failed conversion attempt
// ---------------------------------------------------------------------------

/// Why a single conversion attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Text could not be parsed into the output type.
    Parse,
    /// Numeric value out of range for the output type.
    Overflow,
    /// The converter does not accept this shape of input.
    Unsupported,
    /// The produced value is not an instance of the requested type.
    Cast,
    /// A nested key/element/field conversion failed.
    Nested,
    /// Nesting went deeper than the configured limit.
    Depth,
    /// The converter panicked.
    Panic,
    /// A plugin-level error surfaced during conversion.
    Plugin,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Parse => "parse",
            FailureKind::Overflow => "overflow",
            FailureKind::Unsupported => "unsupported",
            FailureKind::Cast => "cast",
            FailureKind::Nested => "nested",
            FailureKind::Depth => "depth",
            FailureKind::Panic => "panic",
            FailureKind::Plugin => "plugin",
        };
        f.write_str(s)
    }
}

/// A conversion diagnostic. Accumulated on the context, never thrown.
#[derive(Clone, PartialEq, Eq)]
pub struct Diagnostic {
    kind: FailureKind,
    output: String,
    message: String,
}

impl Diagnostic {
    pub fn new(kind: FailureKind, output: &Type, msg: impl Into<String>) -> Self {
        Self {
            kind,
            output: output.key().to_owned(),
            message: msg.into(),
        }
    }

    pub fn parse(output: &Type, msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, output, msg)
    }

    pub fn overflow(output: &Type, msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Overflow, output, msg)
    }

    pub fn unsupported(output: &Type, msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Unsupported, output, msg)
    }

    pub fn cast(output: &Type, msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Cast, output, msg)
    }

    pub fn nested(output: &Type, msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Nested, output, msg)
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Key of the output type the failed attempt targeted.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with `ctx`, keeping kind and output type.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            output: self.output,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl From<(&Type, PluginError)> for Diagnostic {
    fn from((output, err): (&Type, PluginError)) -> Self {
        Self::new(FailureKind::Plugin, output, err.message)
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.output, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.output, self.message)
    }
}
