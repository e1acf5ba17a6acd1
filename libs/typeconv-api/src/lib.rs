//! Plugin-facing contract of the conversion engine.
//!
//! Converter plugins depend on this crate only. It defines the runtime type
//! descriptors, the tagged [`Value`] model, the [`Converter`] /
//! [`GenericConverterFactory`] / [`ConverterSource`] traits and the
//! per-call [`ConvertContext`].

pub mod context;
pub mod converter;
pub mod error;
pub mod source;
pub mod typed;
pub mod types;
pub mod value;

pub use context::{ConvertContext, DEFAULT_MAX_DEPTH};
pub use converter::{Converter, GenericConverterFactory, Resolver, invoke};
pub use error::{Diagnostic, ErrorKind, FailureKind, PluginError};
pub use source::{ConverterSource, Registrations, SourceFn};
pub use typed::{FromValue, Typed};
pub use types::{Ancestry, FieldDecl, Type, TypeBuilder, TypeError, TypeKind};
pub use value::{Opaque, Record, Value};
