//! Type-conversion resolution engine.
//!
//! Converter sources register converters and generic factories once, at
//! build time. Lookups for types nobody registered are answered by
//! specializing a generic factory or by adapting an ancestor's converter,
//! and the answer is cached for the life of the engine.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod global;
pub mod registry;
mod specialize;

pub use config::{DiscoveryConfig, EngineConfig};
pub use discovery::DiscoveryReport;
pub use engine::{Conversion, Engine, EngineBuilder};
pub use error::{ConversionError, EngineError};
pub use global::{global, install};
pub use registry::{ConverterRegistry, Entry, Offer, Origin};

#[cfg(feature = "builtins")]
use std::sync::Arc;

#[cfg(feature = "builtins")]
use typeconv_api::ConverterSource;

/// The converter sources bundled with the engine.
#[cfg(feature = "builtins")]
pub fn builtin_sources() -> Vec<Arc<dyn ConverterSource>> {
    vec![
        Arc::new(typeconv_converter_primitives::PrimitivesSource),
        Arc::new(typeconv_converter_composite::CompositeSource),
    ]
}
