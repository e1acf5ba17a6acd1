use std::sync::Arc;

use crate::converter::{Converter, GenericConverterFactory};
use crate::error::PluginError;

/// Converters and factories offered by one discovery source, in the order
/// they were added.
#[derive(Default)]
pub struct Registrations {
    converters: Vec<Arc<dyn Converter>>,
    factories: Vec<Arc<dyn GenericConverterFactory>>,
}

impl Registrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn converter(&mut self, converter: impl Converter + 'static) -> &mut Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn add_converter(&mut self, converter: Arc<dyn Converter>) -> &mut Self {
        self.converters.push(converter);
        self
    }

    pub fn factory(&mut self, factory: impl GenericConverterFactory + 'static) -> &mut Self {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn add_factory(&mut self, factory: Arc<dyn GenericConverterFactory>) -> &mut Self {
        self.factories.push(factory);
        self
    }

    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    pub fn factories(&self) -> &[Arc<dyn GenericConverterFactory>] {
        &self.factories
    }

    pub fn len(&self) -> usize {
        self.converters.len() + self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named set of converter plugins handed to the engine at startup.
///
/// `register` may fail; the engine logs the failure, drops whatever the
/// source added, and continues with the next source.
pub trait ConverterSource: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, out: &mut Registrations) -> Result<(), PluginError>;
}

/// A [`ConverterSource`] backed by a closure.
///
/// ```
/// use typeconv_api::{ConverterSource, Registrations, SourceFn};
///
/// let source = SourceFn::new("empty", |_out: &mut Registrations| Ok(()));
/// assert_eq!(source.name(), "empty");
/// ```
pub struct SourceFn<F> {
    name: String,
    register: F,
}

impl<F> SourceFn<F>
where
    F: Fn(&mut Registrations) -> Result<(), PluginError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, register: F) -> Self {
        Self { name: name.into(), register }
    }
}

impl<F> ConverterSource for SourceFn<F>
where
    F: Fn(&mut Registrations) -> Result<(), PluginError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, out: &mut Registrations) -> Result<(), PluginError> {
        (self.register)(out)
    }
}
