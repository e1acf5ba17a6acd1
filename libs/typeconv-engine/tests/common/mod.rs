#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use typeconv_api::{
    ConvertContext, Converter, Diagnostic, GenericConverterFactory, PluginError, Record, Type,
    TypeBuilder, Value,
};

/// Answers every input with a record of the requested type stamped with
/// `by = tag`, so tests can see which converter ran.
pub struct Tagged {
    pub ty: Type,
    pub tag: &'static str,
    pub priority: i32,
    pub ignore_inherit: bool,
    pub initialized: Arc<AtomicUsize>,
}

impl Tagged {
    pub fn new(ty: &Type, tag: &'static str) -> Self {
        Self {
            ty: ty.clone(),
            tag,
            priority: 0,
            ignore_inherit: false,
            initialized: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn ignoring_inherit(mut self) -> Self {
        self.ignore_inherit = true;
        self
    }
}

impl Converter for Tagged {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn ignore_inherit(&self) -> bool {
        self.ignore_inherit
    }

    fn initialize(&self, _resolver: &dyn typeconv_api::Resolver) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        _input: &Value,
        output: &Type,
    ) -> Result<Value, Diagnostic> {
        Ok(Value::Record(Record::new(output.clone()).with("by", self.tag)))
    }
}

/// Tag stamped by [`Tagged`], if `value` carries one.
pub fn tag_of(value: &Value) -> Option<&str> {
    match value {
        Value::Record(record) => record.get("by").and_then(Value::as_str),
        _ => None,
    }
}

/// Counts `create` calls and hands out [`Tagged`] converters.
pub struct CountingFactory {
    pub ty: Type,
    pub params: usize,
    pub created: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(ty: Type, params: usize) -> Self {
        Self { ty, params, created: Arc::new(AtomicUsize::new(0)) }
    }
}

impl GenericConverterFactory for CountingFactory {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn type_params(&self) -> usize {
        self.params
    }

    fn create(&self, closed: &Type) -> Result<Arc<dyn Converter>, PluginError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Tagged::new(closed, "factory")))
    }
}

/// `interface Pet`, `class Animal`, `class Dog : Animal, Pet`.
pub struct Zoo {
    pub pet: Type,
    pub animal: Type,
    pub dog: Type,
}

pub fn zoo() -> Zoo {
    let pet = TypeBuilder::interface("Pet").build().unwrap();
    let animal = TypeBuilder::class("Animal")
        .field("name", Type::string())
        .build()
        .unwrap();
    let dog = TypeBuilder::class("Dog")
        .base(&animal)
        .implements(&pet)
        .field("good", Type::bool())
        .build()
        .unwrap();
    Zoo { pet, animal, dog }
}
