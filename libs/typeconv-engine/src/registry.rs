use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use typeconv_api::{Converter, GenericConverterFactory, Type};

/// What a registry key maps to.
#[derive(Clone)]
pub enum Slot {
    Converter(Arc<dyn Converter>),
    /// Held under a generic definition key.
    Factory(Arc<dyn GenericConverterFactory>),
}

/// How an entry got into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Registered during discovery.
    Direct,
    /// Generic factory registered during discovery.
    Factory,
    /// Produced by a factory for a closed generic type.
    Specialized,
    /// Adapter over the converter of an ancestor.
    Fallback { ancestor: Type },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Direct => f.write_str("direct"),
            Origin::Factory => f.write_str("factory"),
            Origin::Specialized => f.write_str("specialized"),
            Origin::Fallback { ancestor } => write!(f, "fallback via {ancestor}"),
        }
    }
}

/// A stored slot with the plugin-declared properties the registry needs.
///
/// `priority` and `ignore_inherit` are read from the plugin once, before the
/// entry is built. The registry never calls back into plugin code.
#[derive(Clone)]
pub struct Entry {
    pub slot: Slot,
    pub origin: Origin,
    pub priority: i32,
    pub ignore_inherit: bool,
}

impl Entry {
    pub fn for_converter(
        converter: Arc<dyn Converter>,
        origin: Origin,
        priority: i32,
        ignore_inherit: bool,
    ) -> Self {
        Self {
            slot: Slot::Converter(converter),
            origin,
            priority,
            ignore_inherit,
        }
    }

    pub fn for_factory(factory: Arc<dyn GenericConverterFactory>, priority: i32) -> Self {
        Self {
            slot: Slot::Factory(factory),
            origin: Origin::Factory,
            priority,
            ignore_inherit: false,
        }
    }

    pub fn converter(&self) -> Option<Arc<dyn Converter>> {
        match &self.slot {
            Slot::Converter(c) => Some(c.clone()),
            Slot::Factory(_) => None,
        }
    }
}

/// Outcome of a discovery-time [`offer`](ConverterRegistry::offer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Nothing was stored for the type yet.
    Added,
    /// The new entry outranked the stored one.
    Replaced,
    /// The stored entry kept the type.
    Shadowed,
}

impl Offer {
    pub fn stored(self) -> bool {
        self != Offer::Shadowed
    }
}

/// Type-to-converter map shared by every resolution.
///
/// Discovery fills it through [`offer`](Self::offer). After that, entries are
/// only ever added, by [`publish`](Self::publish), and never replaced.
#[derive(Default)]
pub struct ConverterRegistry {
    entries: RwLock<HashMap<Type, Entry>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Type, Entry>> {
        match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("converter registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Type, Entry>> {
        match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("converter registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn get(&self, ty: &Type) -> Option<Entry> {
        self.read().get(ty).cloned()
    }

    /// Converter stored for exactly `ty`.
    pub fn converter(&self, ty: &Type) -> Option<Arc<dyn Converter>> {
        self.read().get(ty).and_then(Entry::converter)
    }

    /// Converter entry stored for `ty` that did not come from a fallback.
    pub fn declared(&self, ty: &Type) -> Option<Entry> {
        match self.read().get(ty) {
            Some(entry @ Entry {
                slot: Slot::Converter(_),
                origin: Origin::Direct | Origin::Specialized,
                ..
            }) => Some(entry.clone()),
            _ => None,
        }
    }

    /// Factory registered under a generic definition.
    pub fn factory(&self, definition: &Type) -> Option<Arc<dyn GenericConverterFactory>> {
        match self.read().get(definition) {
            Some(Entry { slot: Slot::Factory(f), .. }) => Some(f.clone()),
            _ => None,
        }
    }

    /// Discovery-time insert. Replaces an existing entry only when the new
    /// one has strictly higher priority.
    pub fn offer(&self, ty: Type, entry: Entry) -> Offer {
        let mut guard = self.write();
        let outcome = match guard.get(&ty) {
            None => Offer::Added,
            Some(existing) if existing.priority < entry.priority => Offer::Replaced,
            Some(_) => Offer::Shadowed,
        };
        if outcome.stored() {
            guard.insert(ty, entry);
        }
        outcome
    }

    /// Cache an entry computed on a miss. The first entry stored for `ty`
    /// wins; later callers get it back in place of their own.
    pub fn publish(&self, ty: Type, entry: Entry) -> Entry {
        self.write().entry(ty).or_insert(entry).clone()
    }

/// Every key with its origin, sorted by type key.
    pub fn snapshot(&self) -> Vec<(Type, Origin)> {
        let mut out: Vec<(Type, Origin)> = self
            .read()
            .iter()
            .map(|(ty, entry)| (ty.clone(), entry.origin.clone()))
            .collect();
        out.sort_by(|a, b| a.0.key().cmp(b.0.key()));
        out
    }

    /// Converters registered during discovery with the key each is stored
    /// under, deduplicated by identity.
    pub fn direct_converters(&self) -> Vec<(Type, Arc<dyn Converter>)> {
        let mut out: Vec<(Type, Arc<dyn Converter>)> = Vec::new();
        for (ty, entry) in self.read().iter() {
            if let (Slot::Converter(c), Origin::Direct) = (&entry.slot, &entry.origin) {
                if !out.iter().any(|(_, seen)| Arc::ptr_eq(seen, c)) {
                    out.push((ty.clone(), c.clone()));
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeconv_api::{ConvertContext, Diagnostic, Value};

    struct Fixed {
        ty: Type,
        priority: i32,
        tag: i64,
    }

    impl Converter for Fixed {
        fn output_type(&self) -> &Type {
            &self.ty
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn try_convert(
            &self,
            _ctx: &mut ConvertContext<'_>,
            _input: &Value,
            _output: &Type,
        ) -> Result<Value, Diagnostic> {
            Ok(Value::Int(self.tag))
        }
    }

    fn fixed(priority: i32, tag: i64) -> Arc<dyn Converter> {
        Arc::new(Fixed { ty: Type::i32(), priority, tag })
    }

    fn direct(converter: &Arc<dyn Converter>) -> Entry {
        Entry::for_converter(converter.clone(), Origin::Direct, converter.priority(), false)
    }

    fn same(a: &Arc<dyn Converter>, b: &Arc<dyn Converter>) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[test]
    fn offer_keeps_the_higher_priority_and_the_first_of_a_tie() {
        let registry = ConverterRegistry::new();
        let low = fixed(0, 1);
        let tie = fixed(0, 2);
        let high = fixed(5, 3);

        assert_eq!(registry.offer(Type::i32(), direct(&low)), Offer::Added);
        assert_eq!(registry.offer(Type::i32(), direct(&tie)), Offer::Shadowed);
        assert!(same(&registry.converter(&Type::i32()).unwrap(), &low));

        assert_eq!(registry.offer(Type::i32(), direct(&high)), Offer::Replaced);
        assert!(same(&registry.converter(&Type::i32()).unwrap(), &high));
    }

    #[test]
    fn offer_compares_the_stored_priority() {
        let registry = ConverterRegistry::new();
        let first = fixed(0, 1);
        let second = fixed(0, 2);

        registry.offer(
            Type::i32(),
            Entry::for_converter(first.clone(), Origin::Direct, 10, false),
        );
        // The plugin reports 0, but the entry was stored at 10.
        assert_eq!(
            registry.offer(
                Type::i32(),
                Entry::for_converter(second, Origin::Direct, 5, false)
            ),
            Offer::Shadowed
        );
        assert!(same(&registry.converter(&Type::i32()).unwrap(), &first));
    }

    #[test]
    fn publish_never_replaces() {
        let registry = ConverterRegistry::new();
        let first = fixed(0, 1);
        let second = fixed(100, 2);

        let stored = registry.publish(
            Type::i32(),
            Entry::for_converter(first.clone(), Origin::Specialized, 0, false),
        );
        assert!(same(&stored.converter().unwrap(), &first));
        let stored = registry.publish(
            Type::i32(),
            Entry::for_converter(second, Origin::Specialized, 100, false),
        );
        assert!(same(&stored.converter().unwrap(), &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn declared_skips_fallbacks() {
        let registry = ConverterRegistry::new();
        registry.publish(
            Type::i32(),
            Entry::for_converter(
                fixed(0, 1),
                Origin::Fallback { ancestor: Type::object() },
                0,
                false,
            ),
        );
        assert!(registry.converter(&Type::i32()).is_some());
        assert!(registry.declared(&Type::i32()).is_none());
    }
}
