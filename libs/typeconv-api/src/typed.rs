use std::collections::BTreeMap;

use crate::types::Type;
use crate::value::Value;

/// A Rust type with a runtime descriptor.
///
/// Backs the generic convenience entry points (`to::<T>()` and friends).
pub trait Typed {
    fn type_of() -> Type;
}

/// Extract a Rust value from what a converter produced for [`Typed::type_of`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_int {
    ($($ty:ident),*) => {
        $(
            impl Typed for $ty {
                fn type_of() -> Type {
                    Type::$ty()
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => $ty::try_from(i).ok(),
                        Value::UInt(u) => $ty::try_from(u).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Typed for f32 {
    fn type_of() -> Type {
        Type::f32()
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl Typed for f64 {
    fn type_of() -> Type {
        Type::f64()
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl Typed for bool {
    fn type_of() -> Type {
        Type::bool()
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl Typed for String {
    fn type_of() -> Type {
        Type::string()
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Typed for Value {
    fn type_of() -> Type {
        Type::object()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn type_of() -> Type {
        Type::list(T::type_of())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Seq(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<K: Typed, V: Typed> Typed for BTreeMap<K, V> {
    fn type_of() -> Type {
        Type::mapping(K::type_of(), V::type_of())
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Some((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            _ => None,
        }
    }
}

/// Absent values. Converters for reference-like types (strings, lists,
/// mappings, records) pass `Null` through, which only `Option` can hold.
impl<T: Typed> Typed for Option<T> {
    fn type_of() -> Type {
        T::type_of()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_for_nested_rust_types() {
        assert_eq!(<BTreeMap<String, Vec<i32>>>::type_of().key(), "Mapping<string, List<i32>>");
        assert_eq!(<Value>::type_of(), Type::object());
    }

    #[test]
    fn extraction_checks_range_and_shape() {
        assert_eq!(u8::from_value(Value::Int(200)), Some(200));
        assert_eq!(u8::from_value(Value::Int(300)), None);
        assert_eq!(i32::from_value(Value::Str("1".into())), None);
        assert_eq!(
            Vec::<i64>::from_value(Value::Seq(vec![Value::Int(1), Value::UInt(2)])),
            Some(vec![1, 2])
        );
        assert_eq!(Vec::<i64>::from_value(Value::Seq(vec![Value::Null])), None);
    }

    #[test]
    fn option_holds_null() {
        assert_eq!(<Option<String>>::type_of(), Type::string());
        assert_eq!(String::from_value(Value::Null), None);
        assert_eq!(<Option<String>>::from_value(Value::Null), Some(None));
        assert_eq!(
            <Option<String>>::from_value(Value::Str("a".into())),
            Some(Some("a".to_string()))
        );
        assert_eq!(<Option<String>>::from_value(Value::Int(1)), None);
    }
}
