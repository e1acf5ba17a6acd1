use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Broad category of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// The universal top type. Every value is an instance of it.
    Object,
    /// Scalar built-ins (`string`, `i32`, ...). Cannot be derived from.
    Primitive,
    Class,
    Interface,
    /// An unbound generic parameter such as `K` in `Mapping<K, V>`.
    Parameter,
}

/// A named field declared on a class type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
enum Generic {
    None,
    Definition { arity: usize },
    Instance { definition: Type, args: Vec<Type> },
}

/// Base chain and flattened interface set of a type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ancestry {
    /// Base classes, nearest first. Never contains the top type.
    pub bases: Vec<Type>,
    /// All implemented interfaces in declaration order, deduplicated.
    pub interfaces: Vec<Type>,
}

struct TypeInfo {
    key: String,
    name: String,
    kind: TypeKind,
    base: Option<Type>,
    interfaces: Vec<Type>,
    fields: Vec<FieldDecl>,
    generic: Generic,
    ancestry: OnceCell<Ancestry>,
}

/// Runtime type descriptor.
///
/// Cheap to clone. Identity is the full key (`"Dog"`, `"Mapping<,>"`,
/// `"Mapping<string, i32>"`): two descriptors with the same key are the
/// same type.
#[derive(Clone)]
pub struct Type(Arc<TypeInfo>);

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.key == other.0.key
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0.key)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.key)
    }
}

/// Error building, instantiating or parsing a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// `instantiate` called on something that is not a generic definition.
    NotGenericDefinition(String),
    /// Wrong number of type arguments.
    Arity { ty: String, expected: usize, found: usize },
    /// Illegal inheritance (deriving from a primitive, implementing a class, ...).
    Inheritance(String),
    /// `Type::parse` failure.
    Parse(String),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::NotGenericDefinition(ty) => write!(f, "'{ty}' is not a generic definition"),
            TypeError::Arity { ty, expected, found } => {
                write!(f, "'{ty}' expects {expected} type argument(s), got {found}")
            }
            TypeError::Inheritance(msg) => write!(f, "invalid inheritance: {msg}"),
            TypeError::Parse(msg) => write!(f, "invalid type expression: {msg}"),
        }
    }
}

impl std::error::Error for TypeError {}

macro_rules! well_known {
    ($($fn_name:ident => $key:literal),* $(,)?) => {
        $(
            #[doc = concat!("The built-in `", $key, "` type.")]
            pub fn $fn_name() -> Type {
                static TYPE: Lazy<Type> = Lazy::new(|| Type::primitive($key));
                TYPE.clone()
            }
        )*

        /// Look up a well-known primitive by key.
        fn primitive_by_key(key: &str) -> Option<Type> {
            match key {
                $($key => Some(Type::$fn_name()),)*
                _ => None,
            }
        }
    };
}

impl Type {
    fn from_info(info: TypeInfo) -> Self {
        Type(Arc::new(info))
    }

    fn primitive(key: &str) -> Self {
        Self::from_info(TypeInfo {
            key: key.to_owned(),
            name: key.to_owned(),
            kind: TypeKind::Primitive,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            generic: Generic::None,
            ancestry: OnceCell::new(),
        })
    }

    /// The universal top type.
    pub fn object() -> Type {
        static TYPE: Lazy<Type> = Lazy::new(|| {
            Type::from_info(TypeInfo {
                key: "object".to_owned(),
                name: "object".to_owned(),
                kind: TypeKind::Object,
                base: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                generic: Generic::None,
                ancestry: OnceCell::new(),
            })
        });
        TYPE.clone()
    }

    well_known! {
        string => "string",
        bool => "bool",
        i8 => "i8",
        i16 => "i16",
        i32 => "i32",
        i64 => "i64",
        u8 => "u8",
        u16 => "u16",
        u32 => "u32",
        u64 => "u64",
        f32 => "f32",
        f64 => "f64",
        bytes => "bytes",
    }

    /// The open `List<>` definition.
    pub fn list_definition() -> Type {
        static TYPE: Lazy<Type> = Lazy::new(|| TypeBuilder::class("List").definition(1));
        TYPE.clone()
    }

    /// The open `Mapping<,>` definition.
    pub fn mapping_definition() -> Type {
        static TYPE: Lazy<Type> = Lazy::new(|| TypeBuilder::class("Mapping").definition(2));
        TYPE.clone()
    }

    /// `List<elem>`.
    pub fn list(elem: Type) -> Type {
        Self::list_definition().apply(vec![elem])
    }

    /// `Mapping<key, value>`.
    pub fn mapping(key: Type, value: Type) -> Type {
        Self::mapping_definition().apply(vec![key, value])
    }

    /// An unbound generic parameter.
    pub fn parameter(name: &str) -> Type {
        Self::from_info(TypeInfo {
            key: name.to_owned(),
            name: name.to_owned(),
            kind: TypeKind::Parameter,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            generic: Generic::None,
            ancestry: OnceCell::new(),
        })
    }

    /// Full identity key.
    pub fn key(&self) -> &str {
        &self.0.key
    }

    /// Bare name without generic arguments.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn is_object(&self) -> bool {
        self.0.kind == TypeKind::Object
    }

    pub fn is_primitive(&self) -> bool {
        self.0.kind == TypeKind::Primitive
    }

    pub fn is_interface(&self) -> bool {
        self.0.kind == TypeKind::Interface
    }

    pub fn is_parameter(&self) -> bool {
        self.0.kind == TypeKind::Parameter
    }

    /// Direct base class, if one was declared.
    pub fn base(&self) -> Option<&Type> {
        self.0.base.as_ref()
    }

    /// Directly declared interfaces (super-interfaces for an interface).
    pub fn interfaces(&self) -> &[Type] {
        &self.0.interfaces
    }

    /// Fields declared on this type only.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.0.fields
    }

    /// Fields including inherited ones, farthest ancestor first.
    /// A redeclared field keeps its inherited position and takes the new type.
    pub fn all_fields(&self) -> Vec<FieldDecl> {
        let ancestry = self.ancestry();
        let mut out: Vec<FieldDecl> = Vec::new();
        for owner in ancestry.bases.iter().rev().chain(std::iter::once(self)) {
            for field in owner.fields() {
                match out.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => existing.ty = field.ty.clone(),
                    None => out.push(field.clone()),
                }
            }
        }
        out
    }

    pub fn is_generic_definition(&self) -> bool {
        matches!(self.0.generic, Generic::Definition { .. })
    }

    pub fn is_generic_instance(&self) -> bool {
        matches!(self.0.generic, Generic::Instance { .. })
    }

    /// Generic instance with no unbound parameters anywhere in its arguments.
    pub fn is_closed_generic(&self) -> bool {
        self.is_generic_instance() && !self.contains_generic_parameters()
    }

    /// True for definitions, parameters and instances with unbound arguments.
    pub fn contains_generic_parameters(&self) -> bool {
        match &self.0.generic {
            Generic::None => self.is_parameter(),
            Generic::Definition { .. } => true,
            Generic::Instance { args, .. } => args.iter().any(Type::contains_generic_parameters),
        }
    }

    /// Definition this instance was built from.
    pub fn generic_definition(&self) -> Option<&Type> {
        match &self.0.generic {
            Generic::Instance { definition, .. } => Some(definition),
            _ => None,
        }
    }

    pub fn generic_args(&self) -> &[Type] {
        match &self.0.generic {
            Generic::Instance { args, .. } => args,
            _ => &[],
        }
    }

    /// Number of generic parameters (definition) or arguments (instance).
    pub fn arity(&self) -> usize {
        match &self.0.generic {
            Generic::None => 0,
            Generic::Definition { arity } => *arity,
            Generic::Instance { args, .. } => args.len(),
        }
    }

    /// Bind the type arguments of a generic definition.
    ///
    /// Arguments may themselves be parameters, producing an open instance.
    pub fn instantiate(&self, args: &[Type]) -> Result<Type, TypeError> {
        let Generic::Definition { arity } = self.0.generic else {
            return Err(TypeError::NotGenericDefinition(self.0.key.clone()));
        };
        if args.len() != arity {
            return Err(TypeError::Arity {
                ty: self.0.key.clone(),
                expected: arity,
                found: args.len(),
            });
        }
        Ok(self.apply(args.to_vec()))
    }

    fn apply(&self, args: Vec<Type>) -> Type {
        let rendered: Vec<&str> = args.iter().map(Type::key).collect();
        Type::from_info(TypeInfo {
            key: format!("{}<{}>", self.0.name, rendered.join(", ")),
            name: self.0.name.clone(),
            kind: self.0.kind,
            base: self.0.base.clone(),
            interfaces: self.0.interfaces.clone(),
            fields: self.0.fields.clone(),
            generic: Generic::Instance { definition: self.clone(), args },
            ancestry: OnceCell::new(),
        })
    }

    /// Base chain and flattened interfaces, computed once per descriptor.
    pub fn ancestry(&self) -> &Ancestry {
        self.0.ancestry.get_or_init(|| compute_ancestry(self))
    }

    /// Reflexive is-a check. Every type is a subtype of the top type.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self == other || other.is_object() {
            return true;
        }
        let ancestry = self.ancestry();
        if other.is_interface() {
            ancestry.interfaces.contains(other)
        } else {
            ancestry.bases.contains(other)
        }
    }

    /// Parse a type expression made of well-known names.
    ///
    /// Accepts primitives, `object`, and nested `List<T>` / `Mapping<K, V>`.
    pub fn parse(text: &str) -> Result<Type, TypeError> {
        let mut parser = TypeParser { src: text.as_bytes(), pos: 0, depth: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != parser.src.len() {
            return Err(TypeError::Parse(format!(
                "unexpected trailing input at offset {} in '{text}'",
                parser.pos
            )));
        }
        Ok(ty)
    }
}

fn compute_ancestry(ty: &Type) -> Ancestry {
    let mut bases = Vec::new();
    let mut next = ty.base().cloned();
    while let Some(base) = next {
        if base.is_object() {
            break;
        }
        next = base.base().cloned();
        bases.push(base);
    }

    let mut interfaces = Vec::new();
    let mut seen = HashSet::new();
    for owner in std::iter::once(ty).chain(bases.iter()) {
        for iface in owner.interfaces() {
            push_interface(iface, &mut interfaces, &mut seen);
        }
    }

    Ancestry { bases, interfaces }
}

fn push_interface(iface: &Type, out: &mut Vec<Type>, seen: &mut HashSet<Type>) {
    if !seen.insert(iface.clone()) {
        return;
    }
    out.push(iface.clone());
    for parent in iface.interfaces() {
        push_interface(parent, out, seen);
    }
}

// ---------------------------------------------------------------------------
// TypeBuilder
// ---------------------------------------------------------------------------

/// Declares a class or interface descriptor.
///
/// ```
/// use typeconv_api::{Type, TypeBuilder};
///
/// let animal = TypeBuilder::class("Animal").field("name", Type::string()).build().unwrap();
/// let dog = TypeBuilder::class("Dog").base(&animal).build().unwrap();
/// assert!(dog.is_subtype_of(&animal));
/// ```
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    base: Option<Type>,
    interfaces: Vec<Type>,
    fields: Vec<FieldDecl>,
}

impl TypeBuilder {
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Interface)
    }

    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn base(mut self, base: &Type) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Implemented interface (for an interface: a super-interface).
    pub fn implements(mut self, iface: &Type) -> Self {
        self.interfaces.push(iface.clone());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDecl { name: name.into(), ty });
        self
    }

    /// Build a non-generic descriptor.
    pub fn build(self) -> Result<Type, TypeError> {
        self.validate()?;
        Ok(Type::from_info(TypeInfo {
            key: self.name.clone(),
            name: self.name,
            kind: self.kind,
            base: self.base,
            interfaces: self.interfaces,
            fields: self.fields,
            generic: Generic::None,
            ancestry: OnceCell::new(),
        }))
    }

    /// Build a generic definition with `arity` parameters, keyed `Name<,>`.
    pub fn generic(self, arity: usize) -> Result<Type, TypeError> {
        if arity == 0 {
            return Err(TypeError::Arity { ty: self.name, expected: 1, found: 0 });
        }
        self.validate()?;
        Ok(self.definition(arity))
    }

    fn definition(self, arity: usize) -> Type {
        Type::from_info(TypeInfo {
            key: format!("{}<{}>", self.name, ",".repeat(arity - 1)),
            name: self.name,
            kind: self.kind,
            base: self.base,
            interfaces: self.interfaces,
            fields: self.fields,
            generic: Generic::Definition { arity },
            ancestry: OnceCell::new(),
        })
    }

    fn validate(&self) -> Result<(), TypeError> {
        if let Some(base) = &self.base {
            if self.kind == TypeKind::Interface {
                return Err(TypeError::Inheritance(format!(
                    "interface '{}' cannot have base class '{base}'",
                    self.name
                )));
            }
            if base.kind() != TypeKind::Class && !base.is_object() {
                return Err(TypeError::Inheritance(format!(
                    "'{}' cannot derive from {:?} '{base}'",
                    self.name,
                    base.kind()
                )));
            }
        }
        if let Some(iface) = self.interfaces.iter().find(|t| !t.is_interface()) {
            return Err(TypeError::Inheritance(format!(
                "'{}' cannot implement non-interface '{iface}'",
                self.name
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Type expression parser
// ---------------------------------------------------------------------------

/// Deepest generic nesting a type expression may use.
pub const MAX_TYPE_NESTING: usize = 32;

struct TypeParser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl TypeParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Result<String, TypeError> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_alphanumeric() || self.src[self.pos] == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(TypeError::Parse(format!("expected a type name at offset {start}")));
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.src.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<Type, TypeError> {
        let name = self.ident()?;
        let mut args = Vec::new();
        if self.eat(b'<') {
            if self.depth == MAX_TYPE_NESTING {
                return Err(TypeError::Parse(format!(
                    "generic arguments nested deeper than {MAX_TYPE_NESTING} at offset {}",
                    self.pos
                )));
            }
            self.depth += 1;
            loop {
                args.push(self.parse_type()?);
                if self.eat(b'>') {
                    break;
                }
                if !self.eat(b',') {
                    return Err(TypeError::Parse(format!(
                        "expected ',' or '>' at offset {}",
                        self.pos
                    )));
                }
            }
            self.depth -= 1;
        }

        let definition = match name.as_str() {
            "object" => Some(Type::object()),
            "List" => Some(Type::list_definition()),
            "Mapping" => Some(Type::mapping_definition()),
            other => Type::primitive_by_key(other),
        };
        let Some(ty) = definition else {
            return Err(TypeError::Parse(format!("unknown type '{name}'")));
        };

        if ty.is_generic_definition() {
            ty.instantiate(&args)
        } else if args.is_empty() {
            Ok(ty)
        } else {
            Err(TypeError::NotGenericDefinition(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str) -> Type {
        TypeBuilder::interface(name).build().unwrap()
    }

    #[test]
    fn ancestry_lists_bases_nearest_first_then_interfaces() {
        let named = iface("INamed");
        let pet = TypeBuilder::interface("IPet").implements(&named).build().unwrap();
        let animal = TypeBuilder::class("Animal").implements(&named).build().unwrap();
        let dog = TypeBuilder::class("Dog").base(&animal).implements(&pet).build().unwrap();
        let puppy = TypeBuilder::class("Puppy").base(&dog).build().unwrap();

        let ancestry = puppy.ancestry();
        assert_eq!(ancestry.bases, vec![dog.clone(), animal.clone()]);
        // Dog's IPet (and its INamed) come before Animal's duplicate INamed.
        assert_eq!(ancestry.interfaces, vec![pet.clone(), named.clone()]);
    }

    #[test]
    fn subtype_checks() {
        let named = iface("INamed");
        let animal = TypeBuilder::class("Animal").implements(&named).build().unwrap();
        let dog = TypeBuilder::class("Dog").base(&animal).build().unwrap();

        assert!(dog.is_subtype_of(&dog));
        assert!(dog.is_subtype_of(&animal));
        assert!(dog.is_subtype_of(&named));
        assert!(dog.is_subtype_of(&Type::object()));
        assert!(Type::i32().is_subtype_of(&Type::object()));
        assert!(!animal.is_subtype_of(&dog));
        assert!(!Type::i32().is_subtype_of(&Type::i64()));
    }

    #[test]
    fn generic_keys_and_shapes() {
        let def = Type::mapping_definition();
        assert_eq!(def.key(), "Mapping<,>");
        assert!(def.is_generic_definition());
        assert_eq!(def.arity(), 2);

        let closed = Type::mapping(Type::string(), Type::i32());
        assert_eq!(closed.key(), "Mapping<string, i32>");
        assert!(closed.is_closed_generic());
        assert_eq!(closed.generic_definition(), Some(&def));

        let open = def.instantiate(&[Type::parameter("K"), Type::parameter("V")]).unwrap();
        assert!(open.is_generic_instance());
        assert!(!open.is_closed_generic());
        assert!(open.contains_generic_parameters());

        assert_eq!(Type::list_definition().key(), "List<>");
    }

    #[test]
    fn instantiate_rejects_wrong_arity_and_non_definitions() {
        let err = Type::mapping_definition().instantiate(&[Type::string()]).unwrap_err();
        assert_eq!(err, TypeError::Arity { ty: "Mapping<,>".into(), expected: 2, found: 1 });

        assert!(matches!(
            Type::string().instantiate(&[]),
            Err(TypeError::NotGenericDefinition(_))
        ));
    }

    #[test]
    fn builder_rejects_bad_inheritance() {
        let named = iface("INamed");
        assert!(TypeBuilder::class("X").base(&Type::i32()).build().is_err());
        assert!(TypeBuilder::class("X").base(&named).build().is_err());
        assert!(TypeBuilder::interface("I").base(&Type::object()).build().is_err());
        let class = TypeBuilder::class("C").build().unwrap();
        assert!(TypeBuilder::class("X").implements(&class).build().is_err());
    }

    #[test]
    fn all_fields_puts_inherited_first() {
        let animal = TypeBuilder::class("Animal")
            .field("name", Type::string())
            .field("age", Type::i32())
            .build()
            .unwrap();
        let dog = TypeBuilder::class("Dog")
            .base(&animal)
            .field("breed", Type::string())
            .field("age", Type::u8())
            .build()
            .unwrap();

        let fields: Vec<(String, String)> = dog
            .all_fields()
            .into_iter()
            .map(|f| (f.name, f.ty.key().to_owned()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("name".to_owned(), "string".to_owned()),
                ("age".to_owned(), "u8".to_owned()),
                ("breed".to_owned(), "string".to_owned()),
            ]
        );
    }

    #[test]
    fn parse_type_expressions() {
        assert_eq!(Type::parse("i32").unwrap(), Type::i32());
        assert_eq!(
            Type::parse(" Mapping< string ,List<f64>> ").unwrap().key(),
            "Mapping<string, List<f64>>"
        );
        assert!(Type::parse("Dog").is_err());
        assert!(Type::parse("List<i32, i32>").is_err());
        assert!(Type::parse("i32<string>").is_err());
        assert!(Type::parse("List<i32> junk").is_err());
    }

    #[test]
    fn parse_caps_generic_nesting() {
        let nested = |depth: usize| format!("{}i32{}", "List<".repeat(depth), ">".repeat(depth));
        assert!(Type::parse(&nested(MAX_TYPE_NESTING)).is_ok());
        assert!(matches!(
            Type::parse(&nested(MAX_TYPE_NESTING + 1)),
            Err(TypeError::Parse(msg)) if msg.contains("nested deeper")
        ));
        assert!(matches!(Type::parse(&nested(100_000)), Err(TypeError::Parse(_))));
    }
}
