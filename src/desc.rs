//! Type descriptions: the read-only shape input handed to the generator.
//!
//! Deserializable from JSON so declaration files can drive the CLI; the
//! builder helpers below keep hand-written descriptions short.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDesc {
    Primitive {
        #[serde(rename = "type")]
        primitive: Primitive,
        #[serde(default, skip_serializing_if = "IntEncoding::is_default")]
        encoding: IntEncoding,
    },
    Record(RecordDecl),
    Union(UnionDecl),
    Enum(EnumDecl),
    List {
        element: Box<TypeDesc>,
    },
    Map {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_name: Option<String>,
    },
    Nullable {
        inner: Box<TypeDesc>,
    },
    /// By-name reference answered by a [`TypeLookup`].
    Ref {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntEncoding {
    #[default]
    Default,
    Unsigned,
    Signed,
    Fixed,
    SignedFixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_numbers: Vec<[i32; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Name on the wire schema when it differs from the declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDecl {
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValueDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_numbers: Vec<[i32; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// INTROSPECTION BOUNDARY
// ————————————————————————————————————————————————————————————————————————————

/// Answers by-name references. Declarations returned here must be
/// `Record`, `Union` or `Enum` descriptions.
pub trait TypeLookup {
    fn lookup(&self, name: &str) -> Option<&TypeDesc>;
}

/// In-memory set of named declarations; also the on-disk format
/// (`{"types": [...]}`) the CLI reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CatalogFile", into = "CatalogFile")]
pub struct Catalog {
    decls: IndexMap<String, TypeDesc>,
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: Vec<TypeDesc>,
}

impl From<CatalogFile> for Catalog {
    fn from(file: CatalogFile) -> Self {
        let mut catalog = Catalog::default();
        for ty in file.types {
            catalog.declare(ty);
        }
        catalog
    }
}

impl From<Catalog> for CatalogFile {
    fn from(catalog: Catalog) -> Self {
        CatalogFile { types: catalog.decls.into_values().collect() }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration under its own name. Non-declarations
    /// (primitives, lists, ...) have no name and are ignored.
    pub fn declare(&mut self, ty: TypeDesc) -> &mut Self {
        if let Some(name) = ty.decl_name() {
            self.decls.insert(name.to_string(), ty);
        }
        self
    }

    pub fn with(mut self, ty: TypeDesc) -> Self {
        self.declare(ty);
        self
    }

    /// Fold `other` in. Re-declaring a name is fine only with an identical
    /// declaration; on a conflict nothing is merged.
    pub fn merge(&mut self, other: Catalog) -> Result<(), GenerationError> {
        for (name, ty) in &other.decls {
            if self.decls.get(name).is_some_and(|existing| existing != ty) {
                return Err(GenerationError::NameConflict { name: name.clone() });
            }
        }
        for (name, ty) in other.decls {
            self.decls.entry(name).or_insert(ty);
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decls.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl TypeLookup for Catalog {
    fn lookup(&self, name: &str) -> Option<&TypeDesc> {
        self.decls.get(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl TypeDesc {
    pub fn primitive(primitive: Primitive) -> Self {
        TypeDesc::Primitive { primitive, encoding: IntEncoding::Default }
    }

    pub fn encoded(primitive: Primitive, encoding: IntEncoding) -> Self {
        TypeDesc::Primitive { primitive, encoding }
    }

    pub fn bool() -> Self {
        Self::primitive(Primitive::Bool)
    }

    pub fn int32() -> Self {
        Self::primitive(Primitive::Int32)
    }

    pub fn int64() -> Self {
        Self::primitive(Primitive::Int64)
    }

    pub fn uint32() -> Self {
        Self::primitive(Primitive::Uint32)
    }

    pub fn uint64() -> Self {
        Self::primitive(Primitive::Uint64)
    }

    pub fn float() -> Self {
        Self::primitive(Primitive::Float)
    }

    pub fn double() -> Self {
        Self::primitive(Primitive::Double)
    }

    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    pub fn list(element: TypeDesc) -> Self {
        TypeDesc::List { element: Box::new(element) }
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map { key: Box::new(key), value: Box::new(value), key_name: None, value_name: None }
    }

    pub fn nullable(inner: TypeDesc) -> Self {
        TypeDesc::Nullable { inner: Box::new(inner) }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeDesc::Ref { name: name.into() }
    }

    /// Name of a declaration (`Record`, `Union`, `Enum`), if this is one.
    pub fn decl_name(&self) -> Option<&str> {
        match self {
            TypeDesc::Record(r) => Some(&r.name),
            TypeDesc::Union(u) => Some(&u.name),
            TypeDesc::Enum(e) => Some(&e.name),
            _ => None,
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            TypeDesc::Primitive { .. } => "primitive",
            TypeDesc::Record(_) => "record",
            TypeDesc::Union(_) => "union",
            TypeDesc::Enum(_) => "enum",
            TypeDesc::List { .. } => "list",
            TypeDesc::Map { .. } => "map",
            TypeDesc::Nullable { .. } => "nullable",
            TypeDesc::Ref { .. } => "reference",
        }
    }
}

impl RecordDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new(), reserved_numbers: Vec::new(), reserved_names: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.push(FieldDecl::new(name, ty));
        self
    }

    pub fn push(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn reserve(mut self, start: i32, end: i32) -> Self {
        self.reserved_numbers.push([start, end]);
        self
    }

    pub fn into_desc(self) -> TypeDesc {
        TypeDesc::Record(self)
    }
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self { name: name.into(), ty, number: None, proto_name: None, packed: None }
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn proto_name(mut self, name: impl Into<String>) -> Self {
        self.proto_name = Some(name.into());
        self
    }

    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = Some(packed);
        self
    }
}

impl UnionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), oneof: None, variants: Vec::new() }
    }

    pub fn variant(mut self, ty: TypeDesc) -> Self {
        self.variants.push(VariantDecl { ty, number: None, name: None });
        self
    }

    pub fn numbered_variant(mut self, number: u32, ty: TypeDesc) -> Self {
        self.variants.push(VariantDecl { ty, number: Some(number), name: None });
        self
    }

    pub fn into_desc(self) -> TypeDesc {
        TypeDesc::Union(self)
    }
}

impl EnumDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), values: Vec::new(), reserved_numbers: Vec::new(), reserved_names: Vec::new() }
    }

    pub fn value(mut self, name: impl Into<String>) -> Self {
        self.values.push(EnumValueDecl { name: name.into(), number: None, default: false });
        self
    }

    pub fn numbered(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push(EnumValueDecl { name: name.into(), number: Some(number), default: false });
        self
    }

    pub fn default_value(mut self, name: impl Into<String>) -> Self {
        self.values.push(EnumValueDecl { name: name.into(), number: None, default: true });
        self
    }

    pub fn into_desc(self) -> TypeDesc {
        TypeDesc::Enum(self)
    }
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Uint8 => "uint8",
            Primitive::Uint16 => "uint16",
            Primitive::Uint32 => "uint32",
            Primitive::Uint64 => "uint64",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "string",
        }
    }

    /// Collapses to `bytes` when used as a list element.
    pub fn is_byte_sized(self) -> bool {
        matches!(self, Primitive::Int8 | Primitive::Uint8)
    }
}

impl IntEncoding {
    pub fn is_default(&self) -> bool {
        matches!(self, IntEncoding::Default)
    }

    pub fn name(self) -> &'static str {
        match self {
            IntEncoding::Default => "default",
            IntEncoding::Unsigned => "unsigned",
            IntEncoding::Signed => "signed",
            IntEncoding::Fixed => "fixed",
            IntEncoding::SignedFixed => "signed_fixed",
        }
    }
}
