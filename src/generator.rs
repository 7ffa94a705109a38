//! Schema generation: walk a type description once per distinct type and
//! register a message or enum node for everything reachable from it.
//!
//! Dispatch by shape:
//! - declared records, unions and enums become named nodes, memoised by name;
//! - primitives become scalar fields;
//! - nullable collections, nested collections and collection-valued oneof
//!   alternatives get synthetic single-field wrapper messages;
//! - maps become `repeated` synthetic entry messages.
//!
//! A failed `generate` call rolls the registry back, so a session never
//! exposes a partial schema.
mod collections;
mod enums;
mod oneof;
mod record;

use heck::{ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::desc::{IntEncoding, Primitive, TypeDesc, TypeLookup};
use crate::error::GenerationError;
use crate::registry::{Reservation, Shape, TypeRegistry};
use crate::scalar::ScalarKind;
use crate::schema::{
    merge_reserved_ranges, Field, FieldEncoding, FieldShape, ReservedRange, Rule, Schema, TypeNode, TypeRef,
};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// ------------------------------- Front API -------------------------------- //

/// Single-use generation session: feed roots, then [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct SchemaGenerator {
    registry: TypeRegistry,
}

impl SchemaGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `root` and everything reachable from it.
    pub fn generate(&mut self, lookup: &dyn TypeLookup, root: &TypeDesc) -> Result<TypeRef, GenerationError> {
        let checkpoint = self.registry.checkpoint();
        let mut pass = Pass { registry: &mut self.registry, lookup };
        let result = pass.root(root);
        if let Err(error) = &result {
            log::debug!("generation failed, rolling back: {error}");
            self.registry.rollback(checkpoint);
        }
        result
    }

    /// Generate the declaration `name` answered by `lookup`.
    pub fn generate_named(&mut self, lookup: &dyn TypeLookup, name: &str) -> Result<TypeRef, GenerationError> {
        let Some(root) = lookup.lookup(name) else {
            return Err(GenerationError::UnknownType { name: name.to_string() });
        };
        self.generate(lookup, root)
    }

    pub fn finish(self) -> Schema {
        self.registry.into_schema()
    }
}

/// One-shot helper: a schema for a single root.
pub fn schema_for(lookup: &dyn TypeLookup, root: &TypeDesc) -> Result<(Schema, TypeRef), GenerationError> {
    let mut generator = SchemaGenerator::new();
    let r = generator.generate(lookup, root)?;
    Ok((generator.finish(), r))
}

// ------------------------------- Dispatch -------------------------------- //

/// State of one `generate` call.
struct Pass<'a> {
    registry: &'a mut TypeRegistry,
    lookup: &'a dyn TypeLookup,
}

/// How a use site maps onto proto3 once nullability is peeled off.
#[derive(Clone, Copy, Debug)]
enum Slot<'d> {
    /// Scalar, enum, message, or a byte list collapsed to `bytes`.
    Single(&'d TypeDesc),
    /// List or map: needs `repeated`.
    Collection(&'d TypeDesc),
}

fn classify(desc: &TypeDesc) -> (bool, Slot<'_>) {
    let mut nullable = false;
    let mut desc = desc;
    while let TypeDesc::Nullable { inner } = desc {
        nullable = true;
        desc = inner;
    }
    let slot = match desc {
        TypeDesc::List { element } if is_byte_element(element) => Slot::Single(desc),
        TypeDesc::List { .. } | TypeDesc::Map { .. } => Slot::Collection(desc),
        _ => Slot::Single(desc),
    };
    (nullable, slot)
}

fn is_byte_element(element: &TypeDesc) -> bool {
    matches!(element, TypeDesc::Primitive { primitive, encoding: IntEncoding::Default } if primitive.is_byte_sized())
}

impl Pass<'_> {
    fn root(&mut self, desc: &TypeDesc) -> Result<TypeRef, GenerationError> {
        match desc {
            TypeDesc::Primitive { .. } | TypeDesc::List { .. } | TypeDesc::Map { .. } | TypeDesc::Nullable { .. } => {
                Err(GenerationError::UnsupportedRoot { shape: desc.shape_name() })
            }
            _ => match self.declared(desc)? {
                FieldEncoding::Message(r) | FieldEncoding::Enum(r) => Ok(r),
                FieldEncoding::Scalar(_) => unreachable!("declarations never map to scalars"),
            },
        }
    }

    /// Reserve `name` (or find its compatible entry) and build it on first sight.
    fn put_or_get<F>(&mut self, name: &str, shape: Shape, create: F) -> Result<TypeRef, GenerationError>
    where
        F: FnOnce(&mut Self) -> Result<TypeNode, GenerationError>,
    {
        match self.registry.reserve(name, shape)? {
            Reservation::Existing(r) => Ok(r),
            Reservation::Fresh(r) => {
                let node = create(self)?;
                self.registry.resolve(r, node);
                Ok(r)
            }
        }
    }

    /// Declared record, union or enum (inline or by reference).
    fn declared(&mut self, desc: &TypeDesc) -> Result<FieldEncoding, GenerationError> {
        match desc {
            TypeDesc::Record(decl) => {
                check_identifier(&decl.name)?;
                let r = self.put_or_get(&decl.name, Shape::Declared(desc.clone()), |p| p.build_record(decl))?;
                Ok(FieldEncoding::Message(r))
            }
            TypeDesc::Union(decl) => {
                check_identifier(&decl.name)?;
                let r = self.put_or_get(&decl.name, Shape::Declared(desc.clone()), |p| p.build_union(decl))?;
                Ok(FieldEncoding::Message(r))
            }
            TypeDesc::Enum(decl) => {
                check_identifier(&decl.name)?;
                let r = self.put_or_get(&decl.name, Shape::Declared(desc.clone()), |_| enums::build_enum(decl))?;
                Ok(FieldEncoding::Enum(r))
            }
            TypeDesc::Ref { name } => {
                if let Some(target) = self.lookup.lookup(name) {
                    if target.decl_name() == Some(name.as_str()) {
                        return self.declared(target);
                    }
                }
                // Inline declarations already seen in this session answer too,
                // which lets an inline record refer to itself by name.
                match self.registry.declared(name) {
                    Some((r, TypeDesc::Enum(_))) => Ok(FieldEncoding::Enum(r)),
                    Some((r, _)) => Ok(FieldEncoding::Message(r)),
                    None => Err(GenerationError::UnknownType { name: name.clone() }),
                }
            }
            other => unreachable!("{} is not a declaration", other.shape_name()),
        }
    }

    /// Encoding of a non-nullable single slot.
    fn single(&mut self, desc: &TypeDesc) -> Result<FieldEncoding, GenerationError> {
        match desc {
            TypeDesc::Primitive { primitive, encoding } => Ok(FieldEncoding::Scalar(scalar_for(*primitive, *encoding)?)),
            TypeDesc::List { .. } => Ok(FieldEncoding::Scalar(ScalarKind::Bytes)),
            _ => self.declared(desc),
        }
    }

    /// A field as it appears in a record or map entry.
    fn member(
        &mut self,
        scope: &str,
        name: &str,
        number: u32,
        desc: &TypeDesc,
        packed: Option<bool>,
    ) -> Result<Field, GenerationError> {
        let field = match classify(desc) {
            (false, Slot::Single(d)) => {
                let encoding = self.single(d)?;
                plain_field(name, number, encoding, Rule::Singular)
            }
            (true, Slot::Single(d)) => {
                let encoding = self.single(d)?;
                plain_field(name, number, encoding, Rule::Optional)
            }
            (false, Slot::Collection(d)) => return self.collection_field(scope, name, number, d, packed),
            (true, Slot::Collection(d)) => {
                let wrapper = self.nullable_wrapper(d)?;
                plain_field(name, number, FieldEncoding::Message(wrapper), Rule::Optional)
            }
        };
        if packed.is_some() {
            return Err(GenerationError::NotPackable { scope: scope.to_string(), field: name.to_string() });
        }
        Ok(field)
    }
}

fn plain_field(name: &str, number: u32, encoding: FieldEncoding, rule: Rule) -> Field {
    Field { name: name.to_string(), number, encoding, rule, shape: FieldShape::Single }
}

// ------------------------------- Scalars --------------------------------- //

/// Map a primitive and its integer-encoding override onto a scalar kind.
pub fn scalar_for(primitive: Primitive, encoding: IntEncoding) -> Result<ScalarKind, GenerationError> {
    use IntEncoding as E;
    use Primitive as P;
    let kind = match (primitive, encoding) {
        (P::Bool, E::Default) => ScalarKind::Bool,
        (P::Float, E::Default) => ScalarKind::Float,
        (P::Double, E::Default) => ScalarKind::Double,
        (P::String, E::Default) => ScalarKind::String,
        (P::Int8 | P::Int16 | P::Int32, E::Default) => ScalarKind::Int32,
        (P::Int8 | P::Int16 | P::Int32, E::Signed) => ScalarKind::SInt32,
        (P::Int8 | P::Int16 | P::Int32, E::Fixed | E::SignedFixed) => ScalarKind::SFixed32,
        (P::Int64, E::Default) => ScalarKind::Int64,
        (P::Int64, E::Signed) => ScalarKind::SInt64,
        (P::Int64, E::Fixed | E::SignedFixed) => ScalarKind::SFixed64,
        (P::Uint8 | P::Uint16 | P::Uint32, E::Default | E::Unsigned) => ScalarKind::UInt32,
        (P::Uint8 | P::Uint16 | P::Uint32, E::Fixed) => ScalarKind::Fixed32,
        (P::Uint64, E::Default | E::Unsigned) => ScalarKind::UInt64,
        (P::Uint64, E::Fixed) => ScalarKind::Fixed64,
        (primitive, encoding) => {
            return Err(GenerationError::InvalidIntEncoding { primitive: primitive.name(), encoding: encoding.name() });
        }
    };
    Ok(kind)
}

// -------------------------------- Naming --------------------------------- //

pub(crate) fn check_identifier(name: &str) -> Result<(), GenerationError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(GenerationError::InvalidIdentifier { name: name.to_string() })
    }
}

/// Human-readable type label used to name synthetic messages and variants.
fn label(desc: &TypeDesc) -> String {
    match desc {
        TypeDesc::Primitive { primitive, encoding } => {
            let suffix = if encoding.is_default() { String::new() } else { encoding.name().to_upper_camel_case() };
            format!("{}{suffix}", primitive.name().to_upper_camel_case())
        }
        TypeDesc::Record(r) => r.name.clone(),
        TypeDesc::Union(u) => u.name.clone(),
        TypeDesc::Enum(e) => e.name.clone(),
        TypeDesc::Ref { name } => name.clone(),
        TypeDesc::List { element } => format!("ListOf{}", label(element)),
        TypeDesc::Map { key, value, key_name, value_name } => format!(
            "MapOf{}To{}{}",
            label(key),
            label(value),
            member_suffix(key_name.as_deref(), value_name.as_deref()),
        ),
        TypeDesc::Nullable { inner } => format!("Nullable{}", label(inner)),
    }
}

/// `WordCount` for a map whose members are renamed to `word`/`count`,
/// empty for the default `key`/`value`.
fn member_suffix(key_name: Option<&str>, value_name: Option<&str>) -> String {
    let key_name = key_name.unwrap_or("key");
    let value_name = value_name.unwrap_or("value");
    if (key_name, value_name) == ("key", "value") {
        return String::new();
    }
    format!("{}{}", key_name.to_upper_camel_case(), value_name.to_upper_camel_case())
}

/// Canonical key of a shape: equal keys mean interchangeable synthetic types.
fn shape_key(desc: &TypeDesc) -> String {
    match desc {
        TypeDesc::Primitive { primitive, encoding } => format!("{}/{}", primitive.name(), encoding.name()),
        TypeDesc::Record(r) => r.name.clone(),
        TypeDesc::Union(u) => u.name.clone(),
        TypeDesc::Enum(e) => e.name.clone(),
        TypeDesc::Ref { name } => name.clone(),
        TypeDesc::List { element } => format!("list<{}>", shape_key(element)),
        TypeDesc::Map { key, value, key_name, value_name } => format!(
            "map<{},{}>[{},{}]",
            shape_key(key),
            shape_key(value),
            key_name.as_deref().unwrap_or("key"),
            value_name.as_deref().unwrap_or("value"),
        ),
        TypeDesc::Nullable { inner } => format!("nullable<{}>", shape_key(inner)),
    }
}

fn variant_field_name(desc: &TypeDesc) -> String {
    label(desc).to_snake_case()
}

fn reserved_ranges(raw: &[[i32; 2]]) -> Vec<ReservedRange> {
    merge_reserved_ranges(raw.iter().map(|[start, end]| ReservedRange::new(*start, *end)))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{Catalog, EnumDecl, FieldDecl, RecordDecl, UnionDecl};
    use crate::schema::{MessageKind, TypeNode};

    fn message<'s>(schema: &'s Schema, name: &str) -> &'s crate::schema::MessageType {
        match schema.get(name) {
            Some(TypeNode::Message(m)) => m,
            other => panic!("{name} is not a message: {other:?}"),
        }
    }

    #[test]
    fn scalar_mapping_honours_overrides() {
        assert_eq!(scalar_for(Primitive::Int32, IntEncoding::Default).unwrap(), ScalarKind::Int32);
        assert_eq!(scalar_for(Primitive::Int16, IntEncoding::Signed).unwrap(), ScalarKind::SInt32);
        assert_eq!(scalar_for(Primitive::Int64, IntEncoding::Fixed).unwrap(), ScalarKind::SFixed64);
        assert_eq!(scalar_for(Primitive::Uint32, IntEncoding::Fixed).unwrap(), ScalarKind::Fixed32);
        assert_eq!(scalar_for(Primitive::Uint64, IntEncoding::Unsigned).unwrap(), ScalarKind::UInt64);
        assert!(scalar_for(Primitive::Uint32, IntEncoding::Signed).is_err());
        assert!(scalar_for(Primitive::String, IntEncoding::Fixed).is_err());
    }

    #[test]
    fn primitive_and_collection_roots_are_rejected() {
        let mut generator = SchemaGenerator::new();
        let catalog = Catalog::new();
        for root in [TypeDesc::int32(), TypeDesc::list(TypeDesc::int32()), TypeDesc::map(TypeDesc::string(), TypeDesc::int32())] {
            assert!(matches!(generator.generate(&catalog, &root), Err(GenerationError::UnsupportedRoot { .. })));
        }
    }

    #[test]
    fn generation_is_idempotent() {
        let root = RecordDecl::new("Point").field("x", TypeDesc::int32()).field("y", TypeDesc::int32()).into_desc();
        let mut generator = SchemaGenerator::new();
        let a = generator.generate(&Catalog::new(), &root).unwrap();
        let b = generator.generate(&Catalog::new(), &root).unwrap();
        assert_eq!(a, b);
        assert_eq!(generator.finish().len(), 1);
    }

    #[test]
    fn self_reference_resolves_through_the_placeholder() {
        let root = RecordDecl::new("Node")
            .field("value", TypeDesc::int32())
            .field("next", TypeDesc::nullable(TypeDesc::reference("Node")))
            .into_desc();
        let (schema, r) = schema_for(&Catalog::new(), &root).unwrap();
        assert_eq!(schema.len(), 1);
        let node = message(&schema, "Node");
        assert_eq!(node.fields[1].encoding, FieldEncoding::Message(r));
        assert_eq!(node.fields[1].rule, Rule::Optional);
    }

    #[test]
    fn mutual_references_terminate() {
        let catalog = Catalog::new()
            .with(RecordDecl::new("A").field("b", TypeDesc::nullable(TypeDesc::reference("B"))).into_desc())
            .with(RecordDecl::new("B").field("a", TypeDesc::nullable(TypeDesc::reference("A"))).into_desc());
        let mut generator = SchemaGenerator::new();
        let a = generator.generate_named(&catalog, "A").unwrap();
        let b = generator.generate_named(&catalog, "B").unwrap();
        let schema = generator.finish();
        assert_eq!(schema.len(), 2);
        assert_eq!(message(&schema, "A").fields[0].encoding, FieldEncoding::Message(b));
        assert_eq!(message(&schema, "B").fields[0].encoding, FieldEncoding::Message(a));
    }

    #[test]
    fn conflicting_declarations_fail_and_roll_back() {
        let first = RecordDecl::new("Thing").field("a", TypeDesc::int32()).into_desc();
        let second = RecordDecl::new("Holder")
            .field("extra", TypeDesc::reference("Extra"))
            .field("thing", RecordDecl::new("Thing").field("a", TypeDesc::string()).into_desc())
            .into_desc();
        let catalog = Catalog::new().with(EnumDecl::new("Extra").default_value("NONE").into_desc());
        let mut generator = SchemaGenerator::new();
        generator.generate(&catalog, &first).unwrap();
        let err = generator.generate(&catalog, &second).unwrap_err();
        assert_eq!(err, GenerationError::NameConflict { name: "Thing".into() });
        let schema = generator.finish();
        assert_eq!(schema.len(), 1);
        assert!(schema.get("Extra").is_none());
    }

    #[test]
    fn unknown_references_fail() {
        let root = RecordDecl::new("R").field("x", TypeDesc::reference("Missing")).into_desc();
        assert_eq!(
            schema_for(&Catalog::new(), &root).unwrap_err(),
            GenerationError::UnknownType { name: "Missing".into() }
        );
    }

    #[test]
    fn invalid_identifiers_fail() {
        let root = RecordDecl::new("Bad Name").into_desc();
        assert!(matches!(schema_for(&Catalog::new(), &root), Err(GenerationError::InvalidIdentifier { .. })));
    }

    #[test]
    fn union_variants_are_named_after_their_types() {
        let catalog = Catalog::new().with(RecordDecl::new("Circle").field("r", TypeDesc::double()).into_desc());
        let root = UnionDecl::new("Shape")
            .variant(TypeDesc::reference("Circle"))
            .numbered_variant(5, TypeDesc::string())
            .variant(TypeDesc::list(TypeDesc::int32()))
            .into_desc();
        let (schema, _) = schema_for(&catalog, &root).unwrap();
        let shape = message(&schema, "Shape");
        assert_eq!(shape.kind, MessageKind::Union { oneof: "value".into() });
        let names = shape.fields.iter().map(|f| (f.name.as_str(), f.number)).collect::<Vec<_>>();
        assert_eq!(names, vec![("circle", 1), ("string", 5), ("list_of_int32", 2)]);
        let wrapper = message(&schema, "ListOfInt32Variant");
        assert_eq!(wrapper.kind, MessageKind::Wrapper);
        assert_eq!(wrapper.fields[0].shape, FieldShape::List { packed: true });
    }

    #[test]
    fn packed_override_must_target_a_packable_list() {
        let root = RecordDecl::new("R")
            .push(FieldDecl::new("names", TypeDesc::list(TypeDesc::string())).packed(true))
            .into_desc();
        assert!(matches!(schema_for(&Catalog::new(), &root), Err(GenerationError::NotPackable { .. })));

        let root = RecordDecl::new("R")
            .push(FieldDecl::new("n", TypeDesc::int32()).packed(false))
            .into_desc();
        assert!(matches!(schema_for(&Catalog::new(), &root), Err(GenerationError::NotPackable { .. })));
    }
}
