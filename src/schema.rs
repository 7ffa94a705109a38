//! Finished schema: an arena of named type nodes.
//!
//! Built once by [`crate::generator::SchemaGenerator`], then immutable and
//! shareable across threads. Nodes reference each other through [`TypeRef`]
//! indices, so cyclic graphs need no pointers.
use indexmap::IndexMap;
use serde_json::{json, Value as Json};

use crate::scalar::ScalarKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(pub(crate) usize);

impl TypeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeNode {
    Message(MessageType),
    Enum(EnumType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageType {
    pub name: String,
    pub kind: MessageKind,
    pub fields: Vec<Field>,
    pub reserved: Reserved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Declared record.
    Record,
    /// Declared union: every field belongs to the `oneof` group.
    Union { oneof: String },
    /// Synthetic single-field message; the value passes straight through.
    Wrapper,
    /// Synthetic `key = 1`, `value = 2` message behind a map field.
    MapEntry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<EnumValue>,
    pub reserved: Reserved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub number: u32,
    pub encoding: FieldEncoding,
    pub rule: Rule,
    pub shape: FieldShape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldEncoding {
    Scalar(ScalarKind),
    Message(TypeRef),
    Enum(TypeRef),
}

impl FieldEncoding {
    pub fn is_packable(self) -> bool {
        match self {
            FieldEncoding::Scalar(kind) => kind.is_packable(),
            FieldEncoding::Message(_) => false,
            FieldEncoding::Enum(_) => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Singular,
    Optional,
    Repeated,
}

/// How the field's value maps onto its wire occurrences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Single,
    List { packed: bool },
    Map,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reserved {
    pub ranges: Vec<ReservedRange>,
    pub names: Vec<String>,
}

/// Inclusive range of reserved numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReservedRange {
    pub start: i32,
    pub end: i32,
}

impl ReservedRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, number: i64) -> bool {
        i64::from(self.start) <= number && number <= i64::from(self.end)
    }
}

/// Sort by lower bound, drop empty ranges, merge touching/overlapping ones.
pub fn merge_reserved_ranges(ranges: impl IntoIterator<Item = ReservedRange>) -> Vec<ReservedRange> {
    let mut sorted: Vec<ReservedRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
    sorted.sort();
    let mut out: Vec<ReservedRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match out.last_mut() {
            Some(prev) if i64::from(range.start) <= i64::from(prev.end) + 1 => {
                prev.end = prev.end.max(range.end);
            }
            _ => out.push(range),
        }
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    pub(crate) nodes: Vec<TypeNode>,
    pub(crate) names: IndexMap<String, TypeRef>,
}

impl Schema {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `None` for a ref minted by a different schema.
    pub fn node(&self, ty: TypeRef) -> Option<&TypeNode> {
        self.nodes.get(ty.0)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.names.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.lookup(name).and_then(|ty| self.node(ty))
    }

    /// Nodes in registration order.
    pub fn types(&self) -> impl Iterator<Item = (TypeRef, &TypeNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (TypeRef(i), node))
    }

    pub fn message(&self, ty: TypeRef) -> Option<&MessageType> {
        match self.node(ty)? {
            TypeNode::Message(m) => Some(m),
            TypeNode::Enum(_) => None,
        }
    }

    pub fn enumeration(&self, ty: TypeRef) -> Option<&EnumType> {
        match self.node(ty)? {
            TypeNode::Enum(e) => Some(e),
            TypeNode::Message(_) => None,
        }
    }

    pub fn name_of(&self, ty: TypeRef) -> Option<&str> {
        self.node(ty).map(TypeNode::name)
    }

    /// JSON rendering of every node, in registration order.
    pub fn to_json(&self) -> Json {
        let types = self.nodes.iter().map(|node| self.node_json(node)).collect::<Vec<_>>();
        json!({ "types": types })
    }

    fn node_json(&self, node: &TypeNode) -> Json {
        match node {
            TypeNode::Enum(e) => {
                let mut o = json!({
                    "kind": "enum",
                    "name": e.name,
                    "values": e.values.iter().map(|v| json!({"name": v.name, "number": v.number})).collect::<Vec<_>>(),
                });
                reserved_json(&mut o, &e.reserved);
                o
            }
            TypeNode::Message(m) => {
                let kind = match &m.kind {
                    MessageKind::Record => "record",
                    MessageKind::Union { .. } => "union",
                    MessageKind::Wrapper => "wrapper",
                    MessageKind::MapEntry => "map_entry",
                };
                let fields = m.fields.iter().map(|f| self.field_json(f)).collect::<Vec<_>>();
                let mut o = json!({ "kind": kind, "name": m.name, "fields": fields });
                if let MessageKind::Union { oneof } = &m.kind {
                    o["oneof"] = Json::from(oneof.clone());
                }
                reserved_json(&mut o, &m.reserved);
                o
            }
        }
    }

    fn field_json(&self, field: &Field) -> Json {
        let ty = match field.encoding {
            FieldEncoding::Scalar(kind) => kind.proto_name().to_string(),
            FieldEncoding::Message(r) | FieldEncoding::Enum(r) => self.name_of(r).unwrap_or_default().to_string(),
        };
        let rule = match field.rule {
            Rule::Singular => "singular",
            Rule::Optional => "optional",
            Rule::Repeated => "repeated",
        };
        let mut o = json!({ "name": field.name, "number": field.number, "type": ty, "rule": rule });
        match field.shape {
            FieldShape::Single => {}
            FieldShape::List { packed } => o["packed"] = Json::from(packed),
            FieldShape::Map => o["map"] = Json::from(true),
        }
        o
    }
}

fn reserved_json(o: &mut Json, reserved: &Reserved) {
    if !reserved.ranges.is_empty() {
        o["reserved_numbers"] = Json::Array(
            reserved.ranges.iter().map(|r| json!([r.start, r.end])).collect()
        );
    }
    if !reserved.names.is_empty() {
        o["reserved_names"] = Json::from(reserved.names.clone());
    }
}

impl TypeNode {
    pub fn name(&self) -> &str {
        match self {
            TypeNode::Message(m) => &m.name,
            TypeNode::Enum(e) => &e.name,
        }
    }
}

impl MessageType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.number == number)
    }
}

impl EnumType {
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }

    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values.iter().find(|v| v.number == number).map(|v| v.name.as_str())
    }
}
