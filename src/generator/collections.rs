//! Lists, maps and the synthetic messages that carry them where proto3 has
//! no direct spelling: nullable collections, nested collections, and
//! collection-valued `oneof` alternatives.

use super::{check_identifier, classify, label, member_suffix, shape_key, Pass, Slot};
use crate::desc::TypeDesc;
use crate::error::GenerationError;
use crate::registry::Shape;
use crate::schema::{Field, FieldEncoding, FieldShape, MessageKind, MessageType, Reserved, Rule, TypeNode, TypeRef};

const ITEM_FIELD: &str = "item";
const VARIANT_FIELD: &str = "value";

impl Pass<'_> {
    /// Field for a non-nullable list or map.
    pub(super) fn collection_field(
        &mut self,
        scope: &str,
        name: &str,
        number: u32,
        desc: &TypeDesc,
        packed: Option<bool>,
    ) -> Result<Field, GenerationError> {
        let not_packable = || GenerationError::NotPackable { scope: scope.to_string(), field: name.to_string() };
        let (encoding, shape) = match desc {
            TypeDesc::List { element } => match classify(element) {
                (false, Slot::Single(d)) => {
                    let encoding = self.single(d)?;
                    let packed = match packed {
                        None => encoding.is_packable(),
                        Some(true) if !encoding.is_packable() => return Err(not_packable()),
                        Some(p) => p,
                    };
                    (encoding, FieldShape::List { packed })
                }
                _ => {
                    if packed == Some(true) {
                        return Err(not_packable());
                    }
                    let item = self.item_wrapper(element)?;
                    (FieldEncoding::Message(item), FieldShape::List { packed: false })
                }
            },
            TypeDesc::Map { .. } => {
                if packed.is_some() {
                    return Err(not_packable());
                }
                (FieldEncoding::Message(self.map_entry(desc)?), FieldShape::Map)
            }
            other => unreachable!("{} is not a collection", other.shape_name()),
        };
        Ok(Field { name: name.to_string(), number, encoding, rule: Rule::Repeated, shape })
    }

    /// `NullableListOfX { list = 1 }` / `NullableMapOfKToV { map = 1 }`.
    pub(super) fn nullable_wrapper(&mut self, desc: &TypeDesc) -> Result<TypeRef, GenerationError> {
        let name = format!("Nullable{}", label(desc));
        let field = match desc {
            TypeDesc::Map { .. } => "map",
            _ => "list",
        };
        let shape = Shape::Synthetic(format!("nullable<{}>", shape_key(desc)));
        self.wrapper(&name, shape, field, desc)
    }

    /// `XItem { item = 1 }`: lets a list hold nullable values or collections.
    fn item_wrapper(&mut self, element: &TypeDesc) -> Result<TypeRef, GenerationError> {
        let name = format!("{}Item", label(element));
        let shape = Shape::Synthetic(format!("item<{}>", shape_key(element)));
        self.wrapper(&name, shape, ITEM_FIELD, element)
    }

    /// `XVariant { value = 1 }`: a `oneof` alternative that is not a plain value.
    pub(super) fn variant_wrapper(&mut self, desc: &TypeDesc) -> Result<TypeRef, GenerationError> {
        let name = format!("{}Variant", label(desc));
        let shape = Shape::Synthetic(format!("variant<{}>", shape_key(desc)));
        self.wrapper(&name, shape, VARIANT_FIELD, desc)
    }

    fn wrapper(&mut self, name: &str, shape: Shape, field: &str, desc: &TypeDesc) -> Result<TypeRef, GenerationError> {
        check_identifier(name)?;
        self.put_or_get(name, shape, |p| {
            let member = p.member(name, field, 1, desc, None)?;
            log::debug!("synthetic wrapper {name} {{ {field} = 1 }}");
            Ok(TypeNode::Message(MessageType {
                name: name.to_string(),
                kind: MessageKind::Wrapper,
                fields: vec![member],
                reserved: Reserved::default(),
            }))
        })
    }

    /// `KToVEntry { key = 1; value = 2 }`, named after the custom member
    /// names too when they are overridden.
    pub(super) fn map_entry(&mut self, desc: &TypeDesc) -> Result<TypeRef, GenerationError> {
        let TypeDesc::Map { key, value, key_name, value_name } = desc else {
            unreachable!("{} is not a map", desc.shape_name())
        };
        let name = format!(
            "{}To{}Entry{}",
            label(key),
            label(value),
            member_suffix(key_name.as_deref(), value_name.as_deref())
        );
        let key_name = key_name.as_deref().unwrap_or("key");
        let value_name = value_name.as_deref().unwrap_or("value");
        check_identifier(key_name)?;
        check_identifier(value_name)?;
        if key_name == value_name {
            return Err(GenerationError::DuplicateName { scope: label(desc), name: key_name.to_string() });
        }
        let shape = Shape::Synthetic(shape_key(desc));
        let entry = name.clone();
        self.put_or_get(&name, shape, |p| {
            let fields = vec![
                p.member(&entry, key_name, 1, key, None)?,
                p.member(&entry, value_name, 2, value, None)?,
            ];
            log::debug!("synthetic map entry {entry} {{ {key_name} = 1; {value_name} = 2 }}");
            Ok(TypeNode::Message(MessageType {
                name: entry.clone(),
                kind: MessageKind::MapEntry,
                fields,
                reserved: Reserved::default(),
            }))
        })
    }
}
