//! Dynamic values the codec runtime encodes and decodes.
//!
//! The JSON bridge is schema guided: JSON alone cannot tell an `int32` from a
//! `sint64`, an enum name from a string, or a union from a record.
use indexmap::IndexMap;
use serde_json::{json, Value as Json};

use crate::error::EncodeError;
use crate::scalar::ScalarKind;
use crate::schema::{Field, FieldEncoding, FieldShape, MessageKind, MessageType, Rule, Schema, TypeRef};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value by name.
    Enum(String),
    List(Vec<Value>),
    /// Entries in insertion order; keys may be any value.
    Map(Vec<(Value, Value)>),
    /// Record fields by schema field name.
    Record(IndexMap<String, Value>),
    /// Union variant by field name.
    Union { variant: String, value: Box<Value> },
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Union { .. } => "union",
        }
    }

    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn union(variant: impl Into<String>, value: Value) -> Self {
        Value::Union { variant: variant.into(), value: Box::new(value) }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Value::Enum(name.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// JSON BRIDGE
// ————————————————————————————————————————————————————————————————————————————

/// Schema-free rendering; maps become `[[key, value], ...]`, bytes hex.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::from(*b),
        Value::I32(n) => Json::from(*n),
        Value::I64(n) => Json::from(*n),
        Value::U32(n) => Json::from(*n),
        Value::U64(n) => Json::from(*n),
        Value::F32(n) => Json::from(f64::from(*n)),
        Value::F64(n) => Json::from(*n),
        Value::String(s) | Value::Enum(s) => Json::from(s.clone()),
        Value::Bytes(b) => Json::from(hex::encode(b)),
        Value::List(xs) => Json::Array(xs.iter().map(to_json).collect()),
        Value::Map(entries) => Json::Array(
            entries.iter().map(|(k, v)| json!([to_json(k), to_json(v)])).collect()
        ),
        Value::Record(fields) => Json::Object(
            fields.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()
        ),
        Value::Union { variant, value } => {
            let mut obj = serde_json::Map::new();
            obj.insert(variant.clone(), to_json(value));
            Json::Object(obj)
        }
    }
}

/// Read a JSON document as a value of message type `root`.
pub fn from_json(schema: &Schema, root: TypeRef, json: &Json) -> Result<Value, EncodeError> {
    let message = schema.root_message(root)?;
    message_from_json(schema, message, json)
}

fn message_from_json(schema: &Schema, message: &MessageType, json: &Json) -> Result<Value, EncodeError> {
    match &message.kind {
        MessageKind::Wrapper => field_from_json(schema, &message.fields[0], json),
        MessageKind::Union { .. } => {
            let obj = as_object(json, "union")?;
            let mut entries = obj.iter();
            let (Some((variant, inner)), None) = (entries.next(), entries.next()) else {
                return Err(mismatch("single-key union object", json));
            };
            let Some(field) = message.field(variant) else {
                return Err(EncodeError::UnknownVariant { union: message.name.clone(), variant: variant.clone() });
            };
            Ok(Value::union(variant.clone(), field_from_json(schema, field, inner)?))
        }
        MessageKind::Record | MessageKind::MapEntry => {
            let obj = as_object(json, "record")?;
            let mut fields = IndexMap::new();
            for (name, inner) in obj {
                let Some(field) = message.field(name) else {
                    return Err(EncodeError::UnknownField { message: message.name.clone(), field: name.clone() });
                };
                fields.insert(name.clone(), field_from_json(schema, field, inner)?);
            }
            Ok(Value::Record(fields))
        }
    }
}

fn field_from_json(schema: &Schema, field: &Field, json: &Json) -> Result<Value, EncodeError> {
    match field.shape {
        FieldShape::List { .. } => {
            let Json::Array(items) = json else { return Err(mismatch("array", json)) };
            items.iter().map(|item| single_from_json(schema, field.encoding, item)).collect::<Result<_, _>>().map(Value::List)
        }
        FieldShape::Map => {
            let FieldEncoding::Message(entry) = field.encoding else {
                return Err(mismatch("map entry", json));
            };
            let Some(entry) = schema.message(entry) else { return Err(mismatch("map entry", json)) };
            let (key_field, value_field) = (&entry.fields[0], &entry.fields[1]);
            let mut out = Vec::new();
            match json {
                Json::Object(obj) => {
                    for (k, v) in obj {
                        let key = field_from_json(schema, key_field, &Json::from(k.clone()))?;
                        out.push((key, field_from_json(schema, value_field, v)?));
                    }
                }
                Json::Array(pairs) => {
                    for pair in pairs {
                        let Some([k, v]) = pair.as_array().map(Vec::as_slice).and_then(|s| <&[Json; 2]>::try_from(s).ok()) else {
                            return Err(mismatch("[key, value] pair", pair));
                        };
                        out.push((field_from_json(schema, key_field, k)?, field_from_json(schema, value_field, v)?));
                    }
                }
                other => return Err(mismatch("map", other)),
            }
            Ok(Value::Map(out))
        }
        FieldShape::Single => {
            if json.is_null() && field.rule == Rule::Optional {
                return Ok(Value::Null);
            }
            single_from_json(schema, field.encoding, json)
        }
    }
}

fn single_from_json(schema: &Schema, encoding: FieldEncoding, json: &Json) -> Result<Value, EncodeError> {
    match encoding {
        FieldEncoding::Scalar(kind) => scalar_from_json(kind, json),
        FieldEncoding::Enum(_) => json.as_str().map(Value::enumeration).ok_or_else(|| mismatch("enum name", json)),
        FieldEncoding::Message(r) => match schema.message(r) {
            Some(message) => message_from_json(schema, message, json),
            None => Err(mismatch("message", json)),
        },
    }
}

fn scalar_from_json(kind: ScalarKind, json: &Json) -> Result<Value, EncodeError> {
    let expected = kind.proto_name();
    let fail = || mismatch(expected, json);
    Ok(match kind {
        ScalarKind::Bool => Value::Bool(json.as_bool().ok_or_else(fail)?),
        ScalarKind::Int32 | ScalarKind::SInt32 | ScalarKind::SFixed32 => {
            Value::I32(json.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(fail)?)
        }
        ScalarKind::UInt32 | ScalarKind::Fixed32 => {
            Value::U32(json.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(fail)?)
        }
        ScalarKind::Int64 | ScalarKind::SInt64 | ScalarKind::SFixed64 => Value::I64(json.as_i64().ok_or_else(fail)?),
        ScalarKind::UInt64 | ScalarKind::Fixed64 => Value::U64(json.as_u64().ok_or_else(fail)?),
        ScalarKind::Float => Value::F32(json.as_f64().ok_or_else(fail)? as f32),
        ScalarKind::Double => Value::F64(json.as_f64().ok_or_else(fail)?),
        ScalarKind::String => Value::String(json.as_str().ok_or_else(fail)?.to_string()),
        ScalarKind::Bytes => {
            let text = json.as_str().ok_or_else(fail)?;
            Value::Bytes(hex::decode(text).map_err(|_| fail())?)
        }
    })
}

fn as_object<'j>(json: &'j Json, expected: &'static str) -> Result<&'j serde_json::Map<String, Json>, EncodeError> {
    json.as_object().ok_or_else(|| mismatch(expected, json))
}

fn mismatch(expected: &'static str, found: &Json) -> EncodeError {
    let found = match found {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    EncodeError::TypeMismatch { expected, found }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{Catalog, EnumDecl, RecordDecl, TypeDesc, UnionDecl};
    use crate::generator::SchemaGenerator;

    fn fixture() -> (Schema, TypeRef) {
        let catalog = Catalog::new()
            .with(EnumDecl::new("Mood").default_value("CALM").value("LOUD").into_desc())
            .with(UnionDecl::new("Payload").variant(TypeDesc::string()).variant(TypeDesc::int64()).into_desc());
        let root = RecordDecl::new("Doc")
            .field("id", TypeDesc::uint32())
            .field("mood", TypeDesc::reference("Mood"))
            .field("tags", TypeDesc::map(TypeDesc::string(), TypeDesc::double()))
            .field("blob", TypeDesc::list(TypeDesc::primitive(crate::desc::Primitive::Uint8)))
            .field("payload", TypeDesc::nullable(TypeDesc::reference("Payload")))
            .into_desc();
        let mut generator = SchemaGenerator::new();
        let r = generator.generate(&catalog, &root).unwrap();
        (generator.finish(), r)
    }

    #[test]
    fn json_bridge_follows_the_schema() {
        let (schema, root) = fixture();
        let doc = json!({
            "id": 7,
            "mood": "LOUD",
            "tags": {"a": 1.5},
            "blob": "00ff",
            "payload": {"int64": -3}
        });
        let value = from_json(&schema, root, &doc).unwrap();
        let Value::Record(fields) = &value else { panic!("record expected") };
        assert_eq!(fields["id"], Value::U32(7));
        assert_eq!(fields["mood"], Value::enumeration("LOUD"));
        assert_eq!(fields["tags"], Value::Map(vec![(Value::string("a"), Value::F64(1.5))]));
        assert_eq!(fields["blob"], Value::Bytes(vec![0x00, 0xFF]));
        assert_eq!(fields["payload"], Value::union("int64", Value::I64(-3)));

        let back = to_json(&value);
        assert_eq!(back["tags"], json!([["a", 1.5]]));
        assert_eq!(from_json(&schema, root, &back).unwrap(), value);
    }

    #[test]
    fn json_bridge_rejects_unknown_fields_and_bad_numbers() {
        let (schema, root) = fixture();
        assert!(matches!(
            from_json(&schema, root, &json!({"nope": 1})),
            Err(EncodeError::UnknownField { .. })
        ));
        assert!(matches!(
            from_json(&schema, root, &json!({"id": -1})),
            Err(EncodeError::TypeMismatch { expected: "uint32", .. })
        ));
        assert_eq!(from_json(&schema, root, &json!({"payload": null})).unwrap(), Value::record([("payload", Value::Null)]));
    }
}
