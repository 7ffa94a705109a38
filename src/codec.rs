//! Composite codec runtime: encodes [`Value`]s against a [`Schema`] and
//! decodes them back.
//!
//! Every field gets a short-lived encoder or decoder value object
//! ([`Field::encoder`], [`Field::decoder`]); records, lists, maps and unions
//! are state machines over a [`ByteSink`] or a borrowed byte slice.
mod list;
mod map;
mod oneof;
mod record;

pub use list::ListEncoder;
pub use map::MapEncoder;
pub use oneof::UnionEncoder;
pub use record::RecordEncoder;

use crate::buffer::ByteSink;
use crate::error::{EncodeError, Error, WireFormatError};
use crate::schema::{Field, FieldEncoding, FieldShape, MessageKind, MessageType, Rule, Schema, TypeNode, TypeRef};
use crate::value::Value;
use crate::wire::{self, WireValue};

/// Nesting depth past which decoding gives up.
pub const MAX_DEPTH: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write singular scalar and enum fields even when they hold the
    /// proto3 default.
    pub emit_defaults: bool,
}

impl Schema {
    pub fn encode(&self, root: TypeRef, value: &Value) -> Result<Vec<u8>, Error> {
        self.encode_with(root, value, EncodeOptions::default())
    }

    pub fn encode_with(&self, root: TypeRef, value: &Value, options: EncodeOptions) -> Result<Vec<u8>, Error> {
        let message = self.root_message(root)?;
        let mut sink = ByteSink::new();
        Codec::new(self, options).encode_message(message, value, &mut sink)?;
        Ok(sink.into_bytes())
    }

    pub fn decode(&self, root: TypeRef, bytes: &[u8]) -> Result<Value, Error> {
        let message = self.root_message(root)?;
        Ok(Codec::new(self, EncodeOptions::default()).decode_message(message, bytes)?)
    }

    pub(crate) fn root_message(&self, root: TypeRef) -> Result<&MessageType, EncodeError> {
        match self.node(root) {
            Some(TypeNode::Message(message)) => Ok(message),
            Some(TypeNode::Enum(e)) => Err(EncodeError::RootNotMessage { name: e.name.clone() }),
            None => Err(EncodeError::UnknownTypeRef { index: root.index() }),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SHARED CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// Read-only state shared by every encoder and decoder of one call.
#[derive(Clone, Copy, Debug)]
pub struct Codec<'s> {
    schema: &'s Schema,
    options: EncodeOptions,
    depth: usize,
}

impl<'s> Codec<'s> {
    pub fn new(schema: &'s Schema, options: EncodeOptions) -> Self {
        Self { schema, options, depth: 0 }
    }

    fn message(self, r: TypeRef) -> &'s MessageType {
        match self.schema.message(r) {
            Some(message) => message,
            None => {
                unreachable!("field encoding points a message at enum `{}`", self.schema.name_of(r).unwrap_or_default())
            }
        }
    }

    pub fn encode_message(self, message: &'s MessageType, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        match message.kind {
            MessageKind::Record | MessageKind::MapEntry => RecordEncoder::new(self, message).encode(value, sink),
            MessageKind::Union { .. } => UnionEncoder::new(self, message).encode(value, sink),
            MessageKind::Wrapper => message.fields[0].encoder(self).write(value, sink),
        }
    }

    /// One tagged occurrence of a single value.
    fn write_element(
        self,
        number: u32,
        encoding: FieldEncoding,
        value: &Value,
        emit_zero: bool,
        sink: &mut ByteSink,
    ) -> Result<(), EncodeError> {
        match encoding {
            FieldEncoding::Scalar(kind) => {
                if let Some(wire) = kind.encode(value, emit_zero)? {
                    sink.write_field(number, &wire);
                }
            }
            FieldEncoding::Enum(r) => {
                let n = self.enum_number(r, value)?;
                if n != 0 || emit_zero {
                    sink.write_field(number, &WireValue::VarInt(i64::from(n) as u64));
                }
            }
            FieldEncoding::Message(r) => {
                let mut nested = ByteSink::new();
                self.encode_message(self.message(r), value, &mut nested)?;
                sink.write_nested(number, &nested);
            }
        }
        Ok(())
    }

    /// Untagged payload of a packable element.
    fn write_packed_element(self, encoding: FieldEncoding, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        match encoding {
            FieldEncoding::Scalar(kind) => {
                if let Some(wire) = kind.encode(value, true)? {
                    sink.write_payload(&wire);
                }
            }
            FieldEncoding::Enum(r) => sink.write_varint(i64::from(self.enum_number(r, value)?) as u64),
            FieldEncoding::Message(_) => unreachable!("messages are never packed"),
        }
        Ok(())
    }

    fn enum_number(self, r: TypeRef, value: &Value) -> Result<i32, EncodeError> {
        let Value::Enum(name) = value else {
            return Err(EncodeError::TypeMismatch { expected: "enum", found: value.kind_name() });
        };
        let Some(e) = self.schema.enumeration(r) else {
            unreachable!("field encoding points an enum at message `{}`", self.schema.name_of(r).unwrap_or_default())
        };
        e.number_of(name).ok_or_else(|| EncodeError::UnknownEnumValue { name: e.name.clone(), value: name.clone() })
    }

    pub fn decode_message(self, message: &'s MessageType, bytes: &[u8]) -> Result<Value, WireFormatError> {
        if self.depth >= MAX_DEPTH {
            return Err(WireFormatError::RecursionLimit(MAX_DEPTH));
        }
        let inner = Codec { depth: self.depth + 1, ..self };
        match message.kind {
            MessageKind::Record | MessageKind::MapEntry => record::decode(inner, message, bytes).map(Value::Record),
            MessageKind::Union { .. } => oneof::decode(inner, message, bytes),
            MessageKind::Wrapper => {
                let fields = record::decode(inner, message, bytes)?;
                Ok(fields.into_values().next().unwrap_or(Value::Null))
            }
        }
    }

    /// Every value carried by one wire occurrence (several for a packed block).
    fn read_element(self, encoding: FieldEncoding, wire: &WireValue<'_>, out: &mut Vec<Value>) -> Result<(), WireFormatError> {
        match (encoding, wire) {
            (FieldEncoding::Scalar(kind), _) => kind.decode(wire, &mut |v| out.push(v)),
            (FieldEncoding::Enum(r), WireValue::VarInt(raw)) => {
                out.push(self.enum_value(r, *raw as i32)?);
                Ok(())
            }
            (FieldEncoding::Enum(r), WireValue::Len(block)) => {
                let mut pos = 0;
                while pos < block.len() {
                    let raw = wire::read_varint(block, &mut pos)?;
                    out.push(self.enum_value(r, raw as i32)?);
                }
                Ok(())
            }
            (FieldEncoding::Message(r), WireValue::Len(bytes)) => {
                out.push(self.decode_message(self.message(r), bytes)?);
                Ok(())
            }
            (encoding, other) => Err(WireFormatError::WireTypeMismatch {
                scalar: if matches!(encoding, FieldEncoding::Enum(_)) { "enum" } else { "message" },
                found: other.wire_type().name(),
            }),
        }
    }

    fn enum_value(self, r: TypeRef, number: i32) -> Result<Value, WireFormatError> {
        let Some(e) = self.schema.enumeration(r) else {
            unreachable!("field encoding points an enum at message `{}`", self.schema.name_of(r).unwrap_or_default())
        };
        e.name_of(number)
            .map(Value::enumeration)
            .ok_or_else(|| WireFormatError::UnknownEnumNumber { name: e.name.clone(), number })
    }

    /// What an absent singular field decodes to.
    fn zero_value(self, encoding: FieldEncoding) -> Result<Value, WireFormatError> {
        match encoding {
            FieldEncoding::Scalar(kind) => Ok(kind.zero_value()),
            FieldEncoding::Enum(r) => self.enum_value(r, 0),
            FieldEncoding::Message(r) => self.decode_message(self.message(r), &[]),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PER-FIELD VALUE OBJECTS
// ————————————————————————————————————————————————————————————————————————————

/// Writes every occurrence of one field.
#[derive(Clone, Copy, Debug)]
pub struct FieldEncoder<'s> {
    field: &'s Field,
    cx: Codec<'s>,
}

impl<'s> FieldEncoder<'s> {
    pub fn write(&self, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        let emit_zero = self.field.rule != Rule::Singular || self.cx.options.emit_defaults;
        self.write_with(value, emit_zero, sink)
    }

    /// `emit_zero` only affects single scalar and enum values.
    pub fn write_with(&self, value: &Value, emit_zero: bool, sink: &mut ByteSink) -> Result<(), EncodeError> {
        let field = self.field;
        log::trace!("encode field {} = {}", field.name, field.number);
        match field.shape {
            FieldShape::Single if value.is_null() && field.rule == Rule::Optional => Ok(()),
            FieldShape::Single => self.cx.write_element(field.number, field.encoding, value, emit_zero, sink),
            FieldShape::List { .. } => {
                let Value::List(items) = value else {
                    return Err(EncodeError::TypeMismatch { expected: "list", found: value.kind_name() });
                };
                let mut list = ListEncoder::new(self.cx, field);
                for item in items {
                    list.push(item, sink)?;
                }
                list.finish(sink);
                Ok(())
            }
            FieldShape::Map => {
                let Value::Map(entries) = value else {
                    return Err(EncodeError::TypeMismatch { expected: "map", found: value.kind_name() });
                };
                let mut map = MapEncoder::new(self.cx, field);
                for (key, value) in entries {
                    map.write_key(key, sink)?;
                    map.write_value(value)?;
                }
                map.finish(sink);
                Ok(())
            }
        }
    }
}

/// Collects the wire occurrences of one field, then builds its value.
#[derive(Clone, Debug)]
pub struct FieldDecoder<'s, 'b> {
    field: &'s Field,
    cx: Codec<'s>,
    parts: Vec<WireValue<'b>>,
}

impl<'s, 'b> FieldDecoder<'s, 'b> {
    pub fn push(&mut self, wire: WireValue<'b>) {
        self.parts.push(wire);
    }

    pub fn field(&self) -> &'s Field {
        self.field
    }

    pub fn finish(self) -> Result<Value, WireFormatError> {
        let field = self.field;
        log::trace!("decode field {} from {} occurrence(s)", field.name, self.parts.len());
        match field.shape {
            FieldShape::Single => {
                let Some(last) = self.parts.last() else {
                    return match field.rule {
                        Rule::Optional => Ok(Value::Null),
                        _ => self.cx.zero_value(field.encoding),
                    };
                };
                let mut values = Vec::with_capacity(1);
                self.cx.read_element(field.encoding, last, &mut values)?;
                match (values.pop(), field.rule) {
                    (Some(v), _) => Ok(v),
                    // An empty packed block carries no value.
                    (None, Rule::Optional) => Ok(Value::Null),
                    (None, _) => self.cx.zero_value(field.encoding),
                }
            }
            FieldShape::List { .. } => {
                let mut items = Vec::new();
                for part in &self.parts {
                    self.cx.read_element(field.encoding, part, &mut items)?;
                }
                Ok(Value::List(items))
            }
            FieldShape::Map => map::decode(self.cx, field, &self.parts),
        }
    }
}

impl Field {
    pub fn encoder<'s>(&'s self, cx: Codec<'s>) -> FieldEncoder<'s> {
        FieldEncoder { field: self, cx }
    }

    pub fn decoder<'s, 'b>(&'s self, cx: Codec<'s>) -> FieldDecoder<'s, 'b> {
        FieldDecoder { field: self, cx, parts: Vec::new() }
    }
}
