//! Scalar catalog: the closed set of proto3 scalar representations.
//!
//! Each kind knows its wire type, whether it can be packed, how to turn a
//! [`Value`] into a [`WireValue`] (with proto3 default suppression) and how to
//! read values back. Decoding is callback style because one length-delimited
//! wire value may be a packed block holding many scalars.
use crate::error::{EncodeError, WireFormatError};
use crate::value::Value;
use crate::wire::{self, WireType, WireValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Float,
    Double,
    String,
    Bytes,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 15] = [
        ScalarKind::Bool,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::SInt32,
        ScalarKind::SInt64,
        ScalarKind::Fixed32,
        ScalarKind::Fixed64,
        ScalarKind::SFixed32,
        ScalarKind::SFixed64,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::String,
        ScalarKind::Bytes,
    ];

    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::SInt32 => "sint32",
            ScalarKind::SInt64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::SFixed32 => "sfixed32",
            ScalarKind::SFixed64 => "sfixed64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    pub fn wire_type(self) -> WireType {
        match self {
            ScalarKind::Bool
            | ScalarKind::Int32
            | ScalarKind::Int64
            | ScalarKind::UInt32
            | ScalarKind::UInt64
            | ScalarKind::SInt32
            | ScalarKind::SInt64 => WireType::VarInt,
            ScalarKind::Fixed32 | ScalarKind::SFixed32 | ScalarKind::Float => WireType::Fixed32,
            ScalarKind::Fixed64 | ScalarKind::SFixed64 | ScalarKind::Double => WireType::Fixed64,
            ScalarKind::String | ScalarKind::Bytes => WireType::Len,
        }
    }

    pub fn is_packable(self) -> bool {
        !matches!(self, ScalarKind::String | ScalarKind::Bytes)
    }

    /// The proto3 default: what an absent field decodes to.
    pub fn zero_value(self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::Int32 | ScalarKind::SInt32 | ScalarKind::SFixed32 => Value::I32(0),
            ScalarKind::Int64 | ScalarKind::SInt64 | ScalarKind::SFixed64 => Value::I64(0),
            ScalarKind::UInt32 | ScalarKind::Fixed32 => Value::U32(0),
            ScalarKind::UInt64 | ScalarKind::Fixed64 => Value::U64(0),
            ScalarKind::Float => Value::F32(0.0),
            ScalarKind::Double => Value::F64(0.0),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::Bytes => Value::Bytes(Vec::new()),
        }
    }

    /// `Ok(None)` when `emit_zero` is off and `value` is the zero value.
    pub fn encode(self, value: &Value, emit_zero: bool) -> Result<Option<WireValue<'_>>, EncodeError> {
        let wire = match (self, value) {
            (ScalarKind::Bool, Value::Bool(b)) => WireValue::VarInt(u64::from(*b)),
            // Negative int32 is sign-extended to ten bytes, as the reference encoders do.
            (ScalarKind::Int32, Value::I32(n)) => WireValue::VarInt(i64::from(*n) as u64),
            (ScalarKind::Int64, Value::I64(n)) => WireValue::VarInt(*n as u64),
            (ScalarKind::UInt32, Value::U32(n)) => WireValue::VarInt(u64::from(*n)),
            (ScalarKind::UInt64, Value::U64(n)) => WireValue::VarInt(*n),
            (ScalarKind::SInt32, Value::I32(n)) => WireValue::VarInt(u64::from(wire::encode_zigzag32(*n))),
            (ScalarKind::SInt64, Value::I64(n)) => WireValue::VarInt(wire::encode_zigzag64(*n)),
            (ScalarKind::Fixed32, Value::U32(n)) => WireValue::Fixed32(*n),
            (ScalarKind::SFixed32, Value::I32(n)) => WireValue::Fixed32(*n as u32),
            (ScalarKind::Fixed64, Value::U64(n)) => WireValue::Fixed64(*n),
            (ScalarKind::SFixed64, Value::I64(n)) => WireValue::Fixed64(*n as u64),
            (ScalarKind::Float, Value::F32(f)) => WireValue::Fixed32(f.to_bits()),
            (ScalarKind::Double, Value::F64(f)) => WireValue::Fixed64(f.to_bits()),
            (ScalarKind::String, Value::String(s)) => WireValue::Len(s.as_bytes()),
            (ScalarKind::Bytes, Value::Bytes(b)) => WireValue::Len(b),
            (kind, other) => {
                return Err(EncodeError::TypeMismatch { expected: kind.proto_name(), found: other.kind_name() });
            }
        };
        if !emit_zero && is_zero(&wire) {
            return Ok(None);
        }
        Ok(Some(wire))
    }

    /// Feed every value carried by `wire` to `on_value`.
    pub fn decode(self, wire: &WireValue<'_>, on_value: &mut dyn FnMut(Value)) -> Result<(), WireFormatError> {
        match (self.wire_type(), wire) {
            (WireType::VarInt, WireValue::VarInt(raw)) => on_value(self.from_varint(*raw)),
            (WireType::Fixed32, WireValue::Fixed32(raw)) => on_value(self.from_fixed32(*raw)),
            (WireType::Fixed64, WireValue::Fixed64(raw)) => on_value(self.from_fixed64(*raw)),
            (WireType::Len, WireValue::Len(bytes)) => on_value(self.from_len(bytes)?),
            (element, WireValue::Len(block)) if self.is_packable() => {
                let mut pos = 0;
                while pos < block.len() {
                    let item = WireValue::read(element, block, &mut pos)?;
                    self.decode(&item, on_value)?;
                }
            }
            (_, other) => {
                return Err(WireFormatError::WireTypeMismatch {
                    scalar: self.proto_name(),
                    found: other.wire_type().name(),
                });
            }
        }
        Ok(())
    }

    /// Decode exactly one value, keeping the last one of a packed block.
    pub fn decode_last(self, wire: &WireValue<'_>) -> Result<Option<Value>, WireFormatError> {
        let mut last = None;
        self.decode(wire, &mut |v| last = Some(v))?;
        Ok(last)
    }

    fn from_varint(self, raw: u64) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(raw != 0),
            ScalarKind::Int32 => Value::I32(raw as i32),
            ScalarKind::Int64 => Value::I64(raw as i64),
            ScalarKind::UInt32 => Value::U32((raw & 0xFFFF_FFFF) as u32),
            ScalarKind::UInt64 => Value::U64(raw),
            ScalarKind::SInt32 => Value::I32(wire::decode_zigzag32(raw as u32)),
            ScalarKind::SInt64 => Value::I64(wire::decode_zigzag64(raw)),
            _ => unreachable!("{} is not a varint kind", self.proto_name()),
        }
    }

    fn from_fixed32(self, raw: u32) -> Value {
        match self {
            ScalarKind::Fixed32 => Value::U32(raw),
            ScalarKind::SFixed32 => Value::I32(raw as i32),
            ScalarKind::Float => Value::F32(f32::from_bits(raw)),
            _ => unreachable!("{} is not a fixed32 kind", self.proto_name()),
        }
    }

    fn from_fixed64(self, raw: u64) -> Value {
        match self {
            ScalarKind::Fixed64 => Value::U64(raw),
            ScalarKind::SFixed64 => Value::I64(raw as i64),
            ScalarKind::Double => Value::F64(f64::from_bits(raw)),
            _ => unreachable!("{} is not a fixed64 kind", self.proto_name()),
        }
    }

    fn from_len(self, bytes: &[u8]) -> Result<Value, WireFormatError> {
        match self {
            ScalarKind::String => std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_string()))
                .map_err(|_| WireFormatError::InvalidUtf8),
            _ => Ok(Value::Bytes(bytes.to_vec())),
        }
    }
}

fn is_zero(wire: &WireValue<'_>) -> bool {
    match wire {
        WireValue::VarInt(v) | WireValue::Fixed64(v) => *v == 0,
        WireValue::Fixed32(v) => *v == 0,
        WireValue::Len(bytes) => bytes.is_empty(),
    }
}
