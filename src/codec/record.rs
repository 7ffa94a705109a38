use indexmap::IndexMap;

use super::{Codec, FieldDecoder};
use crate::buffer::{ByteSink, ByteSource};
use crate::error::{EncodeError, WireFormatError};
use crate::schema::{FieldShape, MessageType, Rule};
use crate::value::Value;

/// Writes a record's fields in schema order.
#[derive(Clone, Copy, Debug)]
pub struct RecordEncoder<'s> {
    cx: Codec<'s>,
    message: &'s MessageType,
}

impl<'s> RecordEncoder<'s> {
    pub fn new(cx: Codec<'s>, message: &'s MessageType) -> Self {
        Self { cx, message }
    }

    pub fn encode(&self, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        let Value::Record(values) = value else {
            return Err(EncodeError::TypeMismatch { expected: "record", found: value.kind_name() });
        };
        if let Some(extra) = values.keys().find(|k| self.message.field(k).is_none()) {
            return Err(EncodeError::UnknownField { message: self.message.name.clone(), field: extra.clone() });
        }
        for field in &self.message.fields {
            match values.get(&field.name) {
                Some(v) => field.encoder(self.cx).write(v, sink)?,
                None if field.rule == Rule::Singular && field.shape == FieldShape::Single => {
                    return Err(EncodeError::MissingField {
                        message: self.message.name.clone(),
                        field: field.name.clone(),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Demultiplex `bytes` into per-field decoders; every schema field appears
/// in the result, absent ones with their default.
pub(super) fn decode<'s>(
    cx: Codec<'s>,
    message: &'s MessageType,
    bytes: &[u8],
) -> Result<IndexMap<String, Value>, WireFormatError> {
    let mut decoders: IndexMap<u32, FieldDecoder<'s, '_>> =
        message.fields.iter().map(|f| (f.number, f.decoder(cx))).collect();
    let mut source = ByteSource::new(bytes);
    while let Some((number, wire)) = source.next_field()? {
        match decoders.get_mut(&number) {
            Some(decoder) => decoder.push(wire),
            None => log::trace!("{}: skipping unknown field {number}", message.name),
        }
    }
    decoders
        .into_values()
        .map(|d| {
            let name = d.field().name.clone();
            d.finish().map(|v| (name, v))
        })
        .collect()
}
