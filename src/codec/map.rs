use super::Codec;
use crate::buffer::ByteSink;
use crate::error::{EncodeError, WireFormatError};
use crate::schema::{Field, FieldEncoding, MessageType};
use crate::value::Value;
use crate::wire::WireValue;

/// Map field writer: one buffered entry message per key, flushed when the
/// next key starts or on [`finish`](Self::finish).
#[derive(Debug)]
pub struct MapEncoder<'s> {
    cx: Codec<'s>,
    field: &'s Field,
    entry: &'s MessageType,
    pending: Option<ByteSink>,
}

impl<'s> MapEncoder<'s> {
    pub fn new(cx: Codec<'s>, field: &'s Field) -> Self {
        let FieldEncoding::Message(entry) = field.encoding else {
            unreachable!("map field `{}` is not backed by an entry message", field.name)
        };
        Self { cx, field, entry: cx.message(entry), pending: None }
    }

    pub fn write_key(&mut self, key: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        self.flush(sink);
        let mut entry = ByteSink::new();
        self.entry.fields[0].encoder(self.cx).write_with(key, true, &mut entry)?;
        self.pending = Some(entry);
        Ok(())
    }

    pub fn write_value(&mut self, value: &Value) -> Result<(), EncodeError> {
        let Some(entry) = self.pending.as_mut() else {
            return Err(EncodeError::MapValueWithoutKey);
        };
        self.entry.fields[1].encoder(self.cx).write_with(value, true, entry)
    }

    pub fn finish(mut self, sink: &mut ByteSink) {
        self.flush(sink);
    }

    fn flush(&mut self, sink: &mut ByteSink) {
        if let Some(entry) = self.pending.take() {
            sink.write_nested(self.field.number, &entry);
        }
    }
}

/// Each occurrence is one entry; a repeated key keeps its first position
/// and takes the later value.
pub(super) fn decode<'s>(cx: Codec<'s>, field: &'s Field, parts: &[WireValue<'_>]) -> Result<Value, WireFormatError> {
    let mut entries: Vec<(Value, Value)> = Vec::with_capacity(parts.len());
    let mut decoded = Vec::with_capacity(1);
    for part in parts {
        decoded.clear();
        cx.read_element(field.encoding, part, &mut decoded)?;
        let Some(Value::Record(entry)) = decoded.pop() else {
            unreachable!("map entries decode to records")
        };
        let mut members = entry.into_values();
        let (Some(key), Some(value)) = (members.next(), members.next()) else {
            unreachable!("map entries have a key and a value")
        };
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => entries.push((key, value)),
        }
    }
    Ok(Value::Map(entries))
}
