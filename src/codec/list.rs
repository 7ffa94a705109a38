use super::Codec;
use crate::buffer::ByteSink;
use crate::error::EncodeError;
use crate::schema::{Field, FieldShape};
use crate::value::Value;

/// Repeated field writer. Packed mode buffers element payloads and emits a
/// single length-delimited occurrence on [`finish`](Self::finish).
#[derive(Debug)]
pub struct ListEncoder<'s> {
    cx: Codec<'s>,
    field: &'s Field,
    packed: Option<ByteSink>,
    written: usize,
}

impl<'s> ListEncoder<'s> {
    pub fn new(cx: Codec<'s>, field: &'s Field) -> Self {
        let packed = matches!(field.shape, FieldShape::List { packed: true }).then(ByteSink::new);
        Self { cx, field, packed, written: 0 }
    }

    pub fn push(&mut self, item: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        match &mut self.packed {
            Some(block) => self.cx.write_packed_element(self.field.encoding, item, block)?,
            None => self.cx.write_element(self.field.number, self.field.encoding, item, true, sink)?,
        }
        self.written += 1;
        Ok(())
    }

    pub fn finish(self, sink: &mut ByteSink) {
        if let Some(block) = self.packed {
            if self.written > 0 {
                sink.write_nested(self.field.number, &block);
            }
        }
    }
}
