//! Byte sink (append-only, owned) and byte source (borrowed, random access).
use crate::error::WireFormatError;
use crate::wire::{self, Tag, WireType, WireValue};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteSink {
    bytes: Vec<u8>,
}

impl ByteSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_varint(&mut self, value: u64) {
        wire::write_varint(&mut self.bytes, value);
    }

    pub fn write_tag(&mut self, number: u32, wire_type: WireType) {
        Tag::new(number, wire_type).write(&mut self.bytes);
    }

    /// Payload without a tag: used for packed blocks.
    pub fn write_payload(&mut self, value: &WireValue<'_>) {
        value.write_payload(&mut self.bytes);
    }

    /// Tag followed by payload.
    pub fn write_field(&mut self, number: u32, value: &WireValue<'_>) {
        self.write_tag(number, value.wire_type());
        self.write_payload(value);
    }

    /// Flush a nested buffer as one length-delimited occurrence of `number`.
    pub fn write_nested(&mut self, number: u32, nested: &ByteSink) {
        self.write_field(number, &WireValue::Len(nested.as_bytes()));
    }
}

/// Random-access view over encoded bytes. Sub-ranges handed out by
/// [`ByteSource::read_value`] borrow the parent slice.
#[derive(Clone, Copy, Debug)]
pub struct ByteSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_varint(&mut self) -> Result<u64, WireFormatError> {
        wire::read_varint(self.bytes, &mut self.pos)
    }

    pub fn read_tag(&mut self) -> Result<Tag, WireFormatError> {
        Tag::read(self.bytes, &mut self.pos)
    }

    pub fn read_value(&mut self, wire_type: WireType) -> Result<WireValue<'a>, WireFormatError> {
        WireValue::read(wire_type, self.bytes, &mut self.pos)
    }

    /// Next `(field number, value)` pair, or `None` at end of input.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireValue<'a>)>, WireFormatError> {
        if self.is_empty() {
            return Ok(None);
        }
        let tag = self.read_tag()?;
        let value = self.read_value(tag.wire_type)?;
        Ok(Some((tag.number, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_block_is_borrowed_from_parent() {
        let mut inner = ByteSink::new();
        inner.write_field(1, &WireValue::VarInt(150));
        let mut outer = ByteSink::new();
        outer.write_nested(3, &inner);
        assert_eq!(outer.as_bytes(), &[0x1A, 0x03, 0x08, 0x96, 0x01]);

        let bytes = outer.into_bytes();
        let mut source = ByteSource::new(&bytes);
        let (number, value) = source.next_field().unwrap().unwrap();
        assert_eq!(number, 3);
        let WireValue::Len(sub) = value else { panic!("expected a length-delimited value") };
        assert!(std::ptr::eq(sub.as_ptr(), bytes[2..].as_ptr()));
        assert!(source.next_field().unwrap().is_none());

        let mut nested = ByteSource::new(sub);
        assert_eq!(nested.next_field().unwrap(), Some((1, WireValue::VarInt(150))));
    }

    #[test]
    fn truncated_field_fails() {
        let bytes = [0x0A, 0x04, b'a'];
        let mut source = ByteSource::new(&bytes);
        assert!(matches!(source.next_field(), Err(WireFormatError::Truncated { .. })));
    }
}
