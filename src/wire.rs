//! Wire primitives: varint, zig-zag, fixed-width little-endian values,
//! length-delimited blocks and tags.
//!
//! Everything here works on plain `Vec<u8>` sinks and `(&[u8], &mut usize)`
//! cursors; [`crate::buffer`] wraps them into owned/borrowed buffer types.
use crate::error::WireFormatError;

/// Largest legal field number (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Field numbers reserved for the protobuf implementation itself.
pub const IMPLEMENTATION_RESERVED: std::ops::RangeInclusive<u32> = 19_000..=19_999;

const MAX_VARINT_LEN: usize = 10;

// ------------------------------ Wire types ------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    VarInt,
    Fixed64,
    Len,
    Fixed32,
}

impl WireType {
    pub fn id(self) -> u8 {
        match self {
            WireType::VarInt => 0,
            WireType::Fixed64 => 1,
            WireType::Len => 2,
            WireType::Fixed32 => 5,
        }
    }

    /// Groups (3, 4) are proto2-only and rejected like any unknown id.
    pub fn from_id(id: u8) -> Result<Self, WireFormatError> {
        match id {
            0 => Ok(WireType::VarInt),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::Fixed32),
            other => Err(WireFormatError::InvalidWireType(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WireType::VarInt => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::Len => "length-delimited",
            WireType::Fixed32 => "fixed32",
        }
    }
}

/// One value as it appears on the wire, before any scalar interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireValue<'a> {
    VarInt(u64),
    Fixed32(u32),
    Fixed64(u64),
    Len(&'a [u8]),
}

impl<'a> WireValue<'a> {
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::VarInt(_) => WireType::VarInt,
            WireValue::Fixed32(_) => WireType::Fixed32,
            WireValue::Fixed64(_) => WireType::Fixed64,
            WireValue::Len(_) => WireType::Len,
        }
    }

    /// Write the payload only (no tag).
    pub fn write_payload(&self, out: &mut Vec<u8>) {
        match *self {
            WireValue::VarInt(v) => write_varint(out, v),
            WireValue::Fixed32(v) => write_fixed32(out, v),
            WireValue::Fixed64(v) => write_fixed64(out, v),
            WireValue::Len(bytes) => write_len(out, bytes),
        }
    }

    /// Read one payload of the given wire type.
    pub fn read(wire_type: WireType, data: &'a [u8], pos: &mut usize) -> Result<Self, WireFormatError> {
        Ok(match wire_type {
            WireType::VarInt => WireValue::VarInt(read_varint(data, pos)?),
            WireType::Fixed32 => WireValue::Fixed32(read_fixed32(data, pos)?),
            WireType::Fixed64 => WireValue::Fixed64(read_fixed64(data, pos)?),
            WireType::Len => WireValue::Len(read_len(data, pos)?),
        })
    }
}

// --------------------------------- Tags ---------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    pub number: u32,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    pub fn encode(self) -> u64 {
        (u64::from(self.number) << 3) | u64::from(self.wire_type.id())
    }

    pub fn parse(raw: u64) -> Result<Self, WireFormatError> {
        let number = raw >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(WireFormatError::InvalidTag(raw));
        }
        let wire_type = WireType::from_id((raw & 0x7) as u8)?;
        Ok(Self { number: number as u32, wire_type })
    }

    pub fn write(self, out: &mut Vec<u8>) {
        write_varint(out, self.encode());
    }

    pub fn read(data: &[u8], pos: &mut usize) -> Result<Self, WireFormatError> {
        Self::parse(read_varint(data, pos)?)
    }
}

// -------------------------------- Varint --------------------------------- //

pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64, WireFormatError> {
    let mut result: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = data.get(*pos) else {
            return Err(WireFormatError::Truncated { needed: 1, remaining: 0 });
        };
        *pos += 1;
        // The tenth byte holds only bit 63.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(WireFormatError::VarintOverflow);
        }
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(WireFormatError::VarintOverflow)
}

pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

// ------------------------------- Zig-zag --------------------------------- //

pub fn encode_zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

pub fn decode_zigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

pub fn encode_zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn decode_zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

// ------------------------------ Fixed width ------------------------------ //

pub fn write_fixed32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_fixed64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn read_fixed32(data: &[u8], pos: &mut usize) -> Result<u32, WireFormatError> {
    let bytes = take(data, pos, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(raw))
}

pub fn read_fixed64(data: &[u8], pos: &mut usize) -> Result<u64, WireFormatError> {
    let bytes = take(data, pos, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(raw))
}

// --------------------------- Length-delimited ---------------------------- //

pub fn write_len(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Borrow the next length-delimited block without copying.
pub fn read_len<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], WireFormatError> {
    let declared = read_varint(data, pos)?;
    let remaining = data.len() - *pos;
    let len = usize::try_from(declared).map_err(|_| WireFormatError::Truncated {
        needed: usize::MAX,
        remaining,
    })?;
    take(data, pos, len)
}

/// Skip one payload of an unknown field.
pub fn skip_value(wire_type: WireType, data: &[u8], pos: &mut usize) -> Result<(), WireFormatError> {
    WireValue::read(wire_type, data, pos).map(|_| ())
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], WireFormatError> {
    let remaining = data.len().saturating_sub(*pos);
    if len > remaining {
        return Err(WireFormatError::Truncated { needed: len, remaining });
    }
    let out = &data[*pos..*pos + len];
    *pos += len;
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_round_trips_full_range() {
        for &v in &[0u64, 1, 127, 128, 300, 16_384, u32::MAX as u64, 1 << 63, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, v);
            assert_eq!(buf.len(), varint_len(v));
            let mut pos = 0;
            assert_eq!(read_varint(&buf, &mut pos).unwrap(), v);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn varint_known_bytes() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);

        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX);
        assert_eq!(buf, vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn varint_overflow_and_truncation() {
        let too_long = [0xFFu8; 11];
        let mut pos = 0;
        assert_eq!(read_varint(&too_long, &mut pos), Err(WireFormatError::VarintOverflow));

        let mut wide = [0xFFu8; 10];
        wide[9] = 0x02;
        let mut pos = 0;
        assert_eq!(read_varint(&wide, &mut pos), Err(WireFormatError::VarintOverflow));
        wide[9] = 0x01;
        let mut pos = 0;
        assert_eq!(read_varint(&wide, &mut pos), Ok(u64::MAX));

        let cut = [0x80u8, 0x80];
        let mut pos = 0;
        assert!(matches!(read_varint(&cut, &mut pos), Err(WireFormatError::Truncated { .. })));
    }

    #[test]
    fn zigzag_is_an_exact_inverse() {
        for &n in &[0i32, 1, -1, 2, -2, i32::MAX, i32::MIN] {
            assert_eq!(decode_zigzag32(encode_zigzag32(n)), n);
        }
        for &n in &[0i64, 1, -1, i64::MAX, i64::MIN] {
            assert_eq!(decode_zigzag64(encode_zigzag64(n)), n);
        }
        assert_eq!(encode_zigzag32(-1), 1);
        assert_eq!(encode_zigzag32(1), 2);
        assert_eq!(encode_zigzag32(i32::MIN), u32::MAX);
        assert_eq!(encode_zigzag64(i64::MAX), u64::MAX - 1);
    }

    #[test]
    fn fixed_values_are_little_endian() {
        let mut buf = Vec::new();
        write_fixed32(&mut buf, 0x1234_5678);
        assert_eq!(buf, vec![0x78, 0x56, 0x34, 0x12]);
        let mut pos = 0;
        assert_eq!(read_fixed32(&buf, &mut pos).unwrap(), 0x1234_5678);

        let mut buf = Vec::new();
        write_fixed64(&mut buf, 1.5f64.to_bits());
        let mut pos = 0;
        assert_eq!(f64::from_bits(read_fixed64(&buf, &mut pos).unwrap()), 1.5);
    }

    #[test]
    fn tags_compose_and_parse() {
        let tag = Tag::new(2, WireType::Len);
        assert_eq!(tag.encode(), 0x12);
        assert_eq!(Tag::parse(0x12).unwrap(), tag);
        assert_eq!(Tag::parse(0x02), Err(WireFormatError::InvalidTag(0x02)));
        assert_eq!(Tag::parse(0x0B), Err(WireFormatError::InvalidWireType(3)));
        let too_big = (u64::from(MAX_FIELD_NUMBER) + 1) << 3;
        assert_eq!(Tag::parse(too_big), Err(WireFormatError::InvalidTag(too_big)));
    }

    #[test]
    fn len_block_must_be_complete() {
        let mut buf = Vec::new();
        write_len(&mut buf, b"hello");
        let mut pos = 0;
        assert_eq!(read_len(&buf, &mut pos).unwrap(), b"hello");

        let short = [0x05u8, b'h', b'i'];
        let mut pos = 0;
        assert_eq!(
            read_len(&short, &mut pos),
            Err(WireFormatError::Truncated { needed: 5, remaining: 2 })
        );
    }

    #[test]
    fn skip_every_wire_type() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        write_fixed64(&mut buf, 7);
        write_len(&mut buf, b"abc");
        write_fixed32(&mut buf, 9);
        let mut pos = 0;
        for wt in [WireType::VarInt, WireType::Fixed64, WireType::Len, WireType::Fixed32] {
            skip_value(wt, &buf, &mut pos).unwrap();
        }
        assert_eq!(pos, buf.len());
    }
}
