use super::Codec;
use crate::buffer::{ByteSink, ByteSource};
use crate::error::{EncodeError, WireFormatError};
use crate::schema::MessageType;
use crate::value::Value;

/// Writes exactly one alternative of a union message.
#[derive(Clone, Copy, Debug)]
pub struct UnionEncoder<'s> {
    cx: Codec<'s>,
    message: &'s MessageType,
}

impl<'s> UnionEncoder<'s> {
    pub fn new(cx: Codec<'s>, message: &'s MessageType) -> Self {
        Self { cx, message }
    }

    pub fn encode(&self, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
        let Value::Union { variant, value } = value else {
            return Err(EncodeError::TypeMismatch { expected: "union", found: value.kind_name() });
        };
        let Some(field) = self.message.field(variant) else {
            return Err(EncodeError::UnknownVariant { union: self.message.name.clone(), variant: variant.clone() });
        };
        // The chosen alternative is written even when it holds a default,
        // otherwise the decoder could not tell which one was set.
        self.cx.write_element(field.number, field.encoding, value, true, sink)
    }
}

/// The first field on the wire picks the variant.
pub(super) fn decode<'s>(cx: Codec<'s>, message: &'s MessageType, bytes: &[u8]) -> Result<Value, WireFormatError> {
    let mut source = ByteSource::new(bytes);
    let Some((number, wire)) = source.next_field()? else {
        return Err(WireFormatError::MissingVariant { union: message.name.clone() });
    };
    let Some(field) = message.field_by_number(number) else {
        return Err(WireFormatError::UnknownVariant { union: message.name.clone(), number });
    };
    let mut decoder = field.decoder(cx);
    decoder.push(wire);
    Ok(Value::union(field.name.clone(), decoder.finish()?))
}

#[cfg(test)]
mod tests {
    use crate::desc::{Catalog, RecordDecl, TypeDesc, UnionDecl};
    use crate::error::{EncodeError, Error, WireFormatError};
    use crate::generator::schema_for;
    use crate::schema::{Schema, TypeRef};
    use crate::value::Value;

    fn shape() -> (Schema, TypeRef) {
        let catalog = Catalog::new()
            .with(RecordDecl::new("Circle").field("radius", TypeDesc::double()).into_desc())
            .with(RecordDecl::new("Square").field("side", TypeDesc::double()).into_desc());
        let root = UnionDecl::new("Shape")
            .variant(TypeDesc::reference("Circle"))
            .variant(TypeDesc::reference("Square"))
            .variant(TypeDesc::int32())
            .into_desc();
        schema_for(&catalog, &root).unwrap()
    }

    #[test]
    fn dispatches_on_the_field_number() {
        let (schema, root) = shape();
        let square = Value::union("square", Value::record([("side", Value::F64(2.0))]));
        let bytes = schema.encode(root, &square).unwrap();
        assert_eq!(bytes[0], 0x12);
        assert_eq!(schema.decode(root, &bytes).unwrap(), square);

        let zero = Value::union("int32", Value::I32(0));
        let bytes = schema.encode(root, &zero).unwrap();
        assert_eq!(bytes, vec![0x18, 0x00]);
        assert_eq!(schema.decode(root, &bytes).unwrap(), zero);
    }

    #[test]
    fn unknown_and_missing_variants_fail() {
        let (schema, root) = shape();
        assert_eq!(
            schema.decode(root, &[0x40, 0x01]).unwrap_err(),
            Error::WireFormat(WireFormatError::UnknownVariant { union: "Shape".into(), number: 8 })
        );
        assert_eq!(
            schema.decode(root, &[]).unwrap_err(),
            Error::WireFormat(WireFormatError::MissingVariant { union: "Shape".into() })
        );
        assert!(matches!(
            schema.encode(root, &Value::union("triangle", Value::Null)),
            Err(Error::Encode(EncodeError::UnknownVariant { .. }))
        ));
    }

    #[test]
    fn nullable_alternative_round_trips_null() {
        let root = UnionDecl::new("Opt").variant(TypeDesc::nullable(TypeDesc::string())).variant(TypeDesc::bool()).into_desc();
        let (schema, root) = schema_for(&Catalog::new(), &root).unwrap();
        let none = Value::union("nullable_string", Value::Null);
        let bytes = schema.encode(root, &none).unwrap();
        assert_eq!(bytes, vec![0x0A, 0x00]);
        assert_eq!(schema.decode(root, &bytes).unwrap(), none);

        let empty = Value::union("nullable_string", Value::string(""));
        let bytes = schema.encode(root, &empty).unwrap();
        assert_eq!(bytes, vec![0x0A, 0x02, 0x0A, 0x00]);
        assert_eq!(schema.decode(root, &bytes).unwrap(), empty);
    }
}
