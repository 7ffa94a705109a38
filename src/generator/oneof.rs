use std::collections::HashSet;

use super::{check_identifier, classify, plain_field, variant_field_name, Pass, Slot};
use crate::desc::{TypeDesc, UnionDecl};
use crate::error::GenerationError;
use crate::numbering::{FieldNumberIterator, NumberSpace};
use crate::schema::{Field, FieldEncoding, MessageKind, MessageType, Reserved, Rule, TypeNode};

const DEFAULT_ONEOF: &str = "value";

impl Pass<'_> {
    /// A union becomes a message whose fields all sit in one `oneof` group.
    pub(super) fn build_union(&mut self, decl: &UnionDecl) -> Result<TypeNode, GenerationError> {
        if decl.variants.is_empty() {
            return Err(GenerationError::EmptyUnion { name: decl.name.clone() });
        }
        let oneof = decl.oneof.clone().unwrap_or_else(|| DEFAULT_ONEOF.to_string());
        check_identifier(&oneof)?;

        let explicit = decl.variants.iter().filter_map(|v| v.number).map(i64::from);
        let mut numbers = FieldNumberIterator::new(&decl.name, NumberSpace::Fields, &[], explicit)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decl.variants.len());
        for variant in &decl.variants {
            let name = variant.name.clone().unwrap_or_else(|| variant_field_name(&variant.ty));
            check_identifier(&name)?;
            if !seen.insert(name.clone()) {
                return Err(GenerationError::DuplicateName { scope: decl.name.clone(), name });
            }
            let number = match variant.number {
                Some(n) => n,
                None => numbers.next_number()? as u32,
            };
            let field = self.alternative(&name, number, &variant.ty)?;
            log::debug!("{}.{oneof}.{} = {}", decl.name, field.name, field.number);
            fields.push(field);
        }

        Ok(TypeNode::Message(MessageType {
            name: decl.name.clone(),
            kind: MessageKind::Union { oneof },
            fields,
            reserved: Reserved::default(),
        }))
    }

    /// `oneof` members cannot be `repeated` or carry their own presence,
    /// so anything but a plain single value is boxed in a wrapper.
    fn alternative(&mut self, name: &str, number: u32, desc: &TypeDesc) -> Result<Field, GenerationError> {
        let encoding = match classify(desc) {
            (false, Slot::Single(d)) => self.single(d)?,
            _ => FieldEncoding::Message(self.variant_wrapper(desc)?),
        };
        Ok(plain_field(name, number, encoding, Rule::Optional))
    }
}

#[cfg(test)]
mod tests {
    use crate::desc::{Catalog, TypeDesc, UnionDecl, VariantDecl};
    use crate::error::GenerationError;
    use crate::generator::schema_for;
    use crate::schema::{FieldEncoding, MessageKind, Rule, TypeNode};

    #[test]
    fn empty_unions_are_rejected() {
        let root = UnionDecl::new("Nothing").into_desc();
        assert_eq!(
            schema_for(&Catalog::new(), &root).unwrap_err(),
            GenerationError::EmptyUnion { name: "Nothing".into() }
        );
    }

    #[test]
    fn nullable_alternatives_get_variant_wrappers() {
        let root = UnionDecl::new("Maybe").variant(TypeDesc::nullable(TypeDesc::int32())).variant(TypeDesc::bool()).into_desc();
        let (schema, r) = schema_for(&Catalog::new(), &root).unwrap();
        let message = schema.message(r).unwrap();
        assert_eq!(message.fields[0].name, "nullable_int32");
        let FieldEncoding::Message(wrapper) = message.fields[0].encoding else { panic!("wrapped") };
        let Some(TypeNode::Message(w)) = schema.get("NullableInt32Variant") else { panic!("wrapper exists") };
        assert_eq!(schema.lookup("NullableInt32Variant"), Some(wrapper));
        assert_eq!(w.kind, MessageKind::Wrapper);
        assert_eq!(w.fields[0].name, "value");
        assert_eq!(w.fields[0].rule, Rule::Optional);
        assert!(message.fields.iter().all(|f| f.rule == Rule::Optional));
    }

    #[test]
    fn custom_names_and_oneof() {
        let mut decl = UnionDecl::new("Id");
        decl.oneof = Some("kind".into());
        decl.variants.push(VariantDecl { ty: TypeDesc::string(), number: Some(3), name: Some("text".into()) });
        decl.variants.push(VariantDecl { ty: TypeDesc::string(), number: None, name: Some("text".into()) });
        assert!(matches!(
            schema_for(&Catalog::new(), &decl.clone().into_desc()),
            Err(GenerationError::DuplicateName { .. })
        ));

        decl.variants[1].name = Some("slug".into());
        let (schema, r) = schema_for(&Catalog::new(), &decl.into_desc()).unwrap();
        let message = schema.message(r).unwrap();
        assert_eq!(message.kind, MessageKind::Union { oneof: "kind".into() });
        assert_eq!(message.field("slug").map(|f| f.number), Some(1));
    }
}
