use std::collections::HashSet;

use super::{check_identifier, reserved_ranges, Pass};
use crate::desc::RecordDecl;
use crate::error::GenerationError;
use crate::numbering::{FieldNumberIterator, NumberSpace};
use crate::schema::{MessageKind, MessageType, Reserved, TypeNode};

impl Pass<'_> {
    pub(super) fn build_record(&mut self, decl: &RecordDecl) -> Result<TypeNode, GenerationError> {
        let ranges = reserved_ranges(&decl.reserved_numbers);
        let explicit = decl.fields.iter().filter_map(|f| f.number).map(i64::from);
        let mut numbers = FieldNumberIterator::new(&decl.name, NumberSpace::Fields, &ranges, explicit)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let name = field.proto_name.as_deref().unwrap_or(&field.name);
            check_identifier(name)?;
            if decl.reserved_names.iter().any(|r| r == name) {
                return Err(GenerationError::ReservedName { scope: decl.name.clone(), name: name.to_string() });
            }
            if !seen.insert(name) {
                return Err(GenerationError::DuplicateName { scope: decl.name.clone(), name: name.to_string() });
            }
            let number = match field.number {
                Some(n) => n,
                // Bounded by MAX_FIELD_NUMBER.
                None => numbers.next_number()? as u32,
            };
            let built = self.member(&decl.name, name, number, &field.ty, field.packed)?;
            log::debug!("{}.{} = {} ({:?}, {:?})", decl.name, built.name, built.number, built.rule, built.shape);
            fields.push(built);
        }

        Ok(TypeNode::Message(MessageType {
            name: decl.name.clone(),
            kind: MessageKind::Record,
            fields,
            reserved: Reserved { ranges, names: decl.reserved_names.clone() },
        }))
    }
}
