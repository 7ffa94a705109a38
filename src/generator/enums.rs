use std::collections::HashSet;

use super::{check_identifier, reserved_ranges};
use crate::desc::EnumDecl;
use crate::error::GenerationError;
use crate::numbering::{FieldNumberIterator, NumberSpace};
use crate::schema::{EnumType, EnumValue, Reserved, TypeNode};

/// Values keep declaration order, except that the zero value is moved first
/// as proto3 requires.
pub(super) fn build_enum(decl: &EnumDecl) -> Result<TypeNode, GenerationError> {
    let ranges = reserved_ranges(&decl.reserved_numbers);
    let explicit = decl.values.iter().filter_map(|v| match (v.number, v.default) {
        (Some(n), _) => Some(i64::from(n)),
        (None, true) => Some(0),
        (None, false) => None,
    });
    let mut numbers = FieldNumberIterator::new(&decl.name, NumberSpace::EnumValues, &ranges, explicit)?;

    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(decl.values.len());
    for value in &decl.values {
        check_identifier(&value.name)?;
        if decl.reserved_names.contains(&value.name) {
            return Err(GenerationError::ReservedName { scope: decl.name.clone(), name: value.name.clone() });
        }
        if !seen.insert(value.name.as_str()) {
            return Err(GenerationError::DuplicateName { scope: decl.name.clone(), name: value.name.clone() });
        }
        let number = match (value.number, value.default) {
            (Some(n), _) => n,
            (None, true) => 0,
            // Bounded by i32::MAX in the enum number space.
            (None, false) => numbers.next_number()? as i32,
        };
        values.push(EnumValue { name: value.name.clone(), number });
    }

    let Some(zero) = values.iter().position(|v| v.number == 0) else {
        return Err(GenerationError::MissingZeroValue { name: decl.name.clone() });
    };
    let zero = values.remove(zero);
    values.insert(0, zero);
    log::debug!("enum {} with {} values", decl.name, values.len());

    Ok(TypeNode::Enum(EnumType {
        name: decl.name.clone(),
        values,
        reserved: Reserved { ranges, names: decl.reserved_names.clone() },
    }))
}
