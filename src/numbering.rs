//! Per-scope number assignment for record fields, union variants and enum values.
use std::collections::BTreeSet;

use crate::error::GenerationError;
use crate::schema::ReservedRange;
use crate::wire::{IMPLEMENTATION_RESERVED, MAX_FIELD_NUMBER};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberSpace {
    /// Field and variant numbers: 1..=2^29-1 minus the 19000..=19999 band.
    Fields,
    /// Enum values: any i32; automatic assignment starts at 1.
    EnumValues,
}

/// Stateful cursor yielding the next unused number in one scope.
///
/// Seeded with every explicit number up front, so automatic assignment can
/// never hand out a number that an override claims later in the scope.
#[derive(Debug)]
pub struct FieldNumberIterator {
    scope: String,
    space: NumberSpace,
    taken: BTreeSet<i64>,
    reserved: Vec<ReservedRange>,
    next: i64,
}

impl FieldNumberIterator {
    pub fn new<I>(
        scope: &str,
        space: NumberSpace,
        reserved: &[ReservedRange],
        explicit: I,
    ) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut it = Self {
            scope: scope.to_string(),
            space,
            taken: BTreeSet::new(),
            reserved: reserved.to_vec(),
            next: 1,
        };
        for number in explicit {
            it.claim(number)?;
        }
        Ok(it)
    }

    /// Validate and record an explicit number.
    fn claim(&mut self, number: i64) -> Result<(), GenerationError> {
        if self.space == NumberSpace::Fields && !is_valid_field_number(number) {
            return Err(GenerationError::InvalidFieldNumber { scope: self.scope.clone(), number });
        }
        if self.reserved.iter().any(|r| r.contains(number)) {
            return Err(GenerationError::ReservedNumber { scope: self.scope.clone(), number });
        }
        if !self.taken.insert(number) {
            return Err(GenerationError::DuplicateNumber { scope: self.scope.clone(), number });
        }
        Ok(())
    }

    pub fn is_taken(&self, number: i64) -> bool {
        self.taken.contains(&number)
    }

    pub fn next_number(&mut self) -> Result<i64, GenerationError> {
        let limit = match self.space {
            NumberSpace::Fields => i64::from(MAX_FIELD_NUMBER),
            NumberSpace::EnumValues => i64::from(i32::MAX),
        };
        let mut candidate = self.next;
        loop {
            if candidate > limit {
                return Err(GenerationError::NumbersExhausted { scope: self.scope.clone() });
            }
            if self.space == NumberSpace::Fields && in_implementation_band(candidate) {
                candidate = i64::from(*IMPLEMENTATION_RESERVED.end()) + 1;
                continue;
            }
            if let Some(range) = self.reserved.iter().find(|r| r.contains(candidate)) {
                candidate = i64::from(range.end) + 1;
                continue;
            }
            if self.taken.contains(&candidate) {
                candidate += 1;
                continue;
            }
            break;
        }
        self.taken.insert(candidate);
        self.next = candidate + 1;
        Ok(candidate)
    }
}

pub fn is_valid_field_number(number: i64) -> bool {
    (1..=i64::from(MAX_FIELD_NUMBER)).contains(&number) && !in_implementation_band(number)
}

fn in_implementation_band(number: i64) -> bool {
    (i64::from(*IMPLEMENTATION_RESERVED.start())..=i64::from(*IMPLEMENTATION_RESERVED.end())).contains(&number)
}
