//! Name-keyed arena of type nodes with deferred initialisation.
//!
//! A name is registered *before* its node is built, so a record that refers
//! to itself (directly or through other records) finds the reserved slot
//! instead of recursing forever.
use indexmap::IndexMap;

use crate::desc::TypeDesc;
use crate::error::GenerationError;
use crate::schema::{Schema, TypeNode, TypeRef};

/// Structural fingerprint used to detect two different types sharing a name.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A declared record/union/enum; compared field by field.
    Declared(TypeDesc),
    /// A synthetic wrapper or map entry, keyed by what it wraps.
    Synthetic(String),
}

#[derive(Debug)]
struct Slot {
    shape: Shape,
    node: Option<TypeNode>,
}

pub enum Reservation {
    Existing(TypeRef),
    Fresh(TypeRef),
}

/// Length of the arena at some point; everything after it can be dropped.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint(usize);

#[derive(Debug, Default)]
pub struct TypeRegistry {
    slots: Vec<Slot>,
    names: IndexMap<String, TypeRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.names.get(name).copied()
    }

    /// The declaration registered under `name`, if it is not synthetic.
    pub fn declared(&self, name: &str) -> Option<(TypeRef, &TypeDesc)> {
        let r = self.get(name)?;
        match &self.slots[r.0].shape {
            Shape::Declared(desc) => Some((r, desc)),
            Shape::Synthetic(_) => None,
        }
    }

    /// Return the compatible entry for `name`, or reserve an unresolved slot.
    pub fn reserve(&mut self, name: &str, shape: Shape) -> Result<Reservation, GenerationError> {
        if let Some(&existing) = self.names.get(name) {
            if self.slots[existing.0].shape != shape {
                return Err(GenerationError::NameConflict { name: name.to_string() });
            }
            return Ok(Reservation::Existing(existing));
        }
        let r = TypeRef(self.slots.len());
        self.slots.push(Slot { shape, node: None });
        self.names.insert(name.to_string(), r);
        log::debug!("reserved type `{name}` as #{}", r.0);
        Ok(Reservation::Fresh(r))
    }

    pub fn resolve(&mut self, r: TypeRef, node: TypeNode) {
        debug_assert!(self.slots[r.0].node.is_none(), "slot #{} resolved twice", r.0);
        self.slots[r.0].node = Some(node);
    }

    pub fn is_resolved(&self, r: TypeRef) -> bool {
        self.slots[r.0].node.is_some()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.slots.len())
    }

    /// Drop every slot registered after `checkpoint`. Slots and names are
    /// appended in lockstep, so truncating both restores the earlier state.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.slots.truncate(checkpoint.0);
        self.names.truncate(checkpoint.0);
    }

    /// Freeze into a [`Schema`]. Every reservation made by a successful
    /// generation pass has been resolved by the time it returns.
    pub fn into_schema(self) -> Schema {
        let nodes = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| match slot.node {
                Some(node) => node,
                None => unreachable!("type #{i} was reserved but never built"),
            })
            .collect();
        Schema { nodes, names: self.names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumType, EnumValue, Reserved};

    fn enum_node(name: &str) -> TypeNode {
        TypeNode::Enum(EnumType {
            name: name.to_string(),
            values: vec![EnumValue { name: "ZERO".into(), number: 0 }],
            reserved: Reserved::default(),
        })
    }

    #[test]
    fn reserve_returns_existing_for_same_shape() {
        let mut registry = TypeRegistry::new();
        let Reservation::Fresh(a) = registry.reserve("A", Shape::Synthetic("a".into())).unwrap() else {
            panic!("first reservation is fresh")
        };
        let Reservation::Existing(b) = registry.reserve("A", Shape::Synthetic("a".into())).unwrap() else {
            panic!("second reservation reuses the slot")
        };
        assert_eq!(a, b);
        assert!(!registry.is_resolved(a));
        registry.resolve(a, enum_node("A"));
        assert!(registry.is_resolved(a));
    }

    #[test]
    fn different_shape_under_same_name_conflicts() {
        let mut registry = TypeRegistry::new();
        registry.reserve("A", Shape::Synthetic("a".into())).unwrap();
        let err = registry.reserve("A", Shape::Synthetic("b".into())).err().unwrap();
        assert_eq!(err, GenerationError::NameConflict { name: "A".into() });
    }

    #[test]
    fn rollback_forgets_later_names() {
        let mut registry = TypeRegistry::new();
        registry.reserve("A", Shape::Synthetic("a".into())).unwrap();
        let cp = registry.checkpoint();
        registry.reserve("B", Shape::Synthetic("b".into())).unwrap();
        registry.rollback(cp);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("B").is_none());
        assert!(registry.get("A").is_some());
    }
}
