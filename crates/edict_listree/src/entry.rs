//! Named entries of map-mode nodes.

use edict_foundation::{Cll, Name};

use crate::node::ValueLink;

/// A named slot in a map-mode node.
///
/// The collision list holds every value currently bound to the name, in
/// stack order: values may be pushed or popped at either end.
#[derive(Debug)]
pub struct NamedEntry {
    name: Name,
    values: Cll<ValueLink>,
}

impl NamedEntry {
    /// Creates an entry with an empty collision list.
    #[must_use]
    pub fn new(name: Name) -> Self {
        Self {
            name,
            values: Cll::new(),
        }
    }

    /// Returns the entry's name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the collision list.
    #[must_use]
    pub fn values(&self) -> &Cll<ValueLink> {
        &self.values
    }

    /// Returns the collision list mutably.
    pub fn values_mut(&mut self) -> &mut Cll<ValueLink> {
        &mut self.values
    }

    /// Returns true when no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
