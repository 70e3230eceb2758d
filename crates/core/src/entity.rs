//! Entity trait: identity + continuity across state changes.

use std::collections::HashMap;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Key a batch of entities by id. Later duplicates win.
pub fn index_by_id<E, I>(entities: I) -> HashMap<E::Id, E>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    entities.into_iter().map(|e| (e.id(), e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Customer, CustomerId};

    #[test]
    fn index_by_id_keys_entities() {
        let index = index_by_id(vec![
            Customer::new(CustomerId::new(2), "bob"),
            Customer::new(CustomerId::new(1), "alice"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&CustomerId::new(1)].username, "alice");
    }
}
