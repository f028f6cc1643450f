//! The reference cache: a write-once arena of entities keyed by refid.
//!
//! Entities register here at construction time, before their children are
//! parsed, so a sibling compound that references them by id can resolve the
//! link while construction is still in progress. Views and child lists hold
//! [`EntityId`]s into this arena; nothing is ever deleted.

use std::collections::HashMap;

use tracing::warn;

use doxograph_shared::{DoxographError, DuplicateIdPolicy, RefId, Result};

use crate::entity::{Entity, EntityId};

/// Arena plus refid index. The single point of mutation during a build.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    by_refid: HashMap<RefId, EntityId>,
    policy: DuplicateIdPolicy,
}

impl EntityRegistry {
    pub fn new(policy: DuplicateIdPolicy) -> Self {
        Self {
            entities: Vec::new(),
            by_refid: HashMap::new(),
            policy,
        }
    }

    /// Allocate an entity and bind its refid for lookups.
    ///
    /// Rebinding an existing refid follows the duplicate-id policy:
    /// `Replace` rebinds (last write wins) with a warning, `Error` fails.
    /// The previously bound entity stays in the arena either way.
    pub fn register(&mut self, entity: Entity) -> Result<EntityId> {
        let refid = entity.refid.clone();
        if self.by_refid.contains_key(&refid) {
            match self.policy {
                DuplicateIdPolicy::Error => {
                    return Err(DoxographError::DuplicateId {
                        refid: refid.to_string(),
                    });
                }
                DuplicateIdPolicy::Replace => {
                    warn!(%refid, "refid registered twice; last write wins");
                }
            }
        }
        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        self.by_refid.insert(refid, id);
        Ok(id)
    }

    /// Allocate an entity without binding its refid (view roots).
    pub fn insert_detached(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        id
    }

    pub fn lookup(&self, refid: &RefId) -> Option<EntityId> {
        self.by_refid.get(refid).copied()
    }

    pub fn lookup_str(&self, refid: &str) -> Option<EntityId> {
        self.by_refid.get(&RefId::from(refid)).copied()
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All arena slots, including detached roots and replaced bindings.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// Refids currently bound, with the entity each resolves to.
    pub fn bound(&self) -> impl Iterator<Item = (&RefId, EntityId)> {
        self.by_refid.iter().map(|(refid, id)| (refid, *id))
    }
}

#[cfg(test)]
mod tests {
    use doxograph_shared::Kind;

    use super::*;

    fn entity(refid: &str, name: &str) -> Entity {
        Entity::new(RefId::from(refid), Kind::Class, name)
    }

    #[test]
    fn register_then_lookup() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let id = registry.register(entity("classa", "A")).expect("register");
        assert_eq!(registry.lookup_str("classa"), Some(id));
        assert_eq!(registry.get(id).name, "A");
        assert_eq!(registry.lookup_str("classb"), None);
    }

    #[test]
    fn replace_policy_rebinds_silently() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let first = registry.register(entity("classa", "A")).expect("register");
        let second = registry.register(entity("classa", "A2")).expect("register");
        assert_ne!(first, second);
        // Last write wins; the first entity stays in the arena.
        assert_eq!(registry.lookup_str("classa"), Some(second));
        assert_eq!(registry.get(first).name, "A");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn error_policy_rejects_duplicates() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Error);
        registry.register(entity("classa", "A")).expect("register");
        let err = registry.register(entity("classa", "A2")).unwrap_err();
        assert!(matches!(err, DoxographError::DuplicateId { .. }));
    }

    #[test]
    fn detached_entities_are_not_bound() {
        let mut registry = EntityRegistry::new(DuplicateIdPolicy::Replace);
        let root = registry.insert_detached(Entity::view_root());
        assert_eq!(registry.lookup_str("root"), None);
        assert_eq!(registry.get(root).kind, Kind::Root);
    }
}
