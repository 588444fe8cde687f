//! Generation-indexed entity arena
//!
//! The registry is the sole owner of live entities. Collaborators hold
//! `EntityId` handles (slot index + generation) and must revalidate them
//! through the registry; a handle to a removed entity simply stops
//! resolving, so stale references can never observe a recycled slot.

use super::entity::Entity;

/// Handle into the entity arena. Copyable, never dangles: lookups fail
/// once the slot's generation has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Owns the set of live entities for one session.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an entity, reusing a free slot when one exists.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entity: Some(entity),
            });
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Resolve a handle, failing for removed or recycled slots.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    /// Whether the handle still refers to a live entity.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Remove the entity behind `id`, bumping the slot generation so any
    /// outstanding handles stop resolving.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation += 1;
        self.free.push(id.index);
        self.len -= 1;
        Some(entity)
    }

    /// Iterate live entities in slot order. Slot order is the container
    /// order used for target acquisition.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entity.as_ref().map(|e| {
                (
                    EntityId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    e,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.entity.as_mut().map(move |e| {
                (
                    EntityId {
                        index: index as u32,
                        generation,
                    },
                    e,
                )
            })
        })
    }

    /// Ids of all live entities, in slot order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Drop everything and forget all handles. Generations are bumped so
    /// handles from before the clear cannot resolve against new entities.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entity.take().is_some() {
                slot.generation += 1;
                self.free.push(index as u32);
            }
        }
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, EntityKind};
    use glam::Vec2;

    fn dummy(text: &str) -> Entity {
        Entity::new(
            EntityKind::Basic {
                dir: Vec2::NEG_Y,
                speed: 10.0,
            },
            text,
            Vec2::new(0.0, 100.0),
        )
    }

    #[test]
    fn handles_stop_resolving_after_removal() {
        let mut reg = EntityRegistry::new();
        let id = reg.insert(dummy("abc"));
        assert!(reg.is_live(id));
        assert!(reg.remove(id).is_some());
        assert!(!reg.is_live(id));
        assert!(reg.remove(id).is_none());
    }

    #[test]
    fn recycled_slot_invalidates_old_handle() {
        let mut reg = EntityRegistry::new();
        let old = reg.insert(dummy("abc"));
        reg.remove(old);
        let new = reg.insert(dummy("def"));
        // Same slot, different generation.
        assert!(!reg.is_live(old));
        assert!(reg.is_live(new));
        assert_ne!(old, new);
    }

    #[test]
    fn iteration_is_slot_ordered() {
        let mut reg = EntityRegistry::new();
        let a = reg.insert(dummy("a"));
        let b = reg.insert(dummy("b"));
        let c = reg.insert(dummy("c"));
        reg.remove(b);
        let ids: Vec<_> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut reg = EntityRegistry::new();
        let a = reg.insert(dummy("a"));
        let b = reg.insert(dummy("b"));
        reg.clear();
        assert!(reg.is_empty());
        assert!(!reg.is_live(a));
        assert!(!reg.is_live(b));
    }
}
