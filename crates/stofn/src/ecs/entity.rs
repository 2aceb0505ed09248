//! # Entity: Lightweight Identifiers for Scene Objects
//!
//! An [`Entity`] is just a number: it doesn't "contain" anything. The
//! [`World`](super::world::World) maps entities to their components and to
//! their row in the transform hierarchy.
//!
//! ## Design: Generational Indices
//!
//! Each handle pairs a **slot index** with a **generation**. When a slot is
//! freed its generation increments, so any handle still carrying the old
//! generation is detected as stale:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← original
//! Entity { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! Generations are 8 bits and wrap, which means a stale handle can alias a
//! live one after 256 reuses of the same slot. Two things keep that window
//! wide:
//!
//! - freed slots go to the back of a FIFO queue, so the oldest one is reused
//!   first;
//! - nothing is reused at all until more than `free_list_low_water` slots are
//!   queued (1024 by default).
//!
//! Slot indices are 24 bits, so a handle packs into a single `u32`
//! ([`Entity::to_bits`]).

use std::collections::VecDeque;
use std::fmt;

use crate::config::WorldConfig;
use crate::error::EcsError;

/// A lightweight handle to an entity in the [`World`](super::world::World).
///
/// Entities are created via [`World::spawn`](super::world::World::spawn) and
/// destroyed via [`World::despawn`](super::world::World::despawn). An `Entity`
/// is only valid for the `World` that created it, and only while its
/// generation matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Slot index in the allocator. Recycled after despawn.
    pub(crate) index: u32,
    /// Bumped every time the slot is freed.
    pub(crate) generation: u8,
}

impl Entity {
    /// Largest representable slot index (24 bits).
    pub const MAX_INDEX: u32 = (1 << 24) - 1;

    /// Returns the raw slot index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u8 {
        self.generation
    }

    /// Pack into `generation << 24 | index`.
    pub fn to_bits(self) -> u32 {
        (u32::from(self.generation) << 24) | self.index
    }

    /// Inverse of [`to_bits`](Self::to_bits). The result is only meaningful
    /// for the world that issued the original handle.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            index: bits & Self::MAX_INDEX,
            generation: (bits >> 24) as u8,
        }
    }

    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Manages entity ID allocation and recycling.
///
/// ## Memory Layout
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// alive:       [T, F, T, F, T]
/// free_list:   [1, 3]            ← FIFO, front is reused first
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u8>,
    alive: Vec<bool>,
    free_list: VecDeque<u32>,
    low_water: usize,
    max_slots: u32,
    alive_count: usize,
}

impl EntityAllocator {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            generations: Vec::with_capacity(config.initial_capacity),
            alive: Vec::with_capacity(config.initial_capacity),
            free_list: VecDeque::new(),
            low_water: config.free_list_low_water,
            max_slots: config.max_slots,
            alive_count: 0,
        }
    }

    /// Allocate a new [`Entity`].
    ///
    /// Reuses the oldest freed slot only when more than `low_water` slots are
    /// queued (or no fresh index is left); otherwise takes a fresh index.
    pub fn allocate(&mut self) -> Result<Entity, EcsError> {
        let exhausted = self.generations.len() as u32 >= self.max_slots;
        let recycled = if exhausted || self.free_list.len() > self.low_water {
            self.free_list.pop_front()
        } else {
            None
        };
        let entity = match recycled {
            Some(index) => {
                // Generation was already bumped on dealloc.
                let entity = Entity {
                    index,
                    generation: self.generations[index as usize],
                };
                log::trace!("reusing slot {} as {:?}", index, entity);
                entity
            }
            None => {
                let index = self.generations.len() as u32;
                if exhausted {
                    return Err(EcsError::CapacityExhausted {
                        max_slots: self.max_slots,
                    });
                }
                self.generations.push(0);
                self.alive.push(false);
                Entity {
                    index,
                    generation: 0,
                }
            }
        };
        self.alive[entity.slot()] = true;
        self.alive_count += 1;
        Ok(entity)
    }

    /// Deallocate an entity, queueing its slot for reuse.
    ///
    /// Returns `true` if the entity was alive, `false` if it was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.slot();
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.alive[idx] = false;
        self.free_list.push_back(entity.index);
        self.alive_count -= 1;
        true
    }

    /// Check if an entity handle is still valid (not despawned or stale).
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.slot();
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    /// The live entity occupying `slot`, if any.
    pub fn entity_at(&self, slot: u32) -> Option<Entity> {
        let idx = slot as usize;
        if *self.alive.get(idx)? {
            Some(Entity {
                index: slot,
                generation: self.generations[idx],
            })
        } else {
            None
        }
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        (0..self.total_slots()).filter_map(|slot| self.entity_at(slot))
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Returns the number of slots waiting in the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the total number of slots ever allocated.
    pub fn total_slots(&self) -> u32 {
        self.generations.len() as u32
    }
}
