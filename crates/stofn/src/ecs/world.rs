//! # World: The Central Container
//!
//! The [`World`] owns every entity, its components and its transform. It's the
//! single source of truth; handles are plain values that index into it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │                                                      │
//! │  EntityAllocator: slot generations + FIFO free list   │
//! │                                                      │
//! │  Components                                          │
//! │    registry: TypeId → ComponentId                    │
//! │    storages[ComponentId] = sparse set (dense Vec<T>) │
//! │                                                      │
//! │  TransformHierarchy                                  │
//! │    rows: dense Vec<TransformRow>, row 0 = sentinel   │
//! │    slot_to_row: slot → row                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stale handles
//!
//! Writes (`add`, `set_local`, `set_parent`) on a despawned handle fail with
//! [`EcsError::StaleHandle`]. Reads (`get`, `world_of`, ...) and `remove`
//! simply report absence.
//!
//! ## Despawn
//!
//! [`despawn`](World::despawn) drops the transform row (re-rooting any
//! children) and every component record before the slot goes back on the
//! free list, so a recycled slot never sees the previous owner's data.

use std::convert::Infallible;

use super::component::{ComponentId, ComponentRegistry, Components};
use super::entity::{Entity, EntityAllocator};
use super::hierarchy::{Children, TransformHierarchy};
use super::query::QueryParam;
use super::system::{SystemContext, check_alive};
use crate::config::WorldConfig;
use crate::error::EcsError;
use crate::math::{Mat4, Transform};

/// The central container for all entity state.
pub struct World {
    config: WorldConfig,
    allocator: EntityAllocator,
    components: Components,
    transforms: TransformHierarchy,
    /// Number of entities spawned since the last stats read (diagnostics only).
    #[cfg(feature = "diagnostics")]
    spawned_this_frame: u32,
    #[cfg(feature = "diagnostics")]
    despawned_this_frame: u32,
}

impl World {
    /// A world with the default [`WorldConfig`].
    pub fn new() -> Self {
        Self::build(WorldConfig::default(), ComponentRegistry::new())
    }

    pub fn with_config(config: WorldConfig) -> Result<Self, EcsError> {
        Self::with_registry(config, ComponentRegistry::new())
    }

    /// Start from a registry that already knows some component types, so
    /// their ids are fixed up front.
    pub fn with_registry(
        config: WorldConfig,
        registry: ComponentRegistry,
    ) -> Result<Self, EcsError> {
        config.validate()?;
        Ok(Self::build(config, registry))
    }

    fn build(config: WorldConfig, registry: ComponentRegistry) -> Self {
        log::debug!(
            "creating world (low water {}, max slots {}, {} component types)",
            config.free_list_low_water,
            config.max_slots,
            registry.len()
        );
        Self {
            allocator: EntityAllocator::new(&config),
            components: Components::new(registry, config.initial_capacity),
            transforms: TransformHierarchy::new(config.initial_capacity),
            config,
            #[cfg(feature = "diagnostics")]
            spawned_this_frame: 0,
            #[cfg(feature = "diagnostics")]
            despawned_this_frame: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ── Spawn / Despawn ──────────────────────────────────────────────

    /// Spawn an entity with no components and no transform.
    ///
    /// # Panics
    ///
    /// Panics if every slot index is in use. Use [`try_spawn`](Self::try_spawn)
    /// to handle that case.
    pub fn spawn(&mut self) -> Entity {
        match self.try_spawn() {
            Ok(entity) => entity,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_spawn(&mut self) -> Result<Entity, EcsError> {
        let entity = self.allocator.allocate()?;
        #[cfg(feature = "diagnostics")]
        {
            self.spawned_this_frame += 1;
        }
        log::trace!("spawned {:?}", entity);
        Ok(entity)
    }

    /// Despawn an entity, dropping its transform row and components and
    /// freeing its slot for reuse. Children are re-rooted.
    ///
    /// Returns `true` if the entity was alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        let had_row = self.transforms.destroy(entity);
        let removed = self.components.remove_all(entity.index());
        self.allocator.deallocate(entity);
        #[cfg(feature = "diagnostics")]
        {
            self.despawned_this_frame += 1;
        }
        log::debug!(
            "despawned {:?} ({} components{})",
            entity,
            removed,
            if had_row { ", transform row" } else { "" }
        );
        true
    }

    /// Despawn an entity and all its descendants.
    ///
    /// Returns `true` if the entity was alive.
    pub fn despawn_recursive(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        let subtree = self.transforms.subtree(entity);
        if subtree.is_empty() {
            return self.despawn(entity);
        }
        // Children first, so nothing gets re-rooted on the way.
        for &e in subtree.iter().rev() {
            self.despawn(e);
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter()
    }

    // ── Components ───────────────────────────────────────────────────

    /// Attach a component, replacing any existing `T` on the entity.
    pub fn add<T: 'static + Send + Sync>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<&mut T, EcsError> {
        check_alive(&self.allocator, entity)?;
        Ok(self.components.insert(entity.index(), component))
    }

    /// Remove a component. Returns `true` if the entity had one.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
            && self.components.remove::<T>(entity.index()).is_some()
    }

    pub fn get<T: 'static + Send + Sync>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.components.get::<T>(entity.index())
    }

    pub fn get_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.components.get_mut::<T>(entity.index())
    }

    pub fn has<T: 'static + Send + Sync>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Register `T` ahead of its first use, returning its id.
    pub fn register_component<T: 'static + Send + Sync>(&mut self) -> ComponentId {
        self.components.registry_mut().register::<T>()
    }

    pub fn component_id<T: 'static>(&self) -> Option<ComponentId> {
        self.components.registry().id_of::<T>()
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut Components {
        &mut self.components
    }

    // ── Transforms ───────────────────────────────────────────────────

    /// Set the local matrix and recompute world matrices for the entity and
    /// its descendants.
    pub fn set_local(&mut self, entity: Entity, local: Mat4) -> Result<(), EcsError> {
        check_alive(&self.allocator, entity)?;
        self.transforms.set_local(entity, local);
        Ok(())
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> Result<(), EcsError> {
        self.set_local(entity, transform.matrix())
    }

    /// Make `child` the last child of `parent`.
    ///
    /// Fails with [`EcsError::CyclicParent`] if `parent` is `child` or one of
    /// its descendants; the hierarchy is left unchanged.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        check_alive(&self.allocator, child)?;
        check_alive(&self.allocator, parent)?;
        self.transforms.set_parent(child, parent)
    }

    /// Detach from the parent, keeping the local matrix. Returns whether the
    /// entity had a parent.
    pub fn remove_parent(&mut self, entity: Entity) -> Result<bool, EcsError> {
        check_alive(&self.allocator, entity)?;
        Ok(self.transforms.remove_parent(entity))
    }

    /// Cached world matrix; identity if the entity has no transform row.
    pub fn world_of(&self, entity: Entity) -> Mat4 {
        self.transforms.world_of(entity)
    }

    pub fn local_of(&self, entity: Entity) -> Option<Mat4> {
        self.transforms.local_of(entity)
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.transforms.parent_of(entity)
    }

    /// Children in the order they were attached.
    pub fn children(&self, entity: Entity) -> Children<'_> {
        self.transforms.children(entity)
    }

    pub fn transforms(&self) -> &TransformHierarchy {
        &self.transforms
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Query all live entities holding the components named by `Q`.
    ///
    /// Each type may appear in `Q` at most once. A repeated type matches
    /// nothing here; [`Schedule`](super::Schedule) rejects it outright.
    ///
    /// # Example
    ///
    /// ```
    /// # use stofn::prelude::*;
    /// # struct Position(Vec3);
    /// # struct Velocity(Vec3);
    /// # let mut world = World::new();
    /// world.query::<(&mut Position, &Velocity)>(|_entity, (pos, vel)| {
    ///     pos.0 += vel.0;
    /// });
    /// ```
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        if let Err(never) = self.run_query::<Q, _, Infallible>(0.0, |_, entity, item| {
            f(entity, item);
            Ok(())
        }) {
            match never {}
        }
    }

    /// Visit matching entities in slot order with a [`SystemContext`],
    /// stopping at the first error.
    ///
    /// Components are always handed back to the world, even on error.
    pub fn run_query<Q, F, E>(&mut self, dt: f32, mut f: F) -> Result<(), E>
    where
        Q: QueryParam,
        F: FnMut(&mut SystemContext<'_>, Entity, Q::Item<'_>) -> Result<(), E>,
    {
        let mut cols = Q::extract(&mut self.components);
        let mut ctx = SystemContext::new(dt, &self.allocator, &mut self.transforms);
        let mut result = Ok(());
        for slot in 0..self.allocator.total_slots() {
            let Some(entity) = self.allocator.entity_at(slot) else {
                continue;
            };
            if let Some(item) = Q::fetch(&mut cols, slot) {
                if let Err(err) = f(&mut ctx, entity, item) {
                    result = Err(err);
                    break;
                }
            }
        }
        Q::restore(cols, &mut self.components);
        result
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Collect entity pool statistics and reset per-frame counters.
    #[cfg(feature = "diagnostics")]
    pub(crate) fn take_entity_pool_stats(&mut self) -> crate::diag::EntityPoolStats {
        let stats = crate::diag::EntityPoolStats {
            total_slots: self.allocator.total_slots(),
            free_count: self.allocator.free_count(),
            alive_count: self.allocator.alive_count(),
            spawned_this_frame: self.spawned_this_frame,
            despawned_this_frame: self.despawned_this_frame,
        };
        self.spawned_this_frame = 0;
        self.despawned_this_frame = 0;
        stats
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
