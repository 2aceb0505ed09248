//! # Component: Per-Type Dense Storage
//!
//! Components are plain data: a `Mesh`, a `Light`, a `Velocity`. Every
//! component type gets its own [`ComponentStorage<T>`]: a sparse set that maps
//! entity slots to a densely packed `Vec<T>`.
//!
//! ```text
//! sparse:  [0, 2, 0, 1]      ← slot → dense index + 1 (0 = absent)
//! dense:   [Mesh, Mesh]      ← contiguous values
//! owners:  [3, 1]            ← dense index → slot
//! ```
//!
//! Lookup by slot is O(1), iteration over a type touches only the dense array,
//! and removal is a swap-remove that patches the moved value's sparse entry.
//!
//! ## Type Erasure
//!
//! The [`Components`] store keeps one `Box<dyn AnyStorage>` per registered
//! type, indexed by [`ComponentId`]. Typed access downcasts the box back to
//! `ComponentStorage<T>`; a mismatch means the registry and the storage table
//! disagree, which is a framework bug and panics.
//!
//! ## Registration
//!
//! [`ComponentRegistry`] hands out ids in registration order. It is an
//! ordinary value owned by the world, so two worlds never share ids by
//! accident and nothing depends on static initialization order.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Identifier of a registered component type, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Metadata recorded for each registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub type_id: TypeId,
    pub name: &'static str,
}

/// Maps Rust types to [`ComponentId`]s.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, returning its id. Registering the same type again
    /// returns the existing id.
    pub fn register<T: 'static + Send + Sync>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }
        let id = ComponentId(self.infos.len() as u32);
        self.ids.insert(type_id, id);
        self.infos.push(ComponentInfo {
            id,
            type_id,
            name: std::any::type_name::<T>(),
        });
        log::trace!("registered component `{}` as {:?}", std::any::type_name::<T>(), id);
        id
    }

    /// The id of `T`, if it was registered.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Registered types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// Sparse-set storage for a single component type.
pub struct ComponentStorage<T> {
    dense: Vec<T>,
    owners: Vec<u32>,
    sparse: Vec<u32>,
}

impl<T> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
        }
    }

    fn dense_index(&self, slot: u32) -> Option<usize> {
        match self.sparse.get(slot as usize) {
            Some(&i) if i != 0 => Some(i as usize - 1),
            _ => None,
        }
    }

    /// Store `value` for `slot`, replacing any existing value.
    pub fn insert(&mut self, slot: u32, value: T) -> &mut T {
        if let Some(i) = self.dense_index(slot) {
            self.dense[i] = value;
            return &mut self.dense[i];
        }
        let idx = slot as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, 0);
        }
        self.dense.push(value);
        self.owners.push(slot);
        self.sparse[idx] = self.dense.len() as u32;
        let last = self.dense.len() - 1;
        &mut self.dense[last]
    }

    /// Swap-remove the value for `slot`.
    pub fn remove(&mut self, slot: u32) -> Option<T> {
        let i = self.dense_index(slot)?;
        self.sparse[slot as usize] = 0;
        let value = self.dense.swap_remove(i);
        self.owners.swap_remove(i);
        // Patch the value that moved into `i`.
        if let Some(&moved) = self.owners.get(i) {
            self.sparse[moved as usize] = i as u32 + 1;
        }
        Some(value)
    }

    pub fn get(&self, slot: u32) -> Option<&T> {
        self.dense_index(slot).map(|i| &self.dense[i])
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.dense_index(slot).map(|i| &mut self.dense[i])
    }

    pub fn contains(&self, slot: u32) -> bool {
        self.dense_index(slot).is_some()
    }

    /// `(slot, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub(crate) fn reserve_slots(&mut self, slots: usize) {
        if slots > self.sparse.len() {
            self.sparse.resize(slots, 0);
        }
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe view of a [`ComponentStorage<T>`] with the type erased.
pub(crate) trait AnyStorage: Any {
    fn remove_slot(&mut self, slot: u32) -> bool;
    fn contains_slot(&self, slot: u32) -> bool;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: 'static + Send + Sync> AnyStorage for ComponentStorage<T> {
    fn remove_slot(&mut self, slot: u32) -> bool {
        self.remove(slot).is_some()
    }

    fn contains_slot(&self, slot: u32) -> bool {
        self.contains(slot)
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

fn type_mismatch<T>() -> ! {
    panic!(
        "Component type mismatch: storage is not `{}`",
        std::any::type_name::<T>()
    )
}

/// All component storages of a world, plus the registry that names them.
///
/// A storage slot is `None` when the type is registered but nothing was ever
/// added, or while a query has it checked out via [`take`](Self::take).
pub struct Components {
    registry: ComponentRegistry,
    storages: Vec<Option<Box<dyn AnyStorage>>>,
    slot_capacity: usize,
}

impl Components {
    pub(crate) fn new(registry: ComponentRegistry, slot_capacity: usize) -> Self {
        Self {
            registry,
            storages: Vec::new(),
            slot_capacity,
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Typed storage for `T`, if any value of `T` was ever added.
    pub fn storage<T: 'static + Send + Sync>(&self) -> Option<&ComponentStorage<T>> {
        let id = self.registry.id_of::<T>()?;
        let boxed = self.storages.get(id.index())?.as_ref()?;
        match boxed.as_any().downcast_ref::<ComponentStorage<T>>() {
            Some(storage) => Some(storage),
            None => type_mismatch::<T>(),
        }
    }

    fn storage_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let id = self.registry.id_of::<T>()?;
        let boxed = self.storages.get_mut(id.index())?.as_mut()?;
        match boxed.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(storage) => Some(storage),
            None => type_mismatch::<T>(),
        }
    }

    /// Insert or replace the `T` stored for `slot`.
    pub(crate) fn insert<T: 'static + Send + Sync>(&mut self, slot: u32, value: T) -> &mut T {
        let id = self.registry.register::<T>();
        if self.storages.len() <= id.index() {
            self.storages.resize_with(id.index() + 1, || None);
        }
        let slot_capacity = self.slot_capacity;
        let boxed = self.storages[id.index()].get_or_insert_with(|| {
            let mut storage = ComponentStorage::<T>::new();
            storage.reserve_slots(slot_capacity);
            Box::new(storage) as Box<dyn AnyStorage>
        });
        match boxed.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(storage) => storage.insert(slot, value),
            None => type_mismatch::<T>(),
        }
    }

    pub(crate) fn remove<T: 'static + Send + Sync>(&mut self, slot: u32) -> Option<T> {
        self.storage_mut::<T>()?.remove(slot)
    }

    pub(crate) fn get<T: 'static + Send + Sync>(&self, slot: u32) -> Option<&T> {
        self.storage::<T>()?.get(slot)
    }

    pub(crate) fn get_mut<T: 'static + Send + Sync>(&mut self, slot: u32) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(slot)
    }

    /// Whether `slot` holds a component with the given id.
    pub fn contains(&self, id: ComponentId, slot: u32) -> bool {
        self.storages
            .get(id.index())
            .and_then(|s| s.as_ref())
            .is_some_and(|s| s.contains_slot(slot))
    }

    /// Drop every component stored for `slot`. Returns how many were removed.
    pub(crate) fn remove_all(&mut self, slot: u32) -> usize {
        self.storages
            .iter_mut()
            .flatten()
            .map(|s| s.remove_slot(slot))
            .filter(|&removed| removed)
            .count()
    }

    /// Number of entities holding each registered type, in id order.
    pub fn counts(&self) -> Vec<(ComponentId, usize)> {
        self.registry
            .iter()
            .map(|info| {
                let count = self
                    .storages
                    .get(info.id.index())
                    .and_then(|s| s.as_ref())
                    .map_or(0, |s| s.len());
                (info.id, count)
            })
            .collect()
    }

    /// Check out the storage for `T` so a query can hold it alongside other
    /// storages. Must be returned with [`restore`](Self::restore).
    pub(crate) fn take<T: 'static + Send + Sync>(
        &mut self,
    ) -> Option<(ComponentId, Box<ComponentStorage<T>>)> {
        let id = self.registry.id_of::<T>()?;
        let boxed = self.storages.get_mut(id.index())?.take()?;
        match boxed.into_any().downcast::<ComponentStorage<T>>() {
            Ok(storage) => Some((id, storage)),
            Err(_) => type_mismatch::<T>(),
        }
    }

    pub(crate) fn restore<T: 'static + Send + Sync>(
        &mut self,
        id: ComponentId,
        storage: Box<ComponentStorage<T>>,
    ) {
        self.storages[id.index()] = Some(storage);
    }
}
