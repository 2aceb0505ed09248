//! # Query: Iterating Over Entities by Component Type
//!
//! A query names the component types it needs; the world visits every live
//! entity in slot order and hands the closure references to the matching
//! records.
//!
//! ```text
//! world.query::<(&Position, &mut Velocity, Option<&Mass>)>(|entity, (pos, vel, mass)| {
//!     // `mass` is None for entities without a Mass; they still match.
//! });
//! ```
//!
//! ## Closure-Based Design
//!
//! Rust's `Iterator` can't express items that borrow from the iterator, so
//! iteration is closure-based. Each parameter checks its storage out of the
//! [`Components`] table (`extract`), which gives the query owned access that
//! the borrow checker can see is disjoint, then puts it back (`restore`).
//!
//! A required parameter whose type has no storage yet simply matches nothing.
//! A storage can only be checked out once, so a query may name each type at
//! most once; the scheduler rejects anything else before running.

use std::marker::PhantomData;

use super::component::{ComponentId, ComponentRegistry, ComponentStorage, Components};

/// How a system touches one component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub id: ComponentId,
    pub mutable: bool,
    /// Optional components are fetched when present but don't filter.
    pub optional: bool,
}

/// Trait for types that can be fetched per entity.
///
/// Implemented for `&T`, `&mut T`, `Option<&T>`, `Option<&mut T>` and tuples
/// of up to eight of those.
pub trait QueryParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// Storage checked out of the world for the duration of the query.
    type Column;

    /// Declared accesses, registering the types if needed. Order follows the
    /// parameter order.
    fn access(registry: &mut ComponentRegistry) -> Vec<Access>;

    fn extract(components: &mut Components) -> Self::Column;

    fn restore(col: Self::Column, components: &mut Components);

    /// The item for `slot`, or `None` if a required component is missing.
    fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>>;
}

/// Checked-out storage for one component type.
pub struct Column<T> {
    storage: Option<(ComponentId, Box<ComponentStorage<T>>)>,
}

impl<T: 'static + Send + Sync> Column<T> {
    fn extract(components: &mut Components) -> Self {
        Self {
            storage: components.take::<T>(),
        }
    }

    fn restore(self, components: &mut Components) {
        if let Some((id, storage)) = self.storage {
            components.restore(id, storage);
        }
    }

    fn get(&self, slot: u32) -> Option<&T> {
        self.storage.as_ref()?.1.get(slot)
    }

    fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.storage.as_mut()?.1.get_mut(slot)
    }
}

fn access_of<T: 'static + Send + Sync>(
    registry: &mut ComponentRegistry,
    mutable: bool,
    optional: bool,
) -> Vec<Access> {
    vec![Access {
        id: registry.register::<T>(),
        mutable,
        optional,
    }]
}

/// Shared read access to a component.
impl<T: 'static + Send + Sync> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = Column<T>;

    fn access(registry: &mut ComponentRegistry) -> Vec<Access> {
        access_of::<T>(registry, false, false)
    }

    fn extract(components: &mut Components) -> Self::Column {
        Column::extract(components)
    }

    fn restore(col: Self::Column, components: &mut Components) {
        col.restore(components);
    }

    fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>> {
        col.get(slot)
    }
}

/// Exclusive write access to a component.
impl<T: 'static + Send + Sync> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = Column<T>;

    fn access(registry: &mut ComponentRegistry) -> Vec<Access> {
        access_of::<T>(registry, true, false)
    }

    fn extract(components: &mut Components) -> Self::Column {
        Column::extract(components)
    }

    fn restore(col: Self::Column, components: &mut Components) {
        col.restore(components);
    }

    fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>> {
        col.get_mut(slot)
    }
}

impl<T: 'static + Send + Sync> QueryParam for Option<&T> {
    type Item<'w> = Option<&'w T>;
    type Column = Column<T>;

    fn access(registry: &mut ComponentRegistry) -> Vec<Access> {
        access_of::<T>(registry, false, true)
    }

    fn extract(components: &mut Components) -> Self::Column {
        Column::extract(components)
    }

    fn restore(col: Self::Column, components: &mut Components) {
        col.restore(components);
    }

    fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>> {
        Some(col.get(slot))
    }
}

impl<T: 'static + Send + Sync> QueryParam for Option<&mut T> {
    type Item<'w> = Option<&'w mut T>;
    type Column = Column<T>;

    fn access(registry: &mut ComponentRegistry) -> Vec<Access> {
        access_of::<T>(registry, true, true)
    }

    fn extract(components: &mut Components) -> Self::Column {
        Column::extract(components)
    }

    fn restore(col: Self::Column, components: &mut Components) {
        col.restore(components);
    }

    fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>> {
        Some(col.get_mut(slot))
    }
}

/// Implement `QueryParam` for tuples of params.
///
/// This lets you write `world.query::<(&A, &mut B)>(|e, (a, b)| { ... })`
/// and get `(Entity, (&A, &mut B))` per matching entity.
macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn access(registry: &mut ComponentRegistry) -> Vec<Access> {
                let mut access = Vec::new();
                $(access.extend($P::access(registry));)+
                access
            }

            #[allow(non_snake_case)]
            fn extract(components: &mut Components) -> Self::Column {
                ($($P::extract(components),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, components: &mut Components) {
                let ($($P,)+) = col;
                $($P::restore($P, components);)+
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, slot: u32) -> Option<Self::Item<'_>> {
                let ($($P,)+) = col;
                Some(($($P::fetch($P, slot)?,)+))
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
impl_query_param_tuple!(A, B, C, D, E, F, G);
impl_query_param_tuple!(A, B, C, D, E, F, G, H);

/// Find the first component that is requested more than once.
pub(crate) fn find_conflict(access: &[Access]) -> Option<ComponentId> {
    access.iter().enumerate().find_map(|(i, a)| {
        access[i + 1..]
            .iter()
            .any(|b| b.id == a.id)
            .then_some(a.id)
    })
}

/// Zero-sized marker tying a query type to a value without owning one.
pub(crate) type QueryMarker<Q> = PhantomData<fn() -> Q>;
