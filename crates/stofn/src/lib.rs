//! # Stofn: Entity/Component Store with a Transform Hierarchy
//!
//! A small, single-threaded ECS core: generational entity handles, per-type
//! component storage, a parent/child transform hierarchy with eagerly
//! propagated world matrices, and an ordered system schedule.
//!
//! Start with `use stofn::prelude::*` and create a [`World`](ecs::World).
//!
//! ```
//! use stofn::prelude::*;
//!
//! let mut world = World::new();
//! let parent = world.spawn();
//! let child = world.spawn();
//! world.set_parent(child, parent).unwrap();
//! world.set_local(parent, Mat4::from_translation(Vec3::X)).unwrap();
//! assert_eq!(world.world_of(child), Mat4::from_translation(Vec3::X));
//! ```

pub mod config;
pub mod ecs;
pub mod error;
pub mod math;
pub mod prelude;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;
