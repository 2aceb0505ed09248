//! # Entity/Component Store with a Transform Hierarchy
//!
//! Entities are generational handles into a slot table. Components live in one
//! sparse set per type, and every entity can have a local transform and a
//! parent in a dense, index-linked hierarchy that keeps world matrices up to
//! date as soon as anything changes.
//!
//! ## Module Overview
//!
//! - [`entity`]: Generational entity handles and slot recycling
//! - [`component`]: Component registry and per-type sparse-set storage
//! - [`hierarchy`]: Parent/child transform rows and world-matrix propagation
//! - [`query`]: Closure-based iteration over entities with given components
//! - [`system`]: System trait, query systems and the schedule runner
//! - [`world`]: Central container tying the above together

pub mod component;
pub mod entity;
pub mod hierarchy;
pub mod query;
pub mod system;
pub mod world;

pub use component::{ComponentId, ComponentRegistry, ComponentStorage, Components};
pub use entity::Entity;
pub use hierarchy::{Children, TransformHierarchy};
pub use query::{Access, QueryParam};
pub use system::{QuerySystem, Schedule, System, SystemContext};
pub use world::World;
