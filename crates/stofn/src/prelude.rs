//! Convenience re-exports: `use stofn::prelude::*` for the common items.

pub use crate::config::WorldConfig;
pub use crate::ecs::{Entity, QuerySystem, Schedule, System, SystemContext, World};
pub use crate::error::EcsError;
pub use crate::math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::time::Time;

#[cfg(feature = "diagnostics")]
pub use crate::diag::WorldStats;
