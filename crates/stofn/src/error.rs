//! Error type shared by the world, the transform hierarchy and the scheduler.
//!
//! Only misuse that a caller can reasonably react to is reported here. Bugs
//! inside the framework itself (a type-erased column holding the wrong type)
//! still panic, the same way the queries do.

use thiserror::Error;

use crate::ecs::Entity;
use crate::ecs::component::ComponentId;

/// Errors returned by [`World`](crate::ecs::World) and
/// [`Schedule`](crate::ecs::Schedule) operations.
#[derive(Debug, Error)]
pub enum EcsError {
    /// The handle's generation no longer matches its slot: the entity was
    /// despawned (and the slot possibly reused).
    #[error("entity {0} is not alive")]
    StaleHandle(Entity),

    /// Every slot index up to the configured limit is in use.
    #[error("entity slot space exhausted ({max_slots} slots)")]
    CapacityExhausted { max_slots: u32 },

    /// Parenting `child` under `parent` would make `child` its own ancestor.
    #[error("cannot parent {child} under {parent}: would create a cycle")]
    CyclicParent { child: Entity, parent: Entity },

    /// A system asked for the same component more than once.
    #[error("system `{system}` requests component {component:?} more than once")]
    ConflictingAccess {
        system: String,
        component: ComponentId,
    },

    /// A system callback failed; the rest of the frame was skipped.
    #[error("system `{system}` failed")]
    System {
        system: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid world config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse world config")]
    ConfigParse(#[from] serde_json::Error),
}
