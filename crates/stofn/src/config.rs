//! World configuration.
//!
//! Everything has a sensible default, so most hosts just call
//! [`World::new`](crate::ecs::World::new). Tools that want to tune the slot
//! recycling policy can load a [`WorldConfig`] from JSON:
//!
//! ```
//! use stofn::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "free_list_low_water": 16 }"#).unwrap();
//! assert_eq!(config.free_list_low_water, 16);
//! assert_eq!(config.max_slots, WorldConfig::MAX_SLOTS);
//! ```

use serde::{Deserialize, Serialize};

use crate::ecs::Entity;
use crate::error::EcsError;

/// Tuning knobs for a [`World`](crate::ecs::World).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Freed slots are only recycled once more than this many are queued.
    /// Until then every spawn takes a fresh slot index.
    pub free_list_low_water: usize,
    /// Upper bound on distinct slot indices.
    pub max_slots: u32,
    /// Slots reserved up front in the allocator, component and transform tables.
    pub initial_capacity: usize,
}

impl WorldConfig {
    /// Default low-water mark for slot recycling.
    pub const DEFAULT_LOW_WATER: usize = 1024;

    /// Slot indices are 24 bits wide.
    pub const MAX_SLOTS: u32 = Entity::MAX_INDEX + 1;

    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EcsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_low_water(mut self, low_water: usize) -> Self {
        self.free_list_low_water = low_water;
        self
    }

    pub fn with_max_slots(mut self, max_slots: u32) -> Self {
        self.max_slots = max_slots;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Check that the values describe a usable world.
    pub fn validate(&self) -> Result<(), EcsError> {
        if self.max_slots == 0 {
            return Err(EcsError::InvalidConfig("max_slots must be at least 1".into()));
        }
        if self.max_slots > Self::MAX_SLOTS {
            return Err(EcsError::InvalidConfig(format!(
                "max_slots {} exceeds the 24-bit slot index range ({})",
                self.max_slots,
                Self::MAX_SLOTS
            )));
        }
        if self.initial_capacity > self.max_slots as usize {
            return Err(EcsError::InvalidConfig(format!(
                "initial_capacity {} exceeds max_slots {}",
                self.initial_capacity, self.max_slots
            )));
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            free_list_low_water: Self::DEFAULT_LOW_WATER,
            max_slots: Self::MAX_SLOTS,
            initial_capacity: 0,
        }
    }
}
