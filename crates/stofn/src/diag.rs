//! Diagnostics: a serializable snapshot of world and schedule state.
//!
//! Enabled by the `diagnostics` feature flag. [`WorldStats::collect`] gathers
//! entity pool usage, per-component record counts, hierarchy size and the
//! schedule's last per-system timings into one value that serializes to JSON
//! for whatever tool wants to display it.
//!
//! Reading the stats resets the world's per-frame spawn/despawn counters, so
//! call it once per frame.

use serde::Serialize;

use crate::ecs::system::SystemTiming;
use crate::ecs::{Schedule, World};

/// Entity pool statistics gathered by `World::take_entity_pool_stats()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityPoolStats {
    pub total_slots: u32,
    pub free_count: usize,
    pub alive_count: usize,
    pub spawned_this_frame: u32,
    pub despawned_this_frame: u32,
}

impl EntityPoolStats {
    /// Share of allocated slots sitting in the free list, in percent.
    pub fn fragmentation_pct(&self) -> f32 {
        if self.total_slots == 0 {
            0.0
        } else {
            self.free_count as f32 / self.total_slots as f32 * 100.0
        }
    }
}

/// Number of records stored for one component type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentCount {
    pub name: String,
    pub count: usize,
}

/// One frame's worth of world statistics.
#[derive(Debug, Clone, Serialize)]
pub struct WorldStats {
    pub entity_pool: EntityPoolStats,
    pub fragmentation_pct: f32,
    pub components: Vec<ComponentCount>,
    pub transform_rows: usize,
    pub root_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_timings: Vec<SystemTiming>,
}

impl WorldStats {
    /// Snapshot `world` (resetting its per-frame counters) and, if given, the
    /// timings of the schedule's last run.
    pub fn collect(world: &mut World, schedule: Option<&Schedule>) -> Self {
        let entity_pool = world.take_entity_pool_stats();
        let components = world
            .components()
            .counts()
            .into_iter()
            .map(|(id, count)| ComponentCount {
                name: world
                    .components()
                    .registry()
                    .info(id)
                    .map(|info| short_type_name(info.name))
                    .unwrap_or_else(|| format!("{:?}", id)),
                count,
            })
            .collect();
        let transforms = world.transforms();
        Self {
            fragmentation_pct: entity_pool.fragmentation_pct(),
            entity_pool,
            components,
            transform_rows: transforms.len(),
            root_count: transforms.roots().count(),
            system_timings: schedule.map(|s| s.timings().to_vec()).unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Strip module paths from a type name, including inside generics
/// (`alloc::vec::Vec<game::Foo>` → `Vec<Foo>`).
fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    for (i, c) in full.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '&' | '[' | ']' | ';') {
            out.push_str(last_segment(&full[segment_start..i]));
            out.push(c);
            segment_start = i + c.len_utf8();
        }
    }
    out.push_str(last_segment(&full[segment_start..]));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
