//! Entity Hierarchies: headless solar system demo.
//!
//! Planets orbit the sun; moons orbit their planet. Only the orbit pivots are
//! rotated each frame, everything else follows through the hierarchy.
//! Halfway through, one planet is despawned together with its moon.
//!
//! Run with: `RUST_LOG=info cargo run -p stofn --example solar_system`

use std::f32::consts::TAU;
use std::time::Duration;

use anyhow::ensure;
use stofn::prelude::*;

// ── Markers ──────────────────────────────────────────────────────────────

struct Sun;
struct Planet(&'static str);
struct Moon;

// ── Orbit component ─────────────────────────────────────────────────────

/// Spins the entity's local transform about Z.
struct Orbit {
    speed: f32,
    angle: f32,
}

const FRAMES: u32 = 120;
const STEP: Duration = Duration::from_millis(50);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut world = World::new();
    let sun = world.spawn();
    world.add(sun, Sun)?;
    world.set_transform(sun, Transform::default())?;

    let planet_configs = [
        ("mercury", 4.0, 1.6, None),
        ("earth", 10.0, 1.0, Some((1.5, 4.0))),
        ("mars", 15.0, 0.8, Some((1.0, 3.0))),
    ];
    let mut pivots = Vec::new();
    for &(name, distance, speed, moon) in &planet_configs {
        pivots.push(spawn_planet(&mut world, sun, name, distance, speed, moon)?);
    }

    let mut schedule = Schedule::new();
    schedule
        .add_query::<&mut Orbit, _>("orbit", |ctx, entity, orbit| {
            orbit.angle = (orbit.angle + orbit.speed * ctx.dt()) % TAU;
            ctx.set_local(entity, Mat4::from_rotation_z(orbit.angle))?;
            Ok(())
        })
        .add_query::<&Planet, _>("bounds", |ctx, entity, planet| {
            let distance = ctx.world_of(entity).w_axis.truncate().length();
            ensure!(distance < 100.0, "{} escaped to {distance}", planet.0);
            Ok(())
        });

    let mut time = Time::new();
    for frame in 0..FRAMES {
        time.tick_fixed(STEP);
        schedule.run(&mut world, time.delta_secs())?;

        if frame == FRAMES / 2 {
            let pivot = pivots.remove(0);
            world.despawn_recursive(pivot);
            log::info!("despawned a planet, {} entities left", world.entity_count());
        }
        if frame % 20 == 0 {
            log_positions(&mut world);
        }
    }

    #[cfg(feature = "diagnostics")]
    log::info!(
        "stats: {}",
        stofn::diag::WorldStats::collect(&mut world, Some(&schedule)).to_json()?
    );
    Ok(())
}

/// Sun → pivot → planet → moon pivot → moon. Returns the planet's pivot.
fn spawn_planet(
    world: &mut World,
    sun: Entity,
    name: &'static str,
    distance: f32,
    speed: f32,
    moon: Option<(f32, f32)>,
) -> Result<Entity, EcsError> {
    // Rotating the pivot makes its children orbit.
    let pivot = world.spawn();
    world.add(pivot, Orbit { speed, angle: 0.0 })?;
    world.set_parent(pivot, sun)?;

    let planet = world.spawn();
    world.add(planet, Planet(name))?;
    world.set_transform(planet, Transform::from_xy(distance, 0.0))?;
    world.set_parent(planet, pivot)?;

    if let Some((moon_distance, moon_speed)) = moon {
        let moon_pivot = world.spawn();
        world.add(moon_pivot, Orbit { speed: moon_speed, angle: 0.0 })?;
        world.set_parent(moon_pivot, planet)?;

        let moon = world.spawn();
        world.add(moon, Moon)?;
        world.set_transform(moon, Transform::from_xy(moon_distance, 0.0))?;
        world.set_parent(moon, moon_pivot)?;
    }
    Ok(pivot)
}

fn log_positions(world: &mut World) {
    let mut planets = Vec::new();
    world.query::<&Planet>(|entity, planet| planets.push((planet.0, entity)));
    for (name, entity) in planets {
        let p = world.world_of(entity).w_axis.truncate();
        log::info!("{name:>8}: ({:6.2}, {:6.2})", p.x, p.y);
    }

    let mut moons = Vec::new();
    world.query::<&Moon>(|entity, _| moons.push(entity));
    for moon in moons {
        let t = Transform::from_matrix(world.world_of(moon));
        log::debug!("moon {} at {}", moon, t.translation);
    }
}
