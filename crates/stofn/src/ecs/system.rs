//! # System: Functions That Run Every Frame
//!
//! There are two kinds of system:
//!
//! - **Closure systems**: any `FnMut(&mut World, f32) -> anyhow::Result<()>`.
//!   They get the whole world and the frame delta and do whatever they like.
//! - **Query systems** ([`QuerySystem`]): declare a [`QueryParam`] such as
//!   `(&Position, &mut Velocity, Option<&Mass>)` and a per-entity callback.
//!   The schedule visits live entities in slot order and calls back for each
//!   one that holds every required component.
//!
//! ## Schedule
//!
//! A [`Schedule`] is a `Vec` of systems run in the order they were added, one
//! after another. Before a system runs its declared access is checked; asking
//! for the same component twice is rejected with
//! [`EcsError::ConflictingAccess`].
//!
//! If a callback returns an error the frame stops right there: the remaining
//! systems (and the remaining entities of the failing system) are skipped and
//! the error comes back from [`Schedule::run`] wrapped in [`EcsError::System`].
//!
//! ## Structural changes during a query
//!
//! While a query system runs, its components are checked out of the world, so
//! the callback can't spawn or despawn. It gets a [`SystemContext`] instead,
//! which can read and write the transform hierarchy.

use std::any::type_name;

use super::component::ComponentRegistry;
use super::entity::{Entity, EntityAllocator};
use super::hierarchy::TransformHierarchy;
use super::query::{Access, QueryMarker, QueryParam, find_conflict};
use super::world::World;
use crate::error::EcsError;
use crate::math::{Mat4, Transform};

/// What a query callback can touch besides its own components.
pub struct SystemContext<'a> {
    dt: f32,
    entities: &'a EntityAllocator,
    transforms: &'a mut TransformHierarchy,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        dt: f32,
        entities: &'a EntityAllocator,
        transforms: &'a mut TransformHierarchy,
    ) -> Self {
        Self {
            dt,
            entities,
            transforms,
        }
    }

    /// Seconds since the previous frame.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn world_of(&self, entity: Entity) -> Mat4 {
        self.transforms.world_of(entity)
    }

    pub fn local_of(&self, entity: Entity) -> Option<Mat4> {
        self.transforms.local_of(entity)
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.transforms.parent_of(entity)
    }

    pub fn set_local(&mut self, entity: Entity, local: Mat4) -> Result<(), EcsError> {
        check_alive(self.entities, entity)?;
        self.transforms.set_local(entity, local);
        Ok(())
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> Result<(), EcsError> {
        self.set_local(entity, transform.matrix())
    }

    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        check_alive(self.entities, child)?;
        check_alive(self.entities, parent)?;
        self.transforms.set_parent(child, parent)
    }

    pub fn remove_parent(&mut self, entity: Entity) -> Result<bool, EcsError> {
        check_alive(self.entities, entity)?;
        Ok(self.transforms.remove_parent(entity))
    }
}

/// `Err(StaleHandle)` unless `entity` is alive.
pub(crate) fn check_alive(entities: &EntityAllocator, entity: Entity) -> Result<(), EcsError> {
    if entities.is_alive(entity) {
        Ok(())
    } else {
        log::warn!("rejected operation on stale handle {:?}", entity);
        Err(EcsError::StaleHandle(entity))
    }
}

/// A system that can be executed on a [`World`].
///
/// Any `FnMut(&mut World, f32) -> anyhow::Result<()>` implements this trait,
/// so you can use closures or function pointers directly.
pub trait System {
    /// Components this system reads or writes. Closure systems declare
    /// nothing.
    fn access(&self, _registry: &mut ComponentRegistry) -> Vec<Access> {
        Vec::new()
    }

    fn run(&mut self, world: &mut World, dt: f32) -> anyhow::Result<()>;
}

/// Blanket impl: any `FnMut(&mut World, f32) -> anyhow::Result<()>` is a
/// `System`.
impl<F: FnMut(&mut World, f32) -> anyhow::Result<()>> System for F {
    fn run(&mut self, world: &mut World, dt: f32) -> anyhow::Result<()> {
        (self)(world, dt)
    }
}

/// A per-entity callback over the entities matching `Q`.
pub struct QuerySystem<Q, F> {
    f: F,
    _query: QueryMarker<Q>,
}

impl<Q, F> QuerySystem<Q, F>
where
    Q: QueryParam,
    F: FnMut(&mut SystemContext<'_>, Entity, Q::Item<'_>) -> anyhow::Result<()>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _query: QueryMarker::default(),
        }
    }
}

impl<Q, F> System for QuerySystem<Q, F>
where
    Q: QueryParam,
    F: FnMut(&mut SystemContext<'_>, Entity, Q::Item<'_>) -> anyhow::Result<()>,
{
    fn access(&self, registry: &mut ComponentRegistry) -> Vec<Access> {
        Q::access(registry)
    }

    fn run(&mut self, world: &mut World, dt: f32) -> anyhow::Result<()> {
        world.run_query::<Q, _, anyhow::Error>(dt, &mut self.f)
    }
}

/// A boxed [`System`] with a short name for errors and diagnostics.
struct NamedSystem {
    name: String,
    system: Box<dyn System>,
}

/// Per-system timing recorded during a single frame.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// An ordered list of systems to run.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    /// Per-system timings from the most recent `run()` call.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule, named after its type.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> &mut Self {
        self.add_named_system(short_system_name(type_name::<S>()), system)
    }

    /// Add a system under an explicit name.
    pub fn add_named_system<S: System + 'static>(
        &mut self,
        name: impl Into<String>,
        system: S,
    ) -> &mut Self {
        self.systems.push(NamedSystem {
            name: name.into(),
            system: Box::new(system),
        });
        self
    }

    /// Add a query system: `f` runs once per live entity holding every
    /// required component of `Q`, in slot order.
    ///
    /// ```
    /// use stofn::prelude::*;
    ///
    /// struct Velocity(Vec3);
    ///
    /// let mut schedule = Schedule::new();
    /// schedule.add_query::<&Velocity, _>("integrate", |ctx, entity, vel| {
    ///     let local = ctx.local_of(entity).unwrap_or(Mat4::IDENTITY);
    ///     ctx.set_local(entity, Mat4::from_translation(vel.0 * ctx.dt()) * local)?;
    ///     Ok(())
    /// });
    /// ```
    pub fn add_query<Q, F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        Q: QueryParam + 'static,
        F: FnMut(&mut SystemContext<'_>, Entity, Q::Item<'_>) -> anyhow::Result<()> + 'static,
    {
        self.add_named_system(name, QuerySystem::<Q, F>::new(f))
    }

    /// Run all systems in order on the given world.
    ///
    /// Stops at the first failing system.
    pub fn run(&mut self, world: &mut World, dt: f32) -> Result<(), EcsError> {
        #[cfg(feature = "diagnostics")]
        self.timings.clear();

        for ns in &mut self.systems {
            let access = ns.system.access(world.components_mut().registry_mut());
            if let Some(component) = find_conflict(&access) {
                log::error!(
                    "system `{}` requests component {:?} more than once",
                    ns.name,
                    component
                );
                return Err(EcsError::ConflictingAccess {
                    system: ns.name.clone(),
                    component,
                });
            }

            #[cfg(feature = "diagnostics")]
            let start = std::time::Instant::now();

            let result = ns.system.run(world, dt);

            #[cfg(feature = "diagnostics")]
            self.timings.push(SystemTiming {
                name: ns.name.clone(),
                duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
            });

            if let Err(source) = result {
                log::error!("system `{}` failed: {:#}", ns.name, source);
                return Err(EcsError::System {
                    system: ns.name.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Returns the number of systems in this schedule.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in run order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|ns| ns.name.as_str())
    }

    /// Timings from the most recent [`run`](Self::run), one per system that
    /// actually ran.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `solar_system::orbit` → `orbit`,
/// `{{closure}}` → `<closure>`).
fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    struct X(i32);
    #[derive(Debug, PartialEq)]
    struct Y(i32);

    fn dummy_system(_world: &mut World, _dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn schedule_captures_system_name() {
        let mut schedule = Schedule::new();
        schedule.add_system(dummy_system);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.names().collect::<Vec<_>>(), ["dummy_system"]);
    }

    #[test]
    fn closure_system_name() {
        let mut schedule = Schedule::new();
        schedule.add_system(|_world: &mut World, _dt: f32| -> anyhow::Result<()> { Ok(()) });
        assert_eq!(schedule.systems[0].name, "<closure>");
    }

    #[test]
    fn query_system_visits_matching_entities_in_slot_order() {
        let mut world = World::new();
        let e: Vec<Entity> = (0..5).map(|_| world.spawn()).collect();
        world.add(e[0], X(0)).unwrap();
        world.add(e[1], X(1)).unwrap();
        world.add(e[1], Y(10)).unwrap();
        world.add(e[2], Y(20)).unwrap();
        world.add(e[3], Y(30)).unwrap();
        world.add(e[3], X(3)).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut schedule = Schedule::new();
        schedule.add_query::<(&X, &mut Y), _>("xy", move |_, entity, (x, y)| {
            y.0 += x.0;
            log.borrow_mut().push(entity);
            Ok(())
        });
        schedule.run(&mut world, 0.016).unwrap();

        assert_eq!(*seen.borrow(), vec![e[1], e[3]]);
        assert_eq!(world.get::<Y>(e[1]), Some(&Y(11)));
        assert_eq!(world.get::<Y>(e[3]), Some(&Y(33)));
        assert_eq!(world.get::<Y>(e[2]), Some(&Y(20)));
    }

    #[test]
    fn systems_run_in_order_with_dt() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut schedule = Schedule::new();
        for i in 0..3 {
            let order = order.clone();
            schedule.add_named_system(format!("s{i}"), move |_: &mut World, dt: f32| -> anyhow::Result<()> {
                order.borrow_mut().push((i, dt));
                Ok(())
            });
        }
        schedule.run(&mut World::new(), 0.5).unwrap();
        assert_eq!(*order.borrow(), vec![(0, 0.5), (1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn failure_aborts_rest_of_frame() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.add(a, X(1)).unwrap();
        world.add(b, X(2)).unwrap();

        let visited = Rc::new(RefCell::new(0));
        let later_ran = Rc::new(RefCell::new(false));
        let v = visited.clone();
        let l = later_ran.clone();

        let mut schedule = Schedule::new();
        schedule
            .add_query::<&X, _>("fails", move |_, _, x| {
                *v.borrow_mut() += 1;
                if x.0 == 1 {
                    bail!("bad value {}", x.0);
                }
                Ok(())
            })
            .add_named_system("later", move |_: &mut World, _: f32| -> anyhow::Result<()> {
                *l.borrow_mut() = true;
                Ok(())
            });

        let err = schedule.run(&mut world, 0.0).unwrap_err();
        match err {
            EcsError::System { system, source } => {
                assert_eq!(system, "fails");
                assert_eq!(source.to_string(), "bad value 1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*visited.borrow(), 1);
        assert!(!*later_ran.borrow());
        // Components were handed back despite the early exit.
        assert_eq!(world.get::<X>(b), Some(&X(2)));
    }

    #[test]
    fn conflicting_access_is_rejected_before_running() {
        let mut world = World::new();
        let e = world.spawn();
        world.add(e, X(1)).unwrap();

        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        let mut schedule = Schedule::new();
        schedule.add_query::<(&X, &mut X), _>("aliased", move |_, _, _| {
            *r.borrow_mut() = true;
            Ok(())
        });
        let err = schedule.run(&mut world, 0.0).unwrap_err();
        assert!(matches!(err, EcsError::ConflictingAccess { ref system, .. } if system == "aliased"));
        assert!(!*ran.borrow());
    }

    #[test]
    fn repeated_shared_read_is_rejected() {
        let mut world = World::new();
        let e = world.spawn();
        world.add(e, X(1)).unwrap();

        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        let mut schedule = Schedule::new();
        schedule.add_query::<(&X, &X), _>("twice", move |_, _, _| {
            *r.borrow_mut() = true;
            Ok(())
        });
        let err = schedule.run(&mut world, 0.0).unwrap_err();
        let x = world.components().registry().id_of::<X>();
        assert!(matches!(
            err,
            EcsError::ConflictingAccess { ref system, component }
                if system == "twice" && Some(component) == x
        ));
        assert!(!*ran.borrow());
    }

    #[test]
    fn optional_components_do_not_filter() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.add(a, X(1)).unwrap();
        world.add(b, X(2)).unwrap();
        world.add(b, Y(5)).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut schedule = Schedule::new();
        schedule.add_query::<(&X, Option<&Y>), _>("opt", move |_, _, (x, y)| {
            log.borrow_mut().push((x.0, y.map(|y| y.0)));
            Ok(())
        });
        schedule.run(&mut world, 0.0).unwrap();
        assert_eq!(*seen.borrow(), vec![(1, None), (2, Some(5))]);
    }

    #[test]
    fn context_writes_transforms() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world.spawn();
        world.add(child, X(3)).unwrap();

        let mut schedule = Schedule::new();
        schedule.add_query::<&X, _>("attach", move |ctx, entity, x| {
            ctx.set_local(parent, Mat4::from_translation(crate::math::Vec3::X))?;
            ctx.set_parent(entity, parent)?;
            ctx.set_local(entity, Mat4::from_translation(crate::math::Vec3::Y * x.0 as f32))?;
            Ok(())
        });
        schedule.run(&mut world, 0.0).unwrap();

        assert_eq!(world.parent_of(child), Some(parent));
        assert_eq!(
            world.world_of(child).w_axis.truncate(),
            crate::math::Vec3::new(1.0, 3.0, 0.0)
        );
    }

    #[test]
    fn context_rejects_stale_handles() {
        let mut world = World::new();
        let gone = world.spawn();
        world.despawn(gone);
        let e = world.spawn();
        world.add(e, X(0)).unwrap();

        let mut schedule = Schedule::new();
        schedule.add_query::<&X, _>("stale", move |ctx, _, _| {
            ctx.set_local(gone, Mat4::IDENTITY)?;
            Ok(())
        });
        let err = schedule.run(&mut world, 0.0).unwrap_err();
        let EcsError::System { source, .. } = err else {
            panic!("expected a system error");
        };
        assert!(matches!(
            source.downcast_ref::<EcsError>(),
            Some(EcsError::StaleHandle(h)) if *h == gone
        ));
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn records_one_timing_per_system() {
        let mut schedule = Schedule::new();
        schedule.add_system(dummy_system).add_system(dummy_system);
        schedule.run(&mut World::new(), 0.0).unwrap();
        assert_eq!(schedule.timings().len(), 2);
        assert_eq!(schedule.timings()[0].name, "dummy_system");
    }
}
