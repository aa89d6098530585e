//! The demo simulation: particles that move, decay and get replaced.

use anyhow::Result;
use tessera_world::prelude::*;
use tracing::{debug, trace};

use crate::components::{FrameClock, Frozen, Lifetime, Position, Velocity};

/// Frames between freeze toggles.
const FREEZE_PERIOD: u64 = 30;

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub moved: usize,
    pub respawned: usize,
    pub toggled: usize,
}

/// A world plus the queries the frame loop reuses every frame.
pub struct Simulation {
    world: World,
    movers: Query<(&'static mut Position, &'static Velocity), Without<Frozen>>,
    decaying: Query<(&'static mut Lifetime, Option<&'static Frozen>)>,
    freezable: CachedQuery,
    spawned: usize,
    respawned: usize,
}

impl Simulation {
    /// Build a world from `config` and fill it with `entities` particles.
    pub fn new(config: WorldConfig, entities: usize, rate: f32) -> Result<Self> {
        let mut world = World::with_config(config)?;
        world.insert_state(FrameClock::new(rate));

        let mut simulation = Self {
            movers: world.query_filtered(),
            decaying: world.query(),
            freezable: {
                let velocity = world.register_component::<Velocity>();
                world.cached_query(QueryDescriptor::new().require(velocity))?
            },
            world,
            spawned: 0,
            respawned: 0,
        };
        for _ in 0..entities {
            simulation.spawn_particle()?;
        }
        Ok(simulation)
    }

    /// The simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Total respawns so far.
    #[must_use]
    pub fn respawned(&self) -> usize {
        self.respawned
    }

    /// Advance the simulation by one frame.
    pub fn step(&mut self) -> Result<FrameStats> {
        let dt = self.world.state::<FrameClock>()?.dt;

        let mut moved = 0;
        self.world.for_each(&mut self.movers, |_, (position, velocity)| {
            position.value += velocity.displacement(dt);
            moved += 1;
        });

        let mut expired = Vec::new();
        for (entity, (lifetime, frozen)) in self.world.iter(&mut self.decaying) {
            lifetime.decay(if frozen.is_some() { 2.0 } else { 1.0 });
            if lifetime.is_expired() {
                expired.push(entity);
            }
        }
        for &entity in &expired {
            self.world.destroy(entity)?;
            let replacement = self.spawn_particle()?;
            trace!(expired = entity.id(), replacement = replacement.id(), "respawned particle");
        }
        self.respawned += expired.len();

        let clock = self.world.state_mut::<FrameClock>()?;
        clock.advance();
        let frame = clock.frame;

        let toggled = if frame % FREEZE_PERIOD == 0 {
            self.toggle_frozen()?
        } else {
            0
        };

        debug!(frame, moved, respawned = expired.len(), toggled, "frame complete");
        Ok(FrameStats {
            frame,
            moved,
            respawned: expired.len(),
            toggled,
        })
    }

    /// Flip the `Frozen` tag on every seventh moving particle.
    fn toggle_frozen(&mut self) -> Result<usize> {
        let candidates = self.world.entities(&mut self.freezable);
        let mut toggled = 0;
        for entity in candidates.into_iter().step_by(7) {
            if self.world.has_component::<Frozen>(entity) {
                self.world.remove_component::<Frozen>(entity)?;
            } else {
                self.world.add_component(entity, Frozen)?;
            }
            toggled += 1;
        }
        Ok(toggled)
    }

    fn spawn_particle(&mut self) -> Result<Entity> {
        let i = self.spawned;
        self.spawned += 1;

        let position = Position::new(i as f32, 0.0, 0.0);
        let velocity = Velocity::new((i % 7) as f32 - 3.0, 1.0, (i % 3) as f32);
        // Every fourth particle is immortal, which keeps a second archetype
        // populated.
        let entity = if i % 4 == 3 {
            self.world.spawn_with((position, velocity))?
        } else {
            let lifetime = Lifetime::new(20.0 + (i % 5) as f32 * 10.0);
            self.world.spawn_with((position, velocity, lifetime))?
        };
        Ok(entity)
    }
}
