//! Components and state used by the demo simulation.

use glam::Vec3;
use tessera_world::prelude::Component;

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub value: Vec3,
}

impl Position {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            value: Vec3::new(x, y, z),
        }
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// Constant drift of a particle, applied once per frame scaled by the
/// frame's `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub per_second: Vec3,
}

impl Velocity {
    /// Drift of `(x, y, z)` world units per simulated second.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            per_second: Vec3::new(x, y, z),
        }
    }

    /// Offset covered during a frame of `dt` seconds.
    #[must_use]
    pub fn displacement(&self, dt: f32) -> Vec3 {
        self.per_second * dt
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Frames a particle has left before it is replaced.
///
/// Immortal particles are spawned without one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
    pub span: f32,
}

impl Lifetime {
    #[must_use]
    pub fn new(span: f32) -> Self {
        Self {
            remaining: span,
            span,
        }
    }

    /// Burn `frames` of the remaining lifetime. Never goes below zero.
    pub fn decay(&mut self, frames: f32) {
        self.remaining = (self.remaining - frames).max(0.0);
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Share of the span already used, from 0 to 1.
    #[must_use]
    pub fn progress(&self) -> f32 {
        1.0 - self.remaining / self.span
    }
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}

/// Tag: the entity is skipped by the movement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frozen;

impl Component for Frozen {
    fn type_name() -> &'static str {
        "Frozen"
    }
}

/// Frame counter kept in world state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    pub frame: u64,
    /// Seconds per frame.
    pub dt: f32,
}

impl FrameClock {
    #[must_use]
    pub fn new(rate: f32) -> Self {
        Self {
            frame: 0,
            dt: 1.0 / rate,
        }
    }

    /// Move to the next frame.
    pub fn advance(&mut self) {
        self.frame += 1;
    }

    /// Simulated seconds since the first frame.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.frame as f32 * self.dt
    }
}
