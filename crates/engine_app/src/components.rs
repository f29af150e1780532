//! Components used by the demo simulation.

use engine_ecs::Component;

/// World-space position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Component for Position {}

/// Units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Component for Velocity {}

/// Seconds left before the entity is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Component for Lifetime {}
