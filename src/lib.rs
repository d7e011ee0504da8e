//! Swept collision detection for real-time simulations.
//!
//! The centerpiece is [`CollisionWorld`][crate::collision::CollisionWorld],
//! which tracks a set of [`Collidable`][crate::entity::Collidable] entities
//! and each tick runs a three-axis sweep-and-prune broad phase followed by a
//! point-sampled continuous narrow phase over the motion since the last tick.

pub mod math;
pub use math::{uv, Ray, Vec3, AABB};

pub mod entity;
pub use entity::{CastHit, Collidable, EntityHandle, Impact};

pub mod collision;
pub use collision::{
    CollisionError, CollisionWorld, PairCounter, Spawner, MAX_RESOLVE_PASSES,
};

#[cfg(test)]
mod testutil;
