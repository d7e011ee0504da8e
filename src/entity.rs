//! The capability surface the collision core requires from simulation
//! entities, and the value types it hands back to them.
//!
//! The core never owns entity behavior. Whatever a body is made of in the
//! wider simulation, collision detection only needs the handful of
//! operations in [`Collidable`]: sampling a hitbox and shape points at a
//! point in time, exact ray intersection, mutual eligibility, a reaction
//! callback and a disposed flag. Entities are shared as
//! `Arc<dyn Collidable>` and identified by pointer; the core keeps no
//! entity-to-entity references of its own.

use crate::math::{Ray, Vec3, AABB};
use std::sync::Arc;

/// Shared handle to an entity participating in collision detection.
pub type EntityHandle = Arc<dyn Collidable>;

/// Operations an entity must provide to participate in collision detection.
///
/// Methods take `&self` even when they conceptually mutate the entity
/// (`update`, `on_collision`): entities are shared between the tick driver,
/// spawning threads and the parallel resolution pool, so implementations
/// are expected to use interior mutability for their own state.
pub trait Collidable: Send + Sync {
    /// World-space bounding box of the entity's shape at the given time.
    fn hitbox(&self, time: f64) -> AABB;

    /// World-space vertex samples of the entity's shape at the given time.
    ///
    /// These are the points swept through time by the narrow phase, so the
    /// same method must return the same number of points from one tick to
    /// the next.
    fn shape_points(&self, time: f64) -> Vec<Vec3>;

    /// Exact intersection test of a ray or segment against the entity's
    /// current shape. Returns None when the shape is not hit.
    fn intersect(&self, ray: Ray) -> Option<Impact>;

    /// Whether this entity is willing to collide with `other`.
    ///
    /// A pair is only considered when both directions agree; the core
    /// checks both rather than symmetrizing one answer.
    fn can_collide_with(&self, other: &dyn Collidable) -> bool;

    /// Reaction callback, invoked on both entities of a confirmed collision
    /// with the shared impact record and the absolute collision time.
    /// Free to mutate the entity's own velocity or orientation, or to
    /// dispose it.
    fn on_collision(&self, other: &dyn Collidable, impact: Impact, time: f64);

    /// Advance the entity's own physical state to the given time.
    fn update(&self, time: f64);

    /// Entities flag themselves as disposed; the core prunes them at the
    /// start of the next tick.
    fn is_disposed(&self) -> bool;
}

/// An intersection event between a moving point (or ray) and a shape.
#[derive(Clone, Copy, Debug)]
pub struct Impact {
    /// Parameter along the tested ray or motion segment at which the shape
    /// is hit. For narrow-phase segments this is a fraction of the tick in
    /// `[0, 1)`; for ray queries it is the distance in units of `dir`.
    pub t: f64,
    /// Surface normal at the hit point, facing away from the hit shape.
    pub normal: Vec3,
    /// World-space hit point.
    pub point: Vec3,
}

impl Impact {
    /// The earlier of two optional impacts; a miss sorts after every hit.
    pub fn earliest(a: Option<Impact>, b: Option<Impact>) -> Option<Impact> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.t < a.t { b } else { a }),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }
}

/// Result of a successful [`CollisionWorld::ray_trace`][crate::CollisionWorld::ray_trace].
#[derive(Clone)]
pub struct CastHit {
    /// The closest entity pierced by the ray.
    pub entity: EntityHandle,
    /// Parametric distance along the ray to the hit, in units of `dir`.
    pub t: f64,
    /// World-space hit point.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

impl std::fmt::Debug for CastHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastHit")
            .field("t", &self.t)
            .field("point", &self.point)
            .field("normal", &self.normal)
            .finish_non_exhaustive()
    }
}
