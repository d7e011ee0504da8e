//! Per-entity temporal snapshots: the shape-point samples of the previous
//! and current tick and the swept AABB spanning both.

use crate::{
    entity::{Collidable, EntityHandle},
    math::{Vec3, AABB},
};
use parking_lot::Mutex;

/// One entity's entry in the spatial index.
///
/// The swept AABB is duplicated outside the snapshot mutex as a plain
/// field: it is only written while the tick driver has exclusive access
/// (snapshot advance, before the axis arrays are resorted), and read
/// freely by the axis sorts, the sweeps and ray queries.
pub(crate) struct SweptEntry {
    pub entity: EntityHandle,
    /// Dense id, reassigned each tick after pruning and merging.
    /// Used as the PairCounter index.
    pub id: usize,
    /// Sort key of the axis arrays: union of the previous-tick and
    /// current-tick hitboxes.
    pub swept: AABB,
    pub snapshot: Mutex<Snapshot>,
}

/// The mutable sample state of an entry. Locked during pair resolution so
/// that pairs sharing an entity are serialized.
pub(crate) struct Snapshot {
    /// Shape points sampled at the previous tick.
    pub prev_points: Vec<Vec3>,
    /// Shape points sampled at the current tick, re-sampled in place when
    /// a reaction changes the entity's end-of-tick state.
    pub curr_points: Vec<Vec3>,
    pub prev_hitbox: AABB,
    pub curr_hitbox: AABB,
}

impl SweptEntry {
    /// Create the entry for a newly ingested entity, sampling its shape
    /// once. Until the first `advance`, previous and current samples
    /// coincide and the swept box is just the hitbox.
    pub fn new(entity: EntityHandle, time: f64) -> Self {
        let points = entity.shape_points(time);
        let hitbox = entity.hitbox(time);
        Self {
            id: 0,
            swept: hitbox,
            snapshot: Mutex::new(Snapshot {
                prev_points: points.clone(),
                curr_points: points,
                prev_hitbox: hitbox,
                curr_hitbox: hitbox,
            }),
            entity,
        }
    }

    /// Advance the snapshot one tick: let the entity integrate its own
    /// state to `time`, shift current samples to previous, re-sample, and
    /// recompute the swept box.
    ///
    /// Only called by the tick driver, so the mutex is never contended here.
    pub fn advance(&mut self, time: f64) {
        self.entity.update(time);
        let snap = self.snapshot.get_mut();
        std::mem::swap(&mut snap.prev_points, &mut snap.curr_points);
        snap.curr_points = self.entity.shape_points(time);
        snap.prev_hitbox = snap.curr_hitbox;
        snap.curr_hitbox = self.entity.hitbox(time);
        self.swept = snap.prev_hitbox.union(&snap.curr_hitbox);
    }
}

impl Snapshot {
    /// Re-sample the current-tick state without advancing game time.
    /// Used after a reaction callback changed the entity's end-of-tick
    /// trajectory mid-resolution.
    pub fn resample(&mut self, entity: &dyn Collidable, time: f64) {
        self.curr_points = entity.shape_points(time);
        self.curr_hitbox = entity.hitbox(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestBody;
    use std::sync::Arc;

    #[test]
    fn advance_shifts_samples_and_unions_hitboxes() {
        // unit half-extent box moving +1 x per time unit
        let body = Arc::new(TestBody::moving(
            Vec3::zero(),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        ));
        let mut entry = SweptEntry::new(body.clone(), 0.0);
        assert_eq!(entry.swept, AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)));

        entry.advance(1.0);
        // swept box spans both tick endpoints
        assert_eq!(entry.swept.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(entry.swept.max, Vec3::new(2.0, 1.0, 1.0));
        let snap = entry.snapshot.get_mut();
        assert_eq!(snap.prev_points.len(), snap.curr_points.len());
        // every current point is the previous point shifted by the velocity
        for (prev, curr) in snap.prev_points.iter().zip(&snap.curr_points) {
            assert_eq!(*curr - *prev, Vec3::new(1.0, 0.0, 0.0));
        }
    }

    #[test]
    fn resample_tracks_reaction_without_touching_prev() {
        let body = Arc::new(TestBody::moving(
            Vec3::zero(),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        ));
        let mut entry = SweptEntry::new(body.clone(), 0.0);
        entry.advance(1.0);

        body.halt_at(Vec3::zero());
        let snap = entry.snapshot.get_mut();
        let prev_before = snap.prev_points.clone();
        snap.resample(&*body, 1.0);
        assert_eq!(snap.prev_points, prev_before);
        assert_eq!(snap.curr_hitbox.center(), Vec3::zero());
    }
}
