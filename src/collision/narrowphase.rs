//! Point-sampled narrow phase: confirms and times an actual intersection
//! between two broad-phase candidates, reacts, and re-checks for chained
//! contacts within the same tick.

use super::{
    snapshot::{Snapshot, SweptEntry},
    spatialindex::SpatialIndex,
};
use crate::entity::{Collidable, Impact};
use crate::math::{Ray, Vec3};

/// How many times one pair is re-checked within a tick after a reaction.
///
/// A reaction can deflect an entity into a new contact with the same
/// partner; re-sampling and re-checking catches those chains. Exceeding
/// the bound stops further correction for the pair this tick. That is a
/// deliberate accuracy ceiling, not an error.
pub const MAX_RESOLVE_PASSES: usize = 5;

/// Earliest impact of `points`' motion segments against `target`'s shape.
///
/// Each current point is swept from its previous-tick position to its
/// current-tick position; only impact fractions below 1 count as happening
/// within this tick. Points that did not move are skipped, matching the
/// degenerate-ray convention of the ray query.
fn earliest_point_impact(
    prev_points: &[Vec3],
    curr_points: &[Vec3],
    target: &dyn Collidable,
) -> Option<Impact> {
    let mut best: Option<Impact> = None;
    for (&prev, &curr) in prev_points.iter().zip(curr_points) {
        let motion = curr - prev;
        if motion.mag_sq() == 0.0 {
            continue;
        }
        let segment = Ray {
            start: prev,
            dir: motion,
        };
        if let Some(hit) = target.intersect(segment) {
            if hit.t >= 0.0 && hit.t < 1.0 {
                best = Impact::earliest(best, Some(hit));
            }
        }
    }
    best
}

/// Exact check of one candidate pair.
///
/// Sweeps a's points against b's shape and b's points against a's shape;
/// the true event is whichever is earlier. The shared normal faces away
/// from b's shape toward the impacting point, so when the symmetric test
/// wins its normal (facing away from a) is flipped.
pub(crate) fn check_pair(
    snap_a: &Snapshot,
    a: &dyn Collidable,
    snap_b: &Snapshot,
    b: &dyn Collidable,
) -> Option<Impact> {
    let hit_ab = earliest_point_impact(&snap_a.prev_points, &snap_a.curr_points, b);
    let hit_ba =
        earliest_point_impact(&snap_b.prev_points, &snap_b.curr_points, a).map(|mut hit| {
            hit.normal = -hit.normal;
            hit
        });
    Impact::earliest(hit_ab, hit_ba)
}

/// Run the bounded resolution loop for one candidate pair.
///
/// Both entries' snapshots are locked in dense-id order for the whole
/// loop; pairs that share an entity therefore never run interleaved, and
/// distinct lock orders can't form a cycle.
pub(crate) fn resolve_pair(
    index: &SpatialIndex,
    id_a: usize,
    id_b: usize,
    prev_time: f64,
    time: f64,
) {
    if id_a == id_b {
        return;
    }
    let (id_lo, id_hi) = if id_a < id_b { (id_a, id_b) } else { (id_b, id_a) };
    let entry_a = index.entry_by_id(id_lo);
    let entry_b = index.entry_by_id(id_hi);
    let mut snap_a = entry_a.snapshot.lock();
    let mut snap_b = entry_b.snapshot.lock();

    for _pass in 0..MAX_RESOLVE_PASSES {
        // an earlier pair's reaction may have disposed one side
        if entry_a.entity.is_disposed() || entry_b.entity.is_disposed() {
            return;
        }
        if same_entity(entry_a, entry_b) {
            return;
        }

        let Some(impact) = check_pair(&snap_a, &*entry_a.entity, &snap_b, &*entry_b.entity)
        else {
            return;
        };

        let impact_time = prev_time + impact.t * (time - prev_time);
        entry_a
            .entity
            .on_collision(&*entry_b.entity, impact, impact_time);
        entry_b
            .entity
            .on_collision(&*entry_a.entity, impact, impact_time);

        // only the end-of-tick state changed, re-sample without advancing
        // game time and look for secondary contacts
        snap_a.resample(&*entry_a.entity, time);
        snap_b.resample(&*entry_b.entity, time);
    }
}

fn same_entity(a: &SweptEntry, b: &SweptEntry) -> bool {
    std::ptr::eq(
        std::sync::Arc::as_ptr(&a.entity) as *const u8,
        std::sync::Arc::as_ptr(&b.entity) as *const u8,
    )
}
