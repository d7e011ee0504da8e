//! The collision pipeline: prune disposed entities, ingest pending ones,
//! advance temporal snapshots, sweep-and-prune all three axes, and resolve
//! the surviving candidate pairs.

use crate::{
    entity::{CastHit, EntityHandle},
    math::{ray_aabb, Ray},
};

use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::Arc;

//

pub mod paircounter;
pub use paircounter::PairCounter;

pub mod narrowphase;
pub use narrowphase::MAX_RESOLVE_PASSES;

pub(crate) mod snapshot;
use snapshot::SweptEntry;

pub(crate) mod spatialindex;
use spatialindex::SpatialIndex;

//

/// One confirmation per axis sweep is required before a pair becomes a
/// narrow-phase candidate.
const AXIS_CONFIRMATIONS: u8 = 3;

/// Errors signaled at the API boundary.
///
/// Everything else in this module is either silently tolerated
/// (stale entities mid-resolution) or a programming error that asserts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CollisionError {
    #[error("entity is already registered in the collision world")]
    DuplicateEntity,
}

#[derive(Default)]
struct PendingQueue {
    queue: Mutex<Vec<EntityHandle>>,
}

/// A cloneable handle for enqueueing entities from threads other than the
/// tick driver.
///
/// Spawning subsystems hold one of these while the tick driver owns the
/// [`CollisionWorld`] exclusively; enqueued entities become active at the
/// start of the next tick.
#[derive(Clone)]
pub struct Spawner(Arc<PendingQueue>);

impl Spawner {
    /// Enqueue an entity. Rejects an entity already sitting in the queue;
    /// an entity already *active* in the world is only caught when the
    /// queue is drained, because the spawner can't see the world's sets.
    pub fn add(&self, entity: EntityHandle) -> Result<(), CollisionError> {
        let mut queue = self.0.queue.lock();
        if queue.iter().any(|e| Arc::ptr_eq(e, &entity)) {
            return Err(CollisionError::DuplicateEntity);
        }
        queue.push(entity);
        Ok(())
    }
}

/// The broad-phase index and narrow-phase resolver for one simulation.
///
/// Owns the canonical entity collection: a static set fixed at
/// construction, a dynamic set that changes over time, and a pending set
/// fed through [`Spawner`] handles or [`add_entity`][Self::add_entity].
pub struct CollisionWorld {
    statics: Vec<EntityHandle>,
    dynamics: Vec<EntityHandle>,
    pending: Arc<PendingQueue>,
    index: SpatialIndex,
    /// Reference time of the previous tick; narrow-phase impact fractions
    /// interpolate between this and the current tick's time.
    prev_time: f64,
}

impl CollisionWorld {
    /// Create a world whose static set is active from the start.
    /// Static entities are never disposed by the core.
    pub fn new(statics: impl IntoIterator<Item = EntityHandle>, start_time: f64) -> Self {
        let statics: Vec<EntityHandle> = statics.into_iter().collect();
        let mut index = SpatialIndex::new();
        index.build(
            statics
                .iter()
                .map(|e| SweptEntry::new(e.clone(), start_time)),
        );
        Self {
            statics,
            dynamics: Vec::new(),
            pending: Arc::new(PendingQueue::default()),
            index,
            prev_time: start_time,
        }
    }

    /// A handle other subsystems can use to enqueue entities concurrently.
    pub fn spawner(&self) -> Spawner {
        Spawner(self.pending.clone())
    }

    /// Enqueue an entity for ingestion at the start of the next tick.
    /// Fails fast if the entity is already present anywhere in the world.
    pub fn add_entity(&self, entity: EntityHandle) -> Result<(), CollisionError> {
        if self.is_registered(&entity) {
            return Err(CollisionError::DuplicateEntity);
        }
        self.spawner().add(entity)
    }

    /// Enqueue a batch of entities. The whole batch is validated before
    /// anything is enqueued, so a duplicate anywhere in it (against the
    /// world, the pending queue or the batch itself) leaves the world
    /// unchanged.
    pub fn add_entities(
        &self,
        entities: impl IntoIterator<Item = EntityHandle>,
    ) -> Result<(), CollisionError> {
        let batch: Vec<EntityHandle> = entities.into_iter().collect();
        let mut queue = self.pending.queue.lock();
        for (i, entity) in batch.iter().enumerate() {
            let duplicate = self
                .statics
                .iter()
                .chain(&self.dynamics)
                .chain(queue.iter())
                .chain(&batch[..i])
                .any(|e| Arc::ptr_eq(e, entity));
            if duplicate {
                return Err(CollisionError::DuplicateEntity);
            }
        }
        queue.extend(batch);
        Ok(())
    }

    /// Whether the entity is anywhere in the world (active or pending).
    pub fn contains(&self, entity: &EntityHandle) -> bool {
        self.is_registered(entity)
    }

    fn is_registered(&self, entity: &EntityHandle) -> bool {
        self.statics
            .iter()
            .chain(&self.dynamics)
            .any(|e| Arc::ptr_eq(e, entity))
            || self
                .pending
                .queue
                .lock()
                .iter()
                .any(|e| Arc::ptr_eq(e, entity))
    }

    /// Read-only view of every entity the world knows about:
    /// static ∪ dynamic ∪ pending.
    pub fn entities(&self) -> Vec<EntityHandle> {
        self.statics
            .iter()
            .chain(&self.dynamics)
            .cloned()
            .chain(self.pending.queue.lock().iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.dynamics.len() + self.pending.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entity and release the index.
    pub fn cleanup(&mut self) {
        self.statics.clear();
        self.dynamics.clear();
        self.pending.queue.lock().clear();
        self.index.clear();
    }

    /// Advance one tick: prune, ingest, update snapshots, sweep all three
    /// axes, and resolve every confirmed candidate pair.
    pub fn process_collisions(&mut self, time: f64) {
        //
        // 1. prune entities that disposed themselves since last tick
        //

        // the index sampled each disposed flag once; dropping exactly the
        // entities it dropped keeps the sets in agreement even when a flag
        // flips concurrently
        let removed = self.index.remove_disposed();
        if !removed.is_empty() {
            self.dynamics
                .retain(|e| !removed.iter().any(|r| Arc::ptr_eq(r, e)));
            self.statics
                .retain(|e| !removed.iter().any(|r| Arc::ptr_eq(r, e)));
        }

        //
        // 2. drain the pending queue into the dynamic set and the index
        //

        let drained: Vec<EntityHandle> = std::mem::take(&mut *self.pending.queue.lock());
        let drained_count = drained.len();
        let mut fresh: Vec<SweptEntry> = Vec::new();
        for entity in drained {
            // disposed before ever becoming active: silently dropped
            if entity.is_disposed() {
                continue;
            }
            assert!(
                !self
                    .statics
                    .iter()
                    .chain(&self.dynamics)
                    .any(|e| Arc::ptr_eq(e, &entity)),
                "entity was registered twice"
            );
            // sample at the previous reference time so the entity's first
            // advance covers its motion since it was spawned
            fresh.push(SweptEntry::new(entity.clone(), self.prev_time));
            self.dynamics.push(entity);
        }
        self.index.merge_in(fresh);

        //
        // 3. advance every active entity's temporal snapshot
        //

        for entry in self.index.iter_mut() {
            entry.advance(time);
        }

        //
        // 4. restore axis sort order (near-sorted fast path)
        //

        self.index.resort();
        #[cfg(debug_assertions)]
        self.index.verify();

        //
        // 5. sweep each axis; a pair confirmed on all three is a candidate
        //

        let index = &self.index;
        let mut counter = PairCounter::new(AXIS_CONFIRMATIONS);
        for axis in 0..3 {
            counter.check_overlap(
                index.axis_order(axis),
                |&k| index.get(k).id,
                |&k| index.get(k).swept.min[axis],
                |&k| index.get(k).swept.max[axis],
                |&ka, &kb| {
                    let (a, b) = (&index.get(ka).entity, &index.get(kb).entity);
                    a.can_collide_with(&**b) && b.can_collide_with(&**a)
                },
            );
        }

        //
        // 6. narrow phase: resolve candidate pairs in parallel
        //

        let pairs = counter.found_pairs();
        let prev_time = self.prev_time;
        #[cfg(feature = "parallel")]
        pairs
            .par_iter()
            .for_each(|&[a, b]| narrowphase::resolve_pair(index, a, b, prev_time, time));
        #[cfg(not(feature = "parallel"))]
        for &[a, b] in pairs {
            narrowphase::resolve_pair(index, a, b, prev_time, time);
        }

        //
        // 7. this tick becomes the next tick's reference time
        //

        self.prev_time = time;
        log::debug!(
            "tick {}: pruned {}, ingested {}, {} tracked, {} candidate pairs",
            time,
            removed.len(),
            drained_count,
            self.index.len(),
            pairs.len(),
        );
    }

    /// Find the closest entity pierced by the ray.
    ///
    /// A zero-length direction is degenerate and never hits anything.
    pub fn ray_trace(&self, ray: Ray) -> Option<CastHit> {
        self.ray_trace_limited(ray, f64::MAX)
    }

    /// Like [`ray_trace`][Self::ray_trace], ignoring hits farther along
    /// the ray than `max_t`.
    pub fn ray_trace_limited(&self, ray: Ray, max_t: f64) -> Option<CastHit> {
        if ray.dir.mag_sq() == 0.0 {
            return None;
        }
        let mut best: Option<CastHit> = None;
        for entry in self.index.iter() {
            // cheap slab test against the swept box before the exact shape
            let Some(entry_t) = ray_aabb(&ray, &entry.swept) else {
                continue;
            };
            if entry_t > max_t {
                continue;
            }
            if let Some(hit) = entry.entity.intersect(ray) {
                if hit.t >= 0.0
                    && hit.t <= max_t
                    && best.as_ref().map_or(true, |b| hit.t < b.t)
                {
                    best = Some(CastHit {
                        entity: entry.entity.clone(),
                        t: hit.t,
                        point: hit.point,
                        normal: hit.normal,
                    });
                }
            }
        }
        best
    }
}
