//! A simple box-shaped entity used by the unit tests:
//! constant linear velocity, axis-aligned box shape, and a configurable
//! reaction to collisions.

use crate::{
    entity::{Collidable, Impact},
    math::{Ray, Vec3, AABB},
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// What a [`TestBody`] does in its `on_collision` callback
/// (besides counting the hit).
pub enum Reaction {
    /// Keep flying as if nothing happened. Useful for testing that the
    /// resolution loop is bounded: the same contact is re-found every pass.
    None,
    /// Stop and teleport the committed center to the given point,
    /// guaranteeing no further contact this tick.
    HaltAt(Vec3),
    /// Flag self as disposed.
    DisposeSelf,
}

struct State {
    /// Time at which `center` was committed.
    time: f64,
    center: Vec3,
    half: Vec3,
    vel: Vec3,
}

impl State {
    fn position(&self, time: f64) -> Vec3 {
        self.center + self.vel * (time - self.time)
    }
}

pub struct TestBody {
    state: Mutex<State>,
    collides: bool,
    reaction: Reaction,
    hits: AtomicUsize,
    disposed: AtomicBool,
    last_impact_time: Mutex<Option<f64>>,
}

impl TestBody {
    pub fn moving(center: Vec3, half: Vec3, vel: Vec3) -> Self {
        Self {
            state: Mutex::new(State {
                time: 0.0,
                center,
                half,
                vel,
            }),
            collides: true,
            reaction: Reaction::None,
            hits: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            last_impact_time: Mutex::new(None),
        }
    }

    pub fn fixed(center: Vec3, half: Vec3) -> Self {
        Self::moving(center, half, Vec3::zero())
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reaction = reaction;
        self
    }

    pub fn ineligible(mut self) -> Self {
        self.collides = false;
        self
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_impact_time(&self) -> Option<f64> {
        *self.last_impact_time.lock()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Zero the velocity and teleport the committed center.
    pub fn halt_at(&self, center: Vec3) {
        let mut state = self.state.lock();
        state.vel = Vec3::zero();
        state.center = center;
    }

    fn aabb_at(&self, time: f64) -> AABB {
        let state = self.state.lock();
        let center = state.position(time);
        AABB::new(center - state.half, center + state.half)
    }
}

impl Collidable for TestBody {
    fn hitbox(&self, time: f64) -> AABB {
        self.aabb_at(time)
    }

    fn shape_points(&self, time: f64) -> Vec<Vec3> {
        let aabb = self.aabb_at(time);
        let (lo, hi) = (aabb.min, aabb.max);
        // the eight corners, in a fixed order so samples pair up across ticks
        vec![
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    fn intersect(&self, ray: Ray) -> Option<Impact> {
        // exact shape = the box at the committed (end-of-tick) state
        let aabb = {
            let state = self.state.lock();
            AABB::new(state.center - state.half, state.center + state.half)
        };
        let mut t_enter: f64 = 0.0;
        let mut t_exit: f64 = f64::MAX;
        let mut entry_normal: Option<Vec3> = None;
        for axis in 0..3 {
            let d = ray.dir[axis];
            if d == 0.0 {
                if ray.start[axis] < aabb.min[axis] || ray.start[axis] > aabb.max[axis] {
                    return None;
                }
            } else {
                let t0 = (aabb.min[axis] - ray.start[axis]) / d;
                let t1 = (aabb.max[axis] - ray.start[axis]) / d;
                let (t_near, t_far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
                if t_near > t_enter {
                    t_enter = t_near;
                    let mut n = Vec3::zero();
                    n[axis] = -d.signum();
                    entry_normal = Some(n);
                }
                t_exit = t_exit.min(t_far);
                if t_enter > t_exit {
                    return None;
                }
            }
        }
        Some(Impact {
            t: t_enter,
            // starting inside: face the ray back the way it came
            normal: entry_normal.unwrap_or(-ray.dir.normalized()),
            point: ray.point_at_t(t_enter),
        })
    }

    fn can_collide_with(&self, _other: &dyn Collidable) -> bool {
        self.collides
    }

    fn on_collision(&self, _other: &dyn Collidable, _impact: Impact, time: f64) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        *self.last_impact_time.lock() = Some(time);
        match self.reaction {
            Reaction::None => {}
            Reaction::HaltAt(center) => self.halt_at(center),
            Reaction::DisposeSelf => self.dispose(),
        }
    }

    fn update(&self, time: f64) {
        let mut state = self.state.lock();
        state.center = state.position(time);
        state.time = time;
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
