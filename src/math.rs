//! Types, aliases and helper operations for doing math with `ultraviolet`.

pub use ultraviolet as uv;

pub type Vec3 = uv::DVec3;

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn zero() -> Self {
        Self {
            min: Vec3::zero(),
            max: Vec3::zero(),
        }
    }

    /// The smallest box containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min_by_component(other.min),
            max: self.max.max_by_component(other.max),
        }
    }

    /// The box covered by both `self` and `other`, if they overlap at all.
    pub fn intersection(&self, other: &AABB) -> Option<AABB> {
        let min = self.min.max_by_component(other.min);
        let max = self.max.min_by_component(other.max);
        if min.x <= max.x && min.y <= max.y && min.z <= max.z {
            Some(AABB { min, max })
        } else {
            None
        }
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Extend the box by the given amount in every direction.
    #[inline]
    pub fn padded(&self, amount: f64) -> AABB {
        let amount = Vec3::new(amount, amount, amount);
        AABB {
            min: self.min - amount,
            max: self.max + amount,
        }
    }
}

/// A ray (or, when `dir` is not normalized, a parametrized segment)
/// starting at `start` and extending in the direction of `dir`.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub start: Vec3,
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    pub fn point_at_t(&self, t: f64) -> Vec3 {
        self.start + t * self.dir
    }
}

/// Slab test of a ray against an AABB.
///
/// Returns the parameter `t >= 0` at which the ray enters the box
/// (zero if it starts inside), or None if it never enters.
pub fn ray_aabb(ray: &Ray, aabb: &AABB) -> Option<f64> {
    let mut t_enter: f64 = 0.0;
    let mut t_exit: f64 = f64::MAX;
    for axis in 0..3 {
        let d = ray.dir[axis];
        if d == 0.0 {
            // parallel to this slab, either always inside it or never
            if ray.start[axis] < aabb.min[axis] || ray.start[axis] > aabb.max[axis] {
                return None;
            }
        } else {
            let t0 = (aabb.min[axis] - ray.start[axis]) / d;
            let t1 = (aabb.max[axis] - ray.start[axis]) / d;
            let (t_near, t_far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            t_enter = t_enter.max(t_near);
            t_exit = t_exit.min(t_far);
            if t_enter > t_exit {
                return None;
            }
        }
    }
    Some(t_enter)
}
