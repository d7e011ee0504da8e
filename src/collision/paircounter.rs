//! A counter of how many independent checks have agreed that a pair of
//! entities overlap.
//!
//! One axis of interval overlap is necessary but not sufficient for 3-D
//! AABB overlap. Running the single-axis sweep once per axis and requiring
//! all three sweeps to confirm a pair reconstructs exact AABB overlap
//! without ever materializing an n×n matrix.

use std::collections::HashMap;

/// Counts confirmations for unordered pairs of dense ids and records the
/// pairs that reach the required confirmation depth.
///
/// Rebuilt from empty every tick; never persisted.
#[derive(Clone, Debug)]
pub struct PairCounter {
    depth: u8,
    counts: HashMap<[usize; 2], u8>,
    found: Vec<[usize; 2]>,
}

impl PairCounter {
    /// Create a counter that confirms a pair after `depth` independent
    /// agreements (one per axis sweep, so 3 for three spatial axes).
    pub fn new(depth: u8) -> Self {
        assert!(depth > 0, "a pair can't be confirmed zero times");
        Self {
            depth,
            counts: HashMap::new(),
            found: Vec::new(),
        }
    }

    #[inline]
    fn canonical(i: usize, j: usize) -> [usize; 2] {
        if i >= j {
            [i, j]
        } else {
            [j, i]
        }
    }

    /// Record one confirmation for the unordered pair (i, j).
    ///
    /// Once the pair has been confirmed `depth` times it is recorded as
    /// found and stays found for the lifetime of the counter, no matter how
    /// many more times it is added.
    pub fn add(&mut self, i: usize, j: usize) {
        let key = Self::canonical(i, j);
        let count = self.counts.entry(key).or_insert(0);
        if *count >= self.depth {
            return;
        }
        *count += 1;
        if *count == self.depth {
            self.found.push(key);
        }
    }

    /// Whether the unordered pair (i, j) has reached the confirmation depth.
    pub fn has(&self, i: usize, j: usize) -> bool {
        self.counts
            .get(&Self::canonical(i, j))
            .map_or(false, |&c| c >= self.depth)
    }

    /// The confirmed pairs, in the order they reached the depth.
    /// Each is in canonical (larger id first) order.
    pub fn found_pairs(&self) -> &[[usize; 2]] {
        &self.found
    }

    /// Number of confirmed pairs.
    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Single forward sweep over one axis's sorted array.
    ///
    /// For each element, scans forward over every later element whose lower
    /// bound is at most the current element's upper bound, i.e. every
    /// element whose interval overlaps it on this axis, and records a
    /// confirmation for each such pair that also passes `eligible`.
    ///
    /// The sweep assumes all elements with a strictly smaller lower bound
    /// than the current one have already been fully processed. That holds
    /// exactly when `sorted` is non-decreasing in `lower`; sweeping a stale
    /// array silently misses pairs.
    pub fn check_overlap<T>(
        &mut self,
        sorted: &[T],
        id_of: impl Fn(&T) -> usize,
        lower: impl Fn(&T) -> f64,
        upper: impl Fn(&T) -> f64,
        mut eligible: impl FnMut(&T, &T) -> bool,
    ) {
        for (i, subject) in sorted.iter().enumerate() {
            let subject_upper = upper(subject);
            for other in &sorted[i + 1..] {
                if lower(other) > subject_upper {
                    break;
                }
                if eligible(subject, other) {
                    self.add(id_of(subject), id_of(other));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn canonicalization() {
        let mut a = PairCounter::new(3);
        let mut b = PairCounter::new(3);
        for _ in 0..3 {
            a.add(2, 7);
            b.add(7, 2);
        }
        assert_eq!(a.found_pairs(), b.found_pairs());
        assert!(a.has(2, 7) && a.has(7, 2));
        assert_eq!(a.found_pairs(), &[[7, 2]]);
    }

    #[test]
    fn depth_threshold_and_saturation() {
        let mut c = PairCounter::new(3);
        c.add(0, 1);
        c.add(1, 0);
        assert!(!c.has(0, 1));
        assert!(c.is_empty());
        c.add(0, 1);
        assert!(c.has(0, 1));
        assert_eq!(c.len(), 1);
        // further confirmations don't duplicate the pair
        c.add(0, 1);
        c.add(1, 0);
        assert_eq!(c.found_pairs(), &[[1, 0]]);
    }

    /// Interval with a dense id, standing in for one axis of a swept AABB.
    #[derive(Clone, Copy)]
    struct Iv(usize, f64, f64);

    fn sweep(counter: &mut PairCounter, intervals: &[Iv]) {
        let mut sorted = intervals.to_vec();
        sorted.sort_unstable_by(|a, b| a.1.total_cmp(&b.1));
        counter.check_overlap(
            &sorted,
            |iv| iv.0,
            |iv| iv.1,
            |iv| iv.2,
            |_, _| true,
        );
    }

    #[test]
    fn single_axis_sweep_finds_exactly_the_overlaps() {
        // 0: [0,2], 1: [1,3], 2: [2.5,4], 3: [10,11]
        let intervals = [
            Iv(0, 0.0, 2.0),
            Iv(1, 1.0, 3.0),
            Iv(2, 2.5, 4.0),
            Iv(3, 10.0, 11.0),
        ];
        let mut c = PairCounter::new(1);
        sweep(&mut c, &intervals);
        let found: Vec<[usize; 2]> = c.found_pairs().iter().cloned().sorted().collect();
        assert_eq!(found, vec![[1, 0], [2, 1]]);
    }

    #[test]
    fn three_axes_reconstruct_aabb_overlap() {
        // per-entity [lower, upper] per axis
        // a and b overlap on all three axes, a and c only on two
        let boxes: [[(f64, f64); 3]; 3] = [
            [(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)],
            [(0.5, 1.5), (0.5, 1.5), (0.5, 1.5)],
            [(0.5, 1.5), (0.5, 1.5), (5.0, 6.0)],
        ];
        let mut c = PairCounter::new(3);
        for axis in 0..3 {
            let intervals: Vec<Iv> = boxes
                .iter()
                .enumerate()
                .map(|(id, b)| Iv(id, b[axis].0, b[axis].1))
                .collect();
            sweep(&mut c, &intervals);
        }
        assert_eq!(c.found_pairs(), &[[1, 0]]);
        assert!(!c.has(0, 2));
        assert!(!c.has(1, 2));
    }

    #[test]
    fn eligibility_predicate_is_honored() {
        let intervals = [Iv(0, 0.0, 2.0), Iv(1, 1.0, 3.0)];
        let mut c = PairCounter::new(1);
        c.check_overlap(
            &intervals,
            |iv| iv.0,
            |iv| iv.1,
            |iv| iv.2,
            |_, _| false,
        );
        assert!(c.is_empty());
    }
}
