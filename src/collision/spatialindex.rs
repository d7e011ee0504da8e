//! The spatial index keeps every tracked entity's swept AABB sorted along
//! all three axes so the broad phase can sweep each axis in a single
//! forward pass.
//!
//! Entries live in an arena; the three axis arrays are permutations of the
//! arena's index set, each ordered by the swept box's lower bound on that
//! axis. Tick-to-tick motion keeps the arrays nearly sorted, which is what
//! makes the insertion-sort fast path in [`resort`][Self::resort] pay off.

use super::snapshot::SweptEntry;
use crate::entity::EntityHandle;
use itertools::Itertools;
use std::collections::HashSet;
use thunderdome as td;

/// Below this many entries a near-sorted array is faster to fix up with
/// insertion sort than to hand to the general sort.
const INSERTION_SORT_MAX: usize = 256;

pub(crate) struct SpatialIndex {
    entries: td::Arena<SweptEntry>,
    /// For each axis, the arena indices ordered by `swept.min` on that axis.
    axes: [Vec<td::Index>; 3],
    /// Dense id -> arena index, rebuilt whenever ids are reassigned.
    by_id: Vec<td::Index>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            entries: td::Arena::new(),
            axes: [Vec::new(), Vec::new(), Vec::new()],
            by_id: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: td::Index) -> &SweptEntry {
        &self.entries[key]
    }

    pub fn entry_by_id(&self, id: usize) -> &SweptEntry {
        &self.entries[self.by_id[id]]
    }

    /// The arena indices sorted by the given axis's lower bound.
    pub fn axis_order(&self, axis: usize) -> &[td::Index] {
        &self.axes[axis]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SweptEntry> {
        self.entries.iter().map(|(_, e)| e)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SweptEntry> {
        self.entries.iter_mut().map(|(_, e)| e)
    }

    /// Populate an empty index and fully sort all three axes. O(n log n).
    pub fn build(&mut self, entries: impl IntoIterator<Item = SweptEntry>) {
        debug_assert!(self.entries.is_empty(), "build on a populated index");
        for entry in entries {
            let key = self.entries.insert(entry);
            for axis in &mut self.axes {
                axis.push(key);
            }
        }
        let entries = &self.entries;
        for (axis_idx, order) in self.axes.iter_mut().enumerate() {
            order.sort_unstable_by(|&a, &b| {
                entries[a].swept.min[axis_idx].total_cmp(&entries[b].swept.min[axis_idx])
            });
        }
        self.assign_ids();
    }

    /// Merge newly added entries into the sorted arrays.
    ///
    /// Only the new entries are sorted (k log k); each axis array is then
    /// rebuilt by a linear sorted-merge, so the global order invariant is
    /// preserved without re-sorting the n existing elements.
    pub fn merge_in(&mut self, new: impl IntoIterator<Item = SweptEntry>) {
        let incoming: Vec<td::Index> = new
            .into_iter()
            .map(|entry| self.entries.insert(entry))
            .collect();
        if incoming.is_empty() {
            return;
        }

        let entries = &self.entries;
        for (axis_idx, order) in self.axes.iter_mut().enumerate() {
            let key = |k: td::Index| entries[k].swept.min[axis_idx];
            let mut fresh = incoming.clone();
            fresh.sort_unstable_by(|&a, &b| key(a).total_cmp(&key(b)));

            // classic two-way sorted merge
            let mut merged = Vec::with_capacity(order.len() + fresh.len());
            let mut old_it = order.iter().copied().peekable();
            let mut new_it = fresh.iter().copied().peekable();
            loop {
                match (old_it.peek(), new_it.peek()) {
                    (Some(&o), Some(&n)) => {
                        if key(n) < key(o) {
                            merged.push(n);
                            new_it.next();
                        } else {
                            merged.push(o);
                            old_it.next();
                        }
                    }
                    (Some(_), None) => {
                        merged.extend(old_it.by_ref());
                    }
                    (None, Some(_)) => {
                        merged.extend(new_it.by_ref());
                    }
                    (None, None) => break,
                }
            }
            *order = merged;
        }
        self.assign_ids();
    }

    /// Drop every entry whose entity reported itself disposed when asked.
    ///
    /// The disposed flag lives in the shared entity and may flip true on
    /// another thread at any point, so it is sampled exactly once per
    /// entry; the axis arrays are then filtered by membership in the
    /// sampled set, keeping them in lockstep with the arena. A dispose
    /// that lands after the sample is picked up by the next prune.
    ///
    /// One linear pass per axis; the arrays are replaced, not compacted
    /// in place. Returns the removed entities.
    pub fn remove_disposed(&mut self) -> Vec<EntityHandle> {
        let doomed: HashSet<td::Index> = self
            .entries
            .iter()
            .filter(|(_, e)| e.entity.is_disposed())
            .map(|(k, _)| k)
            .collect();
        if doomed.is_empty() {
            return Vec::new();
        }

        for order in &mut self.axes {
            let kept: Vec<td::Index> = order
                .iter()
                .copied()
                .filter(|k| !doomed.contains(k))
                .collect();
            *order = kept;
        }
        let mut removed = Vec::with_capacity(doomed.len());
        for key in &doomed {
            if let Some(entry) = self.entries.remove(*key) {
                removed.push(entry.entity);
            }
        }
        self.assign_ids();
        removed
    }

    /// Restore sort order after the swept boxes moved.
    ///
    /// Small arrays take the insertion-sort path: motion between ticks is
    /// small, so the arrays are nearly sorted and insertion sort finishes
    /// in close to linear time. This is a latency trade-off only; both
    /// paths produce the same order.
    pub fn resort(&mut self) {
        let entries = &self.entries;
        for (axis_idx, order) in self.axes.iter_mut().enumerate() {
            let key = |k: td::Index| entries[k].swept.min[axis_idx];
            if order.len() < INSERTION_SORT_MAX {
                insertion_sort_by_key(order, key);
            } else {
                order.sort_unstable_by(|&a, &b| key(a).total_cmp(&key(b)));
            }
        }
    }

    /// Reassign dense ids (the PairCounter index space) in arena order and
    /// rebuild the id lookup table.
    fn assign_ids(&mut self) {
        self.by_id.clear();
        for (id, (key, entry)) in self.entries.iter_mut().enumerate() {
            entry.id = id;
            self.by_id.push(key);
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        for order in &mut self.axes {
            order.clear();
        }
        self.by_id.clear();
    }

    /// Check the index invariants: the three arrays are permutations of the
    /// arena's index set and each is non-decreasing in its axis key.
    ///
    /// A violation is a programming error in the index, never a runtime
    /// condition; panics.
    pub fn verify(&self) {
        let mut arena_keys: Vec<u64> = self.entries.iter().map(|(k, _)| k.to_bits()).collect();
        arena_keys.sort_unstable();
        for (axis_idx, order) in self.axes.iter().enumerate() {
            assert_eq!(
                order.len(),
                self.entries.len(),
                "axis {} array length diverged from the entry set",
                axis_idx
            );
            let sorted = order
                .iter()
                .tuple_windows()
                .all(|(&a, &b)| {
                    self.entries[a].swept.min[axis_idx] <= self.entries[b].swept.min[axis_idx]
                });
            assert!(sorted, "axis {} array is out of order", axis_idx);

            let mut keys: Vec<u64> = order.iter().map(|k| k.to_bits()).collect();
            keys.sort_unstable();
            assert_eq!(
                keys, arena_keys,
                "axis {} array does not contain the entry set",
                axis_idx
            );
        }
    }
}

fn insertion_sort_by_key(v: &mut [td::Index], key: impl Fn(td::Index) -> f64) {
    for i in 1..v.len() {
        let subject = v[i];
        let subject_key = key(subject);
        let mut j = i;
        while j > 0 && key(v[j - 1]) > subject_key {
            v[j] = v[j - 1];
            j -= 1;
        }
        v[j] = subject;
    }
}
