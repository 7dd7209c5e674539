//! Load, parse and delete queues.
//!
//! [`WorkQueue`] orders pending tiles closest-first and caps how many may be
//! in flight at once; the engine keeps one for byte fetches and one for
//! decode/mesh jobs. [`DeleteQueue`] holds tiles whose children are no longer
//! needed, in the order they became unnecessary.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use globe_geo::TileKey;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Debug)]
struct QueueEntry {
    key: TileKey,
    distance: f64,
    /// Generation counter to skip stale entries after a priority update.
    generation: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Max-heap: the closest tile, then the oldest entry, compares greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Closest-first queue with a bound on in-flight work.
#[derive(Debug)]
pub struct WorkQueue {
    name: &'static str,
    heap: BinaryHeap<QueueEntry>,
    /// Current generation per queued key.
    generations: FxHashMap<TileKey, u64>,
    next_generation: u64,
    in_flight: usize,
    max_in_flight: usize,
}

impl WorkQueue {
    #[must_use]
    pub fn new(name: &'static str, max_in_flight: usize) -> Self {
        Self {
            name,
            heap: BinaryHeap::new(),
            generations: FxHashMap::default(),
            next_generation: 0,
            in_flight: 0,
            max_in_flight: max_in_flight.max(1),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `key`, or update its distance if already queued.
    pub fn push(&mut self, key: TileKey, distance: f64) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(key, generation);
        self.heap.push(QueueEntry {
            key,
            distance,
            generation,
        });
    }

    /// Drop a pending entry. Work already in flight is unaffected.
    pub fn remove(&mut self, key: TileKey) -> bool {
        self.generations.remove(&key).is_some()
    }

    #[must_use]
    pub fn contains(&self, key: TileKey) -> bool {
        self.generations.contains_key(&key)
    }

    /// Take the closest pending tile if the in-flight cap allows, counting it
    /// as in flight.
    pub fn pop_ready(&mut self) -> Option<TileKey> {
        if self.in_flight >= self.max_in_flight {
            return None;
        }
        while let Some(entry) = self.heap.pop() {
            if self.generations.get(&entry.key) == Some(&entry.generation) {
                self.generations.remove(&entry.key);
                self.in_flight += 1;
                return Some(entry.key);
            }
        }
        None
    }

    /// Mark one in-flight item finished.
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

/// FIFO of tiles whose children should be removed, without duplicates.
#[derive(Debug, Default)]
pub struct DeleteQueue {
    order: VecDeque<TileKey>,
    queued: FxHashSet<TileKey>,
}

impl DeleteQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the children of `parent` for removal. Returns `false` if already queued.
    pub fn push(&mut self, parent: TileKey) -> bool {
        if !self.queued.insert(parent) {
            return false;
        }
        self.order.push_back(parent);
        true
    }

    /// Take `parent` back out of the queue because its children are needed again.
    pub fn erase(&mut self, parent: TileKey) -> bool {
        if !self.queued.remove(&parent) {
            return false;
        }
        self.order.retain(|k| *k != parent);
        true
    }

    pub fn pop(&mut self) -> Option<TileKey> {
        let key = self.order.pop_front()?;
        self.queued.remove(&key);
        Some(key)
    }

    #[must_use]
    pub fn contains(&self, parent: TileKey) -> bool {
        self.queued.contains(&parent)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Queued keys, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TileKey> {
        self.order.iter()
    }
}
