//! A priority queue of callbacks ("plans") keyed by simulated time
//!
//! Defines a `Queue<T>` that stores items of type `T` sorted by `f64` time
//! and then by [`ExecutionPhase`]. The queue supports adding plans,
//! cancelling plans, and retrieving the earliest plan. Adding a plan is
//! *O*(log(*n*)) while cancellation is *O*(1).
//!
//! `Context` uses this queue to hold every suspended agent: a task that is
//! waiting out its duration or an agent polling for arrival is simply a plan
//! at some future time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{HashMap, HashMapExt};

/// Orders plans that fall on the same simulated time. Plans in `First` run
/// before `Normal`, which run before `Last`. Within a phase, plans run in the
/// order they were added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExecutionPhase {
    First,
    #[default]
    Normal,
    Last,
}

/// A time-ordered queue of plans carrying data of type `T`.
///
/// When plans are created they are sequentially assigned a [`PlanId`]. The
/// time, phase, and id are stored in a binary heap of `Entry` objects while
/// the payload lives in a map keyed by id, so cancelling a plan only removes
/// its payload; the stale heap entry is skipped when popped.
pub struct Queue<T> {
    queue: BinaryHeap<Entry>,
    data_map: HashMap<u64, T>,
    plan_counter: u64,
}

impl<T> Queue<T> {
    /// Create a new empty `Queue<T>`
    #[must_use]
    pub fn new() -> Queue<T> {
        Queue {
            queue: BinaryHeap::new(),
            data_map: HashMap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time and phase
    ///
    /// Returns a `PlanId` that can be used to cancel it.
    pub fn add_plan(&mut self, time: f64, data: T, phase: ExecutionPhase) -> PlanId {
        let id = self.plan_counter;
        self.queue.push(Entry { time, phase, id });
        self.data_map.insert(id, data);
        self.plan_counter += 1;
        PlanId(id)
    }

    /// Cancel a plan that has not yet run
    ///
    /// Returns `false` if the plan already ran or was already cancelled.
    pub fn cancel_plan(&mut self, id: PlanId) -> bool {
        self.data_map.remove(&id.0).is_some()
    }

    /// Remove and return the earliest live plan, or `None` if the queue is
    /// empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        while let Some(entry) = self.queue.pop() {
            // Cancelled plans have no data
            if let Some(data) = self.data_map.remove(&entry.id) {
                return Some(Plan {
                    time: entry.time,
                    data,
                });
            }
        }
        None
    }

    /// Number of live (not cancelled) plans
    #[must_use]
    pub fn remaining_plan_count(&self) -> usize {
        self.data_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.is_empty()
    }

    /// Drop every pending plan
    pub fn clear(&mut self) {
        self.queue.clear();
        self.data_map.clear();
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(PartialEq, Debug)]
struct Entry {
    time: f64,
    phase: ExecutionPhase,
    id: u64,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed so the max-heap pops the earliest time, then the earliest phase,
/// then the lowest id.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.phase.cmp(&other.phase))
            .then(self.id.cmp(&other.id))
            .reverse()
    }
}

/// A unique identifier for a plan added to a `Queue<T>`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanId(u64);

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}
