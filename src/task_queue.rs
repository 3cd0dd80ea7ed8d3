//! FIFO task queue for one pipeline stage, paired with its dedup set.

use std::collections::{HashSet, VecDeque};

use crate::types::{Position, Stage, Task};

/// Queue of cells awaiting one stage.
///
/// A cell key stays in the dedup set from the moment it is queued until the
/// owner calls [`StageQueue::release`], which it does once the task has been
/// dropped as stale or its pending assignment has completed. That keeps a
/// cell from being queued twice while a task for it is queued or in flight.
#[derive(Debug)]
pub struct StageQueue {
    stage: Stage,
    queue: VecDeque<Position>,
    tracked: HashSet<Position>,
}

impl StageQueue {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            queue: VecDeque::new(),
            tracked: HashSet::new(),
        }
    }

    /// Queue `cell`; false if it is already queued or in flight.
    pub fn push(&mut self, cell: Position) -> bool {
        if !self.tracked.insert(cell) {
            return false;
        }
        self.queue.push_back(cell);
        true
    }

    pub fn front(&self) -> Option<Task> {
        self.queue.front().map(|cell| Task::new(*cell, self.stage))
    }

    /// Take the oldest task off the queue. Its key stays tracked.
    pub fn pop_front(&mut self) -> Option<Task> {
        self.queue.pop_front().map(|cell| Task::new(cell, self.stage))
    }

    /// Forget `cell` so it may be queued again.
    pub fn release(&mut self, cell: Position) -> bool {
        self.tracked.remove(&cell)
    }

    /// Cells currently waiting, oldest first.
    pub fn queued(&self) -> Vec<Position> {
        self.queue.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything, tracked keys included.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.tracked.clear();
    }
}
