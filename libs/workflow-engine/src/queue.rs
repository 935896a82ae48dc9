//! Priority Queues (spec.md §4.5): one FIFO-within-priority queue per stage.
//!
//! Populated from two sources — the Orchestrator on step-ready events, and
//! the Reconciler's periodic scan — so `enqueue` must be idempotent:
//! duplicate ids collapse via an auxiliary `HashSet` rather than growing the
//! heap unboundedly.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use nanopore_domain::{Priority, StepId, WorkflowStage};

/// The ordering key for one queued step: `(priority desc, submission_date
/// asc, sample_number asc)`, per spec.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueKey {
    pub priority: Priority,
    pub submission_date: DateTime<Utc>,
    pub sample_number: i32,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: QueueKey,
    step_id: StepId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for Entry {}

// `BinaryHeap` is a max-heap: higher priority pops first (direct compare),
// then older submission_date and lower sample_number pop first, which means
// we compare them in reverse so the *smaller* value ranks *higher*.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .priority
            .cmp(&other.key.priority)
            .then_with(|| Reverse(self.key.submission_date).cmp(&Reverse(other.key.submission_date)))
            .then_with(|| Reverse(self.key.sample_number).cmp(&Reverse(other.key.sample_number)))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct StageQueue {
    heap: BinaryHeap<Entry>,
    queued: HashSet<StepId>,
}

impl StageQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            queued: HashSet::new(),
        }
    }
}

/// One `BinaryHeap`-backed queue per stage, guarded by a `parking_lot::Mutex`
/// so `enqueue`/`dequeue`/`remove`/`reorder` are synchronous and cheap —
/// callers never hold the lock across an `.await`.
pub struct PriorityQueues {
    stages: Mutex<HashMap<WorkflowStage, StageQueue>>,
}

impl PriorityQueues {
    #[must_use]
    pub fn new() -> Self {
        let mut stages = HashMap::new();
        for stage in WorkflowStage::ALL {
            stages.insert(stage, StageQueue::new());
        }
        Self {
            stages: Mutex::new(stages),
        }
    }

    /// Idempotent: re-enqueuing an id already present in `stage`'s queue is
    /// a no-op.
    pub fn enqueue(&self, stage: WorkflowStage, step_id: StepId, key: QueueKey) {
        let mut stages = self.stages.lock();
        let queue = stages.get_mut(&stage).expect("all stages pre-populated");
        if !queue.queued.insert(step_id) {
            return;
        }
        queue.heap.push(Entry { key, step_id });
    }

    /// Pop the highest-priority step id for `stage`, skipping entries that
    /// were lazily removed (their id is no longer in `queued`).
    pub fn dequeue(&self, stage: WorkflowStage) -> Option<StepId> {
        let mut stages = self.stages.lock();
        let queue = stages.get_mut(&stage)?;
        while let Some(entry) = queue.heap.pop() {
            if queue.queued.remove(&entry.step_id) {
                return Some(entry.step_id);
            }
        }
        None
    }

    /// Lazily remove a step id from `stage`'s queue (used when a sample is
    /// paused or a step cancelled). The heap entry is dropped on next pop.
    pub fn remove(&self, stage: WorkflowStage, step_id: StepId) {
        let mut stages = self.stages.lock();
        if let Some(queue) = stages.get_mut(&stage) {
            queue.queued.remove(&step_id);
        }
    }

    /// Remove then re-insert every one of `entries` with its new key,
    /// O(pending steps for the sample) per spec.md §4.5.
    pub fn reorder(&self, entries: &[(WorkflowStage, StepId, QueueKey)]) {
        let mut stages = self.stages.lock();
        for &(stage, step_id, key) in entries {
            let queue = stages.get_mut(&stage).expect("all stages pre-populated");
            queue.queued.insert(step_id);
            queue.heap.push(Entry { key, step_id });
        }
    }

    /// Number of still-live entries queued for `stage` (lazily-removed
    /// entries still physically in the heap are not counted).
    #[must_use]
    pub fn len(&self, stage: WorkflowStage) -> usize {
        self.stages
            .lock()
            .get(&stage)
            .map_or(0, |q| q.queued.len())
    }

    #[must_use]
    pub fn is_empty(&self, stage: WorkflowStage) -> bool {
        self.len(stage) == 0
    }
}

impl Default for PriorityQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(priority: Priority, days_ago: i64, sample_number: i32) -> QueueKey {
        QueueKey {
            priority,
            submission_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                - chrono::Duration::days(days_ago),
            sample_number,
        }
    }

    #[test]
    fn urgent_preempts_normal_even_if_enqueued_later() {
        let queues = PriorityQueues::new();
        let normal = StepId::new();
        let urgent = StepId::new();

        queues.enqueue(WorkflowStage::SampleQc, normal, key(Priority::Normal, 0, 1));
        queues.enqueue(WorkflowStage::SampleQc, urgent, key(Priority::Urgent, 0, 2));

        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(urgent));
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(normal));
    }

    #[test]
    fn ties_break_on_submission_date_then_sample_number() {
        let queues = PriorityQueues::new();
        let older = StepId::new();
        let newer = StepId::new();

        queues.enqueue(WorkflowStage::SampleQc, newer, key(Priority::Normal, 0, 1));
        queues.enqueue(WorkflowStage::SampleQc, older, key(Priority::Normal, 5, 1));

        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(older));
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(newer));
    }

    #[test]
    fn duplicate_enqueue_is_idempotent() {
        let queues = PriorityQueues::new();
        let id = StepId::new();
        queues.enqueue(WorkflowStage::SampleQc, id, key(Priority::Normal, 0, 1));
        queues.enqueue(WorkflowStage::SampleQc, id, key(Priority::Urgent, 0, 1));
        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
    }

    #[test]
    fn dequeue_from_empty_queue_returns_none() {
        let queues = PriorityQueues::new();
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), None);
    }

    #[test]
    fn removed_entry_is_skipped_on_dequeue() {
        let queues = PriorityQueues::new();
        let id = StepId::new();
        queues.enqueue(WorkflowStage::SampleQc, id, key(Priority::Normal, 0, 1));
        queues.remove(WorkflowStage::SampleQc, id);
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), None);
    }

    #[test]
    fn reorder_applies_new_priority() {
        let queues = PriorityQueues::new();
        let a = StepId::new();
        let b = StepId::new();
        queues.enqueue(WorkflowStage::SampleQc, a, key(Priority::Normal, 0, 1));
        queues.enqueue(WorkflowStage::SampleQc, b, key(Priority::Normal, 0, 2));

        queues.reorder(&[(WorkflowStage::SampleQc, a, key(Priority::Urgent, 0, 1))]);

        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(a));
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(b));
    }
}
