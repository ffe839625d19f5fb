//! Shared FIFO of pending row tasks.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::types::{JobSpec, Task};

/// Concurrent FIFO of tasks waiting to be computed.
///
/// Shared by every worker session and by the local executor. Neither
/// operation blocks beyond the short critical section: an empty queue means
/// "no more work right now", not "wait for more".
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue holding one task per row of `spec`, in row order.
    pub fn for_job(spec: &JobSpec) -> Self {
        Self {
            pending: Mutex::new(spec.tasks().collect()),
        }
    }

    /// Append a task. Also used to hand back in-flight tasks after a failure.
    pub fn enqueue(&self, task: Task) {
        self.pending.lock().push_back(task);
    }

    /// Take the oldest task, or `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<Task> {
        self.pending.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
