use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::domain::RawEvent;

/// Ordered hand-off queue between the listener thread and the polling
/// consumer. Unbounded: the consumer drains every tick, and an event must
/// never be dropped once pushed.
#[derive(Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<RawEvent>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RawEvent>> {
        // A panicked consumer must not wedge the listener thread.
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, event: RawEvent) {
        self.lock().push_back(event);
    }

    /// Takes every queued event at once, in the order pushed.
    pub fn drain(&self) -> Vec<RawEvent> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
