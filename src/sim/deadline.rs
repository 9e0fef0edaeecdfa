/// Deferred actions, fired synchronously at the start of a tick.
///
/// Every entry remembers the generation it was scheduled in. The owner
/// bumps the generation on each phase change, so an entry that outlives
/// its phase is dropped instead of fired.

use std::fmt::Debug;

use tracing::debug;

#[derive(Clone, Debug)]
struct Entry<A> {
    due_ms: u64,
    generation: u64,
    action: A,
}

#[derive(Clone, Debug)]
pub struct DeadlineQueue<A> {
    generation: u64,
    entries: Vec<Entry<A>>,
}

impl<A: Debug> Default for DeadlineQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Debug> DeadlineQueue<A> {
    pub fn new() -> Self {
        DeadlineQueue { generation: 0, entries: Vec::new() }
    }

    /// Invalidate everything scheduled so far.
    pub fn bump(&mut self) {
        self.generation += 1;
    }

    pub fn schedule(&mut self, due_ms: u64, action: A) {
        debug!(due_ms, generation = self.generation, ?action, "deferred action scheduled");
        self.entries.push(Entry { due_ms, generation: self.generation, action });
    }

    /// Remove and return every live action due at `now_ms`, earliest first.
    /// Stale actions that fall due are discarded.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<A> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due_ms <= now_ms);
        self.entries = pending;
        due.sort_by_key(|e| e.due_ms);

        let current = self.generation;
        due.into_iter()
            .filter_map(|e| {
                if e.generation == current {
                    Some(e.action)
                } else {
                    debug!(action = ?e.action, scheduled_in = e.generation, current, "stale deferred action dropped");
                    None
                }
            })
            .collect()
    }

    /// Pending entries, stale ones included.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
