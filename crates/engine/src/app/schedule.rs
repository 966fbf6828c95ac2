use super::action::Signal;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledEvent {
    due_ms: u64,
    seq: u64,
    signal: Signal,
}

/// One-shot events delivered to the active scene on the first realtick at
/// or after their due time. Cleared whenever the scene deactivates.
#[derive(Debug, Default)]
pub struct Schedule {
    entries: Vec<ScheduledEvent>,
    next_seq: u64,
}

impl Schedule {
    pub fn push(&mut self, due_ms: u64, signal: Signal) {
        self.next_seq += 1;
        self.entries.push(ScheduledEvent {
            due_ms,
            seq: self.next_seq,
            signal,
        });
    }

    /// Removes every pending event with `tag`; returns how many were dropped.
    pub fn cancel(&mut self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|event| event.signal.tag != tag);
        before - self.entries.len()
    }

    pub fn drain_due(&mut self, now_ms: u64) -> Vec<Signal> {
        let mut due: Vec<ScheduledEvent> = Vec::new();
        self.entries.retain(|event| {
            if event.due_ms <= now_ms {
                due.push(*event);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|event| (event.due_ms, event.seq));
        due.into_iter().map(|event| event.signal).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
