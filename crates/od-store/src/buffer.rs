use std::collections::VecDeque;

use od_core::types::Event;

/// Append-only, capacity-bounded log of raw events.
///
/// Retained purely for the timeline/audit views; the worker registry is the
/// source of truth for current state. When full, the oldest entry is evicted
/// first.
#[derive(Debug)]
pub struct EventBuffer {
    capacity: usize,
    events: VecDeque<Event>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first iteration over the retained window.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// The most recent `n` events, oldest-first.
    pub fn tail(&self, n: usize) -> Vec<Event> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Drop everything (full resynchronization only).
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use od_core::types::EventKind;

    fn ev(n: u64) -> Event {
        Event::new(
            EventKind::TranscriptLine,
            Utc::now(),
            serde_json::json!({ "issue": n }),
        )
    }

    #[test]
    fn push_and_tail() {
        let mut buf = EventBuffer::new(10);
        for i in 0..4 {
            buf.push(ev(i));
        }
        assert_eq!(buf.len(), 4);
        let tail = buf.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].data["issue"], 2);
        assert_eq!(tail[1].data["issue"], 3);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut buf = EventBuffer::new(3);
        for i in 0..5 {
            buf.push(ev(i));
        }
        assert_eq!(buf.len(), 3);
        let all: Vec<_> = buf.iter().map(|e| e.data["issue"].as_u64().unwrap()).collect();
        assert_eq!(all, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = EventBuffer::new(0);
        buf.push(ev(1));
        assert_eq!(buf.len(), 1);
        buf.push(ev(2));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.iter().next().unwrap().data["issue"], 2);
    }

    #[test]
    fn tail_larger_than_len_returns_all() {
        let mut buf = EventBuffer::new(10);
        buf.push(ev(1));
        assert_eq!(buf.tail(100).len(), 1);
    }
}
