//! Recording of callback invocations across lanes.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Finished,
}

/// A single recorded event. `seq` is a process-wide monotonic counter shared
/// by all events of one [`CallLog`].
#[derive(Debug, Clone)]
pub struct Event<T> {
    pub item: T,
    pub kind: EventKind,
    pub seq: usize,
    pub thread: ThreadId,
}

/// Thread-safe journal of callback invocations.
pub struct CallLog<T> {
    events: Mutex<Vec<Event<T>>>,
    seq: AtomicUsize,
}

impl<T: Clone> CallLog<T> {
    pub fn new() -> CallLog<T> {
        CallLog {
            events: Mutex::new(Vec::new()),
            seq: AtomicUsize::new(0),
        }
    }

    /// Records that processing of `item` started and returns its sequence
    /// number.
    pub fn start(&self, item: &T) -> usize {
        self.push(item, EventKind::Started)
    }

    /// Records that processing of `item` finished and returns its sequence
    /// number.
    pub fn finish(&self, item: &T) -> usize {
        self.push(item, EventKind::Finished)
    }

    /// Returns the next sequence number without recording anything. Useful as
    /// a timestamp for "everything after this point".
    pub fn mark(&self) -> usize {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<Event<T>> {
        self.events.lock().unwrap().clone()
    }

    /// Items in the order their processing started.
    pub fn started(&self) -> Vec<T> {
        self.items_of(EventKind::Started)
    }

    /// Items in the order their processing finished.
    pub fn finished(&self) -> Vec<T> {
        self.items_of(EventKind::Finished)
    }

    /// Number of items whose processing started after sequence number `seq`.
    pub fn started_after(&self, seq: usize) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == EventKind::Started && e.seq > seq)
            .count()
    }

    /// The highest number of items that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        let mut events = self.events();
        events.sort_by_key(|e| e.seq);
        let mut current = 0usize;
        let mut max = 0;
        for e in events {
            match e.kind {
                EventKind::Started => {
                    current += 1;
                    max = max.max(current);
                }
                EventKind::Finished => current = current.saturating_sub(1),
            }
        }
        max
    }

    /// Items started on each distinct thread, in start order per thread.
    pub fn started_by_thread(&self) -> Vec<Vec<T>> {
        let mut groups: Vec<(ThreadId, Vec<T>)> = Vec::new();
        for e in self.events() {
            if e.kind != EventKind::Started {
                continue;
            }
            match groups.iter_mut().find(|(id, _)| *id == e.thread) {
                Some((_, items)) => items.push(e.item),
                None => groups.push((e.thread, vec![e.item])),
            }
        }
        groups.into_iter().map(|(_, items)| items).collect()
    }

    fn items_of(&self, kind: EventKind) -> Vec<T> {
        let mut events = self.events();
        events.sort_by_key(|e| e.seq);
        events
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.item)
            .collect()
    }

    fn push(&self, item: &T, kind: EventKind) -> usize {
        let mut events = self.events.lock().unwrap();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        events.push(Event {
            item: item.clone(),
            kind,
            seq,
            thread: thread::current().id(),
        });
        seq
    }
}

impl<T: Clone> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}
