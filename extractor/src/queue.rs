//! Bounded FIFO of typed `ExtractedMessage` values with soft/hard caps.
//!
//! The extractor is the sole writer; any number of downstream consumers
//! (rendering windows, loggers, the response generator) may dequeue. A plain
//! mutex is enough here, unlike the ring: messages own a heap `Vec<u8>` payload
//! and are not `Copy`, so there is no lock-free SPSC trick that avoids one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use shared::errors::QueueError;
use shared::ExtractedMessage;

pub struct OutputQueue {
    inner: Mutex<VecDeque<ExtractedMessage>>,
    soft_cap: usize,
    hard_cap: usize,
    enqueued: AtomicUsize,
    dequeued: AtomicUsize,
    dropped: AtomicUsize,
}

impl OutputQueue {
    /// `hard_cap` must be `>= soft_cap`; the caller (config validation) is
    /// responsible for enforcing that before construction.
    pub fn new(soft_cap: usize, hard_cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            soft_cap,
            hard_cap,
            enqueued: AtomicUsize::new(0),
            dequeued: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Enqueues `m`, rejecting it once `len() >= hard_cap`.
    ///
    /// On rejection the caller (the extractor) must treat the bytes that
    /// produced `m` as not consumed, so they are retried once the queue drains.
    pub fn enqueue(&self, m: ExtractedMessage) -> Result<(), QueueError> {
        let mut guard = self.inner.lock().expect("output queue mutex poisoned");
        if guard.len() >= self.hard_cap {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(QueueError::Full {
                size: guard.len(),
                hard_cap: self.hard_cap,
            });
        }
        guard.push_back(m);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn dequeue(&self) -> Option<ExtractedMessage> {
        let mut guard = self.inner.lock().expect("output queue mutex poisoned");
        let m = guard.pop_front();
        if m.is_some() {
            self.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        m
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("output queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once `len() >= soft_cap`: the extractor should stop emitting for
    /// this call and let consumers catch up, even though enqueue still succeeds.
    pub fn is_under_pressure(&self) -> bool {
        self.len() >= self.soft_cap
    }

    pub fn drop_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn enqueued_count(&self) -> usize {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued_count(&self) -> usize {
        self.dequeued.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MessageKind;

    fn msg(n: u8) -> ExtractedMessage {
        ExtractedMessage::new(MessageKind::CogMessage, vec![n], 1.0, n as u64)
    }

    #[test]
    fn enqueue_dequeue_preserves_order() {
        let q = OutputQueue::new(10, 20);
        q.enqueue(msg(1)).unwrap();
        q.enqueue(msg(2)).unwrap();
        assert_eq!(q.dequeue().unwrap().payload, vec![1]);
        assert_eq!(q.dequeue().unwrap().payload, vec![2]);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn soft_cap_allows_enqueue_but_signals_pressure() {
        let q = OutputQueue::new(1, 3);
        q.enqueue(msg(1)).unwrap();
        assert!(q.is_under_pressure());
        q.enqueue(msg(2)).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn hard_cap_rejects_and_counts_drops() {
        let q = OutputQueue::new(1, 2);
        q.enqueue(msg(1)).unwrap();
        q.enqueue(msg(2)).unwrap();
        let err = q.enqueue(msg(3)).unwrap_err();
        assert!(matches!(err, QueueError::Full { .. }));
        assert_eq!(q.len(), 2);
        assert_eq!(q.drop_count(), 1);
    }
}
