//! Lock-free work queue for distributing items across parallel workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free work queue distributing items to workers.
///
/// Workers call [`next()`](WorkQueue::next) to atomically claim the next item
/// together with its input position.
pub struct WorkQueue<S> {
    items: Vec<S>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    pub fn new(items: Vec<S>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim next item (lock-free); `None` once the queue is drained
    pub fn next(&self) -> Option<(usize, &S)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|item| (i, item))
    }

    /// Number of items claimed so far (saturates at total)
    pub fn dispatched(&self) -> usize {
        self.cursor.load(Ordering::Relaxed).min(self.items.len())
    }

    /// Total items in queue
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Items never claimed by a worker, with their input positions
    pub fn undispatched(&self) -> impl Iterator<Item = (usize, &S)> {
        let start = self.dispatched();
        self.items.iter().enumerate().skip(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_items_with_positions() {
        let q = WorkQueue::new(vec!["a", "b", "c"]);
        assert_eq!(q.total(), 3);
        assert_eq!(q.next(), Some((0, &"a")));
        assert_eq!(q.next(), Some((1, &"b")));
        assert_eq!(q.next(), Some((2, &"c")));
        assert_eq!(q.next(), None);
        assert_eq!(q.dispatched(), 3);
    }

    #[test]
    fn undispatched_tail() {
        let q = WorkQueue::new(vec![10, 20, 30, 40]);
        q.next();
        let rest: Vec<_> = q.undispatched().collect();
        assert_eq!(rest, vec![(1, &20), (2, &30), (3, &40)]);
    }

    #[test]
    fn drained_queue_has_no_undispatched() {
        let q = WorkQueue::new(vec![1]);
        q.next();
        q.next();
        q.next();
        assert_eq!(q.dispatched(), 1);
        assert_eq!(q.undispatched().count(), 0);
    }

    #[test]
    fn empty_queue() {
        let q: WorkQueue<i32> = WorkQueue::new(vec![]);
        assert_eq!(q.total(), 0);
        assert_eq!(q.next(), None);
    }
}
