//! Lock-free queue distributing one page's records across workers.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Workers call [`next()`](WorkQueue::next) to atomically claim the
/// next item; no locking, no rebalancing.
pub struct WorkQueue<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item (lock-free).
    pub fn next(&self) -> Option<&T> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_order() {
        let q = WorkQueue::new(vec!["a", "b"]);
        assert_eq!(q.total(), 2);
        assert_eq!(q.next(), Some(&"a"));
        assert_eq!(q.next(), Some(&"b"));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let q: WorkQueue<u32> = WorkQueue::new(vec![]);
        assert_eq!(q.next(), None);
    }

    #[test]
    fn concurrent_claims_cover_all_items_once() {
        use std::sync::Arc;
        let q = Arc::new(WorkQueue::new((0..100).collect::<Vec<u32>>()));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let q = q.clone();
            handles.push(std::thread::spawn(move || {
                let mut claimed = Vec::new();
                while let Some(&item) = q.next() {
                    claimed.push(item);
                }
                claimed
            }));
        }
        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("worker panicked"))
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<u32>>());
    }
}
