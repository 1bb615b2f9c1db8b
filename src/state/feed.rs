//! Bounded most-recent-first buffers for the opportunity and log feeds.

use std::collections::VecDeque;

/// Opportunities kept for display.
pub const OPPORTUNITY_CAPACITY: usize = 100;
/// Log lines kept for the activity panel.
pub const LOG_CAPACITY: usize = 200;

/// A fixed-capacity buffer. Index 0 is always the latest item; pushing past
/// capacity evicts the oldest from the back.
#[derive(Debug, Clone)]
pub struct BoundedFeed<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedFeed<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts at the front, truncating the tail. Returns the evicted item.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `n` items with the largest `key`, largest first. Ties keep
    /// arrival order (newer first). The feed itself is not reordered.
    pub fn top_by<F>(&self, n: usize, key: F) -> Vec<&T>
    where
        F: Fn(&T) -> f64,
    {
        let mut sorted: Vec<&T> = self.items.iter().collect();
        sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
        sorted.truncate(n);
        sorted
    }
}
