//! Bounded FIFO sample buffer

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Keeps the most recent `capacity` samples, evicting the oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.min(128)),
        }
    }

    pub fn push(&mut self, item: T) {
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl RingBuffer<f64> {
    /// Arithmetic mean, or `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.iter().sum::<f64>() / self.items.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn test_mean() {
        let mut ring = RingBuffer::new(10);
        assert_eq!(ring.mean(), None);
        ring.push(0.5);
        ring.push(1.0);
        assert_eq!(ring.mean(), Some(0.75));
    }
}
