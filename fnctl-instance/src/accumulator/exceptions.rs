use std::collections::VecDeque;

use fnctl_pb::ExceptionInformation;

/// Fixed-capacity exception history. Pushing past capacity evicts the
/// oldest record first.
#[derive(Debug, Clone)]
pub struct ExceptionLog {
    entries: VecDeque<ExceptionInformation>,
    capacity: usize,
}

impl ExceptionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: ExceptionInformation) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExceptionInformation> {
        self.entries.iter()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<ExceptionInformation> {
        self.entries.iter().cloned().collect()
    }
}
