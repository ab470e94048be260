//! Bounded, newest-first correction history

use crate::storage::{Repository, HISTORY_KEY};
use crate::types::CorrectionResult;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

pub struct HistoryManager {
    repository: Repository,
    capacity: usize,
}

impl HistoryManager {
    pub fn new(repository: Repository, capacity: usize) -> Self {
        Self {
            repository,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored entries, newest first
    pub fn list(&self) -> Vec<CorrectionResult> {
        self.repository.load_or_default(HISTORY_KEY, Vec::new)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// Prepend `result`, dropping the oldest entries beyond capacity
    pub fn add(&self, result: CorrectionResult) {
        let mut history = self.list();
        history.insert(0, result);
        self.store(history);
    }

    /// Remove every entry with exactly this timestamp
    pub fn remove(&self, timestamp: &str) {
        let mut history = self.list();
        let before = history.len();
        history.retain(|entry| entry.timestamp != timestamp);

        if history.len() == before {
            tracing::debug!("No history entry with timestamp {}", timestamp);
        }
        self.store(history);
    }

    pub fn clear(&self) {
        self.store(Vec::new());
    }

    fn store(&self, mut history: Vec<CorrectionResult>) {
        history.truncate(self.capacity);
        self.repository.save_or_log(HISTORY_KEY, &history);
    }
}
