//! Append-only record of sub-runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationRecord {
    pub timestamp: DateTime<Utc>,
    /// Runner name, possibly decorated (e.g. `"manager (final)"`)
    pub agent: String,
    pub result: String,
}

/// Shared, thread-safe execution history.
#[derive(Debug, Default)]
pub struct ExecutionHistory {
    records: Mutex<Vec<OrchestrationRecord>>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, agent: impl Into<String>, result: impl Into<String>) {
        self.lock().push(OrchestrationRecord {
            timestamp: Utc::now(),
            agent: agent.into(),
            result: result.into(),
        });
    }

    pub fn snapshot(&self) -> Vec<OrchestrationRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OrchestrationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_and_clears() {
        let history = ExecutionHistory::new();
        history.record("a", "first");
        history.record("b", "second");

        let records = history.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent, "a");
        assert_eq!(records[1].result, "second");
        assert!(records[0].timestamp <= records[1].timestamp);

        history.clear();
        assert!(history.is_empty());
    }
}
