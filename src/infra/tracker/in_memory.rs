// In-memory OutcomeTracker for tests and dry runs. Preserves append order.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::core::reports::{CollaboratorError, OutcomeTracker, TrackerRecord};

pub struct InMemoryTracker {
    rows: Mutex<Vec<TrackerRecord>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn rows(&self) -> Vec<TrackerRecord> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeTracker for InMemoryTracker {
    async fn append(&self, record: TrackerRecord) -> Result<(), CollaboratorError> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> TrackerRecord {
        TrackerRecord {
            client_name: name.to_string(),
            url: String::new(),
            success: true,
            total_points: None,
            risk: None,
            flagged_count: None,
            artifact_link: None,
            file_id: None,
            case_number: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn rows_come_back_in_append_order() {
        let tracker = InMemoryTracker::new();

        tracker.append(record("first")).await.unwrap();
        tracker.append(record("second")).await.unwrap();
        tracker.append(record("third")).await.unwrap();

        let names: Vec<String> = tracker.rows().into_iter().map(|r| r.client_name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
