// Appends per-item failures to a JSONL file so a later run (or a human) can
// retry just the failed reports.

use chrono::Local;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::reports::{FailureEntry, FailureRecord};

#[derive(Debug, Serialize)]
struct FailureLine<'a> {
    timestamp: String,
    identity: &'a str,
    url: &'a str,
    stage: String,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SummaryFailureLine<'a> {
    timestamp: String,
    identity: &'a str,
    error: &'a str,
}

pub struct JsonlFailureLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlFailureLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn append(&self, failure: &FailureRecord) -> std::io::Result<()> {
        let line = FailureLine {
            timestamp: Local::now().format("%d/%m/%Y - %H:%M:%S").to_string(),
            identity: &failure.identity,
            url: &failure.url,
            stage: failure.stage.to_string(),
            message: &failure.message,
        };

        let json = serde_json::to_string(&line)?;
        self.write_line(&json)
    }

    fn write_line(&self, json: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Logs every failure in a batch. Never fatal: a broken failure log is
    /// worth a warning, not a crashed run.
    pub fn append_all(&self, failures: &[FailureRecord]) {
        for failure in failures {
            if let Err(e) = self.append(failure) {
                tracing::warn!(
                    "Could not write failure log entry for '{}': {}",
                    failure.identity,
                    e
                );
            }
        }
    }

    /// Same as `append_all` but for the condensed entries a batch summary
    /// carries (the stage is already folded into the error text).
    pub fn append_entries(&self, failures: &[FailureEntry]) {
        for failure in failures {
            let line = SummaryFailureLine {
                timestamp: Local::now().format("%d/%m/%Y - %H:%M:%S").to_string(),
                identity: &failure.identity,
                error: &failure.error,
            };

            let result = serde_json::to_string(&line)
                .map_err(std::io::Error::other)
                .and_then(|json| self.write_line(&json));

            if let Err(e) = result {
                tracing::warn!(
                    "Could not write failure log entry for '{}': {}",
                    failure.identity,
                    e
                );
            }
        }
    }
}
