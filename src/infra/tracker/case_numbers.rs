// Sequential case number allocation, persisted to a small JSON state file so
// numbering survives restarts. Format: "JD - SS - 10673" where JD are the
// client's initials.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::reports::{CaseNumberAllocator, CollaboratorError};

const STARTING_NUMBER: u64 = 10673;

#[derive(Debug, Serialize, Deserialize)]
struct CounterState {
    next_number: u64,
}

pub struct CaseNumberStore {
    path: Option<PathBuf>,
    next: Mutex<u64>,
}

impl CaseNumberStore {
    /// Loads the counter from `path`, starting fresh if the file is missing
    /// or unreadable.
    pub fn load(path: PathBuf) -> Self {
        let next = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<CounterState>(&content).ok())
            .map(|state| state.next_number)
            .unwrap_or(STARTING_NUMBER);

        Self {
            path: Some(path),
            next: Mutex::new(next),
        }
    }

    /// Counter without persistence, for dry runs and tests.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            next: Mutex::new(STARTING_NUMBER),
        }
    }

    /// Two uppercase initials from the client name: first letters of the
    /// first two words, or the first two letters of a single-word name.
    /// "XX" when the name is empty or has no alphabetic characters.
    fn initials(client_name: &str) -> String {
        let words: Vec<&str> = client_name.split_whitespace().collect();

        let initials: String = if words.len() == 1 {
            words[0]
                .chars()
                .filter(|c| c.is_alphabetic())
                .take(2)
                .flat_map(char::to_uppercase)
                .collect()
        } else {
            words
                .iter()
                .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
                .take(2)
                .flat_map(char::to_uppercase)
                .collect()
        };

        if initials.is_empty() {
            "XX".to_string()
        } else {
            initials
        }
    }

    fn persist(&self, next_number: u64) {
        let Some(path) = &self.path else {
            return;
        };

        let state = CounterState { next_number };
        match serde_json::to_string(&state) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!("Could not persist case counter to {:?}: {}", path, e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize case counter: {}", e),
        }
    }
}

impl CaseNumberAllocator for CaseNumberStore {
    fn allocate(&self, client_name: &str) -> Result<String, CollaboratorError> {
        let number = {
            let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
            let number = *next;
            *next += 1;
            number
        };
        self.persist(number + 1);

        Ok(format!(
            "{} - SS - {}",
            Self::initials(client_name),
            number
        ))
    }
}
