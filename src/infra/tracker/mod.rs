#[path = "sheets_tracker.rs"]
mod sheets_tracker;

#[path = "in_memory.rs"]
mod in_memory;

#[path = "failure_log.rs"]
mod failure_log;

#[path = "case_numbers.rs"]
mod case_numbers;

pub use case_numbers::CaseNumberStore;
pub use failure_log::JsonlFailureLog;
pub use in_memory::InMemoryTracker;
pub use sheets_tracker::SheetsTracker;
