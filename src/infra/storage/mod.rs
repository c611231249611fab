// Storage infra layer.
// - `drive_storage.rs` uploads artifacts to Google Drive over HTTP.
// - `in_memory.rs` keeps artifacts in memory for tests and dry runs.

#[path = "drive_storage.rs"]
pub mod drive_storage;

#[path = "in_memory.rs"]
pub mod in_memory;

pub use drive_storage::DriveStorage;
pub use in_memory::InMemoryStorage;
