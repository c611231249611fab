// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "booking/mod.rs"]
pub mod booking;

#[path = "reports/mod.rs"]
pub mod reports;
