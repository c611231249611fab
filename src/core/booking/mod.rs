// Booking intake module - normalizes loosely-structured booking items
// (chat-bot output, CSV rows) into canonical records.

pub mod booking_models;
pub mod booking_service;
pub mod catalog;

pub use booking_models::{ActionRule, BookingAction, BusinessHours, CanonicalRecord};
pub use booking_service::{BookingError, BookingService};
pub use catalog::{CatalogInput, ServiceCatalog};
