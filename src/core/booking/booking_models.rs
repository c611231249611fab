// Domain models for booking intake.
// These are plain data types - all parsing and validation lives in
// booking_service.rs so the models stay inert and easy to test against.

use chrono::NaiveDateTime;

/// What a booking asks us to do, inferred from its free-text status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Create,
    Update,
    Delete,
}

/// One classification rule: if the (lowercased) status contains `keyword`,
/// the booking gets `action`. Rules are evaluated in order, first match wins.
///
/// Keeping the table as data means new keywords ("move", "postpone", ...)
/// are a config change, not a code change.
#[derive(Debug, Clone)]
pub struct ActionRule {
    pub keyword: &'static str,
    pub action: BookingAction,
}

/// The default rule table. Anything that matches nothing is a Create.
pub fn default_action_rules() -> Vec<ActionRule> {
    vec![
        ActionRule {
            keyword: "update",
            action: BookingAction::Update,
        },
        ActionRule {
            keyword: "reschedule",
            action: BookingAction::Update,
        },
        ActionRule {
            keyword: "cancel",
            action: BookingAction::Delete,
        },
        ActionRule {
            keyword: "delete",
            action: BookingAction::Delete,
        },
    ]
}

/// Opening window for appointments. Parsed hours outside the window are
/// clamped into it rather than rejected - deliberate booking policy, see
/// DESIGN.md.
#[derive(Debug, Clone, Copy)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 10,
            close_hour: 19,
        }
    }
}

impl BusinessHours {
    pub fn clamp_hour(&self, hour: u32) -> u32 {
        hour.clamp(self.open_hour, self.close_hour)
    }
}

/// Fallback price when neither the input nor the catalog knows one.
pub const DEFAULT_PRICE: u32 = 500;

/// Fallback duration when neither the input nor the catalog knows one.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// A fully normalized booking. Constructed once by the normalizer and
/// immutable afterwards - downstream code only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Supplied booking id, or a synthesized `BK-XXXXXX` one.
    pub booking_id: String,
    pub action: BookingAction,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Lowercase-trimmed, guaranteed to exist in the service catalog.
    pub service: String,
    pub stylist: Option<String>,
    pub price: u32,
    pub duration_minutes: u32,
    pub start: NaiveDateTime,
    /// True when the fixed fallback price was substituted (input and catalog
    /// both missing). Lets callers audit how many records relied on defaults.
    pub price_defaulted: bool,
    /// Same audit flag for the duration.
    pub duration_defaulted: bool,
}
