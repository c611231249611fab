// The booking normalizer. This is pure business logic: one loosely-structured
// input item goes in, one canonical record (or a rejection) comes out. No I/O
// happens here - the catalog is read-only reference data injected up front.

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::booking_models::{
    default_action_rules, ActionRule, BookingAction, BusinessHours, CanonicalRecord,
    DEFAULT_DURATION_MINUTES, DEFAULT_PRICE,
};
use super::catalog::{normalize_service_name, ServiceCatalog};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("service '{0}' is not in the catalog")]
    UnknownService(String),

    #[error("malformed time '{0}': must be HH:MM or H AM/PM")]
    MalformedTime(String),

    #[error("malformed date '{0}': expected YYYY-MM-DD")]
    MalformedDate(String),
}

pub struct BookingService {
    catalog: ServiceCatalog,
    rules: Vec<ActionRule>,
    hours: BusinessHours,
}

impl BookingService {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self {
            catalog,
            rules: default_action_rules(),
            hours: BusinessHours::default(),
        }
    }

    /// Swap in a custom classification table (first match wins).
    pub fn with_rules(mut self, rules: Vec<ActionRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_hours(mut self, hours: BusinessHours) -> Self {
        self.hours = hours;
        self
    }

    /// Classify a free-text status into an action by ordered keyword match.
    /// Unmatched (or absent) statuses default to Create.
    pub fn classify(&self, status: &str) -> BookingAction {
        let status = status.to_lowercase();
        self.rules
            .iter()
            .find(|rule| status.contains(rule.keyword))
            .map(|rule| rule.action)
            .unwrap_or(BookingAction::Create)
    }

    /// Normalize one raw booking item into a `CanonicalRecord`.
    ///
    /// Input shape is polymorphic: the payload fields may live under
    /// `"details"`, under `"booking_details"`, or directly on the item itself.
    /// The status field is looked up on the root first, then the details.
    pub fn normalize(&self, raw: &Value) -> Result<CanonicalRecord, BookingError> {
        let details = extract_details(raw);

        let status = string_field(raw, "status")
            .or_else(|| string_field(details, "status"))
            .unwrap_or_default();
        let action = self.classify(&status);

        let service_raw =
            string_field(details, "service").ok_or(BookingError::MissingField("service"))?;
        let service = normalize_service_name(&service_raw);
        if !self.catalog.contains(&service) {
            return Err(BookingError::UnknownService(service));
        }

        let date_raw = string_field(details, "date").ok_or(BookingError::MissingField("date"))?;
        let time_raw = string_field(details, "time").ok_or(BookingError::MissingField("time"))?;

        let date = NaiveDate::parse_from_str(date_raw.trim(), "%Y-%m-%d")
            .map_err(|_| BookingError::MalformedDate(date_raw.clone()))?;
        let (hour, minute) = parse_time(&time_raw)?;

        // Out-of-hours bookings are pulled into the window, minute preserved.
        let hour = self.hours.clamp_hour(hour);
        let start = combine(date, hour, minute, &time_raw)?;

        let booking_id = string_field(details, "booking_id")
            .or_else(|| string_field(details, "id"))
            .or_else(|| string_field(raw, "booking_id"))
            .unwrap_or_else(synthesize_booking_id);

        let (price, price_defaulted) = match number_field(details, "price") {
            Some(p) => (p, false),
            None => match self.catalog.price_of(&service) {
                Some(p) => (p, false),
                None => {
                    warn!(booking_id = %booking_id, service = %service,
                        "price missing from input and catalog, using default {DEFAULT_PRICE}");
                    (DEFAULT_PRICE, true)
                }
            },
        };

        let (duration_minutes, duration_defaulted) = match number_field(details, "duration") {
            Some(d) => (d, false),
            None => match self.catalog.duration_of(&service) {
                Some(d) => (d, false),
                None => {
                    warn!(booking_id = %booking_id, service = %service,
                        "duration missing from input and catalog, using default {DEFAULT_DURATION_MINUTES}");
                    (DEFAULT_DURATION_MINUTES, true)
                }
            },
        };

        Ok(CanonicalRecord {
            booking_id,
            action,
            customer_name: string_field(details, "name"),
            email: string_field(details, "email"),
            phone: string_field(details, "phone"),
            service,
            stylist: string_field(details, "stylist"),
            price,
            duration_minutes,
            start,
            price_defaulted,
            duration_defaulted,
        })
    }
}

/// Find the details object: primary key, alternate key, then the item itself.
fn extract_details(raw: &Value) -> &Value {
    raw.get("details")
        .filter(|v| v.is_object())
        .or_else(|| raw.get("booking_details").filter(|v| v.is_object()))
        .unwrap_or(raw)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numeric fields may arrive as JSON integers, JSON floats, or numeric
/// strings. Floats are rounded to the nearest whole unit.
fn number_field(value: &Value, key: &str) -> Option<u32> {
    let field = value.get(key)?;
    if let Some(n) = field.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = field.as_f64() {
        return round_to_u32(f);
    }
    let text = field.as_str()?.trim();
    text.parse()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(round_to_u32))
}

fn round_to_u32(f: f64) -> Option<u32> {
    (f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX)).then(|| f.round() as u32)
}

fn synthesize_booking_id() -> String {
    // Collision odds are non-zero but operationally acceptable; see DESIGN.md.
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("BK-{:06X}", suffix)
}

/// Parse a time string in one of the two accepted textual forms:
/// strict 24-hour `HH:MM`, or informal `H AM/PM` (case-insensitive,
/// with or without the space). Anything else is malformed.
fn parse_time(input: &str) -> Result<(u32, u32), BookingError> {
    let trimmed = input.trim();
    let malformed = || BookingError::MalformedTime(input.to_string());

    if let Some((h, m)) = trimmed.split_once(':') {
        // "9:30" is fine (identity modulo zero-padding), "9:5" is not.
        if m.len() != 2 {
            return Err(malformed());
        }
        let hour: u32 = h.parse().map_err(|_| malformed())?;
        let minute: u32 = m.parse().map_err(|_| malformed())?;
        if hour > 23 || minute > 59 {
            return Err(malformed());
        }
        return Ok((hour, minute));
    }

    let upper = trimmed.to_uppercase();
    let (digits, is_pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim(), false)
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim(), true)
    } else {
        return Err(malformed());
    };

    let hour: u32 = digits.parse().map_err(|_| malformed())?;
    if !(1..=12).contains(&hour) {
        return Err(malformed());
    }

    // Standard 12-hour convention: 12 AM is midnight, 12 PM is noon.
    let hour24 = match (is_pm, hour) {
        (false, 12) => 0,
        (false, h) => h,
        (true, 12) => 12,
        (true, h) => h + 12,
    };

    Ok((hour24, 0))
}

fn combine(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    time_raw: &str,
) -> Result<NaiveDateTime, BookingError> {
    date.and_hms_opt(hour, minute, 0)
        .ok_or_else(|| BookingError::MalformedTime(time_raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn catalog_of(services: &[&str]) -> ServiceCatalog {
        let input: super::super::catalog::CatalogInput =
            serde_json::from_value(json!(services)).unwrap();
        ServiceCatalog::from_services(input)
    }

    fn service() -> BookingService {
        BookingService::new(catalog_of(&["haircut", "colour"]))
    }

    #[test]
    fn parse_time_24_hour() {
        assert_eq!(parse_time("09:30").unwrap(), (9, 30));
        assert_eq!(parse_time("9:30").unwrap(), (9, 30));
        assert_eq!(parse_time("23:59").unwrap(), (23, 59));
        assert_eq!(parse_time("0:00").unwrap(), (0, 0));
    }

    #[test]
    fn parse_time_meridiem() {
        assert_eq!(parse_time("12 AM").unwrap(), (0, 0));
        assert_eq!(parse_time("12 PM").unwrap(), (12, 0));
        assert_eq!(parse_time("7 PM").unwrap(), (19, 0));
        assert_eq!(parse_time("7 am").unwrap(), (7, 0));
        assert_eq!(parse_time("2pm").unwrap(), (14, 0));
    }

    #[test]
    fn parse_time_rejects_garbage() {
        for bad in ["", "late", "25:00", "10:70", "13 PM", "0 AM", "9:5", "7 XM"] {
            assert!(parse_time(bad).is_err(), "expected rejection for {bad:?}");
        }
    }

    #[test]
    fn classify_follows_rule_order() {
        let svc = service();

        assert_eq!(svc.classify("Please RESCHEDULE me"), BookingAction::Update);
        assert_eq!(svc.classify("cancelled"), BookingAction::Delete);
        assert_eq!(svc.classify("new booking"), BookingAction::Create);
        assert_eq!(svc.classify(""), BookingAction::Create);
    }

    #[test]
    fn custom_rules_and_hours_replace_the_defaults() {
        let svc = service()
            .with_rules(vec![ActionRule {
                keyword: "postpone",
                action: BookingAction::Update,
            }])
            .with_hours(BusinessHours {
                open_hour: 8,
                close_hour: 22,
            });

        // Only the injected table applies now.
        assert_eq!(svc.classify("please postpone"), BookingAction::Update);
        assert_eq!(svc.classify("cancel"), BookingAction::Create);

        // The wider window keeps what the default hours would clamp.
        let raw = json!({
            "details": {"service": "haircut", "date": "2025-03-01", "time": "9 PM"}
        });
        assert_eq!(svc.normalize(&raw).unwrap().start.hour(), 21);
    }

    #[test]
    fn normalize_end_to_end_cancellation() {
        // Typical chat-bot output: a cancellation with a padded service name
        // and an afternoon meridiem time.
        let raw = json!({
            "status": "cancelled",
            "details": {
                "service": "HairCut ",
                "date": "2025-03-01",
                "time": "2 PM",
            }
        });

        let record = service().normalize(&raw).unwrap();

        assert_eq!(record.action, BookingAction::Delete);
        assert_eq!(record.service, "haircut");
        assert_eq!(record.start.hour(), 14);
        assert_eq!(record.start.minute(), 0);
        assert!(record.booking_id.starts_with("BK-"));
    }

    #[test]
    fn normalize_clamps_out_of_hours() {
        let early = json!({
            "details": {"service": "haircut", "date": "2025-03-01", "time": "7:45"}
        });
        let late = json!({
            "details": {"service": "haircut", "date": "2025-03-01", "time": "11 PM"}
        });

        let record = service().normalize(&early).unwrap();
        assert_eq!(record.start.hour(), 10);
        assert_eq!(record.start.minute(), 45); // minute preserved

        let record = service().normalize(&late).unwrap();
        assert_eq!(record.start.hour(), 19);
    }

    #[test]
    fn normalize_rejects_unknown_service() {
        let raw = json!({
            "details": {"service": "bogus", "date": "2025-03-01", "time": "12:00"}
        });

        let err = service().normalize(&raw).unwrap_err();
        assert!(matches!(err, BookingError::UnknownService(s) if s == "bogus"));
    }

    #[test]
    fn normalize_reads_alternate_shapes() {
        let nested = json!({
            "booking_details": {"service": "colour", "date": "2025-04-02", "time": "11:00"}
        });
        let flat = json!({
            "service": "colour", "date": "2025-04-02", "time": "11:00"
        });

        for raw in [nested, flat] {
            let record = service().normalize(&raw).unwrap();
            assert_eq!(record.service, "colour");
        }
    }

    #[test]
    fn normalize_falls_back_for_price_and_duration() {
        let mut prices = std::collections::HashMap::new();
        prices.insert("haircut".to_string(), 35);
        let input: super::super::catalog::CatalogInput =
            serde_json::from_value(json!(["haircut"])).unwrap();
        let catalog = ServiceCatalog::new(input, prices, Default::default());
        let svc = BookingService::new(catalog);

        let raw = json!({
            "details": {"service": "haircut", "date": "2025-03-01", "time": "12:00"}
        });
        let record = svc.normalize(&raw).unwrap();

        // Price came from the catalog, duration fell through to the default.
        assert_eq!(record.price, 35);
        assert!(!record.price_defaulted);
        assert_eq!(record.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert!(record.duration_defaulted);
    }

    #[test]
    fn normalize_prefers_explicit_values() {
        let raw = json!({
            "details": {
                "booking_id": "BK-12",
                "service": "haircut",
                "date": "2025-03-01",
                "time": "12:00",
                "price": 80,
                "duration": "90",
                "name": "Jane Doe",
                "stylist": "Sam",
            }
        });

        let record = service().normalize(&raw).unwrap();

        assert_eq!(record.booking_id, "BK-12");
        assert_eq!(record.price, 80);
        assert_eq!(record.duration_minutes, 90);
        assert!(!record.price_defaulted);
        assert!(!record.duration_defaulted);
        assert_eq!(record.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.stylist.as_deref(), Some("Sam"));
    }

    #[test]
    fn normalize_rounds_fractional_amounts() {
        let raw = json!({
            "details": {
                "service": "haircut",
                "date": "2025-03-01",
                "time": "12:00",
                "price": 35.5,
                "duration": "45.2",
            }
        });

        let record = service().normalize(&raw).unwrap();

        // Explicit values win even when fractional; negatives are discarded.
        assert_eq!(record.price, 36);
        assert!(!record.price_defaulted);
        assert_eq!(record.duration_minutes, 45);
        assert!(!record.duration_defaulted);

        let negative = json!({
            "details": {
                "service": "haircut", "date": "2025-03-01", "time": "12:00",
                "price": -5.0,
            }
        });
        let record = service().normalize(&negative).unwrap();
        assert_eq!(record.price, DEFAULT_PRICE);
        assert!(record.price_defaulted);
    }

    #[test]
    fn normalize_reports_missing_fields() {
        let raw = json!({"details": {"date": "2025-03-01", "time": "12:00"}});
        assert!(matches!(
            service().normalize(&raw),
            Err(BookingError::MissingField("service"))
        ));

        let raw = json!({"details": {"service": "haircut", "time": "12:00"}});
        assert!(matches!(
            service().normalize(&raw),
            Err(BookingError::MissingField("date"))
        ));
    }
}
