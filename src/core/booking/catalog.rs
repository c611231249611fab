// Service catalog - read-only reference data the normalizer validates against.
//
// Upstream config sources are sloppy about shape: sometimes the service list
// arrives as a plain array, sometimes as an object whose keys are the service
// names. Instead of coercing defensively at every call site, the ambiguity is
// parsed exactly once here into a single canonical set.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// The two shapes a service list may arrive in. With `untagged`, serde tries
/// each variant in order, so both `["haircut"]` and `{"haircut": {...}}`
/// deserialize without the caller caring which one it got.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogInput {
    List(Vec<String>),
    Map(HashMap<String, serde_json::Value>),
}

/// Canonical catalog: lowercase-trimmed service names plus optional price and
/// duration tables keyed the same way.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: BTreeSet<String>,
    prices: HashMap<String, u32>,
    durations: HashMap<String, u32>,
}

/// The one normalization rule for catalog keys and lookups.
pub fn normalize_service_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl ServiceCatalog {
    pub fn new(
        input: CatalogInput,
        prices: HashMap<String, u32>,
        durations: HashMap<String, u32>,
    ) -> Self {
        let services = match input {
            CatalogInput::List(names) => names
                .iter()
                .map(|n| normalize_service_name(n))
                .collect(),
            CatalogInput::Map(map) => map
                .keys()
                .map(|k| normalize_service_name(k))
                .collect(),
        };

        Self {
            services,
            prices: prices
                .into_iter()
                .map(|(k, v)| (normalize_service_name(&k), v))
                .collect(),
            durations: durations
                .into_iter()
                .map(|(k, v)| (normalize_service_name(&k), v))
                .collect(),
        }
    }

    /// Build a catalog with only a service list, no price/duration tables.
    pub fn from_services(input: CatalogInput) -> Self {
        Self::new(input, HashMap::new(), HashMap::new())
    }

    /// Membership test. `service` must already be normalized.
    pub fn contains(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    pub fn price_of(&self, service: &str) -> Option<u32> {
        self.prices.get(service).copied()
    }

    pub fn duration_of(&self, service: &str) -> Option<u32> {
        self.durations.get(service).copied()
    }

    /// Sorted view of the known services (BTreeSet keeps them ordered).
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
