// Loads the service catalog from a JSON file. The file may spell the
// services as a plain list of names or as a map of name -> details; both
// shapes produce the same catalog.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::booking::{CatalogInput, ServiceCatalog};

#[derive(Debug, Error)]
pub enum CatalogStoreError {
    #[error("could not read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    services: CatalogInput,
    #[serde(default)]
    prices: HashMap<String, u32>,
    #[serde(default)]
    durations: HashMap<String, u32>,
}

pub fn load_catalog(path: &Path) -> Result<ServiceCatalog, CatalogStoreError> {
    let content = std::fs::read_to_string(path)?;
    let file: CatalogFile = serde_json::from_str(&content)?;
    Ok(ServiceCatalog::new(file.services, file.prices, file.durations))
}
