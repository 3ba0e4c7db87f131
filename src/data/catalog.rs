//! Commander catalog: the read-only source of commander identity and base stats.

use std::collections::HashMap;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::data::RosterError;
use crate::data::commander::Commander;

pub const DEFAULT_CATALOG_PATH: &str = "data/commanders.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub commanders: Vec<Commander>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_key: HashMap<String, Commander>,
}

/// Lowercase and collapse spaces, dashes and underscores so "Iron Warden" finds `iron_warden`.
pub(crate) fn normalize_lookup(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

impl Catalog {
    pub fn from_commanders<I>(commanders: I) -> Self
    where
        I: IntoIterator<Item = Commander>,
    {
        let mut catalog = Self::default();
        catalog.extend(commanders);
        catalog
    }

    /// Later entries replace earlier ones with the same id.
    pub fn extend<I>(&mut self, commanders: I)
    where
        I: IntoIterator<Item = Commander>,
    {
        for commander in commanders {
            self.by_key.insert(normalize_lookup(&commander.id), commander);
        }
    }

    /// Look up by id, falling back to a unique name match.
    pub fn get(&self, id_or_name: &str) -> Option<&Commander> {
        let key = normalize_lookup(id_or_name);
        if let Some(commander) = self.by_key.get(&key) {
            return Some(commander);
        }
        let mut by_name = self
            .by_key
            .values()
            .filter(|commander| normalize_lookup(&commander.name) == key);
        match (by_name.next(), by_name.next()) {
            (Some(commander), None) => Some(commander),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Commanders sorted by id.
    pub fn commanders(&self) -> Vec<&Commander> {
        let mut list: Vec<&Commander> = self.by_key.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}

pub fn load_catalog(path: &str) -> Result<Catalog, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_string(),
        source,
    })?;
    let file: CatalogFile = serde_json::from_str(&raw).map_err(|source| RosterError::Parse {
        path: path.to_string(),
        source,
    })?;
    Ok(Catalog::from_commanders(file.commanders))
}

/// The catalog at [DEFAULT_CATALOG_PATH], or an empty one when the file is missing or invalid.
pub fn load_default_catalog() -> Catalog {
    match load_catalog(DEFAULT_CATALOG_PATH) {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::warn!(error = %err, "commander catalog unavailable, continuing with an empty catalog");
            Catalog::default()
        }
    }
}
