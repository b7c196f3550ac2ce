//! Entity catalog loaded from a data file
//!
//! The catalog lists every bookable entity a source knows about: display
//! name, upstream identifier and region. It replaces per-script hardcoded
//! tables.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::types::QueryTarget;

/// Ordered list of known entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCatalog {
    pub entities: Vec<QueryTarget>,
}

impl EntityCatalog {
    /// Build a catalog, rejecting blank or duplicate names.
    pub fn new(entities: Vec<QueryTarget>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entity in &entities {
            if entity.name.trim().is_empty() {
                return Err(AvailabilityError::Config(
                    "catalog entry with an empty name".to_string(),
                ));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(AvailabilityError::Config(format!(
                    "duplicate catalog entry '{}'",
                    entity.name
                )));
            }
        }
        Ok(Self { entities })
    }

    /// Parse a catalog from JSON: either `{"entities": [...]}` or a bare array.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Document {
            Bare(Vec<QueryTarget>),
            Wrapped { entities: Vec<QueryTarget> },
        }

        let entities = match serde_json::from_str::<Document>(json)? {
            Document::Bare(entities) => entities,
            Document::Wrapped { entities } => entities,
        };
        Self::new(entities)
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up an entity by exact display name
    pub fn get(&self, name: &str) -> Option<&QueryTarget> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// All display names, in catalog order
    pub fn names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }

    /// Display names grouped by region; entities without one go under `""`
    pub fn regions(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entity in &self.entities {
            grouped
                .entry(entity.region.clone().unwrap_or_default())
                .or_default()
                .push(entity.name.clone());
        }
        grouped
    }

    /// Display names belonging to `region` (exact match)
    pub fn names_in_region(&self, region: &str) -> Vec<String> {
        self.entities
            .iter()
            .filter(|e| e.region.as_deref() == Some(region))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Selected names that the catalog does not know, in selection order
    pub fn unknown<'a, S: AsRef<str>>(&self, selected: &'a [S]) -> Vec<&'a str> {
        selected
            .iter()
            .map(|s| s.as_ref())
            .filter(|name| self.get(name).is_none())
            .collect()
    }

    /// Upstream identifiers of the selected entities, comma-joined in catalog order.
    ///
    /// Entities without an identifier are skipped.
    ///
    /// # Example
    /// ```
    /// use availability_core::catalog::EntityCatalog;
    ///
    /// let catalog = EntityCatalog::from_json(r#"[
    ///     {"name": "Refuge A", "id": "101"},
    ///     {"name": "Refuge B", "id": "102"},
    ///     {"name": "Refuge C", "id": "103"}
    /// ]"#).unwrap();
    /// assert_eq!(catalog.joined_ids(&["Refuge C", "Refuge A"]), "101,103");
    /// ```
    pub fn joined_ids<S: AsRef<str>>(&self, selected: &[S]) -> String {
        let wanted: HashSet<&str> = selected.iter().map(|s| s.as_ref()).collect();
        self.entities
            .iter()
            .filter(|e| wanted.contains(e.name.as_str()))
            .filter_map(|e| e.id.as_deref())
            .collect::<Vec<_>>()
            .join(",")
    }
}
