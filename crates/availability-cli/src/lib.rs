//! Availability Scout command-line front end
//!
//! This crate wraps [`availability_core`] in a small CLI: load a source
//! configuration and entity catalog, pick a date window and a selection,
//! run the pipeline and write the export to disk.
//!
//! # Usage
//!
//! ```text
//! availability-scout --config data/refuges.source.json \
//!     --catalog data/refuges.catalog.json \
//!     --anchor 15/06/2025 --around 1 --region Vanoise --format csv
//! ```
//!
//! # Commands
//! - `--list` - Print the catalog grouped by region
//! - default - Run the pipeline and write `<export_name>.<ext>`

pub mod args;
pub mod commands;

use std::path::Path;

use anyhow::{Context, Result};
use availability_core::{AvailabilityScraper, EntityCatalog, SourceConfig};
use log::debug;

/// A configured scraper plus its catalog, loaded once per invocation
pub struct Session {
    scraper: AvailabilityScraper,
}

impl Session {
    /// Build a session from already loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SourceConfig, catalog: EntityCatalog) -> Result<Self> {
        let name = config.name.clone();
        let scraper = AvailabilityScraper::new(config, catalog)
            .with_context(|| format!("invalid source configuration '{}'", name))?;
        Ok(Self { scraper })
    }

    /// Load the source configuration and, if given, the entity catalog.
    pub fn load(config_path: &Path, catalog_path: Option<&Path>) -> Result<Self> {
        let config = SourceConfig::load(config_path)
            .with_context(|| format!("failed to read source config {}", config_path.display()))?;

        let catalog = match catalog_path {
            Some(path) => EntityCatalog::load(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?,
            None => EntityCatalog::default(),
        };
        debug!(
            "Loaded source '{}' with {} catalog entit(ies)",
            config.name,
            catalog.entities.len()
        );

        Self::new(config, catalog)
    }

    /// Get a reference to the inner scraper.
    pub fn scraper(&self) -> &AvailabilityScraper {
        &self.scraper
    }
}
