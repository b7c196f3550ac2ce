//! Main availability pipeline API
//!
//! This module ties the stages together: expand the date window, fetch and
//! parse each date in order, accumulate the records, filter them by the
//! caller's selection and export what is left.
//! A failing date is skipped with a warning; it never aborts the run.

use std::time::Instant;

use log::{info, warn};

use crate::catalog::EntityCatalog;
use crate::config::{SourceConfig, SourceKind};
use crate::dates::{DateWindow, QueryDate, WindowSpan};
use crate::error::Result;
use crate::export::{export, ExportFile, ExportFormat};
use crate::fetcher::AvailabilityFetcher;
use crate::parser::{parse_response, ParseContext};
use crate::types::{
    AvailabilityRecord, NumberedRecord, Progress, ResultSet, RunOutcome, RunReport, RunStage,
    Warning, WarningKind,
};

/// Everything the caller chooses for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunQuery {
    /// Anchor date in the source's date format
    pub anchor: String,
    pub span: WindowSpan,
    /// Entity display names to keep (exact match)
    pub selected: Vec<String>,
    pub format: ExportFormat,
}

/// Report plus the export, if anything survived filtering
#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: RunReport,
    pub file: Option<ExportFile>,
}

/// Availability pipeline for one configured source
///
/// # Example
/// ```no_run
/// use availability_core::{AvailabilityScraper, EntityCatalog, ExportFormat, SourceConfig, WindowSpan};
/// use availability_core::scraper::RunQuery;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SourceConfig::load("data/refuges.source.json")?;
///     let catalog = EntityCatalog::load("data/refuges.catalog.json")?;
///     let scraper = AvailabilityScraper::new(config, catalog)?;
///
///     let query = RunQuery {
///         anchor: "15/06/2025".to_string(),
///         span: WindowSpan::Around(1),
///         selected: vec!["Refuge du Goûter".to_string()],
///         format: ExportFormat::Csv,
///     };
///     let result = scraper.run(&query).await?;
///     println!("{} rows", result.report.rows().len());
///     Ok(())
/// }
/// ```
pub struct AvailabilityScraper {
    fetcher: AvailabilityFetcher,
    catalog: EntityCatalog,
}

impl AvailabilityScraper {
    /// Create a scraper for `config`, validating it first.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: SourceConfig, catalog: EntityCatalog) -> Result<Self> {
        config.validate()?;
        let fetcher = AvailabilityFetcher::new(config)?;
        Ok(Self { fetcher, catalog })
    }

    /// Create a scraper with a pre-built fetcher.
    pub fn with_fetcher(fetcher: AvailabilityFetcher, catalog: EntityCatalog) -> Self {
        Self { fetcher, catalog }
    }

    /// The source configuration
    pub fn config(&self) -> &SourceConfig {
        self.fetcher.config()
    }

    /// The entity catalog
    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Run the pipeline without progress notifications.
    pub async fn run(&self, query: &RunQuery) -> Result<RunResult> {
        self.run_with_progress(query, |_| {}).await
    }

    /// Run the pipeline, calling `on_progress` at every stage change.
    ///
    /// # Errors
    /// Only failures that happen before any network I/O (bad anchor date,
    /// oversized window) are returned as `Err`. Fetch, parse and export
    /// failures become warnings in the report; a failed export leaves
    /// `file` empty but keeps the rows.
    pub async fn run_with_progress<F>(&self, query: &RunQuery, mut on_progress: F) -> Result<RunResult>
    where
        F: FnMut(&Progress),
    {
        let config = self.config();
        let mut tracker = ProgressTracker::new();

        tracker.stage(RunStage::Expanding, &mut on_progress);
        let window = DateWindow::parse(&query.anchor, &config.date_format, query.span)?;
        let dates = window.expand();
        tracker.total = dates.len();
        info!(
            "{}: querying {} date(s) for {} selected entit(ies)",
            config.name,
            dates.len(),
            query.selected.len()
        );

        let mut warnings = self.selection_warnings(&query.selected);
        let ids = self.catalog.joined_ids(&query.selected);
        let mut results = ResultSet::new();

        for date in &dates {
            let label = date.to_string();
            tracker.stage(RunStage::Fetching(label.clone()), &mut on_progress);

            let fetched = self
                .fetcher
                .fetch_with_hook(date, &ids, |_| {
                    tracker.stage(RunStage::Retrying(label.clone()), &mut on_progress)
                })
                .await;

            let outcome = match fetched {
                Ok(body) => {
                    tracker.stage(RunStage::Parsing(label.clone()), &mut on_progress);
                    self.parse_date(date, &body)
                }
                Err(e) => Err(Warning {
                    date: label.clone(),
                    kind: WarningKind::Fetch,
                    message: e.to_string(),
                }),
            };

            match outcome {
                Ok(records) => {
                    info!("{}: {} record(s)", label, records.len());
                    results.extend_date(records);
                }
                Err(warning) => {
                    warn!("{}: skipped ({})", label, warning.message);
                    warnings.push(warning);
                }
            }
            tracker.completed += 1;
        }

        tracker.stage(RunStage::Filtering, &mut on_progress);
        let rows = results.filter(&query.selected);
        info!(
            "{}: {} of {} record(s) match the selection",
            config.name,
            rows.len(),
            results.len()
        );

        let (outcome, file) = if rows.is_empty() {
            info!("{}: no results", config.name);
            (RunOutcome::NoResults, None)
        } else {
            tracker.stage(RunStage::Exporting, &mut on_progress);
            let file = match export_or_warn(&rows, query.format, &config.export_name) {
                Ok(file) => Some(file),
                Err(warning) => {
                    warn!("{}: export failed ({})", config.name, warning.message);
                    warnings.push(warning);
                    None
                }
            };
            (RunOutcome::Rows { rows }, file)
        };

        tracker.stage(RunStage::Done, &mut on_progress);

        Ok(RunResult {
            report: RunReport {
                dates: dates.iter().map(|d| d.to_string()).collect(),
                collected: results.len(),
                warnings,
                outcome,
            },
            file,
        })
    }

    /// Parse one date's body; an unreadable body becomes a warning.
    fn parse_date(
        &self,
        date: &QueryDate,
        body: &str,
    ) -> std::result::Result<Vec<AvailabilityRecord>, Warning> {
        let config = self.config();
        let context = ParseContext {
            query_date: date.as_str(),
            entity_name: config.hotel_display_name(),
            entity_id: match config.kind {
                SourceKind::BookingJson => Some(config.booking.hotel_code.as_str()),
                SourceKind::RefugeHtml => None,
            },
        };

        parse_response(config.kind, body, &context).map_err(|e| Warning {
            date: date.to_string(),
            kind: WarningKind::Parse,
            message: e.to_string(),
        })
    }

    /// Warnings for selected names the catalog does not list.
    ///
    /// Booking sources match on the hotel display name, so the catalog is
    /// only consulted for refuge sources with a non-empty catalog.
    fn selection_warnings(&self, selected: &[String]) -> Vec<Warning> {
        let config = self.config();
        if config.kind != SourceKind::RefugeHtml || self.catalog.entities.is_empty() {
            return Vec::new();
        }

        self.catalog
            .unknown(selected)
            .into_iter()
            .map(|name| Warning {
                date: String::new(),
                kind: WarningKind::UnknownEntity,
                message: format!("'{}' is not in the catalog", name),
            })
            .collect()
    }
}

/// Export `rows`, turning a writer failure into a report warning.
fn export_or_warn(
    rows: &[NumberedRecord],
    format: ExportFormat,
    base_name: &str,
) -> std::result::Result<ExportFile, Warning> {
    export(rows, format, base_name).map_err(|e| Warning {
        date: String::new(),
        kind: WarningKind::Export,
        message: e.to_string(),
    })
}

/// Builds `Progress` values with a linear time estimate
struct ProgressTracker {
    started: Instant,
    completed: usize,
    total: usize,
}

impl ProgressTracker {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            completed: 0,
            total: 0,
        }
    }

    fn stage<F: FnMut(&Progress)>(&self, stage: RunStage, on_progress: &mut F) {
        let estimated_remaining = if self.completed > 0 && self.total >= self.completed {
            let per_date = self.started.elapsed() / self.completed as u32;
            Some(per_date * (self.total - self.completed) as u32)
        } else {
            None
        };

        on_progress(&Progress {
            stage,
            completed: self.completed,
            total: self.total,
            estimated_remaining,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvailabilityError;

    fn config() -> SourceConfig {
        SourceConfig {
            url: "http://127.0.0.1:9/dispo".to_string(),
            ..SourceConfig::default()
        }
    }

    fn query(anchor: &str) -> RunQuery {
        RunQuery {
            anchor: anchor.to_string(),
            span: WindowSpan::Around(1),
            selected: vec!["Refuge A".to_string()],
            format: ExportFormat::Csv,
        }
    }

    #[test]
    fn test_scraper_creation() {
        let scraper = AvailabilityScraper::new(config(), EntityCatalog::default());
        assert!(scraper.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = SourceConfig::default();
        assert!(matches!(
            AvailabilityScraper::new(bad, EntityCatalog::default()),
            Err(AvailabilityError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_anchor_aborts_before_fetching() {
        let scraper = AvailabilityScraper::new(config(), EntityCatalog::default()).unwrap();
        let mut stages = Vec::new();
        let result = scraper
            .run_with_progress(&query("2025-06-15"), |p| stages.push(p.stage.clone()))
            .await;

        assert!(matches!(result, Err(AvailabilityError::DateParse { .. })));
        assert_eq!(stages, vec![RunStage::Expanding]);
    }

    #[tokio::test]
    async fn test_empty_window_reports_no_results() {
        let scraper = AvailabilityScraper::new(config(), EntityCatalog::default()).unwrap();
        let mut q = query("15/06/2025");
        q.span = WindowSpan::Forward(0);

        let result = scraper.run(&q).await.unwrap();
        assert!(result.report.dates.is_empty());
        assert_eq!(result.report.outcome, RunOutcome::NoResults);
        assert!(result.file.is_none());
    }

    #[test]
    fn test_export_failure_becomes_warning() {
        let warning = export_or_warn(&[], ExportFormat::Xlsx, "refuges").unwrap_err();
        assert_eq!(warning.kind, WarningKind::Export);
        assert_eq!(warning.message, AvailabilityError::EmptyResult.to_string());

        let rows = vec![NumberedRecord {
            sequence: 1,
            record: AvailabilityRecord {
                entity_name: "Refuge A".to_string(),
                query_date: "14/06/2025".to_string(),
                ..Default::default()
            },
        }];
        let file = export_or_warn(&rows, ExportFormat::Csv, "refuges").unwrap();
        assert_eq!(file.file_name, "refuges.csv");
    }

    #[test]
    fn test_unknown_selection_warning() {
        let catalog = EntityCatalog::from_json(r#"[{"name": "Refuge A", "id": "1"}]"#).unwrap();
        let scraper = AvailabilityScraper::new(config(), catalog).unwrap();
        let warnings =
            scraper.selection_warnings(&["Refuge A".to_string(), "Refuge Z".to_string()]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnknownEntity);
        assert!(warnings[0].message.contains("Refuge Z"));
    }
}
