//! Data types for the availability pipeline
//!
//! This module contains the records produced by the parsers, the per-run
//! result accumulation, and the report handed back to callers.
//! All public types implement Serialize for JSON output.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An entity the caller wants availability for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTarget {
    /// Display name; identity of the entity (case-sensitive)
    pub name: String,
    /// Upstream identifier used by the booking site
    #[serde(default)]
    pub id: Option<String>,
    /// Region or massif the entity belongs to
    #[serde(default)]
    pub region: Option<String>,
}

impl QueryTarget {
    /// Create a target with only a display name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            region: None,
        }
    }
}

/// One row of availability for one entity on one query date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Entity display name
    pub entity_name: String,
    /// Upstream identifier
    pub entity_id: Option<String>,
    /// Date string the record was queried under, in the source's format
    pub query_date: String,
    /// Altitude as displayed upstream (e.g. "2 100 m")
    pub altitude: Option<String>,
    /// Massif, valley or town
    pub location: Option<String>,
    /// Total capacity (places/beds)
    pub capacity: Option<u32>,
    /// Number of free places
    pub available: Option<u32>,
    /// Free-text availability status
    pub status: Option<String>,
    /// Date quoted inside the availability text, when it differs from the query
    pub reported_date: Option<String>,
    /// Room category for hotel sources
    pub room_type: Option<String>,
    /// Total price for the stay
    pub total: Option<f64>,
    /// Taxes for the stay
    pub taxes: Option<f64>,
    /// Fees for the stay
    pub fees: Option<f64>,
    /// Maximum guests in the room
    pub max_guests: Option<u32>,
    /// Short rate description
    pub short_description: Option<String>,
    /// Long rate description
    pub long_description: Option<String>,
    /// Image URL
    pub image: Option<String>,
}

/// A filtered record with its 1-based display position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberedRecord {
    pub sequence: usize,
    pub record: AvailabilityRecord,
}

/// All records collected during one run, before filtering
///
/// Insertion order is date order, then discovery order within a date.
/// No deduplication is performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    records: Vec<AvailabilityRecord>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records parsed for one date
    pub fn extend_date(&mut self, records: Vec<AvailabilityRecord>) {
        self.records.extend(records);
    }

    /// Records in insertion order
    pub fn records(&self) -> &[AvailabilityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep only records whose entity name is in `names`, numbered from 1.
    ///
    /// Relative order of surviving records is preserved.
    ///
    /// # Example
    /// ```
    /// use availability_core::types::{AvailabilityRecord, ResultSet};
    ///
    /// let mut set = ResultSet::new();
    /// set.extend_date(vec![
    ///     AvailabilityRecord { entity_name: "Refuge A".into(), ..Default::default() },
    ///     AvailabilityRecord { entity_name: "Refuge B".into(), ..Default::default() },
    /// ]);
    /// let rows = set.filter(&["Refuge A".to_string()]);
    /// assert_eq!(rows.len(), 1);
    /// assert_eq!(rows[0].sequence, 1);
    /// ```
    pub fn filter<S: AsRef<str>>(&self, names: &[S]) -> Vec<NumberedRecord> {
        let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();

        self.records
            .iter()
            .filter(|record| wanted.contains(record.entity_name.as_str()))
            .enumerate()
            .map(|(index, record)| NumberedRecord {
                sequence: index + 1,
                record: record.clone(),
            })
            .collect()
    }
}

/// Which stage of a run produced a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Every fetch attempt for the date failed
    Fetch,
    /// The response for the date could not be parsed
    Parse,
    /// A selected name is not in the catalog
    UnknownEntity,
    /// The filtered rows could not be written to the export file
    Export,
}

/// Non-fatal problem scoped to one date or one selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Query date the warning belongs to (empty for selection warnings)
    pub date: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Lifecycle of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "date", rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    Expanding,
    Fetching(String),
    Retrying(String),
    Parsing(String),
    Filtering,
    Exporting,
    Done,
}

/// Progress notification sent after each stage change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub stage: RunStage,
    /// Dates fully processed so far
    pub completed: usize,
    /// Dates in the window
    pub total: usize,
    /// Linear estimate of the time left, once at least one date is done
    pub estimated_remaining: Option<Duration>,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Result of filtering a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one record survived filtering
    Rows { rows: Vec<NumberedRecord> },
    /// Nothing matched the selection
    NoResults,
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Query dates in order, in the source's format
    pub dates: Vec<String>,
    /// Records collected before filtering
    pub collected: usize,
    /// Per-date and per-selection warnings, in the order they occurred
    pub warnings: Vec<Warning>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Filtered rows, empty for [`RunOutcome::NoResults`]
    pub fn rows(&self) -> &[NumberedRecord] {
        match &self.outcome {
            RunOutcome::Rows { rows } => rows,
            RunOutcome::NoResults => &[],
        }
    }

    /// Warnings for one query date
    pub fn warnings_for<'a>(&'a self, date: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.date == date)
    }
}
