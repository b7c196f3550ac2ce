//! Query date window expansion
//!
//! Turns an anchor date plus an offset window into the ordered list of
//! calendar dates the pipeline queries, formatted the way the upstream
//! source expects them.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};

/// Upper bound on the number of dates a single run may query
pub const MAX_WINDOW_DAYS: u64 = 365;

/// Date format used by the refuge booking pages (`15/06/2025`)
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Shape of the window around the anchor date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpan {
    /// `n` consecutive days starting at the anchor
    Forward(u64),
    /// `k` days before and after the anchor, anchor included
    Around(u64),
}

impl WindowSpan {
    /// Number of dates this span produces
    pub fn len(&self) -> u64 {
        match *self {
            WindowSpan::Forward(n) => n,
            WindowSpan::Around(k) => k.saturating_mul(2).saturating_add(1),
        }
    }

    /// Whether the span produces no dates at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One date to query, carrying its upstream representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDate {
    date: NaiveDate,
    formatted: String,
}

impl QueryDate {
    /// Build a query date rendered with `format`.
    ///
    /// `format` must already be validated (see [`validate_format`]).
    pub fn new(date: NaiveDate, format: &str) -> Self {
        Self {
            date,
            formatted: date.format(format).to_string(),
        }
    }

    /// The calendar date
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Date string in the source's format; this is the value records carry
    pub fn as_str(&self) -> &str {
        &self.formatted
    }

    /// Zero-padded day of month (`"05"`)
    pub fn day(&self) -> String {
        format!("{:02}", self.date.day())
    }

    /// Zero-padded month (`"06"`)
    pub fn month(&self) -> String {
        format!("{:02}", self.date.month())
    }

    /// Four-digit year (`"2025"`)
    pub fn year(&self) -> String {
        format!("{:04}", self.date.year())
    }

    /// ISO-8601 representation (`2025-06-15`)
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// ISO-8601 representation of the following day, used as stay end date
    pub fn next_day_iso(&self) -> Option<String> {
        self.date
            .checked_add_days(Days::new(1))
            .map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl std::fmt::Display for QueryDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted)
    }
}

/// Anchor date plus window specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    anchor: NaiveDate,
    span: WindowSpan,
    format: String,
}

impl DateWindow {
    /// Parse `anchor` with `format` and attach the window.
    ///
    /// # Errors
    /// - `AvailabilityError::Config` if `format` is not a valid strftime pattern
    /// - `AvailabilityError::DateParse` if `anchor` does not match `format`
    /// - `AvailabilityError::InvalidWindow` if the window is longer than
    ///   [`MAX_WINDOW_DAYS`] or leaves the representable calendar
    ///
    /// # Example
    /// ```
    /// use availability_core::dates::{DateWindow, WindowSpan};
    ///
    /// let window = DateWindow::parse("15/06/2025", "%d/%m/%Y", WindowSpan::Around(1)).unwrap();
    /// let dates: Vec<String> = window.expand().iter().map(|d| d.to_string()).collect();
    /// assert_eq!(dates, ["14/06/2025", "15/06/2025", "16/06/2025"]);
    /// ```
    pub fn parse(anchor: &str, format: &str, span: WindowSpan) -> Result<Self> {
        validate_format(format)?;
        let parsed = NaiveDate::parse_from_str(anchor.trim(), format).map_err(|_| {
            AvailabilityError::DateParse {
                input: anchor.to_string(),
                format: format.to_string(),
            }
        })?;
        Self::new(parsed, format, span)
    }

    /// Build a window from an already parsed anchor.
    pub fn new(anchor: NaiveDate, format: &str, span: WindowSpan) -> Result<Self> {
        validate_format(format)?;

        if span.len() > MAX_WINDOW_DAYS {
            return Err(AvailabilityError::InvalidWindow(format!(
                "{} days exceeds the limit of {}",
                span.len(),
                MAX_WINDOW_DAYS
            )));
        }

        let window = Self {
            anchor,
            span,
            format: format.to_string(),
        };

        // Both ends must exist on the calendar
        if !span.is_empty() && (window.first().is_none() || window.last().is_none()) {
            return Err(AvailabilityError::InvalidWindow(
                "window runs past the supported calendar range".to_string(),
            ));
        }

        Ok(window)
    }

    /// The anchor date
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// The window specification
    pub fn span(&self) -> WindowSpan {
        self.span
    }

    /// Number of dates [`expand`](Self::expand) yields
    pub fn len(&self) -> usize {
        self.span.len() as usize
    }

    /// Whether the window yields no dates
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    fn first(&self) -> Option<NaiveDate> {
        match self.span {
            WindowSpan::Forward(_) => Some(self.anchor),
            WindowSpan::Around(k) => self.anchor.checked_sub_days(Days::new(k)),
        }
    }

    fn last(&self) -> Option<NaiveDate> {
        match self.span {
            WindowSpan::Forward(n) => self.anchor.checked_add_days(Days::new(n.saturating_sub(1))),
            WindowSpan::Around(k) => self.anchor.checked_add_days(Days::new(k)),
        }
    }

    /// Expand into ascending, duplicate-free query dates.
    pub fn expand(&self) -> Vec<QueryDate> {
        let Some(first) = self.first() else {
            return Vec::new();
        };

        first
            .iter_days()
            .take(self.len())
            .map(|date| QueryDate::new(date, &self.format))
            .collect()
    }
}

/// Check that `format` is a usable strftime pattern.
///
/// Rendering a date with a broken pattern panics inside chrono, so every
/// pattern is checked once before use.
pub fn validate_format(format: &str) -> Result<()> {
    if format.trim().is_empty() {
        return Err(AvailabilityError::Config("date format is empty".to_string()));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(AvailabilityError::Config(format!(
            "invalid date format '{}'",
            format
        )));
    }

    // Time and offset specifiers parse fine but cannot render a bare date
    let mut rendered = String::new();
    write!(rendered, "{}", sample_date().format(format)).map_err(|_| {
        AvailabilityError::Config(format!(
            "date format '{}' needs more than a calendar date",
            format
        ))
    })?;
    Ok(())
}

fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(window: &DateWindow) -> Vec<String> {
        window.expand().iter().map(|d| d.as_str().to_string()).collect()
    }

    #[test]
    fn test_around_one_day() {
        let window = DateWindow::parse("15/06/2025", DEFAULT_DATE_FORMAT, WindowSpan::Around(1)).unwrap();
        assert_eq!(strings(&window), ["14/06/2025", "15/06/2025", "16/06/2025"]);
    }

    #[test]
    fn test_forward_crosses_month_boundary() {
        let window = DateWindow::parse("30/06/2025", DEFAULT_DATE_FORMAT, WindowSpan::Forward(3)).unwrap();
        assert_eq!(strings(&window), ["30/06/2025", "01/07/2025", "02/07/2025"]);
    }

    #[test]
    fn test_forward_zero_is_empty() {
        let window = DateWindow::parse("15/06/2025", DEFAULT_DATE_FORMAT, WindowSpan::Forward(0)).unwrap();
        assert!(window.is_empty());
        assert!(window.expand().is_empty());
    }

    #[test]
    fn test_around_zero_is_anchor_only() {
        let window = DateWindow::parse("15/06/2025", DEFAULT_DATE_FORMAT, WindowSpan::Around(0)).unwrap();
        assert_eq!(strings(&window), ["15/06/2025"]);
    }

    #[test]
    fn test_iso_format() {
        let window = DateWindow::parse("2025-12-31", "%Y-%m-%d", WindowSpan::Forward(2)).unwrap();
        assert_eq!(strings(&window), ["2025-12-31", "2026-01-01"]);
    }

    #[test]
    fn test_invalid_anchor_is_rejected() {
        let result = DateWindow::parse("2025-06-15", DEFAULT_DATE_FORMAT, WindowSpan::Forward(3));
        match result {
            Err(AvailabilityError::DateParse { input, format }) => {
                assert_eq!(input, "2025-06-15");
                assert_eq!(format, DEFAULT_DATE_FORMAT);
            }
            other => panic!("Expected DateParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_impossible_date_is_rejected() {
        let result = DateWindow::parse("31/02/2025", DEFAULT_DATE_FORMAT, WindowSpan::Forward(1));
        assert!(matches!(result, Err(AvailabilityError::DateParse { .. })));
    }

    #[test]
    fn test_window_limit() {
        assert!(DateWindow::parse("01/01/2025", DEFAULT_DATE_FORMAT, WindowSpan::Forward(365)).is_ok());
        assert!(matches!(
            DateWindow::parse("01/01/2025", DEFAULT_DATE_FORMAT, WindowSpan::Forward(366)),
            Err(AvailabilityError::InvalidWindow(_))
        ));
        assert!(DateWindow::parse("01/01/2025", DEFAULT_DATE_FORMAT, WindowSpan::Around(182)).is_ok());
        assert!(matches!(
            DateWindow::parse("01/01/2025", DEFAULT_DATE_FORMAT, WindowSpan::Around(183)),
            Err(AvailabilityError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_invalid_format_is_config_error() {
        let result = DateWindow::parse("15/06/2025", "%Q", WindowSpan::Forward(1));
        assert!(matches!(result, Err(AvailabilityError::Config(_))));
    }

    #[test]
    fn test_time_specifiers_rejected() {
        for format in ["%d/%m/%Y %H:%M", "%Y-%m-%dT%S", "%d/%m/%Y %z"] {
            assert!(
                matches!(validate_format(format), Err(AvailabilityError::Config(_))),
                "{} should be rejected",
                format
            );
        }
        let result = DateWindow::parse("15/06/2025 10:00", "%d/%m/%Y %H:%M", WindowSpan::Forward(1));
        assert!(matches!(result, Err(AvailabilityError::Config(_))));
        assert!(validate_format("%A %d %B %Y").is_ok());
    }

    #[test]
    fn test_query_date_components() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let query = QueryDate::new(date, DEFAULT_DATE_FORMAT);
        assert_eq!(query.as_str(), "05/06/2025");
        assert_eq!(query.day(), "05");
        assert_eq!(query.month(), "06");
        assert_eq!(query.year(), "2025");
        assert_eq!(query.iso(), "2025-06-05");
        assert_eq!(query.next_day_iso().as_deref(), Some("2025-06-06"));
    }

    fn anchor_strategy() -> impl Strategy<Value = NaiveDate> {
        (1990i32..2100, 1u32..=365).prop_map(|(year, ordinal)| {
            NaiveDate::from_yo_opt(year, ordinal).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_around_is_ascending_and_sized(anchor in anchor_strategy(), k in 0u64..=182) {
            let window = DateWindow::new(anchor, DEFAULT_DATE_FORMAT, WindowSpan::Around(k)).unwrap();
            let dates: Vec<NaiveDate> = window.expand().iter().map(|d| d.date()).collect();
            prop_assert_eq!(dates.len() as u64, 2 * k + 1);
            prop_assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(dates.contains(&anchor));
        }

        #[test]
        fn prop_forward_is_ascending_and_sized(anchor in anchor_strategy(), n in 0u64..=365) {
            let window = DateWindow::new(anchor, DEFAULT_DATE_FORMAT, WindowSpan::Forward(n)).unwrap();
            let dates: Vec<NaiveDate> = window.expand().iter().map(|d| d.date()).collect();
            prop_assert_eq!(dates.len() as u64, n);
            prop_assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
            if n > 0 {
                prop_assert_eq!(dates[0], anchor);
            }
        }
    }
}
