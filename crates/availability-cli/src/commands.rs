//! Commands behind the CLI flags
//!
//! Each function takes the loaded [`Session`] and returns plain data, so
//! `main` stays a thin dispatcher.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use availability_core::{
    ExportFile, Progress, RunQuery, RunReport, RunResult, RunStage, SourceKind,
};
use log::{debug, info};

use crate::args::Selection;
use crate::Session;

/// Catalog listing grouped by region, one line per entry.
///
/// Entities without a region are listed last under "(no region)".
pub fn list_entities(session: &Session) -> Vec<String> {
    let catalog = session.scraper().catalog();
    let mut lines = Vec::new();
    let mut unassigned = Vec::new();

    for (region, names) in catalog.regions() {
        if region.is_empty() {
            unassigned = names;
            continue;
        }
        lines.push(format!("{}:", region));
        lines.extend(names.into_iter().map(|n| format!("  {}", n)));
    }
    if !unassigned.is_empty() {
        lines.push("(no region):".to_string());
        lines.extend(unassigned.into_iter().map(|n| format!("  {}", n)));
    }
    lines
}

/// Turn the selection flags into display names, without duplicates.
///
/// Booking sources with nothing selected default to the hotel itself.
///
/// # Errors
/// - an unknown `--region`
/// - an empty selection for a refuge source
pub fn resolve_selection(session: &Session, selection: &Selection) -> Result<Vec<String>> {
    let scraper = session.scraper();
    let catalog = scraper.catalog();
    let mut names: Vec<String> = Vec::new();

    if selection.all {
        names.extend(catalog.names());
    }
    if let Some(region) = &selection.region {
        let in_region = catalog.names_in_region(region);
        if in_region.is_empty() {
            bail!("no catalog entities in region '{}'", region);
        }
        names.extend(in_region);
    }
    names.extend(selection.names.iter().cloned());

    let mut seen = std::collections::HashSet::new();
    names.retain(|name| seen.insert(name.clone()));

    if names.is_empty() {
        let config = scraper.config();
        match config.kind {
            SourceKind::BookingJson => names.push(config.hotel_display_name().to_string()),
            SourceKind::RefugeHtml => {
                bail!("nothing selected; use --select, --region or --all")
            }
        }
    }
    Ok(names)
}

/// Run the pipeline, logging progress as it goes.
pub async fn run_query(session: &Session, query: &RunQuery) -> Result<RunResult> {
    session
        .scraper()
        .run_with_progress(query, |progress| match progress.stage {
            RunStage::Fetching(_) | RunStage::Retrying(_) => info!("{}", describe_progress(progress)),
            _ => debug!("{}", describe_progress(progress)),
        })
        .await
        .with_context(|| format!("run anchored at {} failed", query.anchor))
}

/// Write `file` into `dir`, creating the directory if needed.
pub fn write_export(file: &ExportFile, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(&file.file_name);
    fs::write(&path, &file.bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Pretty-printed JSON for `report`, rows and warnings included.
pub fn report_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize run report")
}

/// One-line progress message, e.g. `[2/3 67%] fetching 15/06/2025, ~2s left`
pub fn describe_progress(progress: &Progress) -> String {
    let stage = match &progress.stage {
        RunStage::Idle => "idle".to_string(),
        RunStage::Expanding => "expanding dates".to_string(),
        RunStage::Fetching(date) => format!("fetching {}", date),
        RunStage::Retrying(date) => format!("retrying {}", date),
        RunStage::Parsing(date) => format!("parsing {}", date),
        RunStage::Filtering => "filtering".to_string(),
        RunStage::Exporting => "exporting".to_string(),
        RunStage::Done => "done".to_string(),
    };

    let mut line = format!(
        "[{}/{} {:.0}%] {}",
        progress.completed,
        progress.total,
        progress.fraction() * 100.0,
        stage
    );
    if let Some(eta) = progress.estimated_remaining {
        line.push_str(&format!(", ~{} left", format_eta(eta)));
    }
    line
}

/// Compact duration: `45s`, `3m 05s`, `1h 02m`
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availability_core::{EntityCatalog, RunOutcome, SourceConfig, Warning, WarningKind};
    use proptest::prelude::*;

    const CATALOG: &str = r#"{"entities": [
        {"name": "Refuge A", "id": "1", "region": "Vanoise"},
        {"name": "Refuge B", "id": "2", "region": "Écrins"},
        {"name": "Refuge C", "id": "3", "region": "Vanoise"},
        {"name": "Cabane D"}
    ]}"#;

    fn refuge_session() -> Session {
        let config = SourceConfig {
            url: "https://refuges.example/dispo".to_string(),
            ..SourceConfig::default()
        };
        Session::new(config, EntityCatalog::from_json(CATALOG).unwrap()).unwrap()
    }

    fn booking_session() -> Session {
        let mut config = SourceConfig {
            url: "https://hotel.example/api".to_string(),
            kind: SourceKind::BookingJson,
            ..SourceConfig::default()
        };
        config.booking.hotel_code = "514".to_string();
        config.booking.hotel_name = "Mandarin Oriental".to_string();
        Session::new(config, EntityCatalog::default()).unwrap()
    }

    #[test]
    fn test_list_groups_by_region() {
        let lines = list_entities(&refuge_session());
        assert_eq!(
            lines,
            vec![
                "Vanoise:",
                "  Refuge A",
                "  Refuge C",
                "Écrins:",
                "  Refuge B",
                "(no region):",
                "  Cabane D",
            ]
        );
    }

    #[test]
    fn test_region_and_names_are_merged_without_duplicates() {
        let selection = Selection {
            names: vec!["Refuge C".to_string(), "Refuge B".to_string()],
            region: Some("Vanoise".to_string()),
            all: false,
        };
        let names = resolve_selection(&refuge_session(), &selection).unwrap();
        assert_eq!(names, vec!["Refuge A", "Refuge C", "Refuge B"]);
    }

    #[test]
    fn test_all_selects_catalog() {
        let selection = Selection {
            all: true,
            ..Selection::default()
        };
        let names = resolve_selection(&refuge_session(), &selection).unwrap();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_unknown_region_is_an_error() {
        let selection = Selection {
            region: Some("Pyrénées".to_string()),
            ..Selection::default()
        };
        assert!(resolve_selection(&refuge_session(), &selection).is_err());
    }

    #[test]
    fn test_empty_selection() {
        assert!(resolve_selection(&refuge_session(), &Selection::default()).is_err());
        assert_eq!(
            resolve_selection(&booking_session(), &Selection::default()).unwrap(),
            vec!["Mandarin Oriental"]
        );
    }

    #[test]
    fn test_describe_progress() {
        let progress = Progress {
            stage: RunStage::Fetching("15/06/2025".to_string()),
            completed: 1,
            total: 4,
            estimated_remaining: Some(Duration::from_secs(75)),
        };
        assert_eq!(
            describe_progress(&progress),
            "[1/4 25%] fetching 15/06/2025, ~1m 15s left"
        );

        let start = Progress {
            stage: RunStage::Expanding,
            completed: 0,
            total: 0,
            estimated_remaining: None,
        };
        assert_eq!(describe_progress(&start), "[0/0 100%] expanding dates");
    }

    #[test]
    fn test_report_json() {
        let report = RunReport {
            dates: vec!["14/06/2025".to_string()],
            collected: 0,
            warnings: vec![Warning {
                date: "14/06/2025".to_string(),
                kind: WarningKind::Fetch,
                message: "Upstream returned HTTP 500".to_string(),
            }],
            outcome: RunOutcome::NoResults,
        };

        let value: serde_json::Value = serde_json::from_str(&report_json(&report).unwrap()).unwrap();
        assert_eq!(value["dates"][0], "14/06/2025");
        assert_eq!(value["warnings"][0]["kind"], "fetch");
        assert_eq!(value["outcome"]["outcome"], "no_results");
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(9)), "9s");
        assert_eq!(format_eta(Duration::from_secs(185)), "3m 05s");
        assert_eq!(format_eta(Duration::from_secs(3720)), "1h 02m");
    }

    #[test]
    fn test_write_export_creates_directory() {
        let dir = std::env::temp_dir().join(format!("availability-scout-{}", std::process::id()));
        let file = ExportFile {
            file_name: "refuges.csv".to_string(),
            mime_type: "text/csv; charset=utf-8",
            bytes: b"\xEF\xBB\xBF#,Name\n".to_vec(),
        };

        let path = write_export(&file, &dir.join("nested")).unwrap();
        assert_eq!(fs::read(&path).unwrap(), file.bytes);
        fs::remove_dir_all(&dir).unwrap();
    }

    proptest! {
        #[test]
        fn test_format_eta_never_empty(secs in 0u64..1_000_000) {
            let text = format_eta(Duration::from_secs(secs));
            prop_assert!(text.ends_with('s') || text.ends_with('m'));
            prop_assert!(text.chars().next().unwrap().is_ascii_digit());
        }
    }
}
