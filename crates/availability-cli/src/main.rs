use anyhow::{Context, Result};
use availability_cli::args::{build_cli, CliOptions};
use availability_cli::commands::{
    list_entities, report_json, resolve_selection, run_query, write_export,
};
use availability_cli::Session;
use availability_core::{RunQuery, WarningKind};
use log::{info, warn, LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let options = CliOptions::from_matches(&matches)?;

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let session = Session::load(&options.config, options.catalog.as_deref())?;

    if options.list {
        for line in list_entities(&session) {
            println!("{}", line);
        }
        return Ok(());
    }

    let anchor = options
        .anchor
        .clone()
        .context("--anchor is required unless --list is given")?;
    let query = RunQuery {
        anchor,
        span: options.span,
        selected: resolve_selection(&session, &options.selection)?,
        format: options.format,
    };
    info!("Selected: {}", query.selected.join(", "));

    let result = run_query(&session, &query).await?;
    let report = &result.report;

    for warning in &report.warnings {
        match warning.kind {
            WarningKind::UnknownEntity | WarningKind::Export => warn!("{}", warning.message),
            WarningKind::Fetch | WarningKind::Parse => {
                warn!("{} skipped: {}", warning.date, warning.message)
            }
        }
    }

    if options.json {
        println!("{}", report_json(report)?);
    }

    match &result.file {
        Some(file) => {
            let path = write_export(file, &options.output)?;
            info!(
                "{} row(s) from {} date(s) written to {}",
                report.rows().len(),
                report.dates.len(),
                path.display()
            );
        }
        None if report.rows().is_empty() && !options.json => println!("No availability found"),
        None if report.rows().is_empty() => info!("No availability found"),
        None => warn!("{} row(s) collected but no file was written", report.rows().len()),
    }

    Ok(())
}
