//! Command-line arguments

use std::path::PathBuf;

use anyhow::{bail, Result};
use availability_core::{ExportFormat, WindowSpan};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

/// Which entities the user asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Names given with `--select`, in order
    pub names: Vec<String>,
    pub region: Option<String>,
    pub all: bool,
}

/// Parsed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub config: PathBuf,
    pub catalog: Option<PathBuf>,
    /// `None` only together with `list`
    pub anchor: Option<String>,
    pub span: WindowSpan,
    pub selection: Selection,
    pub format: ExportFormat,
    pub output: PathBuf,
    pub list: bool,
    /// Print the run report as JSON on stdout
    pub json: bool,
    pub verbose: bool,
}

/// Days queried when neither `--days` nor `--around` is given
pub const DEFAULT_DAYS: u64 = 60;

pub fn build_cli() -> Command {
    Command::new("availability-scout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collects day-by-day availability over a date window and exports it")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Source configuration file")
                .value_parser(value_parser!(PathBuf))
                .default_value("data/refuges.source.json"),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .value_name("FILE")
                .help("Entity catalog (name, id, region)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("anchor")
                .short('a')
                .long("anchor")
                .value_name("DATE")
                .help("Anchor date in the source's date format")
                .required_unless_present("list"),
        )
        .arg(
            Arg::new("days")
                .short('d')
                .long("days")
                .value_name("N")
                .help("Query N consecutive days starting at the anchor [default: 60]")
                .value_parser(value_parser!(u64).range(1..))
                .conflicts_with("around"),
        )
        .arg(
            Arg::new("around")
                .long("around")
                .value_name("K")
                .help("Query K days either side of the anchor")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("select")
                .short('s')
                .long("select")
                .value_name("NAME")
                .help("Entity display name to keep (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .value_name("REGION")
                .help("Select every catalog entity in REGION"),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .help("Select the whole catalog")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Export format: csv or xlsx")
                .default_value("csv"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory for the exported file")
                .value_parser(value_parser!(PathBuf))
                .default_value("."),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("Print the catalog grouped by region and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run report as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug output")
                .action(ArgAction::SetTrue),
        )
}

impl CliOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let span = match (
            matches.get_one::<u64>("days"),
            matches.get_one::<u64>("around"),
        ) {
            (Some(_), Some(_)) => bail!("--days and --around cannot be combined"),
            (_, Some(k)) => WindowSpan::Around(*k),
            (Some(n), None) => WindowSpan::Forward(*n),
            (None, None) => WindowSpan::Forward(DEFAULT_DAYS),
        };

        let format = matches
            .get_one::<String>("format")
            .map(|f| f.parse::<ExportFormat>())
            .transpose()?
            .unwrap_or(ExportFormat::Csv);

        Ok(Self {
            config: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("data/refuges.source.json")),
            catalog: matches.get_one::<PathBuf>("catalog").cloned(),
            anchor: matches.get_one::<String>("anchor").cloned(),
            span,
            selection: Selection {
                names: matches
                    .get_many::<String>("select")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                region: matches.get_one::<String>("region").cloned(),
                all: matches.get_flag("all"),
            },
            format,
            output: matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(".")),
            list: matches.get_flag("list"),
            json: matches.get_flag("json"),
            verbose: matches.get_flag("verbose"),
        })
    }

    /// Parse options from an argument list (program name first).
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = build_cli().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }
}
