//! Print a disk-space utilization report for a SQLite database file

use anyhow::Context;
use clap::{Parser, ValueEnum};
use spaceanalyzer::{AnalyzerBuilder, ClassicReport, Sections};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SPACEANALYZER_LOG";

/// Exit status when the file could not be analysed at all
const EXIT_UNAVAILABLE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "space-analyzer",
    version,
    about = "Report how the pages of a SQLite database file are used"
)]
struct Cli {
    /// Database file to analyse
    database: PathBuf,

    /// Leave out the trailing SQL dump
    #[arg(long)]
    no_dump: bool,

    /// Leave out the definitions section
    #[arg(long)]
    no_definitions: bool,

    /// Print only these sections (repeatable)
    #[arg(long, value_enum)]
    section: Vec<SectionArg>,

    /// Name of the schema catalog in the report
    #[arg(long, default_value = spaceanalyzer::source::DEFAULT_CATALOG_NAME)]
    catalog_name: String,

    /// Skip the file header check
    #[arg(long)]
    skip_header_check: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    Summary,
    TablePages,
    ObjectPages,
    Global,
    Indices,
    Details,
    Definitions,
    Dump,
}

impl From<SectionArg> for Sections {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Summary => Sections::SUMMARY,
            SectionArg::TablePages => Sections::TABLE_PAGES,
            SectionArg::ObjectPages => Sections::OBJECT_PAGES,
            SectionArg::Global => Sections::GLOBAL,
            SectionArg::Indices => Sections::INDICES,
            SectionArg::Details => Sections::DETAILS,
            SectionArg::Definitions => Sections::DEFINITIONS,
            SectionArg::Dump => Sections::DUMP,
        }
    }
}

impl Cli {
    fn sections(&self) -> Sections {
        let mut sections = if self.section.is_empty() {
            Sections::all()
        } else {
            self.section.iter().fold(Sections::empty(), |acc, &s| acc | Sections::from(s))
        };
        if self.no_dump {
            sections.remove(Sections::DUMP);
        }
        if self.no_definitions {
            sections.remove(Sections::DEFINITIONS);
        }
        sections
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let analyzer = AnalyzerBuilder::new()
        .catalog_name(&cli.catalog_name)
        .verify_header(!cli.skip_header_check)
        .open(&cli.database)
        .with_context(|| format!("cannot analyse {}", cli.database.display()))?;

    let label = cli.database.display().to_string();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    ClassicReport::new(&analyzer, label)
        .write(&mut out, cli.sections())
        .context("failed to write report")?;
    out.flush().context("failed to write report")?;
    Ok(())
}

/// Exit status for a failed run
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<spaceanalyzer::Error>() {
        Some(err) if err.is_source_unavailable() => EXIT_UNAVAILABLE,
        _ => 1,
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        tracing::debug!("analysis failed: {err:?}");
        eprintln!("space-analyzer: {err:#}");
        process::exit(exit_code(&err));
    }
}
