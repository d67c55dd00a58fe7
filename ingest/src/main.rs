//! Stageload CLI - stage CRM, Facebook Ads and Google Ads exports
//!
//! # Main Commands
//!
//! ```bash
//! stageload run                              # Ingest every source in the data dir
//! stageload run --csv-out staged/            # Write CSV files instead of SQLite
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! stageload parse data/crm_revenue.csv --source crm    # Adapter output as JSON
//! stageload clean data/crm_revenue.csv --source crm    # Cleaned rows as JSON
//! ```

use clap::{ArgAction, Parser, Subcommand};
use serde_json::{json, Value};
use stageload::logs::{init_logging, LogConfig, LogFormat};
use stageload::{
    clean_parsed, parse_source, run_ingestion, IngestConfig, ParsedSource, RowRepairer,
    SinkTarget, SourceKind, SourceStatus,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "stageload")]
#[command(about = "Repair, normalize and stage marketing export files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every known source into the staging namespace
    Run {
        /// Directory holding the source files (default: STAGELOAD_DATA_DIR or ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// SQLite database file (default: STAGELOAD_DATABASE or staging.db)
        #[arg(long, conflicts_with = "csv_out")]
        database: Option<PathBuf>,

        /// Write one CSV file per table under this directory instead of SQLite
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Destination namespace (default: STAGELOAD_NAMESPACE or stg_data)
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Parse a source file and output the raw table as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Source kind: crm, facebook or google
        #[arg(short, long)]
        source: SourceKind,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse, repair and normalize a source file and output the rows as JSON
    Clean {
        /// Input file
        input: PathBuf,

        /// Source kind: crm, facebook or google
        #[arg(short, long)]
        source: SourceKind,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("warning: logging not initialized: {}", e);
    }

    let result = match cli.command {
        Commands::Run {
            data_dir,
            database,
            csv_out,
            namespace,
        } => cmd_run(data_dir, database, csv_out, namespace),

        Commands::Parse {
            input,
            source,
            output,
        } => cmd_parse(&input, source, output.as_deref()),

        Commands::Clean {
            input,
            source,
            output,
        } => cmd_clean(&input, source, output.as_deref()),
    };

    if let Err(e) = result {
        error!(error = %e, "stageload failed");
        std::process::exit(1);
    }
}

fn cmd_run(
    data_dir: Option<PathBuf>,
    database: Option<PathBuf>,
    csv_out: Option<PathBuf>,
    namespace: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = IngestConfig::from_env()?;
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(ns) = namespace {
        config = config.with_namespace(ns)?;
    }
    if let Some(db) = database {
        config = config.with_sink(SinkTarget::Sqlite(db));
    }
    if let Some(out) = csv_out {
        config = config.with_sink(SinkTarget::CsvDir(out));
    }

    let mut sink = config.sink.open()?;
    let result = run_ingestion(&config, sink.as_mut());
    let closed = sink.close();
    let report = result?;
    closed?;

    for outcome in &report.outcomes {
        match &outcome.status {
            SourceStatus::Ingested {
                rows,
                repaired,
                malformed,
            } => info!(
                source = %outcome.kind,
                destination = %outcome.destination,
                rows,
                repaired,
                malformed,
                "ingested"
            ),
            SourceStatus::Skipped => info!(source = %outcome.kind, "skipped (file not found)"),
        }
    }
    Ok(())
}

fn read_parsed(input: &Path, source: SourceKind) -> Result<ParsedSource, Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let parsed = parse_source(source, &bytes)?;
    info!(
        path = %input.display(),
        encoding = %parsed.encoding,
        delimiter = ?parsed.delimiter,
        rows = parsed.table.row_count(),
        malformed = parsed.malformed.len(),
        "parsed source"
    );
    Ok(parsed)
}

fn cmd_parse(
    input: &Path,
    source: SourceKind,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = read_parsed(input, source)?;

    let doc = json!({
        "source": source,
        "encoding": parsed.encoding,
        "delimiter": parsed.delimiter.map(|d| d.to_string()),
        "raw_header": parsed.raw_header,
        "columns": parsed.table.columns(),
        "overflow_rows": parsed.overflow_rows,
        "malformed": parsed.malformed.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "rows": parsed.table.to_records(),
    });
    write_json(&doc, output)
}

fn cmd_clean(
    input: &Path,
    source: SourceKind,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = read_parsed(input, source)?;
    let cleaned = clean_parsed(source, parsed, &RowRepairer::new())?;

    if let Some(report) = &cleaned.repair {
        info!("{}", report.summary());
    }
    write_json(&Value::Array(cleaned.table.to_records()), output)
}

fn write_json(value: &Value, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, content)?;
            info!(path = %p.display(), "output written");
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
