//! High-level ingestion API: one source file in, one staging table out.
//!
//! Per source the steps are:
//!
//! 1. Read the raw bytes with the matching adapter
//! 2. Repair column-shifted rows (CRM only)
//! 3. Canonicalize column names
//! 4. Normalize values per column policy
//! 5. Keep only the columns of the original header (CRM only)
//! 6. Replace the destination table in the sink
//!
//! # Example
//!
//! ```rust
//! use stageload::{clean_source, RowRepairer, SourceKind};
//!
//! let csv = "Order ID,Customer ID,Order Date,Revenue,Region\n\
//!            1,c1,15_03_2024, 199.99 ,Europe\n";
//! let cleaned = clean_source(SourceKind::Crm, csv.as_bytes(), &RowRepairer::new()).unwrap();
//!
//! assert_eq!(
//!     cleaned.table.columns(),
//!     &["order_id", "customer_id", "order_date", "revenue", "region"]
//! );
//! assert_eq!(cleaned.table.rows()[0][2].as_str(), Some("2024-03-15"));
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use super::columns::normalize_table_columns;
use super::repair::{RepairReport, RowRepairer};
use super::values::normalize_values;
use crate::config::IngestConfig;
use crate::error::{PipelineError, PipelineResult, SourceError, SourceResult};
use crate::models::Table;
use crate::parser::{read_delimited, read_google_feed, DelimitedOptions, MalformedRecord, ParsedSource};
use crate::sink::{Destination, StagingSink};

/// Overflow columns captured after the CRM header.
pub const CRM_OVERFLOW_COLUMNS: usize = 4;

/// The known export sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Crm,
    Facebook,
    Google,
}

impl SourceKind {
    /// Processing order of a full run.
    pub const ALL: [SourceKind; 3] = [SourceKind::Crm, SourceKind::Facebook, SourceKind::Google];

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Crm => "crm",
            SourceKind::Facebook => "facebook",
            SourceKind::Google => "google",
        }
    }

    /// File name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            SourceKind::Crm => "crm_revenue.csv",
            SourceKind::Facebook => "facebook_export.csv",
            SourceKind::Google => "google_ads_api.json",
        }
    }

    pub fn destination_table(&self) -> &'static str {
        match self {
            SourceKind::Crm => "stg_crm_revenue",
            SourceKind::Facebook => "stg_facebook_ads",
            SourceKind::Google => "stg_google_ads",
        }
    }

    pub fn overflow_columns(&self) -> usize {
        match self {
            SourceKind::Crm => CRM_OVERFLOW_COLUMNS,
            SourceKind::Facebook | SourceKind::Google => 0,
        }
    }

    /// Whether rows go through the repairer and the output is cut back to the raw header.
    pub fn needs_repair(&self) -> bool {
        matches!(self, SourceKind::Crm)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crm" => Ok(SourceKind::Crm),
            "facebook" | "fb" => Ok(SourceKind::Facebook),
            "google" => Ok(SourceKind::Google),
            other => Err(format!(
                "unknown source '{}' (expected crm, facebook or google)",
                other
            )),
        }
    }
}

/// A source after repair and normalization, ready for a sink.
#[derive(Debug, Clone)]
pub struct CleanedSource {
    pub kind: SourceKind,
    pub table: Table,
    /// Present for sources that go through the repairer.
    pub repair: Option<RepairReport>,
    pub malformed: Vec<MalformedRecord>,
    pub overflow_rows: usize,
}

impl CleanedSource {
    pub fn repaired_count(&self) -> usize {
        self.repair.as_ref().map_or(0, RepairReport::flagged_count)
    }
}

/// Read raw bytes with the adapter for `kind`.
pub fn parse_source(kind: SourceKind, bytes: &[u8]) -> SourceResult<ParsedSource> {
    match kind {
        SourceKind::Google => read_google_feed(bytes),
        SourceKind::Crm | SourceKind::Facebook => {
            read_delimited(bytes, &DelimitedOptions::with_overflow(kind.overflow_columns()))
        }
    }
}

/// Repair, normalize and restrict an already parsed source.
pub fn clean_parsed(
    kind: SourceKind,
    parsed: ParsedSource,
    repairer: &RowRepairer,
) -> PipelineResult<CleanedSource> {
    let ParsedSource {
        mut table,
        raw_header,
        malformed,
        overflow_rows,
        ..
    } = parsed;

    let repair = if kind.needs_repair() {
        let report = repairer.repair(&mut table);
        if !report.is_clean() {
            info!(source = %kind, flagged = report.flagged_count(), "repaired shifted rows");
            debug!(source = %kind, "{}", report.summary());
        }
        Some(report)
    } else {
        None
    };

    normalize_table_columns(&mut table)?;
    normalize_values(&mut table);

    if kind.needs_repair() {
        table = restrict_to_header(&table, raw_header.len())?;
    }

    Ok(CleanedSource {
        kind,
        table,
        repair,
        malformed,
        overflow_rows,
    })
}

/// Parse and clean raw bytes.
pub fn clean_source(
    kind: SourceKind,
    bytes: &[u8],
    repairer: &RowRepairer,
) -> PipelineResult<CleanedSource> {
    let parsed = parse_source(kind, bytes).map_err(|e| PipelineError::from_source(kind.label(), e))?;
    clean_parsed(kind, parsed, repairer)
}

/// Keep the leading `width` columns: the canonical raw header, without
/// overflow or appended repair columns.
fn restrict_to_header(table: &Table, width: usize) -> PipelineResult<Table> {
    let keep: Vec<String> = table.columns().iter().take(width).cloned().collect();
    Ok(table.select(&keep)?)
}

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Ingested {
        rows: usize,
        repaired: usize,
        malformed: usize,
    },
    /// Source file absent; nothing written.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub destination: Destination,
    pub status: SourceStatus,
}

/// Clean one source file and replace its destination table.
///
/// A missing file is not an error: the source is reported as skipped.
pub fn ingest_source(
    kind: SourceKind,
    path: &Path,
    sink: &mut dyn StagingSink,
    namespace: &str,
    repairer: &RowRepairer,
) -> PipelineResult<SourceOutcome> {
    let span = info_span!("source", source = %kind);
    let _enter = span.enter();

    let destination = Destination::new(namespace, kind.destination_table())?;

    if !path.exists() {
        warn!(path = %path.display(), "source file not found, skipping");
        return Ok(SourceOutcome {
            kind,
            destination,
            status: SourceStatus::Skipped,
        });
    }

    info!(path = %path.display(), "reading source");
    let bytes = std::fs::read(path).map_err(|e| {
        PipelineError::from_source(
            kind.label(),
            SourceError::FileRead {
                path: path.to_path_buf(),
                source: e,
            },
        )
    })?;

    let cleaned = clean_source(kind, &bytes, repairer)?;
    let rows = sink.replace(&destination, &cleaned.table)?;
    info!(destination = %destination, rows, sink = sink.kind(), "staged table");

    Ok(SourceOutcome {
        kind,
        destination,
        status: SourceStatus::Ingested {
            rows,
            repaired: cleaned.repaired_count(),
            malformed: cleaned.malformed.len(),
        },
    })
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl IngestReport {
    pub fn ingested_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SourceStatus::Ingested { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SourceStatus::Skipped)
            .count()
    }

    pub fn total_rows(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                SourceStatus::Ingested { rows, .. } => rows,
                SourceStatus::Skipped => 0,
            })
            .sum()
    }
}

/// Ingest every known source into `sink`, in [`SourceKind::ALL`] order.
///
/// Stops at the first fatal error. Closing the sink is left to the caller.
pub fn run_ingestion(config: &IngestConfig, sink: &mut dyn StagingSink) -> PipelineResult<IngestReport> {
    let span = info_span!("ingest", namespace = %config.namespace);
    let _enter = span.enter();

    sink.prepare(&config.namespace)?;
    let repairer = RowRepairer::new();

    let mut report = IngestReport::default();
    for kind in SourceKind::ALL {
        let outcome = ingest_source(
            kind,
            &config.source_path(kind),
            sink,
            &config.namespace,
            &repairer,
        )?;
        report.outcomes.push(outcome);
    }

    info!(
        ingested = report.ingested_count(),
        skipped = report.skipped_count(),
        rows = report.total_rows(),
        "ingestion finished"
    );
    Ok(report)
}
