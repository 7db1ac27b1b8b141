//! Output formatting and persistence for analysis results.
//!
//! Supports pretty-printing, console tables, CSV export of groupings and
//! JSON reports (optionally gzip-compressed).

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fmt::{Debug, Write as _};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{GroupedStats, Report};
use csv::WriterBuilder;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders a grouping as a fixed-width console table.
pub fn render_table(grouped: &GroupedStats) -> String {
    let key = grouped.key.to_string();
    let width = grouped
        .groups
        .iter()
        .map(|g| g.label.len())
        .max()
        .unwrap_or(0)
        .max(key.len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>8}  {:>7}  {:>9}",
        key, "count", "no-shows", "rate", "relative"
    );

    for g in &grouped.groups {
        let relative = match g.relative_rate {
            Some(r) => format!("{r:+.1}%"),
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>8}  {:>6.1}%  {:>9}",
            g.label,
            g.count,
            g.no_shows,
            g.rate * 100.0,
            relative
        );
    }

    let _ = writeln!(
        out,
        "overall: {} records, {:.1}% no-show",
        grouped.total,
        grouped.overall_rate * 100.0
    );
    out
}

/// Writes one CSV row per group, with headers.
pub fn write_groups_csv(path: impl AsRef<Path>, grouped: &GroupedStats) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), groups = grouped.groups.len(), "Writing grouping CSV");

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;

    for group in &grouped.groups {
        writer.serialize(group)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the report as pretty JSON, gzip-compressed when `gzip` is set.
pub fn write_report_json(path: impl AsRef<Path>, report: &Report, gzip: bool) -> Result<()> {
    let path = path.as_ref();
    let body = serde_json::to_vec_pretty(report)?;

    let mut file = BufWriter::new(File::create(path)?);
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&body)?;
        encoder.finish()?.flush()?;
    } else {
        file.write_all(&body)?;
        file.flush()?;
    }

    info!(path = %path.display(), gzip, bytes = body.len(), "Report written");
    Ok(())
}
