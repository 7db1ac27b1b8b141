//! Loading and cleaning of appointment datasets.
//!
//! Reads a delimited file (optionally gzip-compressed), parses every row and
//! drops records that are statistically invalid: negative ages and waits
//! outside `[0, max_wait_days)`.

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::LoadError;
use crate::parser::{ColumnMap, parse_row};
use crate::record::Appointment;

/// Row counts produced by the cleaning stage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub raw_rows: usize,
    pub kept: usize,
    pub dropped_negative_age: usize,
    pub dropped_wait_out_of_range: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.dropped_negative_age + self.dropped_wait_out_of_range
    }
}

/// Why a record was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NegativeAge,
    WaitOutOfRange,
}

/// Returns the reason `record` must be dropped, if any.
pub fn check(record: &Appointment, config: &PipelineConfig) -> Option<Rejection> {
    if record.age < config.min_age {
        Some(Rejection::NegativeAge)
    } else if record.wait_days < 0 || record.wait_days >= config.max_wait_days {
        Some(Rejection::WaitOutOfRange)
    } else {
        None
    }
}

/// Filters parsed records, keeping those that pass [`check`].
pub fn clean(
    records: impl IntoIterator<Item = Appointment>,
    config: &PipelineConfig,
) -> (Vec<Appointment>, CleanReport) {
    let mut report = CleanReport::default();
    let mut kept = Vec::new();

    for record in records {
        report.raw_rows += 1;

        match check(&record, config) {
            None => kept.push(record),
            Some(Rejection::NegativeAge) => {
                debug!(age = record.age, "Dropping record with negative age");
                report.dropped_negative_age += 1;
            }
            Some(Rejection::WaitOutOfRange) => {
                debug!(wait_days = record.wait_days, "Dropping record with out-of-range wait");
                report.dropped_wait_out_of_range += 1;
            }
        }
    }

    report.kept = kept.len();
    (kept, report)
}

/// Parses every row from `reader`. The first malformed row aborts the load.
///
/// `config` is validated first, so an invalid config is rejected before any
/// input is read.
pub fn read_appointments<R: Read>(
    reader: R,
    config: &PipelineConfig,
) -> Result<Vec<Appointment>, LoadError> {
    config.validate()?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(config.delimiter_byte()?)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let map = ColumnMap::from_headers(rdr.headers()?, config)?;
    for column in map.absent() {
        warn!(column = column.name(), "Optional column absent, using default");
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(parse_row(&row, &map, config, line)?);
    }

    Ok(records)
}

/// Loads, parses and cleans the dataset at `path`.
///
/// Files ending in `.gz` are decompressed transparently.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_appointments(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<(Vec<Appointment>, CleanReport), LoadError> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);

    let parsed = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        read_appointments(MultiGzDecoder::new(file), config)?
    } else {
        read_appointments(file, config)?
    };

    let (records, report) = clean(parsed, config);

    info!(
        raw_rows = report.raw_rows,
        kept = report.kept,
        dropped_negative_age = report.dropped_negative_age,
        dropped_wait_out_of_range = report.dropped_wait_out_of_range,
        "Dataset cleaned"
    );

    Ok((records, report))
}
