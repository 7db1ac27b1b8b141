use crate::analyzers::aggregate::{GroupOptions, group_by};
use crate::analyzers::correlation::{correlate_groups, correlate_records};
use crate::analyzers::summary::summarize;
use crate::analyzers::types::{GroupKey, GroupingReport, Report, Variable, VariableCorrelation};
use crate::cleaning::{CleanReport, load_appointments};
use crate::config::PipelineConfig;
use crate::record::Appointment;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

pub const SCHEMA_VERSION: u8 = 1;

/// Runs the summary, every grouping in `keys` (the defaults when empty) and
/// the record-level correlations over already-cleaned records.
pub fn build_report(
    source: &str,
    records: &[Appointment],
    cleaning: CleanReport,
    keys: &[GroupKey],
    opts: &GroupOptions,
) -> Report {
    let keys = if keys.is_empty() {
        GroupKey::defaults()
    } else {
        keys.to_vec()
    };

    let groupings = keys
        .into_iter()
        .map(|key| {
            let stats = group_by(records, key, opts);
            let trend = correlate_groups(&stats);
            GroupingReport { stats, trend }
        })
        .collect();

    let correlations = Variable::ALL
        .into_iter()
        .map(|variable| {
            let correlation = correlate_records(records, variable);
            if !correlation.is_defined() {
                warn!(variable = %variable, "Correlation undefined for variable");
            }
            VariableCorrelation {
                variable,
                correlation,
            }
        })
        .collect();

    Report {
        schema_version: SCHEMA_VERSION,
        generated_at: chrono::Utc::now(),
        source: source.to_string(),
        cleaning,
        summary: summarize(records),
        groupings,
        correlations,
    }
}

/// Loads and cleans the dataset at `path`, then builds its full [`Report`].
#[tracing::instrument(skip(path, config, opts), fields(path = %path.display()))]
pub fn analyze(
    path: &Path,
    config: &PipelineConfig,
    keys: &[GroupKey],
    opts: &GroupOptions,
) -> Result<Report> {
    let (records, cleaning) = load_appointments(path, config)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let report = build_report(&path.display().to_string(), &records, cleaning, keys, opts);

    info!(
        records = report.summary.records,
        groupings = report.groupings.len(),
        no_show_rate = report.summary.no_show_rate,
        "Report built"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::appointment;

    #[test]
    fn test_build_report_default_keys() {
        let records: Vec<_> = (0..8).map(|i| appointment(10 + i, i % 2 == 0)).collect();
        let cleaning = CleanReport {
            raw_rows: 8,
            kept: 8,
            ..Default::default()
        };

        let report = build_report("memory", &records, cleaning, &[], &GroupOptions::default());

        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.groupings.len(), GroupKey::defaults().len());
        assert_eq!(report.correlations.len(), Variable::ALL.len());
        assert_eq!(report.summary.records, 8);
        for grouping in &report.groupings {
            let counted: usize = grouping.stats.groups.iter().map(|g| g.count).sum();
            assert_eq!(counted, 8);
        }
    }

    #[test]
    fn test_build_report_selected_keys() {
        let records: Vec<_> = (0..4).map(|i| appointment(30, i == 0)).collect();
        let report = build_report(
            "memory",
            &records,
            CleanReport::default(),
            &[GroupKey::Sms],
            &GroupOptions::default(),
        );

        assert_eq!(report.groupings.len(), 1);
        assert_eq!(report.groupings[0].stats.key, GroupKey::Sms);
        // a single group has no trend
        assert!(!report.groupings[0].trend.is_defined());
    }
}
