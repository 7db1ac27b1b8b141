use crate::analyzers::types::{GroupKey, GroupStats, GroupedStats};
use crate::analyzers::utility::{proportion, proportion_std_error};
use crate::record::Appointment;
use std::collections::BTreeMap;
use tracing::debug;

/// Options for [`group_by`].
#[derive(Debug, Clone, Copy)]
pub struct GroupOptions {
    /// Fill in [`GroupStats::relative_rate`].
    pub relative: bool,
    /// Groups with fewer members are left out of the output.
    pub min_group_size: usize,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            relative: true,
            min_group_size: 1,
        }
    }
}

/// Percentage deviation of `rate` from `overall`.
///
/// Exactly 0 when the two rates are equal; `None` when `overall` is zero and
/// `rate` differs from it.
pub fn relative_rate(rate: f64, overall: f64) -> Option<f64> {
    if rate == overall {
        Some(0.0)
    } else if overall == 0.0 {
        None
    } else {
        Some(100.0 * (rate - overall) / overall)
    }
}

/// Partitions `records` by `key` and computes each group's count and no-show rate.
///
/// Only groups with at least one member exist, so no rate is ever computed
/// over an empty group. The overall rate covers every record, including
/// those in groups dropped by `min_group_size`.
pub fn group_by(records: &[Appointment], key: GroupKey, opts: &GroupOptions) -> GroupedStats {
    let mut tallies: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    let mut total_no_shows = 0;

    for record in records {
        let tally = tallies.entry(key.ordinal(record)).or_default();
        tally.0 += 1;
        if record.no_show {
            tally.1 += 1;
            total_no_shows += 1;
        }
    }

    let overall_rate = proportion(total_no_shows, records.len());

    let groups: Vec<GroupStats> = tallies
        .into_iter()
        .filter(|(_, (count, _))| *count >= opts.min_group_size)
        .map(|(ordinal, (count, no_shows))| {
            let rate = proportion(no_shows, count);
            GroupStats {
                label: key.label(ordinal),
                key: ordinal,
                count,
                no_shows,
                rate,
                std_error: proportion_std_error(rate, count),
                relative_rate: if opts.relative {
                    relative_rate(rate, overall_rate)
                } else {
                    None
                },
            }
        })
        .collect();

    debug!(key = %key, groups = groups.len(), overall_rate, "Grouped records");

    GroupedStats {
        key,
        total: records.len(),
        overall_rate,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Condition;
    use crate::record::tests::appointment;
    use chrono::NaiveDate;

    fn sample() -> Vec<Appointment> {
        let mut records = vec![
            appointment(10, false),
            appointment(10, true),
            appointment(20, false),
            appointment(20, false),
            appointment(30, true),
        ];
        records[1].sms_reminders = 1;
        records[4].sms_reminders = 2;
        records[4].diabetes = true;
        records
    }

    #[test]
    fn test_group_by_age() {
        let grouped = group_by(&sample(), GroupKey::Age, &GroupOptions::default());

        assert_eq!(grouped.total, 5);
        assert_eq!(grouped.overall_rate, 0.4);
        assert_eq!(grouped.groups.len(), 3);
        assert_eq!(grouped.groups[0].label, "10");
        assert_eq!(grouped.groups[0].count, 2);
        assert_eq!(grouped.groups[0].rate, 0.5);
        assert_eq!(grouped.groups[1].rate, 0.0);
        assert_eq!(grouped.groups[2].rate, 1.0);
    }

    #[test]
    fn test_every_key_partitions_all_records() {
        let records = sample();
        let opts = GroupOptions::default();

        for key in GroupKey::defaults()
            .into_iter()
            .chain([GroupKey::AgeBand(15), GroupKey::WaitBand(7), GroupKey::Year])
        {
            let grouped = group_by(&records, key, &opts);
            let counted: usize = grouped.groups.iter().map(|g| g.count).sum();
            assert_eq!(counted, records.len(), "key {key}");
        }
    }

    #[test]
    fn test_relative_rate() {
        let grouped = group_by(&sample(), GroupKey::Age, &GroupOptions::default());
        let relative: Vec<_> = grouped.groups.iter().map(|g| g.relative_rate).collect();

        assert!((relative[1].unwrap() + 100.0).abs() < 1e-9);
        assert!((relative[0].unwrap() - 25.0).abs() < 1e-9);
        assert!((relative[2].unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_rate_zero_when_equal_to_overall() {
        assert_eq!(relative_rate(0.3, 0.3), Some(0.0));
        assert_eq!(relative_rate(0.0, 0.0), Some(0.0));
        assert_eq!(relative_rate(0.5, 0.0), None);
    }

    #[test]
    fn test_single_group_reaggregation() {
        let records = sample();
        let grouped = group_by(&records, GroupKey::Gender, &GroupOptions::default());

        assert_eq!(grouped.groups.len(), 1);
        let only = &grouped.groups[0];
        assert_eq!(only.rate, grouped.overall_rate);
        assert_eq!(only.relative_rate, Some(0.0));
    }

    #[test]
    fn test_relative_disabled() {
        let opts = GroupOptions {
            relative: false,
            ..Default::default()
        };
        let grouped = group_by(&sample(), GroupKey::Age, &opts);
        assert!(grouped.groups.iter().all(|g| g.relative_rate.is_none()));
    }

    #[test]
    fn test_min_group_size_keeps_overall_rate() {
        let opts = GroupOptions {
            min_group_size: 2,
            ..Default::default()
        };
        let grouped = group_by(&sample(), GroupKey::Age, &opts);

        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(grouped.overall_rate, 0.4);
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        let grouped = group_by(&[], GroupKey::Weekday, &GroupOptions::default());
        assert!(grouped.groups.is_empty());
        assert_eq!(grouped.total, 0);
    }

    #[test]
    fn test_group_by_condition_and_weekday() {
        let mut records = sample();
        records[0].appointment_on = NaiveDate::from_ymd_opt(2015, 1, 10).unwrap();

        let by_condition = group_by(
            &records,
            GroupKey::Condition(Condition::Diabetes),
            &GroupOptions::default(),
        );
        assert_eq!(by_condition.groups[1].label, "yes");
        assert_eq!(by_condition.groups[1].count, 1);

        let by_weekday = group_by(&records, GroupKey::Weekday, &GroupOptions::default());
        let labels: Vec<_> = by_weekday.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["Mon", "Sat"]);
    }
}
