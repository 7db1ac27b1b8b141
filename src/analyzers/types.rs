//! Data types used by the aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::cleaning::CleanReport;
use crate::error::KeyParseError;
use crate::record::{Appointment, Condition, Gender};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The attribute records are partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Age,
    /// Ages bucketed into bands of the given width.
    AgeBand(u32),
    Gender,
    Weekday,
    Month,
    Year,
    DayOfYear,
    Wait,
    /// Wait days bucketed into bands of the given width.
    WaitBand(u32),
    Sms,
    Condition(Condition),
}

impl GroupKey {
    /// The keys a full report covers when none are requested.
    pub fn defaults() -> Vec<GroupKey> {
        let mut keys = vec![
            GroupKey::Age,
            GroupKey::Gender,
            GroupKey::Weekday,
            GroupKey::Month,
            GroupKey::DayOfYear,
            GroupKey::Wait,
            GroupKey::Sms,
        ];
        keys.extend(Condition::ALL.into_iter().map(GroupKey::Condition));
        keys
    }

    /// Sortable group identifier for `record` under this key.
    pub fn ordinal(&self, record: &Appointment) -> i64 {
        match self {
            GroupKey::Age => record.age,
            GroupKey::AgeBand(width) => band(record.age, *width),
            GroupKey::Gender => match record.gender {
                Gender::Female => 0,
                Gender::Male => 1,
            },
            GroupKey::Weekday => record.weekday().num_days_from_monday() as i64,
            GroupKey::Month => record.month() as i64,
            GroupKey::Year => record.year() as i64,
            GroupKey::DayOfYear => record.day_of_year() as i64,
            GroupKey::Wait => record.wait_days,
            GroupKey::WaitBand(width) => band(record.wait_days, *width),
            GroupKey::Sms => record.sms_reminders as i64,
            GroupKey::Condition(c) => record.has(*c) as i64,
        }
    }

    /// Display label for a group ordinal produced by [`GroupKey::ordinal`].
    pub fn label(&self, ordinal: i64) -> String {
        let lookup = |names: &[&str], index: i64| {
            usize::try_from(index)
                .ok()
                .and_then(|i| names.get(i))
                .map(|s| s.to_string())
                .unwrap_or_else(|| ordinal.to_string())
        };

        match self {
            GroupKey::AgeBand(width) | GroupKey::WaitBand(width) => {
                format!("{}-{}", ordinal, ordinal + (*width).max(1) as i64 - 1)
            }
            GroupKey::Gender => {
                let gender = if ordinal == 0 { Gender::Female } else { Gender::Male };
                gender.as_str().to_string()
            }
            GroupKey::Weekday => lookup(&WEEKDAYS[..], ordinal),
            GroupKey::Month => lookup(&MONTHS[..], ordinal - 1),
            GroupKey::Condition(_) => (if ordinal == 0 { "no" } else { "yes" }).to_string(),
            _ => ordinal.to_string(),
        }
    }
}

fn band(value: i64, width: u32) -> i64 {
    let width = width.max(1) as i64;
    value.div_euclid(width) * width
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Age => f.write_str("age"),
            GroupKey::AgeBand(w) => write!(f, "age-band:{w}"),
            GroupKey::Gender => f.write_str("gender"),
            GroupKey::Weekday => f.write_str("weekday"),
            GroupKey::Month => f.write_str("month"),
            GroupKey::Year => f.write_str("year"),
            GroupKey::DayOfYear => f.write_str("day-of-year"),
            GroupKey::Wait => f.write_str("wait"),
            GroupKey::WaitBand(w) => write!(f, "wait-band:{w}"),
            GroupKey::Sms => f.write_str("sms"),
            GroupKey::Condition(c) => write!(f, "condition:{c}"),
        }
    }
}

impl FromStr for GroupKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError {
            kind: "grouping key",
            input: s.to_string(),
        };
        let width = |w: &str| match w.parse::<u32>() {
            Ok(w) if w > 0 => Ok(w),
            _ => Err(err()),
        };

        let normalized = s.trim().to_ascii_lowercase();
        let (name, param) = match normalized.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (normalized.as_str(), None),
        };

        match (name, param) {
            ("age", None) => Ok(GroupKey::Age),
            ("age-band", Some(w)) => Ok(GroupKey::AgeBand(width(w)?)),
            ("gender", None) => Ok(GroupKey::Gender),
            ("weekday", None) => Ok(GroupKey::Weekday),
            ("month", None) => Ok(GroupKey::Month),
            ("year", None) => Ok(GroupKey::Year),
            ("day-of-year", None) => Ok(GroupKey::DayOfYear),
            ("wait", None) => Ok(GroupKey::Wait),
            ("wait-band", Some(w)) => Ok(GroupKey::WaitBand(width(w)?)),
            ("sms", None) => Ok(GroupKey::Sms),
            ("condition", Some(c)) => c.parse().map(GroupKey::Condition).map_err(|_| err()),
            _ => Err(err()),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A numeric record attribute that can be correlated with the no-show outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Age,
    Wait,
    Sms,
    Month,
    Weekday,
    DayOfYear,
    Handicap,
}

impl Variable {
    pub const ALL: [Variable; 7] = [
        Variable::Age,
        Variable::Wait,
        Variable::Sms,
        Variable::Month,
        Variable::Weekday,
        Variable::DayOfYear,
        Variable::Handicap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Age => "age",
            Variable::Wait => "wait",
            Variable::Sms => "sms",
            Variable::Month => "month",
            Variable::Weekday => "weekday",
            Variable::DayOfYear => "day-of-year",
            Variable::Handicap => "handicap",
        }
    }

    pub fn value(&self, record: &Appointment) -> f64 {
        match self {
            Variable::Age => record.age as f64,
            Variable::Wait => record.wait_days as f64,
            Variable::Sms => record.sms_reminders as f64,
            Variable::Month => record.month() as f64,
            Variable::Weekday => record.weekday().num_days_from_monday() as f64,
            Variable::DayOfYear => record.day_of_year() as f64,
            Variable::Handicap => record.handicap as f64,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyParseError {
                kind: "variable",
                input: s.to_string(),
            })
    }
}

impl Serialize for Variable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Count and no-show rate for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub key: i64,
    pub count: usize,
    pub no_shows: usize,
    pub rate: f64,
    pub std_error: f64,
    /// Percentage deviation of `rate` from the overall rate.
    pub relative_rate: Option<f64>,
}

/// Every non-empty group for one [`GroupKey`], in ascending key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedStats {
    pub key: GroupKey,
    pub total: usize,
    pub overall_rate: f64,
    pub groups: Vec<GroupStats>,
}

/// Pearson correlation with its 95% confidence interval.
///
/// All fields other than `n` are NaN when the correlation is undefined.
/// When `|r| = 1` the t statistic saturates at `±f64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub n: usize,
    pub r: f64,
    pub t_statistic: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Mean, sample standard deviation and 95% CI half-width of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub mean: f64,
    pub std_dev: f64,
    pub ci95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSummary {
    pub condition: Condition,
    pub count: usize,
    pub prevalence: f64,
    pub no_show_rate: f64,
}

/// Dataset-wide descriptive statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub no_shows: usize,
    pub no_show_rate: f64,
    pub age: Spread,
    pub wait_days: Spread,
    pub first_appointment: Option<NaiveDate>,
    pub last_appointment: Option<NaiveDate>,
    pub conditions: Vec<ConditionSummary>,
}

/// A grouping plus the trend between its key and its rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingReport {
    #[serde(flatten)]
    pub stats: GroupedStats,
    pub trend: Correlation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableCorrelation {
    pub variable: Variable,
    #[serde(flatten)]
    pub correlation: Correlation,
}

/// Complete analysis of one dataset, written out as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub cleaning: CleanReport,
    pub summary: Summary,
    pub groupings: Vec<GroupingReport>,
    pub correlations: Vec<VariableCorrelation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::appointment;

    #[test]
    fn test_group_key_round_trips_through_display() {
        for key in GroupKey::defaults()
            .into_iter()
            .chain([GroupKey::AgeBand(10), GroupKey::WaitBand(7), GroupKey::Year])
        {
            assert_eq!(key.to_string().parse::<GroupKey>(), Ok(key));
        }
    }

    #[test]
    fn test_group_key_rejects_bad_input() {
        assert!("age-band:0".parse::<GroupKey>().is_err());
        assert!("age-band".parse::<GroupKey>().is_err());
        assert!("condition:asthma".parse::<GroupKey>().is_err());
        assert!("colour".parse::<GroupKey>().is_err());
    }

    #[test]
    fn test_band_ordinal_and_label() {
        let key = GroupKey::AgeBand(10);
        let record = appointment(47, false);

        assert_eq!(key.ordinal(&record), 40);
        assert_eq!(key.label(40), "40-49");
    }

    #[test]
    fn test_labels() {
        assert_eq!(GroupKey::Weekday.label(0), "Mon");
        assert_eq!(GroupKey::Weekday.label(6), "Sun");
        assert_eq!(GroupKey::Month.label(12), "Dec");
        assert_eq!(GroupKey::Gender.label(1), "M");
        assert_eq!(GroupKey::Condition(Condition::Smoker).label(1), "yes");
        assert_eq!(GroupKey::Sms.label(2), "2");
    }

    #[test]
    fn test_variable_parse() {
        assert_eq!("Day-Of-Year".parse::<Variable>(), Ok(Variable::DayOfYear));
        assert!("height".parse::<Variable>().is_err());
    }
}
