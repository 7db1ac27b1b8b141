//! Row parser for appointment CSV files.
//!
//! Maps the file's headers onto the canonical schema and coerces each text
//! field into its typed form. Any field that cannot be coerced aborts the
//! load with [`LoadError::InvalidField`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;

use crate::config::PipelineConfig;
use crate::error::LoadError;
use crate::record::{Appointment, Gender};

pub const MAX_SMS_REMINDERS: u8 = 2;
pub const MAX_HANDICAP_LEVEL: u8 = 4;

/// Canonical columns of the appointment schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Age,
    Gender,
    RegisteredOn,
    AppointmentOn,
    Status,
    Diabetes,
    Alcoholism,
    Hypertension,
    Smoker,
    Welfare,
    Tuberculosis,
    Handicap,
    SmsReminders,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Age,
        Column::Gender,
        Column::RegisteredOn,
        Column::AppointmentOn,
        Column::Status,
        Column::Diabetes,
        Column::Alcoholism,
        Column::Hypertension,
        Column::Smoker,
        Column::Welfare,
        Column::Tuberculosis,
        Column::Handicap,
        Column::SmsReminders,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Age => "age",
            Column::Gender => "gender",
            Column::RegisteredOn => "registered_on",
            Column::AppointmentOn => "appointment_on",
            Column::Status => "status",
            Column::Diabetes => "diabetes",
            Column::Alcoholism => "alcoholism",
            Column::Hypertension => "hypertension",
            Column::Smoker => "smoker",
            Column::Welfare => "welfare",
            Column::Tuberculosis => "tuberculosis",
            Column::Handicap => "handicap",
            Column::SmsReminders => "sms_reminders",
        }
    }

    /// Header names used by the raw no-show dataset.
    fn raw_aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Age => &["Age"],
            Column::Gender => &["Gender"],
            Column::RegisteredOn => &["AppointmentRegistration", "ScheduledDay"],
            Column::AppointmentOn => &["ApointmentData", "AppointmentData", "AppointmentDay"],
            Column::Status => &["Status", "No-show"],
            Column::Diabetes => &["Diabetes"],
            Column::Alcoholism => &["Alcoolism"],
            Column::Hypertension => &["HiperTension", "Hipertension"],
            Column::Smoker => &["Smokes"],
            Column::Welfare => &["Scholarship"],
            Column::Tuberculosis => &["Tuberculosis"],
            Column::Handicap => &["Handcap"],
            Column::SmsReminders => &["Sms_Reminder", "SMS_received"],
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Column::Age
                | Column::Gender
                | Column::RegisteredOn
                | Column::AppointmentOn
                | Column::Status
        )
    }

    fn matches(&self, header: &str) -> bool {
        self.name().eq_ignore_ascii_case(header)
            || self
                .raw_aliases()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(header))
    }
}

/// Resolves a header to its canonical column, consulting configured aliases first.
pub fn resolve_column(header: &str, config: &PipelineConfig) -> Option<Column> {
    let header = header.trim();

    let aliased = config
        .column_aliases
        .iter()
        .find(|(from, _)| from.trim().eq_ignore_ascii_case(header))
        .map(|(_, to)| to.as_str());

    let name = aliased.unwrap_or(header);
    Column::ALL.into_iter().find(|c| c.matches(name))
}

/// Position of each canonical column in the file's records.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indexes: HashMap<Column, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord, config: &PipelineConfig) -> Result<Self, LoadError> {
        let mut indexes = HashMap::new();

        for (i, header) in headers.iter().enumerate() {
            if let Some(column) = resolve_column(header, config) {
                // First occurrence wins.
                indexes.entry(column).or_insert(i);
            }
        }

        if let Some(missing) = Column::ALL
            .into_iter()
            .find(|c| c.is_required() && !indexes.contains_key(c))
        {
            return Err(LoadError::MissingColumn {
                column: missing.name(),
            });
        }

        Ok(Self { indexes })
    }

    /// Optional columns the file does not carry.
    pub fn absent(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| !self.indexes.contains_key(c))
            .collect()
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.indexes
            .get(&column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
    }
}

/// Coerces one CSV record into an [`Appointment`].
///
/// `line` is used only for error messages. The record is not filtered here;
/// negative ages and long waits are left for the cleaning stage.
pub fn parse_row(
    record: &StringRecord,
    map: &ColumnMap,
    config: &PipelineConfig,
    line: u64,
) -> Result<Appointment, LoadError> {
    let field = |column: Column, value: &str, reason: String| LoadError::InvalidField {
        line,
        column: column.name(),
        value: value.to_string(),
        reason,
    };

    let required = |column: Column| {
        map.get(record, column)
            .ok_or_else(|| field(column, "", "field is missing from the row".into()))
    };

    macro_rules! coerce {
        ($column:expr, $parse:expr) => {{
            let raw = required($column)?;
            $parse(raw).map_err(|reason| field($column, raw, reason))?
        }};
    }

    macro_rules! optional {
        ($column:expr, $parse:expr, $default:expr) => {{
            match map.get(record, $column) {
                Some(raw) => $parse(raw).map_err(|reason| field($column, raw, reason))?,
                None => $default,
            }
        }};
    }

    let age = coerce!(Column::Age, parse_age);
    let gender = coerce!(Column::Gender, parse_gender);
    let registered_on = coerce!(Column::RegisteredOn, |s| parse_date(s, &config.date_formats));
    let appointment_on = coerce!(Column::AppointmentOn, |s| parse_date(s, &config.date_formats));
    let no_show = coerce!(Column::Status, |s| parse_status(s, config));

    Ok(Appointment {
        age,
        gender,
        registered_on,
        appointment_on,
        no_show,
        diabetes: optional!(Column::Diabetes, parse_flag, false),
        alcoholism: optional!(Column::Alcoholism, parse_flag, false),
        hypertension: optional!(Column::Hypertension, parse_flag, false),
        smoker: optional!(Column::Smoker, parse_flag, false),
        welfare: optional!(Column::Welfare, parse_flag, false),
        tuberculosis: optional!(Column::Tuberculosis, parse_flag, false),
        handicap: optional!(Column::Handicap, |s| parse_bounded(s, MAX_HANDICAP_LEVEL), 0),
        sms_reminders: optional!(
            Column::SmsReminders,
            |s| parse_bounded(s, MAX_SMS_REMINDERS),
            0
        ),
        wait_days: (appointment_on - registered_on).num_days(),
    })
}

pub fn parse_age(s: &str) -> Result<i64, String> {
    s.parse::<i64>().map_err(|e| e.to_string())
}

pub fn parse_gender(s: &str) -> Result<Gender, String> {
    match s.to_ascii_lowercase().as_str() {
        "m" | "male" => Ok(Gender::Male),
        "f" | "female" => Ok(Gender::Female),
        _ => Err("expected M or F".into()),
    }
}

/// Coerces attendance text to `true` for a no-show and `false` for attended.
pub fn parse_status(s: &str, config: &PipelineConfig) -> Result<bool, String> {
    let matches = |tokens: &[String]| tokens.iter().any(|t| t.eq_ignore_ascii_case(s));

    if matches(&config.no_show_tokens) {
        Ok(true)
    } else if matches(&config.attended_tokens) {
        Ok(false)
    } else {
        Err("not a recognised attendance status".into())
    }
}

/// Parses a calendar date, accepting RFC 3339 timestamps, naive date-times
/// and each of `formats` in order.
pub fn parse_date(s: &str, formats: &[String]) -> Result<NaiveDate, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts.date());
        }
    }

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .ok_or_else(|| "unrecognised date format".into())
}

pub fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err("expected a boolean flag (0/1)".into()),
    }
}

pub fn parse_bounded(s: &str, max: u8) -> Result<u8, String> {
    let value = s.parse::<u8>().map_err(|e| e.to_string())?;
    if value > max {
        return Err(format!("must be between 0 and {max}"));
    }
    Ok(value)
}
