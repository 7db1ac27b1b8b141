//! The cleaned appointment record and its enumerations.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::KeyParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

/// Boolean medical or demographic flags carried by each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Diabetes,
    Alcoholism,
    Hypertension,
    Smoker,
    /// Member of the welfare (scholarship) program.
    Welfare,
    Tuberculosis,
    /// Any handicap level above zero.
    Handicap,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Diabetes,
        Condition::Alcoholism,
        Condition::Hypertension,
        Condition::Smoker,
        Condition::Welfare,
        Condition::Tuberculosis,
        Condition::Handicap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Diabetes => "diabetes",
            Condition::Alcoholism => "alcoholism",
            Condition::Hypertension => "hypertension",
            Condition::Smoker => "smoker",
            Condition::Welfare => "welfare",
            Condition::Tuberculosis => "tuberculosis",
            Condition::Handicap => "handicap",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyParseError {
                kind: "condition",
                input: s.to_string(),
            })
    }
}

/// One validated appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub age: i64,
    pub gender: Gender,
    pub registered_on: NaiveDate,
    pub appointment_on: NaiveDate,
    pub no_show: bool,

    // condition flags
    pub diabetes: bool,
    pub alcoholism: bool,
    pub hypertension: bool,
    pub smoker: bool,
    pub welfare: bool,
    pub tuberculosis: bool,
    pub handicap: u8,

    pub sms_reminders: u8,
    pub wait_days: i64,
}

impl Appointment {
    pub fn year(&self) -> i32 {
        self.appointment_on.year()
    }

    pub fn month(&self) -> u32 {
        self.appointment_on.month()
    }

    pub fn day(&self) -> u32 {
        self.appointment_on.day()
    }

    pub fn day_of_year(&self) -> u32 {
        self.appointment_on.ordinal()
    }

    pub fn weekday(&self) -> Weekday {
        self.appointment_on.weekday()
    }

    pub fn has(&self, condition: Condition) -> bool {
        match condition {
            Condition::Diabetes => self.diabetes,
            Condition::Alcoholism => self.alcoholism,
            Condition::Hypertension => self.hypertension,
            Condition::Smoker => self.smoker,
            Condition::Welfare => self.welfare,
            Condition::Tuberculosis => self.tuberculosis,
            Condition::Handicap => self.handicap > 0,
        }
    }

    /// The no-show outcome as 0.0 or 1.0, for averaging.
    pub fn failure(&self) -> f64 {
        if self.no_show { 1.0 } else { 0.0 }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a record with neutral defaults; tests override what they need.
    pub(crate) fn appointment(age: i64, no_show: bool) -> Appointment {
        let registered_on = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
        Appointment {
            age,
            gender: Gender::Female,
            registered_on,
            appointment_on: registered_on,
            no_show,
            diabetes: false,
            alcoholism: false,
            hypertension: false,
            smoker: false,
            welfare: false,
            tuberculosis: false,
            handicap: 0,
            sms_reminders: 0,
            wait_days: 0,
        }
    }

    #[test]
    fn test_derived_date_fields() {
        let mut a = appointment(30, false);
        a.appointment_on = NaiveDate::from_ymd_opt(2015, 3, 2).unwrap();

        assert_eq!(a.year(), 2015);
        assert_eq!(a.month(), 3);
        assert_eq!(a.day(), 2);
        assert_eq!(a.day_of_year(), 61);
        assert_eq!(a.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_handicap_flag_uses_level() {
        let mut a = appointment(30, false);
        assert!(!a.has(Condition::Handicap));
        a.handicap = 2;
        assert!(a.has(Condition::Handicap));
    }

    #[test]
    fn test_condition_from_str() {
        assert_eq!("Diabetes".parse::<Condition>(), Ok(Condition::Diabetes));
        assert_eq!(" welfare ".parse::<Condition>(), Ok(Condition::Welfare));
        assert!("asthma".parse::<Condition>().is_err());
    }
}
