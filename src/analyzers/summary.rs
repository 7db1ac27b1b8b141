use crate::analyzers::types::{ConditionSummary, Spread, Summary};
use crate::analyzers::utility::proportion;
use crate::record::{Appointment, Condition};

/// Computes dataset-wide descriptive statistics over cleaned records.
pub fn summarize(records: &[Appointment]) -> Summary {
    let no_shows = records.iter().filter(|r| r.no_show).count();

    let ages: Vec<f64> = records.iter().map(|r| r.age as f64).collect();
    let waits: Vec<f64> = records.iter().map(|r| r.wait_days as f64).collect();

    let conditions = Condition::ALL
        .into_iter()
        .map(|condition| {
            let (count, missed) = records
                .iter()
                .filter(|r| r.has(condition))
                .fold((0, 0), |(count, missed), r| (count + 1, missed + r.no_show as usize));

            ConditionSummary {
                condition,
                count,
                prevalence: proportion(count, records.len()),
                no_show_rate: proportion(missed, count),
            }
        })
        .collect();

    Summary {
        records: records.len(),
        no_shows,
        no_show_rate: proportion(no_shows, records.len()),
        age: Spread::of(&ages),
        wait_days: Spread::of(&waits),
        first_appointment: records.iter().map(|r| r.appointment_on).min(),
        last_appointment: records.iter().map(|r| r.appointment_on).max(),
        conditions,
    }
}
