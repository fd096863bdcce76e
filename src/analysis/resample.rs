/// Calendar resampling by mean aggregation.
///
/// Used to thin a daily series before threshold analysis (weekly means
/// smooth out single-day spikes).

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::model::{AnalysisError, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFrequency {
    /// Calendar days, labelled by the day.
    Daily,
    /// Weeks ending Sunday, labelled by that Sunday.
    Weekly,
    /// Calendar months, labelled by the month's last day.
    Monthly,
}

impl FromStr for ResampleFrequency {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(ResampleFrequency::Daily),
            "w" | "week" | "weekly" => Ok(ResampleFrequency::Weekly),
            "m" | "month" | "monthly" => Ok(ResampleFrequency::Monthly),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown resample frequency '{}'",
                other
            ))),
        }
    }
}

impl ResampleFrequency {
    /// The bin label for a calendar date.
    pub fn label(&self, date: NaiveDate) -> NaiveDate {
        match self {
            ResampleFrequency::Daily => date,
            ResampleFrequency::Weekly => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday)).unwrap_or(date)
            }
            ResampleFrequency::Monthly => last_day_of_month(date),
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Mean of each calendar bin, one observation per non-empty bin, in label
/// order. Labels are stamped at midnight UTC. Non-finite values are left
/// out of the means; a bin holding only non-finite values is dropped.
pub fn resample_mean(
    observations: &[Observation],
    frequency: ResampleFrequency,
) -> Vec<Observation> {
    let mut bins: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.value.is_finite()) {
        let label = frequency.label(obs.time.date_naive());
        let entry = bins.entry(label).or_insert((0.0, 0));
        entry.0 += obs.value;
        entry.1 += 1;
    }

    bins.into_iter()
        .map(|(label, (sum, n))| Observation {
            time: DateTime::from_naive_utc_and_offset(label.and_time(NaiveTime::MIN), Utc),
            value: sum / n as f64,
        })
        .collect()
}
