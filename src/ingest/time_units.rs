/// CF-convention time axis decoding.
///
/// Reanalysis files store time as numeric offsets with a units attribute
/// such as `"hours since 1800-01-01 00:00:0.0"`. Only the standard
/// (proleptic Gregorian) calendar is supported.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::model::AnalysisError;

/// A parsed `"<unit> since <epoch>"` string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    /// Length of one unit, in seconds.
    pub unit_seconds: f64,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self, AnalysisError> {
        let bad = || AnalysisError::Parse(format!("unrecognised time units '{}'", units));

        let (unit, epoch) = units.split_once(" since ").ok_or_else(bad)?;
        let unit_seconds = match unit.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" | "s" => 1.0,
            "minute" | "minutes" | "min" => 60.0,
            "hour" | "hours" | "h" => 3_600.0,
            "day" | "days" | "d" => 86_400.0,
            _ => return Err(bad()),
        };

        let epoch = parse_epoch(epoch.trim()).ok_or_else(bad)?;
        Ok(Self {
            unit_seconds,
            epoch,
        })
    }

    /// The timestamp `offset` units after the epoch, rounded to the millisecond.
    pub fn to_datetime(&self, offset: f64) -> Result<DateTime<Utc>, AnalysisError> {
        let millis = offset * self.unit_seconds * 1_000.0;
        if !millis.is_finite() {
            return Err(AnalysisError::Parse(format!("non-finite time offset {}", offset)));
        }
        Duration::try_milliseconds(millis.round() as i64)
            .and_then(|d| self.epoch.checked_add_signed(d))
            .ok_or_else(|| AnalysisError::Parse(format!("time offset {} out of range", offset)))
    }

    pub fn decode(&self, offsets: &[f64]) -> Result<Vec<DateTime<Utc>>, AnalysisError> {
        offsets.iter().map(|&o| self.to_datetime(o)).collect()
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a space or `T` and
/// `H:M[:S[.f]]`, optionally followed by `Z`, `UTC` or `+00:00`.
fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let s = s
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();
    let (date_part, time_part) = match s.split_once(|c| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let time = match time_part {
        Some(t) if !t.is_empty() => parse_clock(t)?,
        _ => NaiveTime::MIN,
    };
    Some(NaiveDateTime::new(date, time).and_utc())
}

/// Lenient `H:M[:S[.f]]`; CF files commonly write seconds as `0.0`.
fn parse_clock(t: &str) -> Option<NaiveTime> {
    let mut parts = t.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let seconds: f64 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0.0);
    if parts.next().is_some() || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let whole = seconds.trunc() as u32;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    NaiveTime::from_hms_nano_opt(hour, minute, whole, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_ncep_reanalysis_units() {
        let units = TimeUnits::parse("hours since 1800-01-01 00:00:0.0").expect("NCEP units");
        assert_eq!(units.unit_seconds, 3_600.0);
        assert_eq!(units.epoch, Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_decodes_hours_offset() {
        let units = TimeUnits::parse("hours since 1800-01-01 00:00:0.0").unwrap();
        // 1979-01-01 00:00 is 1_569_072 hours after 1800-01-01.
        let t = units.to_datetime(1_569_072.0).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(1979, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parses_days_since_date_only() {
        let units = TimeUnits::parse("days since 1979-01-01").unwrap();
        let decoded = units.decode(&[0.0, 1.0, 31.5]).unwrap();
        assert_eq!(decoded[1], Utc.with_ymd_and_hms(1979, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(decoded[2], Utc.with_ymd_and_hms(1979, 2, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parses_iso_epoch_with_zulu() {
        let units = TimeUnits::parse("seconds since 1970-01-01T00:00:00Z").unwrap();
        assert_eq!(units.epoch, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn test_rejects_unknown_unit_or_missing_since() {
        assert!(TimeUnits::parse("fortnights since 1800-01-01").is_err());
        assert!(TimeUnits::parse("hours").is_err());
        assert!(TimeUnits::parse("hours since yesterday").is_err());
    }
}
