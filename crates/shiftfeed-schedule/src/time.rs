//! Civil time to UTC instant conversion.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::ScheduleError;

const CIVIL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

pub fn parse_zone(zone: &str) -> Result<Tz, ScheduleError> {
    zone.parse::<Tz>()
        .map_err(|_| ScheduleError::Zone(zone.to_string()))
}

/// Interpret `civil` as wall-clock time in `zone` and return the UTC instant
/// in milliseconds since the epoch.
pub fn normalize(civil: &str, zone: &str) -> Result<i64, ScheduleError> {
    normalize_in(civil, parse_zone(zone)?)
}

/// Same as [`normalize`] with an already resolved zone.
///
/// Strings that carry their own UTC offset are taken as absolute instants.
/// Ambiguous wall times resolve to the earlier instant; wall times skipped by
/// a DST jump are moved forward one hour.
pub fn normalize_in(civil: &str, tz: Tz) -> Result<i64, ScheduleError> {
    let input = civil.trim();

    if let Some(instant) = parse_with_offset(input) {
        return Ok(instant.timestamp_millis());
    }

    let naive = parse_civil(input)?;
    resolve(tz, naive, input).map(|dt| dt.timestamp_millis())
}

fn parse_with_offset(input: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(input, fmt).ok())
}

fn parse_civil(input: &str) -> Result<NaiveDateTime, ScheduleError> {
    if let Some(naive) = CIVIL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Ok(naive);
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ScheduleError::parse(input, "unrecognized date/time format"))
}

fn resolve(tz: Tz, naive: NaiveDateTime, input: &str) -> Result<DateTime<Tz>, ScheduleError> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Ok(dt);
    }

    // Spring-forward gap
    tz.from_local_datetime(&(naive + Duration::hours(1)))
        .earliest()
        .ok_or_else(|| ScheduleError::parse(input, format!("time does not exist in {}", tz)))
}
