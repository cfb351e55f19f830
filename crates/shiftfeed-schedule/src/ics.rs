//! iCalendar feed generation.
//!
//! The feed is written by hand rather than through a calendar builder so the
//! output stays byte-stable between runs: `\n` line endings, no DTSTAMP, no
//! generated UIDs. Text values are emitted as-is; commas, semicolons and
//! backslashes in store/department/role names are not escaped.

use chrono::DateTime;
use indoc::{formatdoc, indoc};

use crate::error::ScheduleError;
use crate::types::Shift;

const CALENDAR_HEADER: &str = indoc! {"
    BEGIN:VCALENDAR
    VERSION:2.0
    CALSCALE:GREGORIAN
    PRODID:-//IDK//IDK//EN
    X-WR-CALNAME:Farm Boy Schedule
    X-APPLE-CALENDAR-COLOR:#FF2968
    REFRESH-INTERVAL;VALUE=DURATION:PT4H
    X-PUBLISHED-TTL:PT4H
"};

const CALENDAR_FOOTER: &str = "END:VCALENDAR\n";

/// Render the feed for `shifts`, one VEVENT per shift in order.
pub fn render(shifts: &[Shift]) -> Result<String, ScheduleError> {
    let mut ics = String::from(CALENDAR_HEADER);

    for (index, shift) in shifts.iter().enumerate() {
        ics.push_str(&render_event(shift, index + 1)?);
    }

    ics.push_str(CALENDAR_FOOTER);
    Ok(ics)
}

fn render_event(shift: &Shift, sequence: usize) -> Result<String, ScheduleError> {
    let updated = if shift.is_updated() { " Updated" } else { "" };

    Ok(formatdoc! {"
        BEGIN:VEVENT
        DTSTART:{start}
        DTEND:{end}
        SUMMARY:Farm Boy ({hours} hour shift){updated}
        LOCATION:Location: {store}. Department: {department}. Role: {role}.
        DESCRIPTION:Paid hours: {paid}
        SEQUENCE:{sequence}
        STATUS:CONFIRMED
        END:VEVENT
        ",
        start = ics_date(shift.start_time)?,
        end = ics_date(shift.end_time)?,
        hours = shift.duration_hours(),
        updated = updated,
        store = shift.store,
        department = shift.department,
        role = shift.role,
        paid = shift.paid_hours,
        sequence = sequence,
    })
}

/// Basic ISO 8601 UTC form, e.g. `20231114T221320Z`.
pub fn ics_date(instant_ms: i64) -> Result<String, ScheduleError> {
    DateTime::from_timestamp_millis(instant_ms)
        .map(|dt| dt.format("%Y%m%dT%H%M%SZ").to_string())
        .ok_or_else(|| ScheduleError::parse(&instant_ms.to_string(), "instant out of range"))
}
