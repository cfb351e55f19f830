//! Turns backend shift records into canonical [`Shift`]s.

use crate::error::ScheduleError;
use crate::time::normalize_in;
use crate::types::{RawShift, RunContext, Shift};

/// Drop cancelled records, convert the rest and keep only shifts that start
/// after the run instant.
///
/// Input order is preserved. The backend already sorts by start time.
pub fn map_and_filter(raw: Vec<RawShift>, ctx: &RunContext) -> Result<Vec<Shift>, ScheduleError> {
    let mut shifts = Vec::with_capacity(raw.len());

    for record in raw.into_iter().filter(|r| !r.is_cancelled()) {
        match to_shift(record, ctx)? {
            Some(shift) if shift.starts_after(ctx.run_instant) => shifts.push(shift),
            Some(shift) => {
                tracing::trace!(start = shift.start_time, "Skipping shift that already started");
            }
            None => tracing::trace!("Skipping shift without a start time"),
        }
    }

    Ok(shifts)
}

/// Convert one record. Returns `None` when the record has no start time,
/// which can never count as upcoming.
///
/// End and update times are required once a record is kept. Missing labels
/// are copied through as empty strings and missing paid hours as zero.
fn to_shift(raw: RawShift, ctx: &RunContext) -> Result<Option<Shift>, ScheduleError> {
    let Some(start) = raw.start_time.as_deref() else {
        return Ok(None);
    };

    Ok(Some(Shift {
        start_time: normalize_in(start, ctx.zone)?,
        end_time: normalize_in(required(raw.end_time.as_deref(), "endTime")?, ctx.zone)?,
        updated_time: normalize_in(required(raw.updated_at.as_deref(), "updated_at")?, ctx.zone)?,
        store: raw.store.unwrap_or_default(),
        department: raw.department.unwrap_or_default(),
        role: raw.role.unwrap_or_default(),
        paid_hours: raw.duration.unwrap_or_default(),
        status: raw.status,
    }))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ScheduleError> {
    value.ok_or_else(|| ScheduleError::parse("null", format!("{} is missing", field)))
}
