//! Schedule API types and data structures.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::time;

pub const STATUS_NORMAL: i64 = 0;
pub const STATUS_UPDATED: i64 = 1;
pub const STATUS_CANCELLED: i64 = 2;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Shift record as returned by the schedules endpoint.
///
/// Times are civil strings in the backend's zone. `startTime` may be null,
/// the endpoint sorts those last. Cancelled records often come back with
/// other fields nulled out, so only `status` is required here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShift {
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, rename = "updated_at")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Paid hours
    #[serde(default)]
    pub duration: Option<f64>,
    pub status: i64,
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub work_date: Option<String>,
}

impl RawShift {
    pub fn is_cancelled(&self) -> bool {
        self.status == STATUS_CANCELLED
    }
}

/// Shift as stored locally. Instants are UTC milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub start_time: i64,
    pub end_time: i64,
    pub updated_time: i64,
    pub store: String,
    pub department: String,
    pub role: String,
    pub paid_hours: f64,
    pub status: i64,
}

impl Shift {
    /// Scheduled length in hours, unrounded.
    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time) as f64 / MS_PER_HOUR
    }

    pub fn is_updated(&self) -> bool {
        self.status == STATUS_UPDATED
    }

    pub fn starts_after(&self, instant_ms: i64) -> bool {
        self.start_time > instant_ms
    }
}

/// Immutable per-run values: the instant the run started and the zone
/// civil timestamps are read in.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub run_instant: i64,
    pub zone: Tz,
}

impl RunContext {
    pub fn new(run_instant: i64, zone: &str) -> Result<Self, ScheduleError> {
        Ok(Self {
            run_instant,
            zone: time::parse_zone(zone)?,
        })
    }
}
