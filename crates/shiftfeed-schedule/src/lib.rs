//! Work-shift schedule sync.
//!
//! Fetches the schedule from the backend, normalizes it to UTC, merges it
//! with the local cache and renders an iCalendar feed.

pub mod client;
pub mod error;
pub mod ics;
pub mod merge;
pub mod normalize;
pub mod storage;
pub mod sync;
pub mod time;
pub mod types;

pub use client::{FetchOutcome, ScheduleClient};
pub use error::ScheduleError;
pub use storage::{RunLock, Storage};
pub use sync::SyncReport;
pub use types::{RawShift, RunContext, Shift};
