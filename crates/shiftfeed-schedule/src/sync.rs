//! One pass of the job: cache -> fetch -> normalize -> merge -> cache -> feed.

use shiftfeed_core::Config;

use crate::client::ScheduleClient;
use crate::error::ScheduleError;
use crate::ics;
use crate::merge::merge;
use crate::normalize::map_and_filter;
use crate::storage::{write_feed, RunLock, Storage};
use crate::types::RunContext;

/// Counts describing what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records returned by the backend, cancelled ones included
    pub fetched: usize,
    /// Upcoming shifts kept from the fetch
    pub upcoming: usize,
    /// Started shifts carried over from the cache
    pub retained: usize,
    /// Shifts written to the cache and the feed
    pub total: usize,
    pub fresh_login: bool,
}

/// Run the job against the backend named in `config`.
pub async fn run(config: &Config, ctx: &RunContext) -> Result<SyncReport, ScheduleError> {
    let client = ScheduleClient::new(&config.api)?;
    sync(&client, config, ctx).await
}

/// Run the job with an existing client.
///
/// Steps run strictly in order. Any failure before the cache is saved leaves
/// the previous cache and feed untouched.
pub async fn sync(
    client: &ScheduleClient,
    config: &Config,
    ctx: &RunContext,
) -> Result<SyncReport, ScheduleError> {
    let _lock = RunLock::acquire(&config.cache_path)?;

    let mut storage = Storage::load(&config.cache_path);

    let outcome = client.fetch_with_relogin(storage.token.as_deref()).await?;
    if outcome.fresh_login {
        storage.token = Some(outcome.token);
    }
    let fetched = outcome.shifts.len();

    let upcoming = map_and_filter(outcome.shifts, ctx)?;
    tracing::debug!(?upcoming, "Normalized schedule");
    let upcoming_count = upcoming.len();

    let cached = std::mem::take(&mut storage.shifts);
    storage.shifts = merge(cached, upcoming, ctx.run_instant);
    storage.save(&config.cache_path)?;

    let feed = ics::render(&storage.shifts)?;
    write_feed(&config.ics_path, &feed)?;

    let report = SyncReport {
        fetched,
        upcoming: upcoming_count,
        retained: storage.shifts.len() - upcoming_count,
        total: storage.shifts.len(),
        fresh_login: outcome.fresh_login,
    };

    tracing::info!(
        fetched = report.fetched,
        upcoming = report.upcoming,
        retained = report.retained,
        "Wrote {} shifts to {:?}",
        report.total,
        config.ics_path
    );

    Ok(report)
}
