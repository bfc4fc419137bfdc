//! Foreground scheduler.
//!
//! Sleeps until the next configured job time, runs every job due at that
//! instant on the blocking pool, and repeats until Ctrl-C. Each job reloads
//! the stores first, so edits made by other `questboard` commands in the
//! meantime are kept.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Weekday};
use questboard_core::notify::sink_from_config;
use questboard_core::storage::{parse_time_of_day, parse_weekday, ScheduleConfig};
use questboard_core::{ConfigError, Job, NotificationSink, QuestBoard};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::{open_board, CmdResult, Ctx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub job: Job,
    pub at: NaiveTime,
    /// Only on this weekday, when set.
    pub weekday: Option<Weekday>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let weekly_on = parse_weekday("schedule.reset_weekly_weekday", &config.reset_weekly_weekday)?;
        let mut entries = Vec::with_capacity(Job::ALL.len());
        for (key, value) in config.times() {
            let job = match key {
                "schedule.reset_daily" => Job::ResetDaily,
                "schedule.reset_weekly" => Job::ResetWeekly,
                "schedule.refresh_events" => Job::RefreshEvents,
                "schedule.send_daily" => Job::SendDaily,
                "schedule.notify_expiring" => Job::NotifyExpiring,
                "schedule.backup" => Job::Backup,
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            };
            entries.push(ScheduleEntry {
                job,
                at: parse_time_of_day(key, value)?,
                weekday: (job == Job::ResetWeekly).then_some(weekly_on),
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// The first instant strictly after `after` at which something is due,
    /// with every job due then, in schedule order.
    pub fn next_run(&self, after: DateTime<FixedOffset>) -> Option<(DateTime<FixedOffset>, Vec<Job>)> {
        let tz = *after.offset();
        let start = after.date_naive();

        let next_for = |entry: &ScheduleEntry| {
            (0..=7).find_map(|offset| {
                let day = start + Duration::days(offset);
                if entry.weekday.is_some_and(|w| w != day.weekday()) {
                    return None;
                }
                let when = tz.from_local_datetime(&day.and_time(entry.at)).single()?;
                (when > after).then_some(when)
            })
        };

        let times: Vec<_> = self
            .entries
            .iter()
            .filter_map(|entry| next_for(entry).map(|when| (when, entry.job)))
            .collect();
        let earliest = times.iter().map(|(when, _)| *when).min()?;
        let jobs = times
            .into_iter()
            .filter(|(when, _)| *when == earliest)
            .map(|(_, job)| job)
            .collect();
        Some((earliest, jobs))
    }
}

pub fn run(_ctx: &Ctx) -> CmdResult {
    let board = open_board()?;
    let schedule = Schedule::from_config(&board.config().schedule)?;
    let sink: Arc<dyn NotificationSink> = Arc::from(sink_from_config(&board.config().notifications));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(Arc::new(Mutex::new(board)), schedule, sink))
}

async fn run_job(board: Arc<Mutex<QuestBoard>>, sink: Arc<dyn NotificationSink>, job: Job) {
    let result = tokio::task::spawn_blocking(move || {
        let mut board = match board.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        board.run_job(job, sink.as_ref())
    })
    .await;

    match result {
        Ok(Ok(_report)) => {}
        Ok(Err(e)) => warn!(%job, error = %e, "job failed"),
        Err(e) => error!(%job, error = %e, "job panicked"),
    }
}

async fn serve(
    board: Arc<Mutex<QuestBoard>>,
    schedule: Schedule,
    sink: Arc<dyn NotificationSink>,
) -> CmdResult {
    info!(jobs = schedule.entries().len(), sink = sink.name(), "scheduler started");
    // Catch up on events that ended while nothing was running.
    run_job(board.clone(), sink.clone(), Job::RefreshEvents).await;

    loop {
        let now = match board.lock() {
            Ok(guard) => guard.now(),
            Err(poisoned) => poisoned.into_inner().now(),
        };
        let Some((when, jobs)) = schedule.next_run(now) else {
            return Err("schedule has no entries".into());
        };
        let wait = (when - now).to_std().unwrap_or_default();
        info!(at = %when, ?jobs, "next run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }

        for job in jobs {
            run_job(board.clone(), sink.clone(), job).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 4, d, h, m, 0)
            .unwrap()
    }

    fn schedule() -> Schedule {
        Schedule::from_config(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn default_schedule_has_every_job() {
        let jobs: Vec<Job> = schedule().entries().iter().map(|e| e.job).collect();
        assert_eq!(jobs, Job::ALL.to_vec());
    }

    #[test]
    fn next_run_picks_the_earliest_time() {
        // 2025-04-10 is a Thursday.
        assert_eq!(
            schedule().next_run(at(10, 4, 30)),
            Some((at(10, 5, 0), vec![Job::ResetDaily]))
        );
        assert_eq!(
            schedule().next_run(at(10, 5, 0)),
            Some((at(10, 5, 5), vec![Job::RefreshEvents]))
        );
        assert_eq!(
            schedule().next_run(at(10, 21, 0)),
            Some((at(11, 4, 0), vec![Job::Backup]))
        );
    }

    #[test]
    fn weekly_reset_runs_with_daily_on_monday() {
        // Sunday night; Monday is the 14th.
        assert_eq!(
            schedule().next_run(at(13, 23, 0)),
            Some((at(14, 4, 0), vec![Job::Backup]))
        );
        assert_eq!(
            schedule().next_run(at(14, 4, 0)),
            Some((at(14, 5, 0), vec![Job::ResetDaily, Job::ResetWeekly]))
        );
    }

    #[test]
    fn rejects_malformed_times() {
        let config = ScheduleConfig {
            send_daily: "8am".into(),
            ..Default::default()
        };
        assert!(Schedule::from_config(&config).is_err());
    }
}
