//! Scheduled maintenance jobs.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::board::QuestBoard;
use crate::error::{CoreError, Result};
use crate::lifecycle;
use crate::notify::{fan_out, NotificationSink};
use crate::period::{daily_key, weekly_key, Period};
use crate::render;
use crate::storage::{backup_stamp, prune_backups};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    ResetDaily,
    ResetWeekly,
    RefreshEvents,
    SendDaily,
    NotifyExpiring,
    Backup,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::ResetDaily,
        Job::ResetWeekly,
        Job::RefreshEvents,
        Job::SendDaily,
        Job::NotifyExpiring,
        Job::Backup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::ResetDaily => "reset-daily",
            Job::ResetWeekly => "reset-weekly",
            Job::RefreshEvents => "refresh-events",
            Job::SendDaily => "send-daily",
            Job::NotifyExpiring => "notify-expiring",
            Job::Backup => "backup",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Job::ALL
            .into_iter()
            .find(|job| job.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Job::ALL.iter().map(Job::as_str).collect();
                CoreError::invalid("job", format!("'{s}' (expected one of {})", names.join(", ")))
            })
    }
}

/// Outcome of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: Job,
    /// Records purged, events changed, messages sent or documents backed up.
    pub affected: usize,
    /// Deliveries or backups that failed.
    pub failed: usize,
    pub detail: String,
}

impl JobReport {
    fn new(job: Job, affected: usize, detail: impl Into<String>) -> Self {
        Self {
            job,
            affected,
            failed: 0,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.detail)?;
        if self.failed > 0 {
            write!(f, " ({} failed)", self.failed)?;
        }
        Ok(())
    }
}

impl QuestBoard {
    /// Run `job` against the documents as currently stored.
    pub fn run_job(&mut self, job: Job, sink: &dyn NotificationSink) -> Result<JobReport> {
        self.reload()?;
        let report = match job {
            Job::ResetDaily => self.reset_daily(),
            Job::ResetWeekly => self.reset_weekly(),
            Job::RefreshEvents => self.refresh_events(),
            Job::SendDaily => self.send_daily_notification(sink),
            Job::NotifyExpiring => self.notify_expiring_events(sink),
            Job::Backup => self.backup(),
        }?;
        info!(job = %report.job, affected = report.affected, failed = report.failed, "{}", report.detail);
        Ok(report)
    }

    /// Drop daily checks from earlier days, along with event checks keyed
    /// before today.
    pub fn reset_daily(&mut self) -> Result<JobReport> {
        let now = self.now();
        let (daily, event) = self.commit_ledger(|ledger| {
            (
                ledger.purge_stale(Period::Daily, &daily_key(&now)),
                ledger.purge_event_before(now.date_naive()),
            )
        })?;
        Ok(JobReport::new(
            Job::ResetDaily,
            daily + event,
            format!("purged {daily} daily and {event} event records"),
        ))
    }

    /// Drop weekly checks not in the current week.
    pub fn reset_weekly(&mut self) -> Result<JobReport> {
        let now = self.now();
        let purged = self.commit_ledger(|ledger| ledger.purge_stale(Period::Weekly, &weekly_key(&now)))?;
        Ok(JobReport::new(
            Job::ResetWeekly,
            purged,
            format!("purged {purged} weekly records"),
        ))
    }

    /// Expire ended events and promote daily event tasks.
    pub fn refresh_events(&mut self) -> Result<JobReport> {
        let today = self.today();
        let refresh = lifecycle::refresh_events(&mut self.catalog, today);
        if refresh.changed() {
            self.save_catalog()?;
        }
        Ok(JobReport::new(
            Job::RefreshEvents,
            refresh.expired.len() + refresh.promoted.len(),
            format!(
                "expired {} events, promoted {} tasks",
                refresh.expired.len(),
                refresh.promoted.len()
            ),
        ))
    }

    /// Send every registered user their daily checklist.
    pub fn send_daily_notification(&mut self, sink: &dyn NotificationSink) -> Result<JobReport> {
        let messages: Vec<_> = self
            .users
            .ids()
            .into_iter()
            .map(|user| (user, render::daily_notification(&self.daily_view(user))))
            .collect();
        let delivery = fan_out(sink, messages);
        Ok(JobReport {
            job: Job::SendDaily,
            affected: delivery.sent,
            failed: delivery.failed.len(),
            detail: format!("sent {} checklists via {}", delivery.sent, sink.name()),
        })
    }

    /// Tell every user about events ending within the configured window.
    pub fn notify_expiring_events(&mut self, sink: &dyn NotificationSink) -> Result<JobReport> {
        let within = i64::from(self.config.notifications.expiring_within_days);
        let soon = lifecycle::expiring_events(&self.catalog, self.today(), within);
        if soon.is_empty() {
            return Ok(JobReport::new(Job::NotifyExpiring, 0, "no events ending soon"));
        }

        let text = render::expiring_notification(&soon);
        let messages = self.users.ids().into_iter().map(|user| (user, text.clone()));
        let delivery = fan_out(sink, messages);
        Ok(JobReport {
            job: Job::NotifyExpiring,
            affected: delivery.sent,
            failed: delivery.failed.len(),
            detail: format!("{} events ending soon, notified {} users", soon.len(), delivery.sent),
        })
    }

    /// Snapshot every store and prune snapshots past retention.
    pub fn backup(&mut self) -> Result<JobReport> {
        let now = self.now();
        let stamp = backup_stamp(&now);
        let keep_days = self.config.backup.keep_days;

        let mut written = 0;
        let mut pruned = 0;
        let mut failed = 0;
        for store in self.stores.documents() {
            match store.backup(&stamp) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(store = %store.describe(), error = %e, "backup failed");
                    failed += 1;
                    continue;
                }
            }
            match prune_backups(store, &now, keep_days) {
                Ok(n) => pruned += n,
                Err(e) => warn!(store = %store.describe(), error = %e, "backup cleanup failed"),
            }
        }

        Ok(JobReport {
            job: Job::Backup,
            affected: written,
            failed,
            detail: format!("wrote {written} backups ({stamp}), pruned {pruned}"),
        })
    }
}
