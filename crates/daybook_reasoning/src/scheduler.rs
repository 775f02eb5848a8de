//! Daily diary job.
//!
//! Walks every user once per run and synthesizes the entry for the target
//! day. Users are handled one after another; a failure for one user is
//! logged and the walk continues.

use crate::diary::{DiarySynthesizer, SynthesisOutcome};
use crate::ticker::schedule_daily;
use chrono::NaiveDate;
use daybook_core::{Clock, DailyTime, DiaryRepository, UserDirectory};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Entries created by this run. Existing entries are not counted.
    pub generated_count: usize,
    pub day: NaiveDate,
}

pub struct DiaryScheduler {
    users: Arc<dyn UserDirectory>,
    diary: Arc<dyn DiaryRepository>,
    synthesizer: Arc<DiarySynthesizer>,
    active_runs: AtomicUsize,
}

/// Keeps the active-run count accurate even if a run is dropped midway.
struct RunGuard<'a>(&'a AtomicUsize);

impl<'a> RunGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DiaryScheduler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        diary: Arc<dyn DiaryRepository>,
        synthesizer: Arc<DiarySynthesizer>,
    ) -> Self {
        Self {
            users,
            diary,
            synthesizer,
            active_runs: AtomicUsize::new(0),
        }
    }

    /// `Running` while at least one run is in progress.
    pub fn state(&self) -> SchedulerState {
        if self.active_runs.load(Ordering::SeqCst) > 0 {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub async fn run(&self, day: NaiveDate) -> RunReport {
        let _guard = RunGuard::enter(&self.active_runs);
        tracing::info!(%day, "Diary run started");

        let users = match self.users.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(%day, "Failed to list users, nothing generated: {:#}", e);
                return RunReport {
                    generated_count: 0,
                    day,
                };
            }
        };

        let mut generated_count = 0;
        for user in users {
            match self.diary.entry_for_day(user, day).await {
                Ok(Some(_)) => {
                    tracing::debug!(user_id = %user, %day, "Entry exists, skipping user");
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(user_id = %user, %day, "Failed to check existing entry: {:#}", e);
                    continue;
                }
            }

            match self.synthesizer.synthesize(user, day).await {
                Ok(SynthesisOutcome::Created(_)) => generated_count += 1,
                Ok(SynthesisOutcome::Existing(_)) | Ok(SynthesisOutcome::Skipped(_)) => {}
                Err(e) => {
                    tracing::warn!(user_id = %user, %day, "Diary synthesis failed: {}", e);
                }
            }
        }

        tracing::info!(%day, generated_count, "Diary run finished");
        RunReport {
            generated_count,
            day,
        }
    }

    pub async fn run_today(&self, clock: &dyn Clock) -> RunReport {
        self.run(clock.today()).await
    }

    /// Manual trigger. Without a day, targets today.
    pub async fn run_manual(&self, day: Option<NaiveDate>, clock: &dyn Clock) -> RunReport {
        let day = day.unwrap_or_else(|| clock.today());
        tracing::info!(%day, "Manual diary run requested");
        self.run(day).await
    }

    /// Run every day at `time` until `shutdown` flips to `true`.
    pub fn spawn_daily(
        self: Arc<Self>,
        clock: Arc<dyn Clock>,
        time: DailyTime,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        schedule_daily(clock, time, shutdown, move |day| {
            let scheduler = self.clone();
            async move {
                scheduler.run(day).await;
            }
        })
    }
}
