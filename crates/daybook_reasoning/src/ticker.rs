//! Daily wall-clock trigger.

use chrono::{Duration, NaiveDate};
use daybook_core::{Clock, DailyTime};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawn a task that calls `callback(day)` once per day at `time`.
///
/// The first deadline is computed before this returns, so a clock advanced
/// right after spawning is never missed. Each following deadline is the same
/// time on the next day; if the clock jumped past several deadlines, they
/// fire back to back, one per day.
///
/// Setting `shutdown` to `true` (or dropping its sender) ends the loop at the
/// next wait. A callback already running is awaited to completion.
pub fn schedule_daily<F, Fut>(
    clock: Arc<dyn Clock>,
    time: DailyTime,
    mut shutdown: watch::Receiver<bool>,
    mut callback: F,
) -> JoinHandle<()>
where
    F: FnMut(NaiveDate) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut deadline = time.next_fire_after(clock.now());
    tracing::info!(next = %deadline, "Daily trigger armed at {}", time);

    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = clock.sleep_until(deadline) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let day = deadline.date();
            tracing::info!(%day, "Daily trigger fired");
            callback(day).await;

            deadline = time.on(day + Duration::days(1));
        }
        tracing::info!("Daily trigger stopped");
    })
}
