//! Wall-clock abstraction
//!
//! The daily trigger never reads system time directly. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] whose time only moves when
//! told to, so day boundaries and firing times are reproducible.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local wall time.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Resolve once `now() >= deadline`.
    async fn sleep_until(&self, deadline: NaiveDateTime);
}

/// Local system time backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep_until(&self, deadline: NaiveDateTime) {
        // Re-check after waking: the wall clock may have been adjusted.
        loop {
            let remaining = deadline - self.now();
            if remaining <= Duration::zero() {
                return;
            }
            tokio::time::sleep(remaining.to_std().unwrap_or_default()).await;
        }
    }
}

/// Deterministic clock for tests.
///
/// Time only advances when explicitly told to; sleepers are woken on every
/// change and re-check their deadline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
    notify: Arc<Notify>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = time;
        self.notify.notify_waiters();
    }

    pub fn advance(&self, by: Duration) {
        debug_assert!(by >= Duration::zero(), "cannot go back in time");
        {
            let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
            *now += by;
        }
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn sleep_until(&self, deadline: NaiveDateTime) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so an advance in between is not lost.
            notified.as_mut().enable();
            if self.now() >= deadline {
                return;
            }
            notified.await;
        }
    }
}

/// A local time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime(NaiveTime);

impl DailyTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        match NaiveTime::from_hms_opt(hour, minute, 0) {
            Some(t) => Ok(Self(t)),
            None => bail!("time out of range: {hour:02}:{minute:02}"),
        }
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.0)
    }

    /// First firing instant strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = self.on(now.date());
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

impl FromStr for DailyTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .with_context(|| format!("expected HH:MM, got `{s}`"))?;
        let hour: u32 = h.parse().with_context(|| format!("invalid hour in `{s}`"))?;
        let minute: u32 = m.parse().with_context(|| format!("invalid minute in `{s}`"))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_daily_time() {
        let t: DailyTime = "23:59".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));
        assert_eq!(t.to_string(), "23:59");
        let t: DailyTime = " 7:05 ".parse().unwrap();
        assert_eq!(t.to_string(), "07:05");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("24:00".parse::<DailyTime>().is_err());
        assert!("12:60".parse::<DailyTime>().is_err());
        assert!("1230".parse::<DailyTime>().is_err());
        assert!("ab:cd".parse::<DailyTime>().is_err());
    }

    #[test]
    fn test_next_fire_same_day_and_rollover() {
        let t = DailyTime::new(23, 59).unwrap();
        assert_eq!(t.next_fire_after(at(2024, 3, 1, 12, 0)), at(2024, 3, 1, 23, 59));
        // Exactly at the firing time: next one is tomorrow
        assert_eq!(t.next_fire_after(at(2024, 3, 1, 23, 59)), at(2024, 3, 2, 23, 59));
        // Month rollover
        assert_eq!(t.next_fire_after(at(2024, 2, 29, 23, 59)), at(2024, 3, 1, 23, 59));
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_wakes_on_advance() {
        let clock = ManualClock::new(at(2024, 3, 1, 23, 0));
        let deadline = at(2024, 3, 1, 23, 59);

        let sleeper = clock.clone();
        let handle = tokio::spawn(async move {
            sleeper.sleep_until(deadline).await;
            sleeper.now()
        });

        clock.advance(Duration::minutes(30));
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        clock.advance(Duration::minutes(30));
        let woke_at = handle.await.unwrap();
        assert!(woke_at >= deadline);
    }

    #[tokio::test]
    async fn test_manual_clock_past_deadline_returns_immediately() {
        let clock = ManualClock::new(at(2024, 3, 2, 0, 0));
        clock.sleep_until(at(2024, 3, 1, 23, 59)).await;
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
