//! Stopwatch for timing a contraction before it is recorded.
//!
//! The stopwatch moves between three states:
//!
//! - `Idle`: no session.
//! - `Running`: a session is active and a ticker refreshes the elapsed counter.
//! - `Stopped`: the session has ended and keeps its final duration until the
//!   next `start` or `reset`.
//!
//! Wall-clock time comes from a [`Clock`], so tests can drive it by hand.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::whole_seconds;

/// Source of wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Jump to an exact instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stopwatch state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopwatchStatus {
    /// No session.
    #[default]
    Idle,
    /// Session active.
    Running,
    /// Session ended, final duration retained.
    Stopped,
}

/// The result of stopping a running stopwatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSpan {
    /// When `start` was called.
    pub start: DateTime<Utc>,
    /// When `stop` was called.
    pub end: DateTime<Utc>,
    /// Whole seconds between the two.
    pub duration_seconds: i64,
}

#[derive(Debug, Default)]
struct Session {
    status: StopwatchStatus,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

/// Measures an in-progress contraction.
///
/// Only one ticker exists per stopwatch; it is aborted on `stop`, `reset`
/// and drop.
#[derive(Debug)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    session: Arc<Mutex<Session>>,
    elapsed: Arc<watch::Sender<u64>>,
    ticker: Option<JoinHandle<()>>,
}

impl Stopwatch {
    /// Create an idle stopwatch using the system clock.
    #[must_use]
    pub fn new(tick_interval: Duration) -> Self {
        Self::with_clock(Arc::new(SystemClock), tick_interval)
    }

    /// Create an idle stopwatch with a custom clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        let (elapsed, _) = watch::channel(0);
        Self {
            clock,
            tick_interval,
            session: Arc::new(Mutex::new(Session::default())),
            elapsed: Arc::new(elapsed),
            ticker: None,
        }
    }

    /// Begin a new session.
    ///
    /// Returns `false` and changes nothing if the stopwatch is already running.
    /// A stopped session is discarded.
    ///
    /// The elapsed counter ticks on the current Tokio runtime. Outside a
    /// runtime the session still runs but the counter only updates on `stop`.
    pub fn start(&mut self) -> bool {
        let start = {
            let mut session = lock(&self.session);
            if session.status == StopwatchStatus::Running {
                return false;
            }
            let start = self.clock.now();
            *session = Session {
                status: StopwatchStatus::Running,
                start: Some(start),
                end: None,
            };
            start
        };
        self.elapsed.send_replace(0);
        debug!("Stopwatch started at {}", start);

        let Ok(runtime) = Handle::try_current() else {
            debug!("No Tokio runtime, stopwatch runs without a ticker");
            return true;
        };

        let clock = Arc::clone(&self.clock);
        let session = Arc::clone(&self.session);
        let elapsed = Arc::clone(&self.elapsed);
        let tick_interval = self.tick_interval;

        self.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;
                let now = clock.now();
                let seconds = {
                    let session = lock(&session);
                    match (session.status, session.start) {
                        (StopwatchStatus::Running, Some(start)) => whole_seconds(start, now),
                        _ => break,
                    }
                };
                elapsed.send_if_modified(|current| {
                    let seconds = u64::try_from(seconds).unwrap_or(0);
                    let changed = *current != seconds;
                    *current = seconds;
                    changed
                });
            }
        }));
        true
    }

    /// End the running session.
    ///
    /// Returns `None` if the stopwatch was not running.
    pub fn stop(&mut self) -> Option<TimedSpan> {
        let span = {
            let mut session = lock(&self.session);
            if session.status != StopwatchStatus::Running {
                return None;
            }
            let start = session.start?;
            let end = self.clock.now();
            session.status = StopwatchStatus::Stopped;
            session.end = Some(end);
            TimedSpan {
                start,
                end,
                duration_seconds: whole_seconds(start, end),
            }
        };
        self.cancel_ticker();
        self.elapsed
            .send_replace(u64::try_from(span.duration_seconds).unwrap_or(0));
        debug!("Stopwatch stopped after {}s", span.duration_seconds);
        Some(span)
    }

    /// Return to `Idle`, discarding any session.
    pub fn reset(&mut self) {
        self.cancel_ticker();
        *lock(&self.session) = Session::default();
        self.elapsed.send_replace(0);
        debug!("Stopwatch reset");
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> StopwatchStatus {
        lock(&self.session).status
    }

    /// Check if a session is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == StopwatchStatus::Running
    }

    /// When the current session started.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        lock(&self.session).start
    }

    /// When the current session stopped.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        lock(&self.session).end
    }

    /// Whole seconds elapsed as of the last tick.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        *self.elapsed.borrow()
    }

    /// Elapsed time as `HH:MM:SS`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format_hms(self.elapsed_seconds())
    }

    /// Watch the elapsed counter change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.elapsed.subscribe()
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

/// Format seconds as zero-padded `HH:MM:SS`.
///
/// Hours are not capped; 100 hours prints as `100:00:00`.
#[must_use]
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Format a stored duration, which may be negative, as `[-]HH:MM:SS`.
#[must_use]
pub fn format_signed_hms(seconds: i64) -> String {
    let formatted = format_hms(seconds.unsigned_abs());
    if seconds < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
