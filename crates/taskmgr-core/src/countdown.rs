use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::datetime::local_midnight;
use crate::task::{Task, TaskId};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Pending,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub state: CountdownState,
    pub text: String,
    /// Deadline minus now, in milliseconds.
    pub delta_millis: i64,
}

impl Countdown {
    pub fn is_overdue(&self) -> bool {
        self.state == CountdownState::Overdue
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Remaining or overdue time until local midnight of `due_date`.
///
/// Returns `None` when there is nothing to show: no due date, or the task
/// is completed. A deadline exactly at `now` is still pending.
pub fn compute_remaining<Z: TimeZone>(
    due_date: Option<NaiveDate>,
    completed: bool,
    now: &DateTime<Z>,
) -> Option<Countdown> {
    if completed {
        return None;
    }
    let due = due_date?;
    let deadline = local_midnight(due, &now.timezone());
    Some(countdown_from_delta(
        deadline.timestamp_millis() - now.timestamp_millis(),
    ))
}

pub fn countdown_from_delta(delta_millis: i64) -> Countdown {
    if delta_millis < 0 {
        let overdue = delta_millis.unsigned_abs();
        let days = overdue / DAY_MS as u64;
        let hours = (overdue % DAY_MS as u64) / HOUR_MS as u64;
        let text = if days > 0 {
            format!("{days}d {hours}h overdue")
        } else {
            let minutes = (overdue % HOUR_MS as u64) / MINUTE_MS as u64;
            format!("{hours}h {minutes}m overdue")
        };
        return Countdown {
            state: CountdownState::Overdue,
            text,
            delta_millis,
        };
    }

    let days = delta_millis / DAY_MS;
    let hours = (delta_millis % DAY_MS) / HOUR_MS;
    let minutes = (delta_millis % HOUR_MS) / MINUTE_MS;
    let seconds = (delta_millis % MINUTE_MS) / SECOND_MS;

    let text = if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    };

    Countdown {
        state: CountdownState::Pending,
        text,
        delta_millis,
    }
}

/// One ticking countdown per watched task.
///
/// Each ticker is a task on the given tokio runtime that re-evaluates
/// [`compute_remaining`] every tick and hands the result to a callback.
/// Watching an id again replaces its ticker; cancelling or dropping the
/// scheduler aborts tickers immediately.
pub struct CountdownScheduler<Z: TimeZone> {
    runtime: Handle,
    zone: Z,
    clock: Arc<dyn Clock>,
    tick: Duration,
    tickers: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl<Z> CountdownScheduler<Z>
where
    Z: TimeZone + Send + Sync + 'static,
{
    pub fn new(runtime: Handle, zone: Z, clock: Arc<dyn Clock>) -> Self {
        Self {
            runtime,
            zone,
            clock,
            tick: DEFAULT_TICK,
            tickers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        if tick.is_zero() {
            debug!("ignoring zero countdown tick");
        } else {
            self.tick = tick;
        }
        self
    }

    /// Starts (or restarts) the countdown for `task_id`.
    ///
    /// With no due date, or a completed task, any running ticker is
    /// released and `on_tick` receives a single `None`.
    pub fn watch<F>(
        &self,
        task_id: &TaskId,
        due_date: Option<NaiveDate>,
        completed: bool,
        mut on_tick: F,
    ) where
        F: FnMut(Option<Countdown>) + Send + 'static,
    {
        self.cancel(task_id);

        let Some(due) = due_date.filter(|_| !completed) else {
            debug!(task = %task_id, completed, "countdown not needed");
            on_tick(None);
            return;
        };

        let zone = self.zone.clone();
        let clock = Arc::clone(&self.clock);
        let tick = self.tick;
        let id = task_id.clone();

        let handle = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let countdown = evaluate(&zone, clock.as_ref(), due);
                trace!(task = %id, countdown = ?countdown, "countdown tick");
                on_tick(countdown);
            }
        });

        debug!(task = %task_id, due = %due, "countdown started");
        self.tickers.lock().insert(task_id.clone(), handle);
    }

    pub fn watch_task<F>(&self, task: &Task, on_tick: F)
    where
        F: FnMut(Option<Countdown>) + Send + 'static,
    {
        self.watch(&task.id, task.due_date, task.completed, on_tick);
    }

    /// Releases the ticker for `task_id`. Returns whether one was running.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        match self.tickers.lock().remove(task_id) {
            Some(handle) => {
                handle.abort();
                debug!(task = %task_id, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let mut tickers = self.tickers.lock();
        for (_, handle) in tickers.drain() {
            handle.abort();
        }
    }

    pub fn is_watching(&self, task_id: &TaskId) -> bool {
        self.tickers
            .lock()
            .get(task_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.tickers
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl<Z: TimeZone> Drop for CountdownScheduler<Z> {
    fn drop(&mut self) {
        for (_, handle) in self.tickers.get_mut().drain() {
            handle.abort();
        }
    }
}

fn evaluate<Z: TimeZone>(zone: &Z, clock: &dyn Clock, due: NaiveDate) -> Option<Countdown> {
    let now = clock.now().with_timezone(zone);
    compute_remaining(Some(due), false, &now)
}
