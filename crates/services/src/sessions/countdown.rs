use std::sync::Mutex;
use std::time::Duration;

use certprep_core::session::TimerId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

const TICK: Duration = Duration::from_secs(1);

/// Owns the one ticking task of a session. Starting a countdown aborts the previous one.
#[derive(Debug, Default)]
pub(crate) struct CountdownDriver {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownDriver {
    /// Calls `on_tick` once per second until it returns false or the countdown is replaced.
    pub(crate) fn start<F>(&self, timer: TimerId, on_tick: F)
    where
        F: Fn(TimerId) -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !on_tick(timer) {
                    break;
                }
            }
        });
        if let Some(previous) = self.replace(Some(handle)) {
            previous.abort();
        }
    }

    pub(crate) fn stop(&self) {
        if let Some(previous) = self.replace(None) {
            previous.abort();
        }
    }

    fn replace(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.task.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }
}

impl Drop for CountdownDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
