//! Cancellable periodic background task
//!
//! A `Ticker` owns exactly one spawned task. Dropping or cancelling the
//! ticker aborts the task, so storing it in an `Option` slot and replacing
//! the slot never leaves two live ticks behind.

use crate::{Result, SmartSoundError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

pub struct Ticker {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn `on_tick` every `period`, first firing one full period from now.
    ///
    /// The task stops on its own once `on_tick` returns `false`. A zero
    /// `period` is rejected with `ConfigError`.
    pub fn spawn<F>(name: &'static str, period: Duration, mut on_tick: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if period.is_zero() {
            return Err(SmartSoundError::ConfigError(format!(
                "{name}: tick period must be greater than zero"
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|e| SmartSoundError::RuntimeUnavailable(format!("{name}: {e}")))?;

        let handle = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick() {
                    debug!(ticker = name, "Ticker finished");
                    break;
                }
            }
        });

        debug!(ticker = name, period_ms = period.as_millis() as u64, "Ticker started");
        Ok(Self { name, handle })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        // Drop aborts
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(ticker = self.name, "Ticker cancelled");
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("name", &self.name)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
