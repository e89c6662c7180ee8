//! Single-slot debounce timer.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one pending value and one armed timer.
///
/// Arming cancels the previous timer outright. The expiry callback receives
/// the generation it was armed with; [`Debouncer::fire`] only yields the
/// pending value for the current generation, so an expiry that raced with a
/// newer edit is ignored.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
            timer: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the timer. `on_expiry` runs
    /// after the delay unless the timer is re-armed or cancelled first.
    pub fn arm<F>(&mut self, value: T, on_expiry: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.abort_timer();
        self.generation += 1;
        self.pending = Some(value);

        let generation = self.generation;
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry(generation);
        }));
    }

    /// Take the pending value if `generation` is the latest armed timer.
    pub fn fire(&mut self, generation: u64) -> Option<T> {
        if generation != self.generation {
            return None;
        }
        self.timer = None;
        self.pending.take()
    }

    /// Drop the pending value and stop the timer.
    pub fn cancel(&mut self) {
        self.abort_timer();
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
