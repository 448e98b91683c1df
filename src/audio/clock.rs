use std::cell::Cell;
use std::time::Duration;

/// Monotonic time source used to estimate the audible playback position.
pub trait Clock {
    /// Time since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> Duration;
}

/// Clock advanced explicitly by its owner; drives offline rendering and tests.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
