use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL_SLICE: Duration = Duration::from_millis(250);

/// Named recurring timer. First fire is one full period after `run` starts.
pub struct RecurringTimer {
    name: String,
    period: Duration,
}

impl RecurringTimer {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call `on_fire` every period until `running` goes false.
    /// Returns the number of fires.
    ///
    /// A period too large to represent as an `Instant` never fires.
    pub fn run(&self, running: &AtomicBool, mut on_fire: impl FnMut()) -> u64 {
        let mut fires = 0;
        let mut next = Instant::now().checked_add(self.period);

        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            match next {
                Some(due) if now >= due => {
                    on_fire();
                    fires += 1;
                    // a fire that overran the period does not queue up extra ones
                    next = due
                        .checked_add(self.period)
                        .filter(|n| *n > Instant::now())
                        .or_else(|| Instant::now().checked_add(self.period));
                }
                Some(due) => thread::sleep((due - now).min(POLL_SLICE)),
                None => thread::sleep(POLL_SLICE),
            }
        }
        fires
    }
}
