use anyhow::{Result, anyhow};
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::message::MessageRef;
use crate::logging::ComponentLogger;
use crate::store::repo::{KeyValueStore, save_archived};

pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(1000);

/// The constant stand-in result. Same value on every failed pass.
pub fn fallback_record() -> Vec<MessageRef> {
    vec![
        MessageRef::new("email_1").with_subject("Mock Email 1"),
        MessageRef::new("email_2").with_subject("Mock Email 2"),
    ]
}

/// Best-effort with static degraded response: when the live list call fails,
/// answer with `fallback_record()` right away and write the same record to
/// storage after `delay`.
#[derive(Debug, Clone)]
pub struct DegradedResponse {
    pub delay: Duration,
}

impl Default for DegradedResponse {
    fn default() -> Self {
        Self {
            delay: DEFAULT_FALLBACK_DELAY,
        }
    }
}

impl DegradedResponse {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn respond(&self, store: Arc<dyn KeyValueStore>, log: &ComponentLogger) -> (Vec<MessageRef>, DeferredWrite) {
        let record = fallback_record();
        let to_store = record.clone();
        let delay = self.delay;
        let log = log.clone();

        let handle = thread::spawn(move || {
            thread::sleep(delay);
            match save_archived(store.as_ref(), &to_store) {
                Ok(()) => log.info("Mock archive complete", &[("count", &to_store.len())]),
                Err(e) => log.error("Deferred fallback write failed", &[("error", &e)]),
            }
        });

        (record, DeferredWrite { handle })
    }
}

/// Delayed storage write scheduled by the degraded path. Dropping it leaves
/// the write running; there is no way to cancel it.
pub struct DeferredWrite {
    handle: JoinHandle<()>,
}

impl DeferredWrite {
    /// Block until the write has happened (or failed and been logged).
    /// A panic on the writer thread comes back as an error.
    pub fn wait(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|p| anyhow!("deferred fallback write panicked: {}", panic_message(p.as_ref())))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for DeferredWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredWrite")
            .field("finished", &self.is_finished())
            .finish()
    }
}
