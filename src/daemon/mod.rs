pub mod timer;

use anyhow::Result;
use std::path::PathBuf;
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::archive::Archiver;
use crate::ipc::{Request, Response};
use crate::logging::ComponentLogger;

use crate::daemon::timer::RecurringTimer;

pub const ALARM_NAME: &str = "autoArchive";
pub const STATUS_COMPLETE: &str = "Archiving complete";

pub struct DaemonConfig {
    pub interval: Duration,
    pub socket_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Requested,
    AwaitingWorkflow,
    Responded,
}

/// One manual "archive now" exchange. Always ends in `Responded`.
pub struct ManualTrigger {
    state: TriggerState,
    log: ComponentLogger,
}

impl ManualTrigger {
    pub fn new(log: ComponentLogger) -> Self {
        Self {
            state: TriggerState::Idle,
            log,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    fn advance(&mut self, next: TriggerState) {
        self.log.debug(
            "Manual trigger transition",
            &[("from", &format!("{:?}", self.state)), ("to", &format!("{next:?}"))],
        );
        self.state = next;
    }

    pub fn handle(&mut self, archiver: &Archiver, req: Request) -> Response {
        self.advance(TriggerState::Requested);
        let resp = match req {
            Request::Ping => Response::new("pong", 0),
            Request::ArchiveNow => {
                self.advance(TriggerState::AwaitingWorkflow);
                match archiver.run_pass() {
                    Ok(outcome) => Response::new(STATUS_COMPLETE, outcome.count()),
                    Err(e) => {
                        self.log.error("Archive pass failed", &[("error", &e)]);
                        Response::new(format!("Archiving failed: {e}"), 0)
                    }
                }
            }
        };
        self.advance(TriggerState::Responded);
        self.log.info(
            "Replying to manual trigger",
            &[("status", &resp.status), ("count", &resp.count)],
        );
        resp
    }
}

/// Timer-driven pass. The result is dropped; errors only get logged.
fn fire_and_forget(archiver: &Arc<Archiver>, log: &ComponentLogger) -> JoinHandle<()> {
    let archiver = archiver.clone();
    let log = log.clone();
    thread::spawn(move || {
        if let Err(e) = archiver.run_pass() {
            log.error("Scheduled archive pass failed", &[("error", &e)]);
        }
    })
}

/// Drive `timer` until `running` goes false, starting a background pass on
/// every fire. Passes still in flight at shutdown are joined before returning.
/// Returns the number of fires.
pub fn run_scheduled(
    archiver: &Arc<Archiver>,
    timer: &RecurringTimer,
    running: &AtomicBool,
    log: &ComponentLogger,
) -> u64 {
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let fires = timer.run(running, || {
        log.info("Alarm fired", &[("alarm", &timer.name())]);
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(fire_and_forget(archiver, log));
    });

    for handle in in_flight {
        if handle.join().is_err() {
            log.error("Scheduled archive pass panicked", &[]);
        }
    }
    fires
}

/// Run until Ctrl-C: the `autoArchive` timer plus the manual trigger socket.
///
/// Timer and manual passes are not serialized against each other; when they
/// overlap, whichever pass writes storage last wins.
pub fn run_daemon(archiver: Arc<Archiver>, cfg: DaemonConfig, log: ComponentLogger) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    serve_manual_triggers(archiver.clone(), &cfg, &log)?;

    let timer = RecurringTimer::new(ALARM_NAME, cfg.interval);
    log.info(
        "Scheduled auto-archiving",
        &[("alarm", &timer.name()), ("periodSecs", &cfg.interval.as_secs())],
    );
    run_scheduled(&archiver, &timer, &running, &log);

    log.info("Shutting down", &[]);
    let _ = std::fs::remove_file(&cfg.socket_path);
    Ok(())
}

#[cfg(unix)]
fn serve_manual_triggers(archiver: Arc<Archiver>, cfg: &DaemonConfig, log: &ComponentLogger) -> Result<()> {
    let listener = crate::ipc::bind(&cfg.socket_path)?;
    log.info(
        "Listening for manual triggers",
        &[("socket", &cfg.socket_path.display())],
    );
    let ipc_log = log.scoped("ipc");
    thread::spawn(move || {
        let trigger_log = ipc_log.clone();
        let handler = move |req: Request| ManualTrigger::new(trigger_log.clone()).handle(&archiver, req);
        if let Err(e) = crate::ipc::serve(listener, handler, ipc_log.clone()) {
            ipc_log.error("IPC server stopped", &[("error", &e)]);
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn serve_manual_triggers(_archiver: Arc<Archiver>, _cfg: &DaemonConfig, log: &ComponentLogger) -> Result<()> {
    log.warn("Manual triggers are not supported on this platform", &[]);
    Ok(())
}
