use log::Level;
use std::fmt::Display;

/// Logger scoped to one component. Built once by whoever wires the
/// collaborators together and handed to each of them; the component name
/// becomes the `log` target so `RUST_LOG=Archiver=debug` works.
#[derive(Debug, Clone)]
pub struct ComponentLogger {
    component: String,
}

impl ComponentLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Child logger, e.g. `Daemon` -> `Daemon.ipc`.
    pub fn scoped(&self, sub: &str) -> Self {
        Self::new(format!("{}.{}", self.component, sub))
    }

    pub fn debug(&self, msg: &str, meta: &[(&str, &dyn Display)]) {
        self.log(Level::Debug, msg, meta);
    }

    pub fn info(&self, msg: &str, meta: &[(&str, &dyn Display)]) {
        self.log(Level::Info, msg, meta);
    }

    pub fn warn(&self, msg: &str, meta: &[(&str, &dyn Display)]) {
        self.log(Level::Warn, msg, meta);
    }

    pub fn error(&self, msg: &str, meta: &[(&str, &dyn Display)]) {
        self.log(Level::Error, msg, meta);
    }

    fn log(&self, level: Level, msg: &str, meta: &[(&str, &dyn Display)]) {
        if !log::log_enabled!(target: self.component.as_str(), level) {
            return;
        }
        let line = format_line(msg, meta);
        log::log!(target: self.component.as_str(), level, "{line}");
    }
}

fn format_line(msg: &str, meta: &[(&str, &dyn Display)]) -> String {
    let mut out = msg.to_string();
    for (k, v) in meta {
        out.push(' ');
        out.push_str(k);
        out.push('=');
        out.push_str(&v.to_string());
    }
    out
}

/// Install env_logger with `info` as the default filter.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
