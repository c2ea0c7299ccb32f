//! Ship log: the accumulated text recorded with every ship
//!
//! Each message is emitted as a `tracing` event and appended, timestamped,
//! to an in-memory record. The record is what gets written to the ship's
//! ConfigMap, so a cancelled or crashed run still leaves its log behind.

use chrono::{SecondsFormat, Utc};
use console::style;
use std::sync::{Arc, Mutex, PoisonError};

/// Target of the events carrying section headers
pub const HEADER_TARGET: &str = "loftsman::header";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Log of a single ship or avast run
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct ShipLog {
    record: Arc<Mutex<String>>,
    console: bool,
}

impl ShipLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print headers, styled, to stderr. Header events are still
    /// emitted under [`HEADER_TARGET`].
    pub fn with_console(mut self) -> Self {
        self.console = true;
        self
    }

    fn append(&self, level: Level, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        record.push_str(&format!("{} {} {}\n", timestamp, level.label(), message));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref().trim_end();
        if message.trim().is_empty() {
            return;
        }
        tracing::info!("{}", message);
        self.append(Level::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref().trim_end();
        if message.trim().is_empty() {
            return;
        }
        tracing::warn!("{}", message);
        self.append(Level::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        let message = message.as_ref().trim_end();
        if message.trim().is_empty() {
            return;
        }
        tracing::error!("{}", message);
        self.append(Level::Error, message);
    }

    /// Opening header of a run
    pub fn header(&self, text: &str) {
        self.banner(text, Level::Info, |t| style(t).bold().cyan().to_string());
    }

    /// Header of one step inside a run, such as a single chart
    pub fn sub_header(&self, text: &str) {
        self.banner(text, Level::Info, |t| style(t).bold().to_string());
    }

    /// Closing header, announcing failures
    pub fn closing_header(&self, text: &str) {
        self.banner(text, Level::Error, |t| style(t).bold().red().to_string());
    }

    fn banner(&self, text: &str, level: Level, styled: impl Fn(&str) -> String) {
        if level == Level::Error {
            tracing::error!(target: HEADER_TARGET, "{}", text);
        } else {
            tracing::info!(target: HEADER_TARGET, "{}", text);
        }
        if self.console {
            let rule = "-".repeat(text.chars().count());
            eprintln!();
            eprintln!("{}", styled(text));
            eprintln!("{}", style(&rule).dim());
        }
        self.append(level, text);
    }

    /// Everything logged so far
    pub fn record(&self) -> String {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
