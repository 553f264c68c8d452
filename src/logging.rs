use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Severity levels for diagnostics lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-line diagnostics recorder. Once-only keys cover the per-page-load
/// probes (game-id resolution source, rewarded SDK probe) that must not spam
/// the log when flows restart.
#[derive(Debug, Clone)]
pub struct DiagnosticsLog {
    min_level: LogLevel,
    lines: Vec<String>,
    once_keys: BTreeSet<String>,
}

impl Default for DiagnosticsLog {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            lines: Vec::new(),
            once_keys: BTreeSet::new(),
        }
    }
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> LogLevel {
        self.min_level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Emits one JSON line with the given message and string fields.
    pub fn log(&mut self, level: LogLevel, message: &str, fields: &[(&str, &str)]) {
        if level < self.min_level {
            return;
        }
        let mut map = Map::new();
        map.insert("level".into(), Value::String(level.as_str().into()));
        map.insert("message".into(), Value::String(message.into()));
        for (key, value) in fields {
            map.insert((*key).into(), Value::String((*value).into()));
        }
        self.lines.push(Value::Object(map).to_string());
    }

    /// Emits the line only the first time `key` is seen. Returns whether the
    /// line was written.
    pub fn log_once(
        &mut self,
        key: &str,
        level: LogLevel,
        message: &str,
        fields: &[(&str, &str)],
    ) -> bool {
        if !self.once_keys.insert(key.to_string()) {
            return false;
        }
        self.log(level, message, fields);
        true
    }

    /// Recorded lines, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
