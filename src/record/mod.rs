use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Metadata key carrying the emitter's host/job/task identity.
pub const TASK_ID_KEY: &str = "tid";

/// Raw integer severity as it travels on the wire. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const TRACE: Level = Level(5);
    pub const DEBUG: Level = Level(10);
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);

    /// Lowest threshold that still admits everything that was explicitly set.
    /// Zero means "not set", so trace verbosity opens the filter at 1.
    pub const ALL: Level = Level(1);

    /// The named band this level falls into.
    pub fn severity(self) -> Severity {
        Severity::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| self >= s.level())
            .unwrap_or(Severity::Trace)
    }
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    /// Accepts a severity name (`info`, `WARN`, ...) or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.trim().parse::<i32>() {
            return Ok(Level(n));
        }
        s.parse::<Severity>().map(Level::from)
    }
}

/// Well-known severity bands, including a trace band below debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn level(self) -> Level {
        match self {
            Severity::Trace => Level::TRACE,
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warning => Level::WARNING,
            Severity::Error => Level::ERROR,
            Severity::Critical => Level::CRITICAL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown severity '{0}'")]
pub struct LevelParseError(pub String);

impl FromStr for Severity {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            _ => Err(LevelParseError(s.to_string())),
        }
    }
}

/// A structured log event as emitted by a client.
///
/// `created` is assigned by the client at emission (seconds since the epoch),
/// never by the receiver. Any wire attribute beyond the four required fields
/// lands in `metadata`, which is where the task id lives.
///
/// `levelno` and `message` stand in for a missing `level` or `msg`. They are
/// kept in `metadata` either way, so a client that sends both is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord")]
pub struct LogRecord {
    pub name: String,
    pub level: Level,
    pub msg: String,
    pub created: f64,
    #[serde(flatten)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct WireRecord {
    name: String,
    level: Option<Level>,
    msg: Option<String>,
    created: f64,
    #[serde(flatten)]
    metadata: HashMap<String, Value>,
}

#[derive(Debug, Error)]
#[error("missing field `{0}`")]
pub struct MissingField(&'static str);

impl TryFrom<WireRecord> for LogRecord {
    type Error = MissingField;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        let level = match wire.level {
            Some(level) => level,
            None => wire
                .metadata
                .get("levelno")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok())
                .map(Level)
                .ok_or(MissingField("level"))?,
        };
        let msg = match wire.msg {
            Some(msg) => msg,
            None => wire
                .metadata
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(MissingField("msg"))?,
        };
        Ok(Self {
            name: wire.name,
            level,
            msg,
            created: wire.created,
            metadata: wire.metadata,
        })
    }
}

impl LogRecord {
    pub fn new(name: impl Into<String>, level: Level, msg: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            level,
            msg: msg.into(),
            created: now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6,
            metadata: HashMap::new(),
        }
    }

    pub fn with_task_id(mut self, tid: impl Into<String>) -> Self {
        self.metadata
            .insert(TASK_ID_KEY.to_string(), Value::String(tid.into()));
        self
    }

    pub fn with_created(mut self, created: f64) -> Self {
        self.created = created;
        self
    }

    pub fn task_id(&self) -> Option<&str> {
        self.metadata.get(TASK_ID_KEY).and_then(Value::as_str)
    }

    /// Creation time in local time. Out-of-range values clamp to the epoch.
    pub fn created_local(&self) -> DateTime<Local> {
        let secs = self.created.floor();
        let nanos = ((self.created - secs) * 1e9) as u32;
        Utc.timestamp_opt(secs as i64, nanos.min(999_999_999))
            .single()
            .unwrap_or_default()
            .with_timezone(&Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bands() {
        assert_eq!(Level(1).severity(), Severity::Trace);
        assert_eq!(Level(5).severity(), Severity::Trace);
        assert_eq!(Level(10).severity(), Severity::Debug);
        assert_eq!(Level(25).severity(), Severity::Info);
        assert_eq!(Level(30).severity(), Severity::Warning);
        assert_eq!(Level(45).severity(), Severity::Error);
        assert_eq!(Level(90).severity(), Severity::Critical);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::INFO);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::WARNING);
        assert_eq!("7".parse::<Level>().unwrap(), Level(7));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_severity_ordering_matches_levels() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].level() < pair[1].level());
        }
    }

    #[test]
    fn test_task_id_accessor() {
        let record = LogRecord::new("a.b", Level::INFO, "hello").with_task_id("node1-42-3");
        assert_eq!(record.task_id(), Some("node1-42-3"));

        let bare = LogRecord::new("a.b", Level::INFO, "hello");
        assert_eq!(bare.task_id(), None);
    }

    #[test]
    fn test_created_local_keeps_millis() {
        let record = LogRecord::new("a", Level::INFO, "m").with_created(1_700_000_000.25);
        let ts = record.created_local();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }
}
