use crate::record::Level;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// `host:port`. An empty host means all interfaces.
    pub listen: String,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub envelope: EnvelopeConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", DEFAULT_PORT),
            output: OutputConfig::default(),
            batch: BatchConfig::default(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only log file. Console when unset.
    pub path: Option<PathBuf>,
    #[serde(with = "level_format")]
    pub min_level: Level,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            min_level: Level::INFO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records held before a flush. 0 writes every record as it arrives.
    pub capacity: usize,
    #[serde(with = "optional_level_format")]
    pub flush_level: Option<Level>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Reject datagrams whose length header disagrees with the body.
    pub strict_length: bool,
}

/// Levels are written as band names where possible and read from either a
/// name or a bare integer.
mod level_format {
    use crate::record::Level;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum RawLevel {
        Number(i32),
        Name(String),
    }

    impl RawLevel {
        pub(super) fn into_level<E: serde::de::Error>(self) -> Result<Level, E> {
            match self {
                RawLevel::Number(n) => Ok(Level(n)),
                RawLevel::Name(name) => name.parse().map_err(E::custom),
            }
        }
    }

    pub(super) fn to_yaml_string(level: Level) -> Option<String> {
        let severity = level.severity();
        (severity.level() == level).then(|| severity.name().to_ascii_lowercase())
    }

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match to_yaml_string(*level) {
            Some(name) => serializer.serialize_str(&name),
            None => level.0.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawLevel::deserialize(deserializer)?.into_level()
    }
}

mod optional_level_format {
    use super::level_format::RawLevel;
    use crate::record::Level;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(level: &Option<Level>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match level {
            Some(level) => super::level_format::serialize(level, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawLevel>::deserialize(deserializer)?
            .map(RawLevel::into_level)
            .transpose()
    }
}
