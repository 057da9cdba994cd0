use crate::record::{Level, LogRecord};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator between the fields of a rendered line.
pub const FIELD_DELIMITER: char = ':';

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to open output file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    #[error("output already closed")]
    Closed,
}

/// Downstream of the batching sink.
pub trait RecordTarget: Send {
    fn write(&mut self, record: &LogRecord) -> Result<(), OutputError>;

    /// Release the underlying resource. Must tolerate repeated calls.
    fn close(&mut self) -> Result<(), OutputError>;
}

enum Destination {
    File(BufWriter<File>),
    Console(io::Stdout),
}

/// Renders records as single lines and appends them to a file or stdout,
/// dropping anything below the configured minimum level.
pub struct OutputWriter {
    destination: Option<Destination>,
    min_level: Level,
}

impl OutputWriter {
    /// Opens `path` for appending and keeps it open until [`close`](RecordTarget::close).
    pub fn file(path: &Path, min_level: Level) -> Result<Self, OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OutputError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            destination: Some(Destination::File(BufWriter::new(file))),
            min_level,
        })
    }

    pub fn console(min_level: Level) -> Self {
        Self {
            destination: Some(Destination::Console(io::stdout())),
            min_level,
        }
    }

    /// Picks a file destination when a path is given, the console otherwise.
    pub fn open(path: Option<&Path>, min_level: Level) -> Result<Self, OutputError> {
        match path {
            Some(path) => Self::file(path, min_level),
            None => Ok(Self::console(min_level)),
        }
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn is_closed(&self) -> bool {
        self.destination.is_none()
    }
}

impl RecordTarget for OutputWriter {
    fn write(&mut self, record: &LogRecord) -> Result<(), OutputError> {
        if record.level < self.min_level {
            return Ok(());
        }

        let line = render_line(record);
        match self.destination.as_mut() {
            Some(Destination::File(file)) => {
                writeln!(file, "{}", line)?;
                // Flush per line so a crash later cannot lose what was written.
                file.flush()?;
            }
            Some(Destination::Console(stdout)) => {
                writeln!(stdout.lock(), "{}", line)?;
            }
            None => return Err(OutputError::Closed),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        match self.destination.take() {
            Some(Destination::File(mut file)) => file.flush()?,
            Some(Destination::Console(stdout)) => stdout.lock().flush()?,
            None => {}
        }
        Ok(())
    }
}

/// `timestamp:name:LEVEL:task id:message`
pub fn render_line(record: &LogRecord) -> String {
    let d = FIELD_DELIMITER;
    format!(
        "{ts}{d}{name}{d}{level}{d}{tid}{d}{msg}",
        ts = record.created_local().format(TIMESTAMP_FORMAT),
        name = record.name,
        level = record.level.severity(),
        tid = record.task_id().unwrap_or_default(),
        msg = record.msg,
    )
}
