//! Sending side of the wire format: how worker processes name themselves
//! and put records on the network.

use crate::config::parse_listen_addr;
use crate::receiver::decoder::HEADER_LEN;
use crate::receiver::output::render_line;
use crate::record::{Level, LogRecord};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use thiserror::Error;
use tracing::debug;

/// Joins the parts of a task id.
pub const TASK_ID_SEPARATOR: &str = "-";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("record body of {0} bytes does not fit the length header")]
    TooLarge(usize),

    #[error("invalid loghost: {0}")]
    LogHost(#[from] crate::config::ConfigError),

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

/// `[u32 big-endian body length][JSON body]`
pub fn encode_envelope(record: &LogRecord) -> Result<Vec<u8>, ClientError> {
    let body = serde_json::to_vec(record)?;
    let len = u32::try_from(body.len()).map_err(|_| ClientError::TooLarge(body.len()))?;

    let mut envelope = Vec::with_capacity(HEADER_LEN + body.len());
    envelope.extend_from_slice(&len.to_be_bytes());
    envelope.extend_from_slice(&body);
    Ok(envelope)
}

/// Task id for this process: short hostname, then the batch scheduler's job
/// id and array task id when present, joined with `-`.
pub fn task_id_from_env() -> String {
    task_id_from(
        |key| std::env::var(key).ok(),
        || {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string())
        },
    )
}

fn task_id_from(
    lookup: impl Fn(&str) -> Option<String>,
    system_hostname: impl FnOnce() -> String,
) -> String {
    let host = match lookup("HOSTNAME") {
        Some(full) => full.split('.').next().unwrap_or_default().to_string(),
        None => system_hostname(),
    };

    let mut parts = vec![host];
    parts.extend(lookup("JOB_ID"));
    parts.extend(lookup("SGE_TASK_ID"));
    parts.join(TASK_ID_SEPARATOR)
}

/// Fire-and-forget datagram sender.
pub struct Emitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Emitter {
    /// `loghost` is `host` or `host:port`; the port defaults to 5005.
    pub fn connect(loghost: &str) -> Result<Self, ClientError> {
        let target = parse_listen_addr(loghost)?;
        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, record: &LogRecord) -> Result<(), ClientError> {
        let envelope = encode_envelope(record)?;
        self.socket.send_to(&envelope, self.target)?;
        Ok(())
    }
}

/// A named logger stamped with this process's task id.
///
/// With an emitter, records go to the loghost and send failures are
/// swallowed (the transport is lossy anyway). Without one, records are
/// rendered to stderr in the receiver's line format.
pub struct ClusterLogger {
    name: String,
    task_id: String,
    threshold: Level,
    emitter: Option<Emitter>,
}

impl ClusterLogger {
    pub fn new(name: impl Into<String>, threshold: Level, emitter: Option<Emitter>) -> Self {
        Self {
            name: name.into(),
            task_id: task_id_from_env(),
            threshold,
            emitter,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn log(&self, level: Level, msg: impl Into<String>) {
        if level < self.threshold {
            return;
        }
        let record = LogRecord::new(&self.name, level, msg).with_task_id(&self.task_id);
        match &self.emitter {
            Some(emitter) => {
                if let Err(e) = emitter.send(&record) {
                    debug!(target_addr = %emitter.target(), error = %e, "Dropped log datagram");
                }
            }
            None => eprintln!("{}", render_line(&record)),
        }
    }

    pub fn trace(&self, msg: impl Into<String>) {
        self.log(Level::TRACE, msg)
    }

    pub fn debug(&self, msg: impl Into<String>) {
        self.log(Level::DEBUG, msg)
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.log(Level::INFO, msg)
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.log(Level::WARNING, msg)
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.log(Level::ERROR, msg)
    }
}
