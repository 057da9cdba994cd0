use crate::receiver::batching::{lock_sink, SharedSink};
use crate::receiver::decoder::Decoder;
use crate::receiver::output::RecordTarget;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest datagram read in one receive. Longer datagrams are truncated by
/// the kernel and then fail to decode.
pub const MAX_DATAGRAM_SIZE: usize = 8192;

const RECV_BACKOFF_START: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before the next receive after `failures` consecutive socket errors.
fn recv_backoff(failures: u32) -> Option<Duration> {
    if failures == 0 {
        return None;
    }
    let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
    Some(RECV_BACKOFF_START.saturating_mul(factor).min(RECV_BACKOFF_MAX))
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    pub decoded: u64,
    pub discarded: u64,
    pub recv_errors: u64,
}

/// Owns the bound datagram socket and runs the receive loop.
pub struct Listener {
    socket: UdpSocket,
    decoder: Decoder,
}

impl Listener {
    pub async fn bind(addr: SocketAddr, decoder: Decoder) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self { socket, decoder })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive until `shutdown` is cancelled or the sink stops accepting.
    ///
    /// Each datagram is decoded and handed to the sink under its lock. Bad
    /// datagrams are logged and skipped; nothing here ends the loop except
    /// shutdown.
    pub async fn run<T: RecordTarget>(
        &self,
        sink: SharedSink<T>,
        shutdown: CancellationToken,
    ) -> ListenerStats {
        let mut stats = ListenerStats::default();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut failures = 0u32;

        info!(addr = ?self.socket.local_addr().ok(), "Listening for log datagrams");

        loop {
            if let Some(delay) = recv_backoff(failures) {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let (len, peer) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        stats.recv_errors += 1;
                        failures = failures.saturating_add(1);
                        warn!(error = %e, failures, "Receive failed");
                        continue;
                    }
                },
            };
            failures = 0;
            stats.received += 1;

            match self.decoder.decode(&buf[..len]) {
                Ok(record) => {
                    debug!(peer = %peer, logger = %record.name, level = %record.level, "Decoded record");
                    stats.decoded += 1;
                    if !lock_sink(&sink).accept(record) {
                        // Shutdown closed the sink between our receive and accept.
                        break;
                    }
                }
                Err(e) => {
                    stats.discarded += 1;
                    warn!(peer = %peer, bytes = len, error = %e, "Record could not be decoded, discarding datagram");
                }
            }
        }

        info!(
            received = stats.received,
            decoded = stats.decoded,
            discarded = stats.discarded,
            recv_errors = stats.recv_errors,
            "Listener stopped"
        );
        stats
    }
}
