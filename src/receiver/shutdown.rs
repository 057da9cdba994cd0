use crate::receiver::batching::{lock_sink, SharedSink};
use crate::receiver::output::RecordTarget;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => f.write_str("SIGINT"),
            ShutdownReason::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Turns a termination request into: stop receiving, flush, close.
///
/// The flush takes the same lock the listener takes for every accept, so it
/// can never observe a half-appended batch. Only the first call does any
/// work; later calls return `None`. A failure to close the output is logged
/// and does not turn shutdown into an error.
pub struct ShutdownCoordinator<T> {
    sink: SharedSink<T>,
    token: CancellationToken,
    started: AtomicBool,
}

impl<T: RecordTarget> ShutdownCoordinator<T> {
    pub fn new(sink: SharedSink<T>, token: CancellationToken) -> Self {
        Self {
            sink,
            token,
            started: AtomicBool::new(false),
        }
    }

    /// Token the listener loop watches.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Returns the number of buffered records flushed, or `None` if shutdown
    /// had already run.
    pub fn shutdown(&self) -> Option<usize> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already in progress, ignoring request");
            return None;
        }

        self.token.cancel();

        let mut sink = lock_sink(&self.sink);
        let drained = sink.flush();
        if let Err(e) = sink.close() {
            error!(error = %e, "Failed to close output");
        }
        let stats = sink.stats();
        info!(
            drained,
            accepted = stats.accepted,
            flushed = stats.flushed,
            "Flushed buffered records and closed output"
        );
        Some(drained)
    }
}

/// Handlers for SIGINT and SIGTERM, installed up front so a request that
/// arrives at any point after startup is caught rather than killing the
/// process with records still buffered.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination request.
    pub async fn recv(&mut self) -> ShutdownReason {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => ShutdownReason::Interrupt,
                _ = self.terminate.recv() => ShutdownReason::Terminate,
            }
        }
        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => ShutdownReason::Interrupt,
                Err(_) => std::future::pending().await,
            }
        }
    }
}
