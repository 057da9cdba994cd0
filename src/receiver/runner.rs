use crate::config::{parse_listen_addr, ConfigError, ReceiverConfig};
use crate::receiver::batching::{lock_sink, BatchingSink, SharedSink, SinkStats};
use crate::receiver::decoder::Decoder;
use crate::receiver::listener::{Listener, ListenerError, ListenerStats};
use crate::receiver::output::{OutputError, OutputWriter};
use crate::receiver::shutdown::{ShutdownCoordinator, ShutdownReason, TerminationSignals};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverSummary {
    pub reason: Option<ShutdownReason>,
    pub listener: ListenerStats,
    pub sink: SinkStats,
}

pub struct ReceiverRunner {
    config: ReceiverConfig,
}

impl ReceiverRunner {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    /// Receive until SIGINT or SIGTERM, then flush and close.
    pub async fn run(self) -> Result<ReceiverSummary, ReceiverError> {
        // Installed before binding so an early request is still handled by us.
        let mut signals = TerminationSignals::install().map_err(ReceiverError::Signal)?;

        let running = self.start().await?;
        info!("Receiver running, send SIGINT or SIGTERM to stop");

        let reason = signals.recv().await;
        info!(signal = %reason, "Termination requested");
        running.shutdown(Some(reason)).await
    }

    /// Bind, open the output and start the listener loop in the background.
    pub async fn start(self) -> Result<RunningReceiver, ReceiverError> {
        let config = self.config;
        let addr = parse_listen_addr(&config.listen)?;

        let listener = match Listener::bind(addr, Decoder::new(config.envelope.strict_length)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, "Could not open network connection to listen");
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind { addr, source })?;

        let writer = OutputWriter::open(config.output.path.as_deref(), config.output.min_level)?;
        match &config.output.path {
            Some(path) => info!(path = %path.display(), min_level = %config.output.min_level, "Writing records to file"),
            None => info!(min_level = %config.output.min_level, "Writing records to console"),
        }

        if config.batch.capacity > 0 {
            info!(capacity = config.batch.capacity, "Handling records in batches");
        }
        let sink = BatchingSink::new(config.batch.capacity, writer)
            .with_flush_level(config.batch.flush_level)
            .into_shared();

        let coordinator = Arc::new(ShutdownCoordinator::new(
            sink.clone(),
            CancellationToken::new(),
        ));

        let token = coordinator.token();
        let loop_sink = sink.clone();
        let handle = tokio::spawn(async move { listener.run(loop_sink, token).await });

        Ok(RunningReceiver {
            local_addr,
            sink,
            coordinator,
            handle,
        })
    }
}

/// A receiver between startup and shutdown.
pub struct RunningReceiver {
    local_addr: SocketAddr,
    sink: SharedSink<OutputWriter>,
    coordinator: Arc<ShutdownCoordinator<OutputWriter>>,
    handle: JoinHandle<ListenerStats>,
}

impl RunningReceiver {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn coordinator(&self) -> Arc<ShutdownCoordinator<OutputWriter>> {
        Arc::clone(&self.coordinator)
    }

    pub fn pending(&self) -> usize {
        lock_sink(&self.sink).len()
    }

    /// Flush and close, then wait for the listener loop to wind down.
    pub async fn shutdown(
        self,
        reason: Option<ShutdownReason>,
    ) -> Result<ReceiverSummary, ReceiverError> {
        if self.coordinator.shutdown().is_none() {
            warn!("Shutdown had already been performed");
        }

        let listener = self.handle.await?;
        let sink = lock_sink(&self.sink).stats();
        info!(
            accepted = sink.accepted,
            flushed = sink.flushed,
            discarded = listener.discarded,
            "Receiver shut down"
        );

        Ok(ReceiverSummary {
            reason,
            listener,
            sink,
        })
    }
}
