use crate::config::{load_or_default, ConfigOverrides};
use crate::receiver::ReceiverRunner;
use std::path::PathBuf;
use tracing::info;

/// `clusterlog receive`: load config, apply flag overrides, receive until
/// a termination signal.
pub async fn run(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    match &config_path {
        Some(path) => info!(config_path = %path.display(), "Loading configuration"),
        None => info!("No config file found, using defaults"),
    }

    let config = load_or_default(config_path.as_deref())?;
    let config = overrides.apply(config)?;
    info!(
        listen = %config.listen,
        min_level = %config.output.min_level,
        batch_capacity = config.batch.capacity,
        "Configuration resolved"
    );

    let summary = ReceiverRunner::new(config).run().await?;
    info!(
        received = summary.listener.received,
        written = summary.sink.flushed,
        "Exiting"
    );
    Ok(())
}
