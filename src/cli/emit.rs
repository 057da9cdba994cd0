use crate::client::{ClusterLogger, Emitter};
use crate::record::Level;
use std::time::Duration;

/// `clusterlog emit`: send a short burst of trace/debug/info records at a
/// fixed cadence, for checking a receiver end to end.
pub async fn emit(
    loghost: Option<String>,
    threshold: Level,
    count: Option<u64>,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let emitter = loghost.as_deref().map(Emitter::connect).transpose()?;
    let logger = ClusterLogger::new("clusterlog.sample", threshold, emitter);

    logger.info(format!("start {}", loghost.as_deref().unwrap_or("(console)")));

    let mut step = 0u64;
    while count.map_or(true, |n| step < n) {
        logger.log(Level::ALL, format!("trace {}", step));
        logger.debug(format!("debug {}", step));
        logger.info(format!("info {}", step));
        step += 1;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    logger.info("finish");
    Ok(())
}
