use clusterlog::client::encode_envelope;
use clusterlog::config::ReceiverConfig;
use clusterlog::receiver::runner::RunningReceiver;
use clusterlog::receiver::{ReceiverError, ReceiverRunner};
use clusterlog::{Level, LogRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UdpSocket;
use tokio::time::sleep;

fn test_config(out: &Path, capacity: usize, min_level: Level) -> ReceiverConfig {
    let mut config = ReceiverConfig::default();
    config.listen = "127.0.0.1:0".to_string();
    config.output.path = Some(out.to_path_buf());
    config.output.min_level = min_level;
    config.batch.capacity = capacity;
    config
}

fn record(level: Level, msg: &str) -> LogRecord {
    LogRecord::new("cluster.worker", level, msg)
        .with_task_id("c401-102-88231-17")
        .with_created(1_769_594_400.5)
}

async fn send(receiver: &RunningReceiver, payloads: &[Vec<u8>]) {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for payload in payloads {
        client.send_to(payload, receiver.local_addr()).await.unwrap();
    }
}

fn lines(path: &PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..300 {
        if done() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_pass_through_writes_each_record() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 0, Level::INFO))
        .start()
        .await
        .unwrap();

    let payloads: Vec<Vec<u8>> = (0..3)
        .map(|i| encode_envelope(&record(Level::INFO, &format!("info {}", i))).unwrap())
        .collect();
    send(&receiver, &payloads).await;

    wait_until(|| lines(&out).len() == 3).await;
    assert_eq!(receiver.pending(), 0);

    let summary = receiver.shutdown(None).await.unwrap();
    assert_eq!(summary.sink.accepted, 3);

    let written = lines(&out);
    for (i, line) in written.iter().enumerate() {
        assert!(
            line.ends_with(&format!(":cluster.worker:INFO:c401-102-88231-17:info {}", i)),
            "unexpected line {}",
            line
        );
    }
}

#[tokio::test]
async fn test_shutdown_flushes_partial_batch() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 5, Level::INFO))
        .start()
        .await
        .unwrap();

    let payloads: Vec<Vec<u8>> = (0..3)
        .map(|i| encode_envelope(&record(Level::INFO, &format!("held {}", i))).unwrap())
        .collect();
    send(&receiver, &payloads).await;

    wait_until(|| receiver.pending() == 3).await;
    assert!(lines(&out).is_empty());

    let summary = receiver.shutdown(None).await.unwrap();
    assert_eq!(summary.sink.flushed, 3);
    assert_eq!(lines(&out).len(), 3);
    assert!(lines(&out)[2].ends_with(":held 2"));
}

#[tokio::test]
async fn test_threshold_flush_then_hold() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 2, Level::INFO))
        .start()
        .await
        .unwrap();

    let payloads: Vec<Vec<u8>> = (0..3)
        .map(|i| encode_envelope(&record(Level::INFO, &format!("m{}", i))).unwrap())
        .collect();
    send(&receiver, &payloads).await;

    wait_until(|| lines(&out).len() == 2 && receiver.pending() == 1).await;

    receiver.shutdown(None).await.unwrap();
    let written = lines(&out);
    assert_eq!(written.len(), 3);
    assert!(written[0].ends_with(":m0"));
    assert!(written[1].ends_with(":m1"));
    assert!(written[2].ends_with(":m2"));
}

#[tokio::test]
async fn test_corrupt_datagram_between_good_ones() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 0, Level::INFO))
        .start()
        .await
        .unwrap();

    let mut corrupt = encode_envelope(&record(Level::INFO, "corrupt")).unwrap();
    corrupt.truncate(corrupt.len() / 2);

    send(
        &receiver,
        &[
            encode_envelope(&record(Level::INFO, "before")).unwrap(),
            corrupt,
            encode_envelope(&record(Level::INFO, "after")).unwrap(),
        ],
    )
    .await;

    wait_until(|| lines(&out).len() == 2).await;
    let summary = receiver.shutdown(None).await.unwrap();

    assert_eq!(summary.listener.received, 3);
    assert_eq!(summary.listener.discarded, 1);
    let written = lines(&out);
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with(":before"));
    assert!(written[1].ends_with(":after"));
}

#[tokio::test]
async fn test_severity_threshold_filters_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 0, Level::WARNING))
        .start()
        .await
        .unwrap();

    send(
        &receiver,
        &[
            encode_envelope(&record(Level::DEBUG, "quiet detail")).unwrap(),
            encode_envelope(&record(Level::ERROR, "loud failure")).unwrap(),
        ],
    )
    .await;

    wait_until(|| lines(&out).len() == 1).await;
    let summary = receiver.shutdown(None).await.unwrap();

    // Both were accepted; only one cleared the threshold.
    assert_eq!(summary.sink.accepted, 2);
    let written = lines(&out);
    assert_eq!(written.len(), 1);
    assert!(written[0].contains(":ERROR:"));
    assert!(!fs::read_to_string(&out).unwrap().contains("quiet detail"));
}

#[tokio::test]
async fn test_repeated_shutdown_does_not_duplicate() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    let receiver = ReceiverRunner::new(test_config(&out, 10, Level::INFO))
        .start()
        .await
        .unwrap();

    send(
        &receiver,
        &[
            encode_envelope(&record(Level::INFO, "one")).unwrap(),
            encode_envelope(&record(Level::INFO, "two")).unwrap(),
        ],
    )
    .await;
    wait_until(|| receiver.pending() == 2).await;

    let coordinator = receiver.coordinator();
    assert_eq!(coordinator.shutdown(), Some(2));
    assert_eq!(coordinator.shutdown(), None);
    receiver.shutdown(None).await.unwrap();

    assert_eq!(lines(&out).len(), 2);
}

#[tokio::test]
async fn test_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");
    fs::write(&out, "from an earlier run\n").unwrap();

    let receiver = ReceiverRunner::new(test_config(&out, 0, Level::INFO))
        .start()
        .await
        .unwrap();
    send(&receiver, &[encode_envelope(&record(Level::INFO, "new")).unwrap()]).await;
    wait_until(|| lines(&out).len() == 2).await;
    receiver.shutdown(None).await.unwrap();

    let written = lines(&out);
    assert_eq!(written[0], "from an earlier run");
    assert!(written[1].ends_with(":new"));
}

#[tokio::test]
async fn test_bind_failure_is_fatal_error() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cluster.log");

    let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(&out, 0, Level::INFO);
    config.listen = occupied.local_addr().unwrap().to_string();

    let result = ReceiverRunner::new(config).start().await;
    assert!(matches!(result, Err(ReceiverError::Listener(_))));
    // Nothing was opened, so nothing was written.
    assert!(!out.exists());
}
