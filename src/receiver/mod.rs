//! The receiving side: datagrams in, rendered lines out.
//!
//! ```text
//! UDP datagram -> Decoder -> BatchingSink -> OutputWriter -> file | stdout
//!                    |             ^
//!               warn + drop        |  flush + close
//!                           ShutdownCoordinator <- SIGINT / SIGTERM
//! ```

pub mod batching;
pub mod decoder;
pub mod listener;
pub mod output;
pub mod runner;
pub mod shutdown;

pub use batching::{BatchingSink, SharedSink, SinkStats};
pub use decoder::{DecodeError, Decoder};
pub use listener::{Listener, ListenerError, ListenerStats};
pub use output::{OutputError, OutputWriter, RecordTarget};
pub use runner::{ReceiverError, ReceiverRunner};
pub use shutdown::{ShutdownCoordinator, ShutdownReason};

#[cfg(test)]
pub(crate) mod testing {
    use super::output::{OutputError, RecordTarget};
    use crate::record::LogRecord;
    use std::sync::{Arc, Mutex};

    /// In-memory target whose clones share one record list.
    #[derive(Clone, Default)]
    pub struct RecordingTarget {
        records: Arc<Mutex<Vec<LogRecord>>>,
        closes: Arc<Mutex<usize>>,
        fail_msg: Option<String>,
        fail_close: bool,
    }

    impl RecordingTarget {
        pub fn failing_on(msg: &str) -> Self {
            Self {
                fail_msg: Some(msg.to_string()),
                ..Self::default()
            }
        }

        pub fn failing_close() -> Self {
            Self {
                fail_close: true,
                ..Self::default()
            }
        }

        pub fn records(&self) -> Vec<LogRecord> {
            self.records.lock().unwrap().clone()
        }

        pub fn close_calls(&self) -> usize {
            *self.closes.lock().unwrap()
        }
    }

    impl RecordTarget for RecordingTarget {
        fn write(&mut self, record: &LogRecord) -> Result<(), OutputError> {
            if self.fail_msg.as_deref() == Some(record.msg.as_str()) {
                return Err(OutputError::Write(std::io::Error::other("injected failure")));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), OutputError> {
            *self.closes.lock().unwrap() += 1;
            if self.fail_close {
                return Err(OutputError::Write(std::io::Error::other("injected close failure")));
            }
            Ok(())
        }
    }
}
