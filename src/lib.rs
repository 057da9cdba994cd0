//! Collects log records that cluster worker processes send as UDP
//! datagrams and writes them, in arrival order, to one file or the console.

pub mod cli;
pub mod client;
pub mod config;
pub mod receiver;
pub mod record;

pub use record::{Level, LogRecord, Severity};
