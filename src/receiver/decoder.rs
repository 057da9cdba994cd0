use crate::record::LogRecord;
use thiserror::Error;

/// Size of the legacy length prefix on every envelope.
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("envelope too short: {0} bytes")]
    TooShort(usize),

    #[error("length header says {declared} bytes, body has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("malformed record body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Turns datagram payloads into records.
///
/// The 4-byte prefix is a big-endian body length written by clients. By
/// default it is stripped without being checked, which keeps the receiver
/// lenient toward clients that pad or mis-size it. `strict` turns a
/// mismatch into a decode failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    strict: bool,
}

impl Decoder {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn decode(&self, payload: &[u8]) -> Result<LogRecord, DecodeError> {
        if payload.len() < HEADER_LEN {
            return Err(DecodeError::TooShort(payload.len()));
        }
        let (header, body) = payload.split_at(HEADER_LEN);

        if self.strict {
            let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
            if declared != body.len() {
                return Err(DecodeError::LengthMismatch {
                    declared,
                    actual: body.len(),
                });
            }
        }

        Ok(serde_json::from_slice(body)?)
    }
}
