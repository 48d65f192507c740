//! Schema registry wire envelope.
//!
//! Every record value carries a five byte header in front of the encoded
//! payload:
//!
//! | offset | size | meaning                         |
//! |--------|------|---------------------------------|
//! | 0      | 1    | format marker, always `0`       |
//! | 1      | 4    | schema id, big-endian `u32`     |
//! | 5      | rest | payload bytes                   |
//!
//! The payload is never inspected; only the schema id changes when a
//! record crosses registries.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// The only supported format marker.
pub const MAGIC_BYTE: u8 = 0;

/// Marker byte plus the schema id.
pub const HEADER_LEN: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("record is {len} bytes, shorter than the 5 byte envelope header")]
    TooShort { len: usize },

    #[error("unsupported format marker {0:#04x}, expected 0x00 (is the value schema registry encoded?)")]
    UnsupportedMarker(u8),
}

/// A decoded record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub schema_id: u32,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(schema_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            schema_id,
            payload: payload.into(),
        }
    }

    /// Returns the same payload under a different schema id.
    pub fn with_schema_id(self, schema_id: u32) -> Self {
        Self { schema_id, ..self }
    }

    pub fn encode(&self) -> Bytes {
        encode(self.schema_id, &self.payload)
    }
}

/// Splits a record value into its schema id and payload.
pub fn decode(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    if bytes.len() < HEADER_LEN {
        return Err(EnvelopeError::TooShort { len: bytes.len() });
    }

    let mut buf = bytes;
    let marker = buf.get_u8();
    if marker != MAGIC_BYTE {
        return Err(EnvelopeError::UnsupportedMarker(marker));
    }
    let schema_id = buf.get_u32();

    Ok(Envelope {
        schema_id,
        payload: Bytes::copy_from_slice(buf),
    })
}

/// Prefixes `payload` with the envelope header for `schema_id`.
pub fn encode(schema_id: u32, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf.put_slice(payload);
    buf.freeze()
}
