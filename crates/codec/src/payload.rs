//! Custom binary payloads
//!
//! Some values have a canonical byte representation that differs from
//! their structural layout — timestamps being the usual case. Such a type
//! implements [`BinaryPayload`] and travels as its payload wrapped in a
//! byte sequence (code 14, length, each byte u8-coded), not as a struct.
//! The payload impl *is* the type's `Encode`/`Decode`, so it always takes
//! precedence over the structural path.

use crate::registry::Codec;
use crate::wire::{self, Reader, TypeCode};
use chrono::{DateTime, Utc};
use sheaf_core::{Result, SheafError};

/// A value that produces and reconstructs its own byte sequence.
pub trait BinaryPayload: Sized {
    /// The canonical byte representation.
    fn to_payload(&self) -> Result<Vec<u8>>;

    /// Rebuild the value from [`to_payload`](BinaryPayload::to_payload)
    /// output.
    fn from_payload(bytes: &[u8]) -> Result<Self>;
}

/// Write `bytes` as the wire's byte-sequence wrapping.
pub fn encode_payload(bytes: &[u8], buf: &mut Vec<u8>) -> Result<()> {
    wire::put_code(buf, TypeCode::Seq);
    wire::put_len(buf, bytes.len())?;
    for b in bytes {
        wire::put_code(buf, TypeCode::U8);
        buf.push(*b);
    }
    Ok(())
}

/// Read back a byte sequence written by [`encode_payload`].
pub fn decode_payload(r: &mut Reader<'_>) -> Result<Vec<u8>> {
    r.expect_code(TypeCode::Seq)?;
    let len = r.take_len()?;
    let mut out = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        r.expect_code(TypeCode::U8)?;
        out.push(r.take(1, "payload byte")?[0]);
    }
    Ok(out)
}

// 12 bytes: seconds since the epoch (i64 LE), subsecond nanos (u32 LE).
impl BinaryPayload for DateTime<Utc> {
    fn to_payload(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&self.timestamp().to_le_bytes());
        out.extend_from_slice(&self.timestamp_subsec_nanos().to_le_bytes());
        Ok(out)
    }

    fn from_payload(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 12 {
            return Err(SheafError::Payload(format!(
                "timestamp payload must be 12 bytes, got {}",
                bytes.len()
            )));
        }
        let mut secs = [0u8; 8];
        secs.copy_from_slice(&bytes[..8]);
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(&bytes[8..]);
        DateTime::from_timestamp(i64::from_le_bytes(secs), u32::from_le_bytes(nanos))
            .ok_or_else(|| SheafError::Payload("timestamp out of range".into()))
    }
}

impl crate::Encode for DateTime<Utc> {
    fn encode(&self, buf: &mut Vec<u8>, _codec: &Codec) -> Result<()> {
        encode_payload(&self.to_payload()?, buf)
    }
}

impl crate::Decode for DateTime<Utc> {
    fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
        Self::from_payload(&decode_payload(r)?)
    }
}
