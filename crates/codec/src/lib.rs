//! Self-describing binary codec for sheaf records
//!
//! This crate implements the wire format the binary persistence back-end
//! stores on disk. The format is compact, little-endian, unaligned and
//! self-describing: every value leads with a one-byte type code, so a
//! decoder can verify at each step that the bytes match the target type.
//!
//! ## Format
//!
//! ```text
//! [code: u8][payload]
//! ```
//!
//! | code | value | payload |
//! |------|-------|---------|
//! | 0 | nil pointer | none |
//! | 1 | bool | 1 byte |
//! | 2–5 | i8/i16/i32/i64 | that many LE bytes |
//! | 6–9 | u8/u16/u32/u64 | that many LE bytes |
//! | 10/11 | f32/f64 | IEEE-754 bits, LE |
//! | 12 | string | u32 LE byte count, UTF-8 bytes |
//! | 13 | struct | each field in declaration order, no count |
//! | 14 | sequence | u32 LE length, each element |
//! | 15 | map | u32 LE entry count, key/value pairs |
//! | 16 | polymorphic | u32 LE registration tag, concrete value |
//!
//! Length prefixes travel bare (no type code of their own). There is no
//! magic number, no version header and no framing: a file is exactly one
//! top-level value.
//!
//! ## Three encoding paths
//!
//! - **Structural**: primitives, strings, sequences, maps, `Option`
//!   (nil sentinel) and `Box` (transparent) have built-in impls; structs
//!   get theirs generated by [`record_codec!`].
//! - **Custom payload**: a [`BinaryPayload`] type travels as its canonical
//!   byte sequence (timestamps ship this way built in). This path wins
//!   over the structural one by construction — the payload impl is the
//!   type's only codec impl.
//! - **Polymorphic**: `Box<dyn Trait>` values carry a registration tag
//!   resolved through a per-instance [`Codec`] registry; see
//!   [`poly_codec!`] and [`register_dyn!`].

#![warn(missing_docs)]

pub mod decode;
pub mod encode;
pub mod payload;
pub mod record;
pub mod registry;
pub mod wire;

pub use decode::Decode;
pub use encode::Encode;
pub use payload::{decode_payload, encode_payload, BinaryPayload};
pub use registry::{Codec, PolyValue, ViewDecodeFn};

// Macros and their expansions resolve errors through `$crate`.
pub use sheaf_core::{Result, SheafError};

/// Encode one value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(value: &T, codec: &Codec) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.encode(&mut buf, codec)?;
    Ok(buf)
}

/// Decode one value from `bytes`, requiring every byte to be consumed.
pub fn from_bytes<T: Decode>(bytes: &[u8], codec: &Codec) -> Result<T> {
    let mut r = wire::Reader::new(bytes);
    let value = T::decode(&mut r, codec)?;
    if !r.is_at_end() {
        return Err(SheafError::Decode(format!(
            "{} trailing bytes after the top-level value",
            bytes.len() - r.offset()
        )));
    }
    Ok(value)
}
