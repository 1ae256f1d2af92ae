//! Error types for sheaf
//!
//! One unified error enum covers the whole workspace. We use `thiserror`
//! for the `Display` and `Error` derives.
//!
//! ## Error classes
//!
//! | Class | Variants | Meaning |
//! |-------|----------|---------|
//! | Staleness | `Stale` | A snapshot was used after the table changed |
//! | Ordering | `OrderViolation` | An update would break the primary order |
//! | Range | `OutOfRange` | Snapshot index outside the captured view |
//! | I/O | `Io`, `Restore` | File open/read/write/remove failure |
//! | Codec | `UnexpectedTypeCode`, `Truncated`, `UnknownTypeTag`, `UnregisteredType`, `UnregisteredView`, `Payload`, `Unsupported` | Malformed wire data or registry misses |
//!
//! Staleness is never retried automatically; callers re-query and decide.
//! Codec and I/O errors carry short context (operation, path, or offset) in
//! the message. There is no "invalid decode target" class: decoders return
//! values, so the failure mode cannot be expressed.

use std::io;
use thiserror::Error;

/// Result alias used across the sheaf crates.
pub type Result<T> = std::result::Result<T, SheafError>;

/// Unified error type for all sheaf operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SheafError {
    /// A snapshot operation observed a table version newer than the one it
    /// captured. The snapshot is stale; re-query to obtain a fresh view.
    #[error("{op}: table has changed")]
    Stale {
        /// Operation that detected the mismatch (`get`, `delete`, ...).
        op: &'static str,
    },

    /// An update would place the record out of order relative to its
    /// neighbors. The table is unchanged.
    #[error("update: order violation")]
    OrderViolation,

    /// A snapshot index was outside the captured view.
    #[error("{op}: index out of range")]
    OutOfRange {
        /// Operation that received the bad index.
        op: &'static str,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// Short description of what was being done ("could not write file").
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Restoring the table from its base folder failed.
    #[error("could not restore table: {0}")]
    Restore(#[source] Box<SheafError>),

    /// The decoder read a type code other than the one the target requires.
    #[error("unexpected type code at offset {offset}: expected {expected}, found {found}")]
    UnexpectedTypeCode {
        /// Byte offset of the offending code.
        offset: usize,
        /// Code the target type requires.
        expected: u8,
        /// Code actually present.
        found: u8,
    },

    /// The input ended before the value was complete.
    #[error("truncated input at offset {offset}: {context}")]
    Truncated {
        /// Byte offset where more data was needed.
        offset: usize,
        /// What was being read.
        context: &'static str,
    },

    /// A polymorphic value carried a registration tag with no entry.
    #[error("unknown type tag {tag}")]
    UnknownTypeTag {
        /// Tag read from the wire (pointer bit already masked).
        tag: u32,
    },

    /// A polymorphic value of an unregistered concrete type was encoded.
    #[error("unregistered type: {name}")]
    UnregisteredType {
        /// `type_name` of the offending concrete type.
        name: &'static str,
    },

    /// A registered type has no decoder for the requested trait object.
    #[error("type {name} is not registered for the requested trait")]
    UnregisteredView {
        /// Name the type was registered under.
        name: String,
    },

    /// A custom binary payload could not be produced or reconstructed.
    #[error("binary payload: {0}")]
    Payload(String),

    /// Structurally valid wire data that cannot be mapped onto the target
    /// value (length mismatch for a fixed-size array, invalid UTF-8, ...).
    #[error("decode: {0}")]
    Decode(String),

    /// The structured-text back-end could not encode or parse a group.
    #[error("{context}: {message}")]
    Text {
        /// Short description of what was being done.
        context: String,
        /// The library encoder's own message.
        message: String,
    },

    /// The value kind has no wire representation.
    #[error("unsupported value: {0}")]
    Unsupported(&'static str),
}

impl SheafError {
    /// Wrap an I/O error with short context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        SheafError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a text-encoder error with short context.
    pub fn text(context: impl Into<String>, source: impl std::fmt::Display) -> Self {
        SheafError::Text {
            context: context.into(),
            message: source.to_string(),
        }
    }

    /// True if the error reports a stale snapshot.
    pub fn is_stale(&self) -> bool {
        matches!(self, SheafError::Stale { .. })
    }
}
