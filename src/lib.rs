//! # sheaf
//!
//! An embedded, in-memory, file-backed object table. A process declares a
//! record type, opens a [`Table`], and gets ordered insertion,
//! predicate queries, stable [`Snapshot`] views for iteration and
//! mutation, and durable persistence of each record group to a file named
//! by the record's own attributes (one file per month is the stock
//! policy).
//!
//! It is not a server, not a query engine, and not a multi-writer
//! database: one process, one folder, modest data sets, a single exclusive
//! lock per table.
//!
//! ## Quick start
//!
//! ```ignore
//! use sheaf::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Reading {
//!     taken_at: DateTime<Utc>,
//!     value: f64,
//! }
//!
//! let table = Table::builder(Monthly::new("readings", |r: &Reading| r.taken_at))
//!     .backend(JsonBackend::new("./data", "_db.json"))
//!     .ordered_by(|a, b| a.taken_at < b.taken_at)
//!     .open()?;
//!
//! table.insert(&Reading { taken_at: Utc::now(), value: 21.5 })?;
//!
//! let mut recent = table.filter(|r| r.value > 20.0);
//! for reading in recent.iter() {
//!     println!("{:?}", reading?);
//! }
//!
//! table.shutdown(); // only needed when a write delay was set
//! ```
//!
//! ## Consistency model
//!
//! Every table mutation bumps a version counter; snapshots carry the
//! version they were captured at and refuse to operate once the table has
//! moved on ("table has changed"). A snapshot's own `delete`/`update`
//! advance its captured version in lock-step, which keeps the common
//! iterate-and-mutate loop working. See [`Snapshot`].
//!
//! ## Persistence
//!
//! Records are partitioned into groups by a [`Grouping`] policy
//! ([`Monthly`] or [`SingleGroup`]); each group is one file, rewritten in
//! full on change and removed when the group empties. Two back-ends share
//! the contract: [`JsonBackend`] (serde_json) and [`BinaryBackend`]
//! (the self-describing `sheaf-codec` wire format, including registered
//! trait objects). [`Table::set_write_delay`] batches rewrites behind a
//! quiescence timer; such tables need [`Table::shutdown`] before exit.

#![warn(missing_docs)]

mod delay;
mod snapshot;
mod table;

pub mod prelude;

pub use snapshot::{Snapshot, SnapshotIter};
pub use table::{Table, TableBuilder};

pub use sheaf_core::{Grouping, Monthly, Result, SheafError, SingleGroup};
pub use sheaf_durability::{BinaryBackend, JsonBackend, Persistence};

// The binary codec surface, for records persisted through BinaryBackend.
pub use sheaf_codec::{
    poly_codec, record_codec, register_dyn, BinaryPayload, Codec, Decode, Encode, PolyValue,
};
