//! Core types shared by every sheaf crate.
//!
//! This crate defines the two foundations the rest of the workspace builds
//! on:
//!
//! - [`SheafError`] / [`Result`]: the unified error type for table,
//!   snapshot, codec and persistence operations.
//! - [`Grouping`]: the strategy that decides which durable file a record
//!   belongs to, with the two stock policies [`Monthly`] and
//!   [`SingleGroup`].

#![warn(missing_docs)]

pub mod error;
pub mod group;

pub use error::{Result, SheafError};
pub use group::{Grouping, Monthly, SingleGroup};
