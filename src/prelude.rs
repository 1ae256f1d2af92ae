//! Convenient glob import for applications:
//! `use sheaf::prelude::*;`

pub use crate::{
    BinaryBackend, Codec, Decode, Encode, Grouping, JsonBackend, Monthly, Persistence, Result,
    SheafError, SingleGroup, Snapshot, Table, TableBuilder,
};

pub use crate::{poly_codec, record_codec, register_dyn};

pub use chrono::{DateTime, Utc};
