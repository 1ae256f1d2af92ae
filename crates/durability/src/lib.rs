//! File-per-group persistence for sheaf tables
//!
//! A table's records are partitioned into named groups; each group is one
//! file in a single flat base folder, named `<group><suffix>` (the suffix
//! carries its own dot, e.g. `_db.json`). Both back-ends implement the same
//! two-operation contract:
//!
//! - [`Persistence::save_group`] rewrites one group's file from the group's
//!   current full contents. Zero records means the group is gone and the
//!   file is removed — absence *is* the empty representation.
//! - [`Persistence::load_all`] scans the base folder, reads every file
//!   whose name ends with the suffix and concatenates the decoded records.
//!
//! [`JsonBackend`] stores groups as JSON arrays with field names preserved;
//! [`BinaryBackend`] stores each group as one top-level value in the
//! sheaf-codec wire format. Neither locks the folder: two processes over
//! the same folder is undefined behavior, and two tables in one process
//! must keep their suffixes or group-name spaces disjoint.

#![warn(missing_docs)]

mod binary;
mod json;

pub use binary::BinaryBackend;
pub use json::JsonBackend;

use sheaf_core::{Result, SheafError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write/restore contract shared by every back-end.
pub trait Persistence<E> {
    /// Rewrite the file for `name` from the group's full contents; remove
    /// it when `records` is empty.
    fn save_group(&self, name: &str, records: &[&E]) -> Result<()>;

    /// Read every group file in the base folder and concatenate the
    /// records.
    fn load_all(&self) -> Result<Vec<E>>;
}

/// List group files under `base`, filtered by suffix, sorted by name.
fn scan_folder(base: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(base).map_err(|e| SheafError::io("could not open base folder", e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SheafError::io("could not scan base folder", e))?;
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Remove a group file. The intent is "ensure absent", so a file that is
/// already gone is success; any other failure propagates.
fn remove_group(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SheafError::io(
            format!("could not remove {}", path.display()),
            e,
        )),
    }
}
