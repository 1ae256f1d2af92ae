//! Binary back-end
//!
//! Each group file holds exactly one top-level value in the sheaf-codec
//! wire format: the sequence of the group's records. No magic number, no
//! version header — a file written by one build is readable by builds with
//! identical record declarations, and by nothing else.
//!
//! Records reached through trait objects round-trip when their concrete
//! types are registered with the [`Codec`] this back-end is built with.

use crate::{remove_group, scan_folder, Persistence};
use sheaf_codec::{from_bytes, to_bytes, Codec, Decode, Encode};
use sheaf_core::{Result, SheafError};
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::debug;

/// Stores record groups in the binary wire format under one base folder.
pub struct BinaryBackend<E> {
    base: PathBuf,
    suffix: String,
    codec: Codec,
    _records: PhantomData<fn() -> E>,
}

impl<E> BinaryBackend<E> {
    /// Back-end over `base`, naming files `<group><suffix>`. The suffix
    /// includes its dot (`"_db.bin"`). The folder must already exist. The
    /// codec carries the polymorphic type registry; `Codec::new()` is
    /// enough for purely structural records.
    pub fn new(base: impl Into<PathBuf>, suffix: impl Into<String>, codec: Codec) -> Self {
        BinaryBackend {
            base: base.into(),
            suffix: suffix.into(),
            codec,
            _records: PhantomData,
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.base.join(format!("{name}{}", self.suffix))
    }
}

impl<E: Encode + Decode> Persistence<E> for BinaryBackend<E> {
    fn save_group(&self, name: &str, records: &[&E]) -> Result<()> {
        debug!(group = name, records = records.len(), "persist binary group");
        let path = self.path_of(name);
        if records.is_empty() {
            return remove_group(&path);
        }
        let bytes = to_bytes(records, &self.codec)?;
        fs::write(&path, bytes)
            .map_err(|e| SheafError::io(format!("could not write {}", path.display()), e))
    }

    fn load_all(&self) -> Result<Vec<E>> {
        let mut all = Vec::new();
        for path in scan_folder(&self.base, &self.suffix)? {
            debug!(file = %path.display(), "read binary group");
            let bytes = fs::read(&path)
                .map_err(|e| SheafError::io(format!("could not read {}", path.display()), e))?;
            let records: Vec<E> = from_bytes(&bytes, &self.codec)?;
            all.extend(records);
        }
        Ok(all)
    }
}
