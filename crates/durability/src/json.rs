//! JSON back-end
//!
//! Each group file is a JSON array of records, encoded with serde_json so
//! field names travel as declared. Structurally identical to the binary
//! back-end; only the encoder differs.

use crate::{remove_group, scan_folder, Persistence};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sheaf_core::{Result, SheafError};
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::debug;

/// Stores record groups as JSON files under one base folder.
pub struct JsonBackend<E> {
    base: PathBuf,
    suffix: String,
    _records: PhantomData<fn() -> E>,
}

impl<E> JsonBackend<E> {
    /// Back-end over `base`, naming files `<group><suffix>`. The suffix
    /// includes its dot (`"_db.json"`). The folder must already exist.
    pub fn new(base: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        JsonBackend {
            base: base.into(),
            suffix: suffix.into(),
            _records: PhantomData,
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.base.join(format!("{name}{}", self.suffix))
    }
}

impl<E: Serialize + DeserializeOwned> Persistence<E> for JsonBackend<E> {
    fn save_group(&self, name: &str, records: &[&E]) -> Result<()> {
        debug!(group = name, records = records.len(), "persist json group");
        let path = self.path_of(name);
        if records.is_empty() {
            return remove_group(&path);
        }
        let bytes = serde_json::to_vec(records)
            .map_err(|e| SheafError::text("could not marshal json", e))?;
        fs::write(&path, bytes)
            .map_err(|e| SheafError::io(format!("could not write {}", path.display()), e))
    }

    fn load_all(&self) -> Result<Vec<E>> {
        let mut all = Vec::new();
        for path in scan_folder(&self.base, &self.suffix)? {
            debug!(file = %path.display(), "read json group");
            let bytes = fs::read(&path)
                .map_err(|e| SheafError::io(format!("could not read {}", path.display()), e))?;
            let records: Vec<E> = serde_json::from_slice(&bytes).map_err(|e| {
                SheafError::text(format!("could not unmarshal {}", path.display()), e)
            })?;
            all.extend(records);
        }
        Ok(all)
    }
}
