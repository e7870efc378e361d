use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// A single JSON document on disk.
///
/// Writes go to a sibling temp file, are flushed to disk and then renamed
/// into place, so a crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// `Ok(None)` when the file does not exist.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.display(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.display(),
                source,
            })
    }

    pub fn write<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        let mut encoded = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
            path: self.display(),
            source,
        })?;
        encoded.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        let write_err = |source| StoreError::Write {
            path: self.display(),
            source,
        };
        let mut file = File::create(&tmp).map_err(write_err)?;
        file.write_all(encoded.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}
