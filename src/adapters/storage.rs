//! Key-value storage adapters.
//!
//! Implements [`StoragePort`] two ways:
//!
//! - [`FileStorage`]: one file per key under `<root>/<namespace>/<key>.bin`.
//!   Writes go to a temp file that is renamed over the target, so a crash
//!   never leaves a half-written record.
//! - [`MemoryStorage`]: a `HashMap`, for tests and `--state-dir`-less runs.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// Copy a stored record into `buf`, refusing to truncate it.
fn copy_record(data: &[u8], buf: &mut [u8]) -> Result<usize, StorageError> {
    let dest = buf.get_mut(..data.len()).ok_or(StorageError::Corrupted)?;
    dest.copy_from_slice(data);
    Ok(data.len())
}

fn io_err(e: &io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage root directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_err(&e))?;
        info!("FileStorage: state directory {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.bin"))
    }
}

impl StoragePort for FileStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let mut file = fs::File::open(self.key_path(namespace, key)).map_err(|e| io_err(&e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| io_err(&e))?;
        copy_record(&data, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.key_path(namespace, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err(&e))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(|e| io_err(&e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&e))?;
        debug!("FileStorage: wrote {namespace}/{key} ({} bytes)", data.len());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&e)),
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.key_path(namespace, key).is_file()
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&Self::composite_key(namespace, key)) {
            Some(data) => copy_record(data, buf),
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&Self::composite_key(namespace, key))
    }
}
