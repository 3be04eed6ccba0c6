//! Minimal state persisted across restarts: where in the schedule the
//! run was and whether it was advancing automatically.
//!
//! Stored as a postcard blob under `cryoloop/resume` through the
//! [`StoragePort`].  Nothing else about the loop survives a restart: the
//! PID integral and stability timer always start fresh.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

use super::ports::StoragePort;

pub const RESUME_NAMESPACE: &str = "cryoloop";
pub const RESUME_KEY: &str = "resume";

/// Largest encoded record we accept.
const MAX_RECORD_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub schedule_index: u32,
    pub auto_advance: bool,
}

impl ResumeState {
    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(storage: &impl StoragePort) -> Result<Option<Self>, StorageError> {
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let len = match storage.read(RESUME_NAMESPACE, RESUME_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        postcard::from_bytes(&buf[..len])
            .map(Some)
            .map_err(|_| StorageError::Corrupted)
    }

    pub fn save(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(self).map_err(|e| StorageError::Io(e.to_string()))?;
        storage.write(RESUME_NAMESPACE, RESUME_KEY, &bytes)
    }

    pub fn clear(storage: &mut impl StoragePort) -> Result<(), StorageError> {
        storage.delete(RESUME_NAMESPACE, RESUME_KEY)
    }
}
