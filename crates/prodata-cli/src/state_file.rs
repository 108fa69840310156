//! One managed resource per JSON file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use prodata_infra::ResourceState;
use tracing::debug;

use crate::error::{CliError, Result};

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> CliError {
        CliError::StateIo {
            path: self.path.clone(),
            source,
        }
    }

    /// `None` when the file does not exist.
    pub fn load(&self) -> Result<Option<ResourceState>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CliError::StateFormat {
                path: self.path.clone(),
                source,
            })
    }

    /// Load and unwrap one kind of resource.
    pub fn require<T>(
        &self,
        expected: &'static str,
        pick: impl FnOnce(ResourceState) -> std::result::Result<T, ResourceState>,
    ) -> Result<T> {
        let state = self.load()?.ok_or_else(|| CliError::NoState {
            path: self.path.clone(),
        })?;
        pick(state).map_err(|other| CliError::WrongKind {
            path: self.path.clone(),
            expected,
            found: other.kind(),
        })
    }

    /// Write through a sibling temp file so a crash never leaves half a record.
    pub fn save(&self, state: &ResourceState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).map_err(|source| CliError::StateFormat {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), kind = state.kind(), "state saved");
        Ok(())
    }

    /// Forget the resource. A missing file is fine.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}
