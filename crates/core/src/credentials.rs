use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};

use crate::{error::Result, util};

const DEFAULT_SESSION_PATH: &str = "config/financex_session.json";

/// Persisted slot for the bearer credential.
///
/// Exactly one value lives under the fixed `token` key. Only the session
/// manager writes it.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// JSON file on disk, e.g. `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(default_session_path())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let file: SessionFile = serde_json::from_str(&content)?;
        Ok(file.token.filter(|token| !token.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(&SessionFile {
            token: Some(token.to_string()),
        })?;
        fs::write(&self.path, payload)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local slot, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(util::read(&self.slot).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *util::write(&self.slot) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *util::write(&self.slot) = None;
        Ok(())
    }
}

pub fn default_session_path() -> &'static str {
    DEFAULT_SESSION_PATH
}
