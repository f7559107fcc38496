use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

/// Persistent home of the access token.
///
/// Writers are login, a successful refresh, and logout or a failed refresh.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> Result<(), Error> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| Error::Store("token lock poisoned".into()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| Error::Store("token lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

/// On-disk record for one storage key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    pub stored_at: Timestamp,
}

/// Write-through store persisting the token as JSON under a storage key.
///
/// Other keys already present in the file are preserved. Reads are served
/// from memory.
pub struct FileCredentialStore {
    path: PathBuf,
    key: String,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// Opens `path`, loading the token stored under `key` when the file exists.
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let key = key.into();
        let initial = read_entries(&path)?.remove(&key).map(|c| c.token);
        debug!(path = %path.display(), key = %key, loaded = initial.is_some(), "credentials.open");
        Ok(Self {
            path,
            key,
            cached: RwLock::new(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, token: Option<&str>) -> Result<(), Error> {
        let mut entries = read_entries(&self.path)?;
        match token {
            Some(token) => {
                entries.insert(
                    self.key.clone(),
                    StoredCredential {
                        token: token.to_string(),
                        stored_at: Timestamp::now(),
                    },
                );
            }
            None => {
                entries.remove(&self.key);
            }
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        self.cached.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> Result<(), Error> {
        {
            let mut slot = self
                .cached
                .write()
                .map_err(|_| Error::Store("token lock poisoned".into()))?;
            *slot = Some(token.to_string());
        }
        self.persist(Some(token))
    }

    fn clear(&self) -> Result<(), Error> {
        {
            let mut slot = self
                .cached
                .write()
                .map_err(|_| Error::Store("token lock poisoned".into()))?;
            *slot = None;
        }
        self.persist(None)
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, StoredCredential>, Error> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}
