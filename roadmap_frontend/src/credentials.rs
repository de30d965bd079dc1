//! Storage for the one bearer token a session owns.
//!
//! Clones share the same token, so the gateway and the real-time client always
//! see the credential issued by the last login.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

use crate::error::Result;

#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store. Reads any token already on disk.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: Some(path.into()),
            token: Arc::default(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-reads the durable copy. A missing file means no credential.
    pub fn load(&self) -> Result<Option<String>> {
        let Some(path) = &self.path else {
            return Ok(self.token());
        };
        let loaded = match fs::read_to_string(path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                (!token.is_empty()).then_some(token)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = loaded.clone();
        Ok(loaded)
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self, token: &str) -> Result<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, token)?;
            debug!("stored credential at {}", path.display());
        }
        Ok(())
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!("failed to remove credential {}: {err}", path.display()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_across_instances() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("auth_token");

        let store = CredentialStore::open(&path).expect("open");
        assert_eq!(store.token(), None);
        store.store("tok-1").expect("store");

        let reopened = CredentialStore::open(&path).expect("reopen");
        assert_eq!(reopened.token().as_deref(), Some("tok-1"));

        reopened.clear();
        assert!(!path.exists());
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn clones_share_the_token() {
        let store = CredentialStore::in_memory();
        let clone = store.clone();
        store.store("shared").expect("store");
        assert_eq!(clone.token().as_deref(), Some("shared"));
        clone.clear();
        assert_eq!(store.token(), None);
    }
}
