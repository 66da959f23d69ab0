// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted client tokens.
//!
//! A [`TokenStore`] is a small string key/value store. [`SessionTokens`] is
//! the only thing that touches it and keeps the access and refresh tokens
//! paired: they are stored together and cleared together.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const ACCESS_TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key/value persistence for client tokens.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        lock(&self.values)?.remove(key);
        Ok(())
    }
}

/// JSON file store, so a session survives restarts.
///
/// Values are cached in memory and the whole map is rewritten on every
/// change via a temp file and rename.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut values = lock(&self.values)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut values = lock(&self.values)?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::other("token store lock poisoned"))
}

/// The access/refresh token pair, as persisted in a [`TokenStore`].
///
/// Write failures are logged and otherwise ignored: a session that cannot be
/// persisted still works for the life of the process.
#[derive(Clone)]
pub struct SessionTokens {
    store: Arc<dyn TokenStore>,
}

impl SessionTokens {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn access(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    pub fn store_pair(&self, access: &str, refresh: &str) {
        for (key, value) in [(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)] {
            if let Err(e) = self.store.set(key, value) {
                tracing::warn!(key, error = %e, "Failed to persist token");
            }
        }
    }

    /// Replace the access token after a refresh.
    pub fn set_access(&self, access: &str) {
        if let Err(e) = self.store.set(ACCESS_TOKEN_KEY, access) {
            tracing::warn!(key = ACCESS_TOKEN_KEY, error = %e, "Failed to persist token");
        }
    }

    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear token");
            }
        }
    }
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("has_access", &self.access().is_some())
            .field("has_refresh", &self.refresh().is_some())
            .finish()
    }
}
