//! Credential storage and the auth context injected into the API client

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Fixed key the credential is stored under
pub const CREDENTIAL_KEY: &str = "nabd_token";

/// Durable storage for the single opaque credential
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Credential store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(flatten)]
    entries: HashMap<String, String>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `~/.config/nabd/credentials.json`
    pub fn default_location() -> Result<Self> {
        let dir = dirs_next::config_dir().context("Could not determine config directory")?;
        Ok(Self::new(dir.join("nabd").join("credentials.json")))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_file(&self) -> Result<CredentialFile> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }
        let content =
            std::fs::read_to_string(&self.path).context("Failed to read credential file")?;
        serde_json::from_str(&content).context("Failed to parse credential file")
    }

    fn write_file(&self, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content =
            serde_json::to_string_pretty(file).context("Failed to serialize credentials")?;
        std::fs::write(&self.path, content).context("Failed to write credential file")
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        match self.read_file() {
            Ok(mut file) => file.entries.remove(CREDENTIAL_KEY),
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Ignoring unreadable credential file");
                None
            }
        }
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut file = self.read_file().unwrap_or_default();
        file.entries
            .insert(CREDENTIAL_KEY.to_string(), token.to_string());
        self.write_file(&file)
    }

    fn clear(&self) -> Result<()> {
        let mut file = match self.read_file() {
            Ok(file) => file,
            Err(_) => CredentialFile::default(),
        };
        if file.entries.remove(CREDENTIAL_KEY).is_some() || self.path.exists() {
            self.write_file(&file)?;
        }
        Ok(())
    }
}

/// In-process credential store
#[derive(Debug, Default)]
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
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

/// Credential access plus the hook run when the server rejects it
#[derive(Clone)]
pub struct AuthContext {
    store: Arc<dyn CredentialStore>,
    on_expired: Option<ExpiryCallback>,
}

impl AuthContext {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            on_expired: None,
        }
    }

    /// Run `callback` whenever a 401 clears the credential
    pub fn on_expired(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_expired = Some(Arc::new(callback));
        self
    }

    /// Bearer header value for the stored credential, if any
    pub fn bearer(&self) -> Option<String> {
        self.store.load().map(|token| format!("Bearer {}", token))
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.load().is_some()
    }

    pub fn store_credential(&self, token: &str) -> Result<()> {
        self.store.store(token)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }

    /// Drop a rejected credential without running the expiry hook
    pub fn discard(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear rejected credential");
        }
    }

    /// Clear the credential and notify the owner that re-authentication
    /// is required
    pub fn expire(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear expired credential");
        }
        debug!(event = "auth_expired", "Credential rejected by server");
        if let Some(callback) = &self.on_expired {
            callback();
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
