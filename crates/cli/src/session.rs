//! Per-invocation configuration, credentials and API client

use crate::output;
use anyhow::{bail, Result};
use console_lib::api::{AuthContext, CredentialStore, FileCredentialStore};
use console_lib::{ApiClient, ConsoleApi, ConsoleConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct Session {
    pub config: ConsoleConfig,
    pub client: Arc<ApiClient>,
    expired: Arc<AtomicBool>,
}

impl Session {
    /// Load configuration and build an authenticated client.
    ///
    /// `api_url` overrides the configured backend URL.
    pub fn open(config_path: Option<&Path>, api_url: Option<&str>) -> Result<Self> {
        let mut config = ConsoleConfig::load(config_path)?;
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }

        let store: Arc<dyn CredentialStore> = match &config.credential_path {
            Some(path) => Arc::new(FileCredentialStore::new(path)),
            None => Arc::new(FileCredentialStore::default_location()?),
        };

        let expired = Arc::new(AtomicBool::new(false));
        let flag = expired.clone();
        let auth = AuthContext::new(store).on_expired(move || {
            if !flag.swap(true, Ordering::SeqCst) {
                output::print_error("Session expired. Run `nabd login` to sign in again.");
            }
        });

        let client = ApiClient::new(&config.api_url, auth, config.request_timeout())?;
        debug!(api_url = %config.api_url, "Session opened");

        Ok(Self {
            config,
            client: Arc::new(client),
            expired,
        })
    }

    pub fn api(&self) -> Arc<dyn ConsoleApi> {
        self.client.clone()
    }

    /// Fail early when no credential is stored
    pub fn require_login(&self) -> Result<()> {
        if !self.client.auth().is_authenticated() {
            bail!("Not logged in. Run `nabd login --token <TOKEN>` first.");
        }
        Ok(())
    }

    /// Whether the server rejected the credential during this run
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.is_expired() {
            bail!("Session expired");
        }
        Ok(())
    }
}
