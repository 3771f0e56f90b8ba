pub mod auth;
pub mod config;
pub mod daemon;
pub mod install_service;
pub mod progress;
pub mod prompts;
pub mod status;
pub mod sync;

use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use list_sync_config::{Config, CredentialStore, PathManager};
use list_sync_core::SyncState;
use list_sync_models::MediaKind;
use list_sync_sources::{TokenSet, TraktClient, TraktCredentials};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// A failure the user has to fix before anything can run: bad config,
/// missing authentication, a token that could not be refreshed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PreconditionFailed(pub String);

impl PreconditionFailed {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Loaded configuration and credentials shared by every command.
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub credentials: CredentialStore,
}

impl AppContext {
    /// Load (or create) the config and the credential store next to it.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let path_manager = PathManager::default();
        let (config_path, credentials_path) = match config_override {
            Some(path) => {
                let credentials = path.with_file_name("credentials.toml");
                (path, credentials)
            }
            None => (path_manager.config_file(), path_manager.credentials_file()),
        };

        let config = Config::load_or_create(&config_path).map_err(|e| {
            PreconditionFailed::new(format!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let mut credentials = CredentialStore::new(credentials_path);
        credentials.load().map_err(|e| {
            eyre!(
                "Failed to load credentials from {}: {}",
                credentials.path().display(),
                e
            )
        })?;

        Ok(Self {
            config_path,
            config,
            credentials,
        })
    }

    pub fn require_valid_config(&self) -> Result<()> {
        self.config.validate().map_err(|e| {
            PreconditionFailed::new(format!(
                "Invalid configuration in {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Client carrying whatever tokens are stored, possibly none.
    pub fn client(&self) -> TraktClient {
        TraktClient::new(TraktCredentials {
            client_id: self.config.trakt.client_id.clone(),
            client_secret: self.config.trakt.client_secret.clone(),
            access_token: self.credentials.get_trakt_access_token().cloned(),
            refresh_token: self.credentials.get_trakt_refresh_token().cloned(),
        })
    }

    /// Client ready for list calls. Refreshes the token first when it
    /// expires within the hour.
    pub async fn authenticated_client(&mut self) -> Result<TraktClient> {
        if !self.credentials.is_authenticated() {
            return Err(PreconditionFailed::new(
                "Not authenticated with Trakt. Run `trakt-sync auth` first.",
            )
            .into());
        }

        let client = self.client();
        if self.credentials.needs_refresh(Utc::now()) {
            info!(operation = "token_refresh", "Access token expires soon, refreshing");
            let tokens = client
                .refresh_access_token()
                .await
                .map_err(|e| PreconditionFailed::new(format!("Token refresh failed: {}", e)))?;
            self.store_tokens(&tokens);
        }
        Ok(client)
    }

    /// Remember a new token pair. A failed write is only logged.
    pub fn store_tokens(&mut self, tokens: &TokenSet) {
        self.credentials.set_trakt_tokens(
            tokens.access_token.clone(),
            tokens.refresh_token.clone(),
            tokens.expires_at,
        );
        self.save_credentials();
    }

    pub fn sync_state(&self) -> SyncState {
        SyncState {
            movies: self.credentials.get_last_full_refresh(MediaKind::Movie),
            shows: self.credentials.get_last_full_refresh(MediaKind::Show),
        }
    }

    pub fn store_sync_state(&mut self, state: &SyncState) {
        for kind in [MediaKind::Movie, MediaKind::Show] {
            if let Some(at) = state.last_full_refresh(kind) {
                self.credentials.set_last_full_refresh(kind, at);
            }
        }
        self.save_credentials();
    }

    fn save_credentials(&self) {
        if let Err(e) = self.credentials.save() {
            warn!(
                operation = "persist_credentials",
                path = %self.credentials.path().display(),
                error = %e,
                "Failed to save credentials"
            );
        }
    }
}
