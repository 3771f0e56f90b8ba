use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use list_sync_models::MediaKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const ACCESS_TOKEN: &str = "trakt_access_token";
const REFRESH_TOKEN: &str = "trakt_refresh_token";
const TOKEN_EXPIRES: &str = "trakt_token_expires";

/// Tokens are refreshed once they expire within this window.
const REFRESH_MARGIN_HOURS: i64 = 1;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Tokens and sync bookkeeping, kept apart from the user-edited config.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key).filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn get_trakt_access_token(&self) -> Option<&String> {
        self.get(ACCESS_TOKEN)
    }

    pub fn get_trakt_refresh_token(&self) -> Option<&String> {
        self.get(REFRESH_TOKEN)
    }

    pub fn get_trakt_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp(TOKEN_EXPIRES)
    }

    /// Store a freshly issued token pair.
    pub fn set_trakt_tokens(&mut self, access_token: String, refresh_token: String, expires_at: DateTime<Utc>) {
        self.set(ACCESS_TOKEN.to_string(), access_token);
        self.set(REFRESH_TOKEN.to_string(), refresh_token);
        self.set(TOKEN_EXPIRES.to_string(), expires_at.to_rfc3339());
    }

    pub fn clear_trakt_tokens(&mut self) {
        self.remove(ACCESS_TOKEN);
        self.remove(REFRESH_TOKEN);
        self.remove(TOKEN_EXPIRES);
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_trakt_access_token().is_some() && self.get_trakt_refresh_token().is_some()
    }

    /// True when an access token exists and expires within the next hour.
    /// A token without a known expiry is treated as due.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.get_trakt_access_token().is_none() {
            return false;
        }
        match self.get_trakt_token_expires() {
            Some(expires_at) => now + Duration::hours(REFRESH_MARGIN_HOURS) > expires_at,
            None => true,
        }
    }

    pub fn get_last_full_refresh(&self, kind: MediaKind) -> Option<DateTime<Utc>> {
        self.get_timestamp(&last_full_refresh_key(kind))
    }

    pub fn set_last_full_refresh(&mut self, kind: MediaKind, timestamp: DateTime<Utc>) {
        self.set(last_full_refresh_key(kind), timestamp.to_rfc3339());
    }
}

fn last_full_refresh_key(kind: MediaKind) -> String {
    format!("last_full_refresh_{}", kind.plural())
}

#[cfg(unix)]
fn restrict_permissions(path: &PathBuf) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &PathBuf) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_tokens("access".to_string(), "refresh".to_string(), now());
        store.set_last_full_refresh(MediaKind::Show, now() - Duration::days(2));
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get_trakt_access_token(), Some(&"access".to_string()));
        assert_eq!(loaded_store.get_trakt_refresh_token(), Some(&"refresh".to_string()));
        assert_eq!(loaded_store.get_trakt_token_expires(), Some(now()));
        assert_eq!(loaded_store.get_last_full_refresh(MediaKind::Show), Some(now() - Duration::days(2)));
        assert_eq!(loaded_store.get_last_full_refresh(MediaKind::Movie), None);
        assert!(loaded_store.is_authenticated());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let mut store = CredentialStore::new(PathBuf::from("/nonexistent/trakt-sync/credentials.toml"));
        store.load().unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_needs_refresh_within_an_hour() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        assert!(!store.needs_refresh(now()));

        store.set_trakt_tokens("a".to_string(), "r".to_string(), now() + Duration::minutes(30));
        assert!(store.needs_refresh(now()));

        store.set_trakt_tokens("a".to_string(), "r".to_string(), now() + Duration::days(30));
        assert!(!store.needs_refresh(now()));

        store.remove(TOKEN_EXPIRES);
        assert!(store.needs_refresh(now()));
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set(ACCESS_TOKEN.to_string(), String::new());
        store.set(REFRESH_TOKEN.to_string(), "r".to_string());
        assert!(!store.is_authenticated());

        store.clear_trakt_tokens();
        assert_eq!(store.get_trakt_refresh_token(), None);
    }
}
