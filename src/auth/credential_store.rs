use std::fs;

use crate::config::AppPaths;
use crate::error::AppResult;

use super::Credentials;

pub trait CredentialStore {
    fn load(&self, profile: &str) -> AppResult<Option<Credentials>>;
    fn save(&self, profile: &str, credentials: &Credentials) -> AppResult<()>;
    fn clear(&self, profile: &str) -> AppResult<bool>;
}

/// Bridge credentials kept as JSON under the data directory with owner-only access.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    paths: AppPaths,
}

impl FileCredentialStore {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, profile: &str) -> AppResult<Option<Credentials>> {
        let path = self.paths.credentials_file(profile);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path)?;
        let credentials = serde_json::from_str(&raw)?;
        Ok(Some(credentials))
    }

    fn save(&self, profile: &str, credentials: &Credentials) -> AppResult<()> {
        let path = self.paths.credentials_file(profile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(credentials)?;
        fs::write(&path, payload)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    fn clear(&self, profile: &str) -> AppResult<bool> {
        let path = self.paths.credentials_file(profile);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(path)?;
        Ok(true)
    }
}
