use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const APP_DIR: &str = "pmail";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    profiles_dir: PathBuf,
    credentials_dir: PathBuf,
    settings_override: Option<PathBuf>,
}

impl AppPaths {
    pub fn discover() -> AppResult<Self> {
        let config_root = dirs::config_dir()
            .ok_or_else(|| AppError::Config("unable to resolve config directory".to_string()))?;
        let data_root = dirs::data_dir()
            .ok_or_else(|| AppError::Config("unable to resolve data directory".to_string()))?;

        Self::at(config_root.join(APP_DIR), data_root.join(APP_DIR))
    }

    /// Lays the directory tree out under explicit roots.
    pub fn at(config_dir: PathBuf, data_dir: PathBuf) -> AppResult<Self> {
        let profiles_dir = config_dir.join("profiles");
        let credentials_dir = data_dir.join("credentials");

        fs::create_dir_all(&profiles_dir)?;
        fs::create_dir_all(&credentials_dir)?;

        Ok(Self {
            config_dir,
            data_dir,
            profiles_dir,
            credentials_dir,
            settings_override: None,
        })
    }

    /// Reads and writes settings at `path` instead of the profile file.
    pub fn with_settings_override(mut self, path: Option<PathBuf>) -> Self {
        self.settings_override = path;
        self
    }

    pub fn settings_file(&self, profile: &str) -> PathBuf {
        match &self.settings_override {
            Some(path) => path.clone(),
            None => self.profiles_dir.join(format!("{profile}.json")),
        }
    }

    pub fn credentials_file(&self, profile: &str) -> PathBuf {
        self.credentials_dir.join(format!("{profile}.json"))
    }

    pub fn idempotency_file(&self) -> PathBuf {
        self.data_dir.join("idempotency.json")
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_profile_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths =
            AppPaths::at(dir.path().join("config"), dir.path().join("data")).expect("paths");

        assert_eq!(
            paths.settings_file("work"),
            dir.path().join("config/profiles/work.json")
        );
        assert_eq!(
            paths.credentials_file("work"),
            dir.path().join("data/credentials/work.json")
        );
        assert!(dir.path().join("data/credentials").is_dir());
    }

    #[test]
    fn override_replaces_settings_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let custom = dir.path().join("custom.json");
        let paths = AppPaths::at(dir.path().join("c"), dir.path().join("d"))
            .expect("paths")
            .with_settings_override(Some(custom.clone()));
        assert_eq!(paths.settings_file("any"), custom);
    }
}
