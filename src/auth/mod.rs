pub mod credential_store;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{AppError, AppResult};

pub use credential_store::{CredentialStore, FileCredentialStore};

/// Overrides the stored bridge password when set.
pub const PASSWORD_ENV: &str = "PMAIL_PASSWORD";

#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Environment,
    Store,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub profile: String,
    pub logged_in: bool,
    pub username: Option<String>,
    pub source: Option<CredentialSource>,
}

/// Picks the credentials for `profile`: `PMAIL_PASSWORD` first, then the store.
pub fn resolve<S: CredentialStore + ?Sized>(
    profile: &str,
    settings: &Settings,
    store: &S,
    env_password: Option<String>,
) -> AppResult<(Credentials, CredentialSource)> {
    if let Some(password) = env_password.filter(|password| !password.is_empty()) {
        let username = match store.load(profile)? {
            Some(saved) if settings.username.is_none() && settings.email.is_none() => {
                saved.username
            }
            _ => settings.username()?.to_string(),
        };
        return Ok((
            Credentials { username, password },
            CredentialSource::Environment,
        ));
    }

    store
        .load(profile)?
        .map(|credentials| (credentials, CredentialSource::Store))
        .ok_or_else(|| {
            AppError::Auth(format!(
                "no bridge credentials for profile `{profile}`. run `pmail auth login` or set {PASSWORD_ENV}"
            ))
        })
}

pub fn status<S: CredentialStore + ?Sized>(
    profile: &str,
    settings: &Settings,
    store: &S,
    env_password: Option<String>,
) -> AppResult<AuthStatus> {
    match resolve(profile, settings, store, env_password) {
        Ok((credentials, source)) => Ok(AuthStatus {
            profile: profile.to_string(),
            logged_in: true,
            username: Some(credentials.username),
            source: Some(source),
        }),
        Err(AppError::Auth(_)) => Ok(AuthStatus {
            profile: profile.to_string(),
            logged_in: false,
            username: None,
            source: None,
        }),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct MemoryStore(RefCell<HashMap<String, Credentials>>);

    impl CredentialStore for MemoryStore {
        fn load(&self, profile: &str) -> AppResult<Option<Credentials>> {
            Ok(self.0.borrow().get(profile).cloned())
        }

        fn save(&self, profile: &str, credentials: &Credentials) -> AppResult<()> {
            self.0
                .borrow_mut()
                .insert(profile.to_string(), credentials.clone());
            Ok(())
        }

        fn clear(&self, profile: &str) -> AppResult<bool> {
            Ok(self.0.borrow_mut().remove(profile).is_some())
        }
    }

    fn settings() -> Settings {
        Settings {
            email: Some("me@proton.me".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn environment_password_wins() {
        let store = MemoryStore::default();
        store
            .save(
                "default",
                &Credentials {
                    username: "stored@proton.me".to_string(),
                    password: "stored".to_string(),
                },
            )
            .expect("save");

        let (credentials, source) =
            resolve("default", &settings(), &store, Some("from-env".to_string())).expect("resolve");
        assert_eq!(source, CredentialSource::Environment);
        assert_eq!(credentials.username, "me@proton.me");
        assert_eq!(credentials.password, "from-env");
    }

    #[test]
    fn falls_back_to_store() {
        let store = MemoryStore::default();
        let saved = Credentials {
            username: "me@proton.me".to_string(),
            password: "secret".to_string(),
        };
        store.save("default", &saved).expect("save");

        let (credentials, source) =
            resolve("default", &settings(), &store, Some(String::new())).expect("resolve");
        assert_eq!(source, CredentialSource::Store);
        assert_eq!(credentials, saved);
    }

    #[test]
    fn missing_credentials_report_logged_out() {
        let store = MemoryStore::default();
        assert!(matches!(
            resolve("default", &settings(), &store, None),
            Err(AppError::Auth(_))
        ));
        let status = status("default", &settings(), &store, None).expect("status");
        assert!(!status.logged_in);
    }

    #[test]
    fn debug_output_hides_password() {
        let credentials = Credentials {
            username: "u".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
