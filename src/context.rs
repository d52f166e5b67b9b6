use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::api::{Folders, MailClient};
use crate::auth::{self, Credentials, FileCredentialStore, PASSWORD_ENV};
use crate::config::{self, AppPaths, Settings};
use crate::error::AppResult;
use crate::idempotency::IdempotencyLedger;
use crate::output::Output;
use crate::protocol::{BridgeImap, BridgeSmtp};

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub verbose: u8,
    pub paths: AppPaths,
    pub settings: Settings,
    pub credential_store: FileCredentialStore,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(
        profile: String,
        json: bool,
        verbose: u8,
        config_path: Option<PathBuf>,
    ) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile)?;
        let paths = AppPaths::discover()?.with_settings_override(config_path);
        let settings = config::load_settings(&paths, &profile)?;
        let credential_store = FileCredentialStore::new(paths.clone());
        let output = Output::new(json);

        Ok(Self {
            profile,
            verbose,
            paths,
            settings,
            credential_store,
            output,
        })
    }

    pub fn credentials(&self) -> AppResult<Credentials> {
        let (credentials, source) = auth::resolve(
            &self.profile,
            &self.settings,
            &self.credential_store,
            env::var(PASSWORD_ENV).ok(),
        )?;
        debug!(profile = %self.profile, ?source, "resolved credentials");
        Ok(credentials)
    }

    /// Opens an authenticated IMAP session wrapped in the mail client.
    pub fn connect_imap(&self) -> AppResult<MailClient<BridgeImap>> {
        let credentials = self.credentials()?;
        let session = BridgeImap::connect(
            &self.settings.imap_endpoint(),
            &credentials.username,
            &credentials.password,
        )?;
        Ok(MailClient::new(session, Folders::from_settings(&self.settings)))
    }

    pub fn connect_smtp(&self) -> AppResult<BridgeSmtp> {
        let credentials = self.credentials()?;
        BridgeSmtp::new(
            &self.settings.smtp_endpoint(),
            &credentials.username,
            &credentials.password,
        )
    }

    pub fn ledger(&self) -> IdempotencyLedger {
        IdempotencyLedger::new(self.paths.idempotency_file())
    }

    /// The requested mailbox, or the profile default.
    pub fn mailbox(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|mailbox| !mailbox.is_empty())
            .unwrap_or_else(|| self.settings.mailbox())
            .to_string()
    }
}
