use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::protocol::imap::ImapEndpoint;
use crate::protocol::smtp::{SmtpEndpoint, SmtpSecurity};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_IMAP_PORT: u16 = 1143;
const DEFAULT_SMTP_PORT: u16 = 1025;
const DEFAULT_MAILBOX: &str = "INBOX";
const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_DRAFTS: &str = "Drafts";
const DEFAULT_TRASH: &str = "Trash";
const DEFAULT_LABEL_PREFIX: &str = "Labels/";

pub const KEYS: &[&str] = &[
    "email",
    "username",
    "sender_name",
    "imap_host",
    "imap_port",
    "smtp_host",
    "smtp_port",
    "smtp_security",
    "accept_invalid_certs",
    "mailbox",
    "limit",
    "drafts_mailbox",
    "trash_mailbox",
    "label_prefix",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imap_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imap_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_security: Option<SmtpSecurity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_invalid_certs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drafts_mailbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_mailbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_prefix: Option<String>,
}

/// Settings with every default applied, as shown by `config show`.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveSettings {
    pub email: Option<String>,
    pub username: Option<String>,
    pub sender_name: Option<String>,
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_security: SmtpSecurity,
    pub accept_invalid_certs: bool,
    pub mailbox: String,
    pub limit: u32,
    pub drafts_mailbox: String,
    pub trash_mailbox: String,
    pub label_prefix: String,
}

impl Settings {
    pub fn email(&self) -> AppResult<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "missing email in profile settings. run `pmail config set email <address>`"
                        .to_string(),
                )
            })
    }

    /// Login name for IMAP/SMTP; defaults to the email address.
    pub fn username(&self) -> AppResult<&str> {
        match self.username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => Ok(username),
            _ => self.email(),
        }
    }

    /// `From` header value, with the display name when one is configured.
    pub fn from_header(&self) -> AppResult<String> {
        let email = self.email()?;
        Ok(match self.sender_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name} <{email}>"),
            _ => email.to_string(),
        })
    }

    pub fn mailbox(&self) -> &str {
        self.mailbox.as_deref().unwrap_or(DEFAULT_MAILBOX)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn drafts_mailbox(&self) -> &str {
        self.drafts_mailbox.as_deref().unwrap_or(DEFAULT_DRAFTS)
    }

    pub fn trash_mailbox(&self) -> &str {
        self.trash_mailbox.as_deref().unwrap_or(DEFAULT_TRASH)
    }

    pub fn label_prefix(&self) -> &str {
        self.label_prefix.as_deref().unwrap_or(DEFAULT_LABEL_PREFIX)
    }

    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs.unwrap_or(true)
    }

    pub fn imap_endpoint(&self) -> ImapEndpoint {
        ImapEndpoint {
            host: self
                .imap_host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.imap_port.unwrap_or(DEFAULT_IMAP_PORT),
            accept_invalid_certs: self.accept_invalid_certs(),
        }
    }

    pub fn smtp_endpoint(&self) -> SmtpEndpoint {
        SmtpEndpoint {
            host: self
                .smtp_host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            security: self.smtp_security.unwrap_or_default(),
            accept_invalid_certs: self.accept_invalid_certs(),
        }
    }

    pub fn effective(&self) -> EffectiveSettings {
        let imap = self.imap_endpoint();
        let smtp = self.smtp_endpoint();
        EffectiveSettings {
            email: self.email.clone(),
            username: self.username.clone(),
            sender_name: self.sender_name.clone(),
            imap_host: imap.host,
            imap_port: imap.port,
            smtp_host: smtp.host,
            smtp_port: smtp.port,
            smtp_security: smtp.security,
            accept_invalid_certs: self.accept_invalid_certs(),
            mailbox: self.mailbox().to_string(),
            limit: self.limit(),
            drafts_mailbox: self.drafts_mailbox().to_string(),
            trash_mailbox: self.trash_mailbox().to_string(),
            label_prefix: self.label_prefix().to_string(),
        }
    }

    /// Sets one key from its textual form. An empty value clears it.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());

        match key {
            "email" => self.email = text,
            "username" => self.username = text,
            "sender_name" => self.sender_name = text,
            "imap_host" => self.imap_host = text,
            "imap_port" => self.imap_port = parse_value(key, text)?,
            "smtp_host" => self.smtp_host = text,
            "smtp_port" => self.smtp_port = parse_value(key, text)?,
            "smtp_security" => {
                self.smtp_security = match text.as_deref() {
                    None => None,
                    Some("starttls") => Some(SmtpSecurity::Starttls),
                    Some("tls") => Some(SmtpSecurity::Tls),
                    Some(other) => {
                        return Err(AppError::InvalidInput(format!(
                            "smtp_security must be `starttls` or `tls`, got {other:?}"
                        )));
                    }
                }
            }
            "accept_invalid_certs" => self.accept_invalid_certs = parse_value(key, text)?,
            "mailbox" => self.mailbox = text,
            "limit" => {
                let limit: Option<u32> = parse_value(key, text)?;
                if limit == Some(0) {
                    return Err(AppError::InvalidInput(
                        "limit must be greater than 0".to_string(),
                    ));
                }
                self.limit = limit;
            }
            "drafts_mailbox" => self.drafts_mailbox = text,
            "trash_mailbox" => self.trash_mailbox = text,
            "label_prefix" => self.label_prefix = text,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "unknown setting {other:?}; expected one of: {}",
                    KEYS.join(", ")
                )));
            }
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, text: Option<String>) -> AppResult<Option<T>> {
    text.map(|raw| {
        raw.parse::<T>()
            .map_err(|_| AppError::InvalidInput(format!("invalid value for {key}: {raw:?}")))
    })
    .transpose()
}

pub fn load(path: PathBuf) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn save(path: PathBuf, settings: &Settings) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(settings)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_bridge() {
        let settings = Settings::default();
        let imap = settings.imap_endpoint();
        let smtp = settings.smtp_endpoint();

        assert_eq!((imap.host.as_str(), imap.port), ("127.0.0.1", 1143));
        assert_eq!((smtp.host.as_str(), smtp.port), ("127.0.0.1", 1025));
        assert_eq!(smtp.security, SmtpSecurity::Starttls);
        assert!(settings.accept_invalid_certs());
        assert_eq!(settings.mailbox(), "INBOX");
        assert_eq!(settings.limit(), 20);
        assert_eq!(settings.label_prefix(), "Labels/");
    }

    #[test]
    fn sets_and_clears_values() {
        let mut settings = Settings::default();
        settings.set("imap_port", "2143").expect("set port");
        settings.set("smtp_security", "tls").expect("set security");
        settings.set("email", "me@proton.me").expect("set email");
        assert_eq!(settings.imap_endpoint().port, 2143);
        assert_eq!(settings.smtp_endpoint().security, SmtpSecurity::Tls);
        assert_eq!(settings.username().expect("username"), "me@proton.me");

        settings.set("imap_port", "").expect("clear port");
        assert_eq!(settings.imap_port, None);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("colour", "blue"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(settings.set("imap_port", "many").is_err());
        assert!(settings.set("limit", "0").is_err());
        assert!(settings.set("smtp_security", "plain").is_err());
    }

    #[test]
    fn from_header_uses_sender_name() {
        let settings = Settings {
            email: Some("me@proton.me".to_string()),
            sender_name: Some("Me Myself".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.from_header().expect("from"),
            "Me Myself <me@proton.me>"
        );
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profiles").join("default.json");
        let mut settings = Settings::default();
        settings.set("mailbox", "Archive").expect("set");
        save(path.clone(), &settings).expect("save");

        let loaded = load(path).expect("load");
        assert_eq!(loaded.mailbox(), "Archive");
        assert_eq!(loaded.imap_port, None);
    }
}
