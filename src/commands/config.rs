use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cli::{ConfigCommand, ConfigSetArgs};
use crate::config;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

const PORT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ConfigPath {
    profile: String,
    settings: String,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct Validation {
    profile: String,
    imap: String,
    smtp: String,
    success: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Fail,
}

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Outcome of `config doctor`.
#[derive(Debug, Serialize)]
struct DoctorReport {
    profile: String,
    healthy: bool,
    checks: Vec<Check>,
}

impl DoctorReport {
    fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            healthy: true,
            checks: Vec::new(),
        }
    }

    /// `Ok` carries an optional detail, `Err` the failure reason.
    fn record(&mut self, name: impl Into<String>, outcome: Result<Option<String>, String>) {
        let name = name.into();
        let (status, message) = match outcome {
            Ok(detail) => (CheckStatus::Ok, detail),
            Err(reason) => (CheckStatus::Fail, Some(reason)),
        };
        debug!(check = %name, ?status, "doctor check");
        if status == CheckStatus::Fail {
            self.healthy = false;
        }
        self.checks.push(Check {
            name,
            status,
            message,
        });
    }

    fn failures(&self) -> usize {
        self.checks
            .iter()
            .filter(|check| check.status == CheckStatus::Fail)
            .count()
    }

    fn render(&self) -> String {
        self.checks
            .iter()
            .map(|check| {
                let marker = match check.status {
                    CheckStatus::Ok => "[OK]  ",
                    CheckStatus::Fail => "[FAIL]",
                };
                match &check.message {
                    Some(message) => format!("{marker} {} - {message}", check.name),
                    None => format!("{marker} {}", check.name),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn run(ctx: &AppContext, command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => {
            let effective = ctx.settings.effective();
            let text = serde_json::to_string_pretty(&effective)?;
            ctx.output.emit(&text, &effective)
        }
        ConfigCommand::Set(args) => set(ctx, args),
        ConfigCommand::Path => {
            let path = ctx.paths.settings_file(&ctx.profile);
            let result = ConfigPath {
                profile: ctx.profile.clone(),
                settings: path.display().to_string(),
                exists: path.exists(),
            };
            ctx.output.emit(&result.settings, &result)
        }
        ConfigCommand::Validate => validate(ctx),
        ConfigCommand::Doctor => doctor(ctx),
    }
}

fn set(ctx: &AppContext, args: ConfigSetArgs) -> AppResult<()> {
    let mut settings = ctx.settings.clone();
    settings.set(&args.key, &args.value)?;
    config::save_settings(&ctx.paths, &ctx.profile, &settings)?;

    let effective = settings.effective();
    let text = if args.value.trim().is_empty() {
        format!("{}: cleared {}", ctx.profile, args.key)
    } else {
        format!("{}: {} = {}", ctx.profile, args.key, args.value.trim())
    };
    ctx.output.emit(&text, &effective)
}

fn validate(ctx: &AppContext) -> AppResult<()> {
    let imap = ctx.settings.imap_endpoint();
    let smtp = ctx.settings.smtp_endpoint();

    ctx.connect_imap()?.logout()?;
    ctx.connect_smtp()?.verify()?;

    let result = Validation {
        profile: ctx.profile.clone(),
        imap: format!("{}:{}", imap.host, imap.port),
        smtp: format!("{}:{}", smtp.host, smtp.port),
        success: true,
    };
    let text = format!(
        "logged in to the bridge at {} (imap) and {} (smtp)",
        result.imap, result.smtp
    );
    ctx.output.emit(&text, &result)
}

fn doctor(ctx: &AppContext) -> AppResult<()> {
    let mut report = DoctorReport::new(&ctx.profile);

    let settings_file = ctx.paths.settings_file(&ctx.profile);
    report.record(
        "settings file exists",
        if settings_file.exists() {
            Ok(Some(settings_file.display().to_string()))
        } else {
            Err(format!("not found at {}", settings_file.display()))
        },
    );

    report.record(
        "email configured",
        ctx.settings
            .email()
            .map(|email| Some(email.to_string()))
            .map_err(|err| err.to_string()),
    );

    let credentials = ctx.credentials();
    report.record(
        "credentials available",
        credentials
            .as_ref()
            .map(|_| None)
            .map_err(ToString::to_string),
    );

    let imap = ctx.settings.imap_endpoint();
    report.record(
        "imap port reachable",
        port_reachable(&imap.host, imap.port, PORT_TIMEOUT),
    );
    let smtp = ctx.settings.smtp_endpoint();
    report.record(
        "smtp port reachable",
        port_reachable(&smtp.host, smtp.port, PORT_TIMEOUT),
    );

    if credentials.is_ok() {
        report.record(
            "imap login",
            ctx.connect_imap()
                .and_then(|client| client.logout())
                .map(|()| None)
                .map_err(|err| err.to_string()),
        );
        report.record(
            "smtp login",
            ctx.connect_smtp()
                .and_then(|smtp| smtp.verify())
                .map(|()| None)
                .map_err(|err| err.to_string()),
        );
    } else {
        let skipped = || Err("cannot test without credentials".to_string());
        report.record("imap login", skipped());
        report.record("smtp login", skipped());
    }

    ctx.output.emit(&report.render(), &report)?;
    if report.healthy {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{} of {} checks failed",
            report.failures(),
            report.checks.len()
        )))
    }
}

fn port_reachable(host: &str, port: u16, timeout: Duration) -> Result<Option<String>, String> {
    let address = format!("{host}:{port}");
    let targets = (host, port)
        .to_socket_addrs()
        .map_err(|err| format!("cannot resolve {address}: {err}"))?;

    let mut last_error = None;
    for target in targets {
        match TcpStream::connect_timeout(&target, timeout) {
            Ok(_) => return Ok(Some(address)),
            Err(err) => last_error = Some(err),
        }
    }

    Err(match last_error {
        Some(err) => format!("cannot connect to {address}: {err}; is the bridge running?"),
        None => format!("{address} resolved to no addresses"),
    })
}
