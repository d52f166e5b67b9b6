use std::env;
use std::io::{self, IsTerminal, Write};

use serde::Serialize;
use tracing::info;

use crate::auth::{self, CredentialSource, CredentialStore, Credentials, PASSWORD_ENV};
use crate::cli::{AuthCommand, LoginArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::protocol::{BridgeImap, ImapSession};

#[derive(Debug, Serialize)]
struct LoginResult {
    profile: String,
    username: String,
}

#[derive(Debug, Serialize)]
struct LogoutResult {
    profile: String,
    removed: bool,
}

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login(args) => login(ctx, args),
        AuthCommand::Status => {
            let status = auth::status(
                &ctx.profile,
                &ctx.settings,
                &ctx.credential_store,
                env::var(PASSWORD_ENV).ok(),
            )?;
            let text = match (&status.username, status.source) {
                (Some(username), Some(source)) if status.logged_in => {
                    let origin = match source {
                        CredentialSource::Environment => PASSWORD_ENV,
                        CredentialSource::Store => "stored",
                    };
                    format!("{}: logged in as {username} ({origin})", status.profile)
                }
                _ => format!("{}: logged out", status.profile),
            };
            ctx.output.emit(&text, &status)
        }
        AuthCommand::Logout => {
            let removed = ctx.credential_store.clear(&ctx.profile)?;
            let result = LogoutResult {
                profile: ctx.profile.clone(),
                removed,
            };
            let text = if removed {
                format!("{}: logged out", result.profile)
            } else {
                format!("{}: no stored credentials", result.profile)
            };
            ctx.output.emit(&text, &result)
        }
    }
}

/// Verifies the credentials against the bridge before storing them.
fn login(ctx: &AppContext, args: LoginArgs) -> AppResult<()> {
    let username = match args.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => username.to_string(),
        _ => ctx.settings.username()?.to_string(),
    };
    let password = read_password(args.password_stdin)?;

    let mut session = BridgeImap::connect(&ctx.settings.imap_endpoint(), &username, &password)?;
    session.logout()?;
    info!(profile = %ctx.profile, %username, "bridge login verified");

    ctx.credential_store.save(
        &ctx.profile,
        &Credentials {
            username: username.clone(),
            password,
        },
    )?;

    let result = LoginResult {
        profile: ctx.profile.clone(),
        username,
    };
    let text = format!("{}: logged in as {}", result.profile, result.username);
    ctx.output.emit(&text, &result)
}

fn read_password(from_stdin: bool) -> AppResult<String> {
    let stdin = io::stdin();
    if !from_stdin && !stdin.is_terminal() {
        return Err(AppError::InvalidInput(
            "no terminal for the password prompt; pass --password-stdin".to_string(),
        ));
    }

    if !from_stdin {
        let mut stderr = io::stderr();
        write!(stderr, "Bridge password: ")?;
        stderr.flush()?;
    }

    let mut value = String::new();
    stdin.read_line(&mut value)?;
    let password = value.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::InvalidInput("password must not be empty".to_string()));
    }
    Ok(password)
}
