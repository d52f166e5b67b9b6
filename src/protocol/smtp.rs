use lettre::address::{Address as EnvelopeAddress, Envelope};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::mail::compose::ComposedMessage;

use super::SmtpSession;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    #[default]
    Starttls,
    Tls,
}

#[derive(Debug, Clone)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub accept_invalid_certs: bool,
}

/// SMTP submission to a local bridge with AUTH PLAIN.
pub struct BridgeSmtp {
    transport: SmtpTransport,
}

impl BridgeSmtp {
    pub fn new(endpoint: &SmtpEndpoint, username: &str, password: &str) -> AppResult<Self> {
        let parameters = TlsParameters::builder(endpoint.host.clone())
            .dangerous_accept_invalid_certs(endpoint.accept_invalid_certs)
            .dangerous_accept_invalid_hostnames(endpoint.accept_invalid_certs)
            .build()
            .map_err(|err| AppError::protocol("smtp tls setup", err))?;
        let tls = match endpoint.security {
            SmtpSecurity::Starttls => Tls::Required(parameters),
            SmtpSecurity::Tls => Tls::Wrapper(parameters),
        };

        let transport = SmtpTransport::builder_dangerous(&endpoint.host)
            .port(endpoint.port)
            .tls(tls)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .authentication(vec![Mechanism::Plain])
            .build();

        Ok(Self { transport })
    }

    /// Connects, negotiates TLS and authenticates without submitting anything.
    pub fn verify(&self) -> AppResult<()> {
        match self.transport.test_connection() {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::Protocol(
                "smtp connection check: server did not answer NOOP".to_string(),
            )),
            Err(err) => Err(AppError::protocol("smtp connection check", err)),
        }
    }
}

impl SmtpSession for BridgeSmtp {
    fn send(&mut self, message: &ComposedMessage) -> AppResult<()> {
        let sender = parse_address(&message.sender)?;
        let recipients = message
            .recipients
            .iter()
            .map(|recipient| parse_address(recipient))
            .collect::<AppResult<Vec<_>>>()?;
        let envelope = Envelope::new(Some(sender), recipients)
            .map_err(|err| AppError::protocol("smtp envelope", err))?;

        debug!(
            recipients = message.recipients.len(),
            bytes = message.bytes.len(),
            "submitting message"
        );
        let response = self
            .transport
            .send_raw(&envelope, &message.bytes)
            .map_err(|err| AppError::protocol("smtp send", err))?;
        info!(code = %response.code(), "message accepted");
        Ok(())
    }
}

fn parse_address(address: &str) -> AppResult<EnvelopeAddress> {
    address
        .parse()
        .map_err(|err| AppError::InvalidInput(format!("invalid address {address:?}: {err}")))
}
