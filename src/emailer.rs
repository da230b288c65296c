//! # Email Delivery
//!
//! Sends the composed report as a single plain-text message over SMTP with STARTTLS.
//! The sender address doubles as the SMTP username and the password is an app
//! credential.
//!
//! ## Addressing
//! - **To**: the configured primary recipient, left out entirely when empty
//! - **Bcc**: every resolved recipient; the header is omitted when the list is empty
//!
//! Bcc addresses are placed on the SMTP envelope and stripped from the transmitted
//! headers, so recipients do not see each other.

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmailConfig;

#[derive(Error, Debug)]
pub enum DispatchError {
    /// No SMTP password configured; raised before any network I/O
    #[error("SMTP credentials are missing")]
    MissingCredentials,

    #[error("invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    /// Neither the primary recipient nor any Bcc address is usable
    #[error("no valid recipients")]
    NoRecipients,

    #[error("cannot build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A fully addressed report email.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub sender: String,
    /// Primary recipient; empty means no visible To
    pub recipient: String,
    pub bcc: Vec<String>,
}

impl OutgoingEmail {
    /// Human-readable headers and body, as printed in dry-run mode.
    pub fn preview(&self) -> String {
        let mut preview = String::new();
        if !self.recipient.is_empty() {
            preview.push_str(&format!("To: {}\n", self.recipient));
        }
        if !self.bcc.is_empty() {
            preview.push_str(&format!("Bcc: {}\n", self.bcc.join(", ")));
        }
        preview.push_str(&format!("From: {}\n", self.sender));
        preview.push_str(&format!("Subject: {}\n\n", self.subject));
        preview.push_str(&self.body);
        preview
    }

    /// Build the MIME message. Bcc recipients end up on the envelope only.
    ///
    /// Malformed Bcc entries are logged and skipped; the message is only refused
    /// when no recipient at all is left.
    pub fn to_message(&self) -> Result<Message, DispatchError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        let mut usable = 0;
        if !self.recipient.trim().is_empty() {
            builder = builder.to(parse_mailbox(&self.recipient)?);
            usable += 1;
        }
        for address in &self.bcc {
            match parse_mailbox(address) {
                Ok(mailbox) => {
                    builder = builder.bcc(mailbox);
                    usable += 1;
                }
                Err(err) => warn!(error = %err, "Skipping malformed recipient"),
            }
        }

        if usable == 0 {
            return Err(DispatchError::NoRecipients);
        }
        Ok(builder.body(self.body.clone())?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| DispatchError::Address {
            address: address.to_string(),
            source,
        })
}

/// SMTP sender bound to one relay.
#[derive(Clone, Debug)]
pub struct EmailDispatcher {
    host: String,
    port: u16,
    timeout: Duration,
}

impl EmailDispatcher {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        EmailDispatcher {
            host: host.to_string(),
            port,
            timeout,
        }
    }

    pub fn from_config(email: &EmailConfig, timeout: Duration) -> Self {
        Self::new(&email.smtp_server, email.smtp_port, timeout)
    }

    /// Authenticate with STARTTLS and send `email`.
    ///
    /// The password is checked before the message is built or any connection made.
    pub async fn send(
        &self,
        email: &OutgoingEmail,
        password: Option<&str>,
    ) -> Result<(), DispatchError> {
        let password = match password {
            Some(password) if !password.is_empty() => password,
            _ => return Err(DispatchError::MissingCredentials),
        };
        if email.sender.trim().is_empty() {
            return Err(DispatchError::MissingCredentials);
        }

        let message = email.to_message()?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(
                email.sender.trim().to_string(),
                password.to_string(),
            ))
            .timeout(Some(self.timeout))
            .build();

        mailer.send(message).await?;
        info!(
            host = %self.host,
            bcc = email.bcc.len(),
            "Email sent successfully"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(recipient: &str, bcc: &[&str]) -> OutgoingEmail {
        OutgoingEmail {
            subject: "🌊 Daily Water Report: 2024-07-01".to_string(),
            body: "Daily Water Report".to_string(),
            sender: "reports@example.com".to_string(),
            recipient: recipient.to_string(),
            bcc: bcc.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_bcc_goes_to_envelope_not_headers() {
        let message = email("", &["a@x.com", "b@x.com"]).to_message().unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(!formatted.contains("Bcc:"));
        assert!(!formatted.contains("To:"));
        let envelope: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(envelope, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_primary_recipient_in_to_header() {
        let message = email("captain@x.com", &[]).to_message().unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("To: captain@x.com"));
        assert!(formatted.contains("From: reports@example.com"));
    }

    #[test]
    fn test_malformed_bcc_is_skipped() {
        let message = email("", &["a@x.com", "not-an-address", "b@x.com"])
            .to_message()
            .unwrap();
        let envelope: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(envelope, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_no_usable_recipient_rejected() {
        let err = email("", &["not-an-address"]).to_message().unwrap_err();
        assert!(matches!(err, DispatchError::NoRecipients));
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut outgoing = email("", &["a@x.com"]);
        outgoing.sender = "reports".to_string();
        let err = outgoing.to_message().unwrap_err();
        assert!(matches!(err, DispatchError::Address { .. }));
    }

    #[test]
    fn test_preview_uses_comma_joined_bcc() {
        let preview = email("captain@x.com", &["a@x.com", "b@x.com"]).preview();
        assert!(preview.starts_with("To: captain@x.com\nBcc: a@x.com, b@x.com\nFrom: reports@example.com\n"));
        assert!(preview.ends_with("\n\nDaily Water Report"));
    }

    #[test]
    fn test_preview_omits_empty_bcc() {
        let preview = email("captain@x.com", &[]).preview();
        assert!(!preview.contains("Bcc:"));
    }

    #[tokio::test]
    async fn test_missing_password_fails_before_io() {
        // Unroutable host: reaching the network would fail differently
        let dispatcher = EmailDispatcher::new("smtp.invalid", 587, Duration::from_secs(1));
        let outgoing = email("", &["a@x.com"]);

        let err = dispatcher.send(&outgoing, None).await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingCredentials));
        let err = dispatcher.send(&outgoing, Some("")).await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingCredentials));
    }
}
