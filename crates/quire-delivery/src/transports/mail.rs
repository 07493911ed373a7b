//! Email delivery over a pluggable mail client.

use crate::report::Receipt;
use crate::target::{DeliveryTarget, TransportKind};
use crate::{Transport, TransportError};
use log::debug;
use quire_types::{Artifact, CredentialsRef};

/// An assembled outbound message: envelope, text body and the artifact
/// as its single attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from_address: String,
    pub to_addresses: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment_filename: String,
    pub attachment_content_type: String,
    pub attachment_bytes: Vec<u8>,
}

/// Builds [`EmailMessage`]s from a fixed sender identity plus per-send
/// recipients and artifact.
#[derive(Debug, Clone)]
pub struct EmailMessageBuilder {
    from_address: String,
    subject: String,
    body: String,
}

impl EmailMessageBuilder {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
            subject: String::new(),
            body: String::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Assemble a message carrying `artifact` as an attachment.
    ///
    /// An empty subject falls back to the artifact filename so the message
    /// is never subjectless.
    pub fn build(&self, to_addresses: Vec<String>, artifact: &Artifact) -> EmailMessage {
        let subject = if self.subject.is_empty() {
            artifact.filename().to_string()
        } else {
            self.subject.clone()
        };
        EmailMessage {
            from_address: self.from_address.clone(),
            to_addresses,
            subject,
            body: self.body.clone(),
            attachment_filename: artifact.filename().to_string(),
            attachment_content_type: artifact.content_type().to_string(),
            attachment_bytes: artifact.bytes().to_vec(),
        }
    }
}

/// The minimal surface a mail relay exposes: authenticate, then submit
/// one message. Implemented over a real SMTP client in deployment and
/// over a mock in tests.
///
/// Connection-level failures (relay unreachable, timeout) are transient;
/// rejected authentication or a rejected envelope is permanent.
pub trait MailClient: Send + Sync {
    fn submit(
        &self,
        credentials: &CredentialsRef,
        message: &EmailMessage,
    ) -> Result<(), TransportError>;
}

/// Delivers artifacts as email attachments.
///
/// The target address holds the recipient list, comma-separated.
pub struct MailTransport<C: MailClient> {
    client: C,
    builder: EmailMessageBuilder,
}

impl<C: MailClient> MailTransport<C> {
    pub fn new(client: C, builder: EmailMessageBuilder) -> Self {
        Self { client, builder }
    }
}

fn recipients(address: &str) -> Result<Vec<String>, TransportError> {
    let to: Vec<String> = address
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    if to.is_empty() {
        return Err(TransportError::Permanent(
            "target address holds no recipients".to_string(),
        ));
    }
    Ok(to)
}

impl<C: MailClient> Transport for MailTransport<C> {
    fn kind(&self) -> TransportKind {
        TransportKind::Email
    }

    fn send(
        &self,
        artifact: &Artifact,
        target: &DeliveryTarget,
    ) -> Result<Receipt, TransportError> {
        let to = recipients(&target.address)?;
        debug!(
            "[DISPATCH] Mailing {} bytes to {} recipient(s)",
            artifact.len(),
            to.len()
        );
        let message = self.builder.build(to, artifact);
        self.client.submit(&target.credentials, &message)?;
        Ok(Receipt {
            destination: target.destination_for(artifact),
            bytes: artifact.len(),
        })
    }

    fn name(&self) -> &'static str {
        "MailTransport"
    }
}
