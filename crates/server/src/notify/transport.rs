//! Mail transport seam and its SMTP implementation.

use crate::config::SmtpConfig;
use crate::error::SendError;
use async_trait::async_trait;
use lettre::message::header::{ContentType, MIME_VERSION_1_0};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// A fully rendered email, identical for every recipient of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Sends one message to one recipient.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, message: &RenderedMessage) -> Result<(), SendError>;
}

/// Pooled, authenticated SMTP session built once at startup.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self, SendError> {
        let builder = if cfg.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.server)?
        };
        let transport = builder
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        Ok(Self::new(transport, sender_mailbox(cfg)?))
    }

    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>, from: Mailbox) -> Self {
        Self { transport, from }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, message: &RenderedMessage) -> Result<(), SendError> {
        let email = build_message(&self.from, to, message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}

/// The `From` mailbox, e.g. `"GuardianshipApp" <alerts@example.org>`.
pub fn sender_mailbox(cfg: &SmtpConfig) -> Result<Mailbox, SendError> {
    let address = parse_address(&cfg.from)?;
    let name = (!cfg.from_name.is_empty()).then(|| cfg.from_name.clone());
    Ok(Mailbox::new(name, address))
}

fn parse_address(address: &str) -> Result<Address, SendError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|e| SendError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Builds a `multipart/alternative` message with plain text and HTML parts.
pub fn build_message(
    from: &Mailbox,
    to: &str,
    message: &RenderedMessage,
) -> Result<Message, SendError> {
    let to = Mailbox::new(None, parse_address(to)?);
    let email = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.clone())
        .header(MIME_VERSION_1_0)
        .message_id(None)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html.clone()),
                ),
        )?;
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            server: "smtp.example.org".into(),
            port: 465,
            username: "mailer".into(),
            password: "secret".into(),
            from: "alerts@example.org".into(),
            from_name: "GuardianshipApp".into(),
            starttls: false,
        }
    }

    fn message() -> RenderedMessage {
        RenderedMessage {
            subject: "EMERGENCY ALERT - Thabo needs help!".into(),
            html: "<p>help</p>".into(),
            text: "help".into(),
        }
    }

    #[test]
    fn sender_uses_display_name() {
        let from = sender_mailbox(&smtp()).unwrap();
        assert_eq!(from.name.as_deref(), Some("GuardianshipApp"));
        assert_eq!(from.email.to_string(), "alerts@example.org");
    }

    #[test]
    fn builds_multipart_message() {
        let from = sender_mailbox(&smtp()).unwrap();
        let email = build_message(&from, "user@example.org", &message()).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: user@example.org"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn invalid_recipient_is_a_send_error() {
        let from = sender_mailbox(&smtp()).unwrap();
        let err = build_message(&from, "not-an-address", &message()).unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn mailer_builds_from_config() {
        let mut cfg = smtp();
        assert!(SmtpMailer::from_config(&cfg).is_ok());
        cfg.starttls = true;
        cfg.port = 587;
        assert!(SmtpMailer::from_config(&cfg).is_ok());
    }
}
