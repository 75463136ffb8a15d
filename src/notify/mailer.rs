//! SMTP delivery. Both channels ride the same transport; SMS messages are
//! just mail addressed to a carrier gateway.

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// One outbound HTML message per call.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// The sending address, used in headers and run reports.
    fn sender(&self) -> &str;

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// STARTTLS SMTP relay with username/password auth.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    sender_address: String,
}

impl SmtpMailer {
    pub fn new(host: &str, user: &str, password: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("invalid SMTP relay host: {host}"))?
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();
        let sender: Mailbox =
            user.parse().with_context(|| format!("SMTP user is not a mail address: {user}"))?;
        Ok(Self { transport, sender, sender_address: user.to_string() })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn sender(&self) -> &str {
        &self.sender_address
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to.parse().with_context(|| format!("invalid recipient address: {to}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("failed to assemble message")?;

        self.transport.send(message).await.with_context(|| format!("SMTP send to {to} failed"))?;
        debug!("Sent \"{}\" to {}", subject, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_address_user() {
        assert!(SmtpMailer::new("smtp.gmail.com", "not an address", "pw").is_err());
    }

    #[test]
    fn test_new_accepts_address_user() {
        let mailer = SmtpMailer::new("smtp.gmail.com", "watcher@example.com", "pw").unwrap();
        assert_eq!(mailer.sender(), "watcher@example.com");
    }
}
