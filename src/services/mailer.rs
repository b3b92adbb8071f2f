//! Outbound mail
//! Transport is pluggable; the bundled `LogMailer` writes messages to the log

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryInfo {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryInfo, MailerError>;
}

/// Development mailer: logs each message instead of delivering it
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryInfo, MailerError> {
        let message_id = format!("<{}@reporacoon>", Uuid::new_v4());

        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Outgoing email"
        );
        tracing::debug!(html = %email.html, "Outgoing email body");

        Ok(DeliveryInfo { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_assigns_message_id() {
        let mailer = LogMailer::new("no-reply@reporacoon.dev");
        let info = mailer
            .send(OutgoingEmail {
                to: "raccoon@example.com".to_string(),
                subject: "hi".to_string(),
                html: "<p>hi</p>".to_string(),
            })
            .await
            .unwrap();

        assert!(info.message_id.ends_with("@reporacoon>"));
    }
}
