//! # Outbound Mail Contract
//!
//! Delivery is an external collaborator; this module only defines the seam.
//! [`LogMailer`] records every send and logs it, which is all the binary
//! needs without an SMTP relay and exactly what tests need to observe
//! activation tokens.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A rendered message handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub recipient: String,
    pub template: &'static str,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailerError>;
}

/// Records and logs outbound mail instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything "sent" so far, oldest first.
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailerError> {
        tracing::info!(
            recipient = %mail.recipient,
            template = mail.template,
            "outbound mail recorded"
        );
        self.sent.lock().push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_records_sends_in_order() {
        let mailer = LogMailer::new();
        for i in 0..3 {
            mailer
                .send(Mail {
                    recipient: format!("user{i}@example.com"),
                    template: "user_welcome",
                    payload: serde_json::json!({ "i": i }),
                })
                .await
                .expect("send");
        }
        let sent = mailer.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].recipient, "user0@example.com");
        assert_eq!(sent[2].payload["i"], 2);
    }
}
