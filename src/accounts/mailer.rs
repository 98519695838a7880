//! Outgoing account mail.

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to send mail to {to}: {reason}")]
pub struct MailError {
    pub to: String,
    pub reason: String,
}

/// Path a confirmation key is redeemed at.
pub fn confirmation_url(key: &str) -> String {
    format!("/accounts/confirm-email/{}/", key)
}

/// Delivers e-mail confirmation messages.
pub trait Mailer: Send + Sync {
    fn send_confirmation(&self, to: &str, key: &str) -> Result<(), MailError>;
}

/// Mailer that only logs the confirmation link.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_confirmation(&self, to: &str, key: &str) -> Result<(), MailError> {
        tracing::info!(to, url = %confirmation_url(key), "E-mail confirmation");
        Ok(())
    }
}

/// A mail recorded by [`MemoryMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub key: String,
}

/// Mailer that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().last().cloned()
    }
}

impl Mailer for MemoryMailer {
    fn send_confirmation(&self, to: &str, key: &str) -> Result<(), MailError> {
        self.sent.lock().push(SentMail {
            to: to.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        assert!(mailer.last().is_none());

        mailer.send_confirmation("a@example.com", "k1").unwrap();
        mailer.send_confirmation("b@example.com", "k2").unwrap();
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(
            mailer.last().unwrap(),
            SentMail {
                to: "b@example.com".to_string(),
                key: "k2".to_string()
            }
        );
    }

    #[test]
    fn test_confirmation_url() {
        assert_eq!(confirmation_url("abc"), "/accounts/confirm-email/abc/");
        assert!(LogMailer.send_confirmation("a@example.com", "abc").is_ok());
    }
}
