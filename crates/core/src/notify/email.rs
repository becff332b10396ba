//! Email notification sender via SMTP.
//!
//! Uses the `lettre` crate to send HTML-formatted notification emails.
//! Recipients are per-submission, so they are passed per send rather than
//! held on the notifier.

use lettre::message::{header::ContentType, Mailbox};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

use crate::errors::NotificationError;

/// SMTP email notifier.
pub struct EmailNotifier {
    smtp_addr: String,
    from: String,
}

impl EmailNotifier {
    /// `smtp_addr` should be `host:port` (e.g. `smtp.example.com:587`).
    pub fn new(smtp_addr: String, from: String) -> Self {
        info!(smtp = %smtp_addr, from = %from, "initializing email notifier");
        Self { smtp_addr, from }
    }

    /// Send an HTML email to each recipient.
    pub async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        debug!(subject, to = ?recipients, "sending email");

        let from_mailbox: Mailbox = self
            .from
            .parse()
            .map_err(|e| NotificationError::EmailError(format!("invalid from address: {}", e)))?;

        for recipient in recipients {
            let to_mailbox: Mailbox = recipient.parse().map_err(|e| {
                NotificationError::EmailError(format!("invalid recipient '{}': {}", recipient, e))
            })?;

            let email = Message::builder()
                .from(from_mailbox.clone())
                .to(to_mailbox)
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string())
                .map_err(|e| {
                    NotificationError::EmailError(format!("failed to build email: {}", e))
                })?;

            let transport = self.build_transport()?;

            match transport.send(email).await {
                Ok(_) => {
                    info!(to = %recipient, "email sent successfully");
                }
                Err(e) => {
                    warn!(to = %recipient, error = %e, "failed to send email");
                    return Err(NotificationError::EmailError(format!(
                        "SMTP send to '{}' failed: {}",
                        recipient, e
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build an async SMTP transport from the configured address. STARTTLS.
    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
        let parts: Vec<&str> = self.smtp_addr.rsplitn(2, ':').collect();
        let host = if parts.len() == 2 {
            parts[1]
        } else {
            self.smtp_addr.as_str()
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::EmailError(format!("SMTP connection error: {}", e)))?
            .build();

        Ok(transport)
    }
}
