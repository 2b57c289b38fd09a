pub mod templates;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::{Recipient, Submission};
use crate::state::AppState;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_notification(
        &self,
        recipients: &[&Recipient],
        submission: &Submission,
    ) -> Result<(), String> {
        let mut builder = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .subject(templates::notification_subject(&submission.name))
            .header(ContentType::TEXT_PLAIN);

        for recipient in recipients {
            builder = builder.to(recipient
                .email
                .parse()
                .map_err(|e| format!("Invalid recipient address: {e}"))?);
        }

        let message = builder
            .body(templates::render_notification(
                &submission.name,
                &submission.data.0,
            ))
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

/// Send the notification email for a submission, best-effort. SMTP failures
/// and unconfigured transports are logged; the submitter never sees them.
pub async fn notify(state: &AppState, submission: &Submission) {
    let Some(mailer) = &state.mailer else {
        tracing::warn!(
            "SMTP not configured; skipping notification for form {:?}",
            submission.name
        );
        return;
    };

    let recipients: Vec<&Recipient> = submission
        .recipients
        .0
        .iter()
        .filter(|recipient| is_valid_recipient(&recipient.email))
        .collect();
    if recipients.is_empty() {
        tracing::debug!("form {:?} has no valid recipients", submission.name);
        return;
    }

    if let Err(err) = mailer.send_notification(&recipients, submission).await {
        tracing::error!(
            "notification for form {:?} failed: {err}",
            submission.name
        );
    }
}

/// Recipients come from editor-entered configuration; skip addresses that
/// cannot possibly deliver rather than failing the whole notification.
pub fn is_valid_recipient(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.contains(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_validation_rejects_junk() {
        assert!(is_valid_recipient("ops@example.com"));
        assert!(!is_valid_recipient("nope"));
        assert!(!is_valid_recipient("@example.com"));
        assert!(!is_valid_recipient("a@nodot"));
        assert!(!is_valid_recipient("a@bad domain.com"));
    }
}
