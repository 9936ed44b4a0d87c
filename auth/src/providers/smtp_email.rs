//! SMTP email provider implementation using Lettre.

use crate::error::{AuthError, Result};
use crate::providers::{EmailProvider, OrderConfirmation, PayoutUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP email provider using Lettre, for production use.
#[derive(Clone)]
pub struct SmtpEmailProvider {
    /// SMTP server address.
    smtp_server: String,
    /// SMTP server port.
    smtp_port: u16,
    /// SMTP credentials.
    credentials: Credentials,
    /// Sender email address.
    from_email: String,
    /// Sender display name.
    from_name: String,
}

impl SmtpEmailProvider {
    /// Creates a new SMTP email provider.
    #[must_use]
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        let credentials = Credentials::new(smtp_username, smtp_password);
        Self {
            smtp_server,
            smtp_port,
            credentials,
            from_email,
            from_name,
        }
    }

    /// Builds an SMTP transport. A new transport per message avoids stale
    /// pooled connections on infrequent sends.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| AuthError::EmailError(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Builds and sends one HTML message on the blocking pool.
    async fn send_html(&self, to: &str, subject: &str, html_body: String) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AuthError::EmailError(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::EmailError(format!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| AuthError::EmailError(format!("failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AuthError::EmailError(format!("failed to send email: {e}")))
        })
        .await
        .map_err(|e| AuthError::EmailError(format!("email task failed: {e}")))?
        .map(|_| ())
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailProvider {
    async fn send_magic_link(
        &self,
        to: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let expires_minutes = (expires_at - Utc::now()).num_minutes();

        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Sign in to Boxoffice</h2>
        <p>Click the link below to sign in. This link can be used once and expires in {expires_minutes} minutes.</p>
        <p style="margin: 30px 0;">
            <a href="{link}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Sign In
            </a>
        </p>
        <p style="color: #666; font-size: 14px;">
            If you didn't request this email, you can safely ignore it.
        </p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Or copy and paste this link into your browser:<br>
            {link}
        </p>
    </div>
</body>
</html>
            "#
        );

        self.send_html(to, "Sign in to Boxoffice", html_body).await
    }

    async fn send_order_confirmation(
        &self,
        to: &str,
        confirmation: &OrderConfirmation,
    ) -> Result<()> {
        let codes = confirmation
            .ticket_codes
            .iter()
            .map(|c| format!("<li style=\"font-family: monospace;\">{c}</li>"))
            .collect::<Vec<_>>()
            .join("\n");

        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #16a34a;">Your tickets for {event}</h2>
        <p>{quantity} × {ticket_type} — total paid {total}.</p>
        <p>Present any of these codes at the door:</p>
        <ul>
{codes}
        </ul>
        <p style="color: #666; font-size: 14px;">
            Keep this email; the codes are your tickets.
        </p>
    </div>
</body>
</html>
            "#,
            event = confirmation.event_title,
            quantity = confirmation.quantity,
            ticket_type = confirmation.ticket_type,
            total = confirmation.total,
        );

        self.send_html(
            to,
            &format!("Your tickets for {}", confirmation.event_title),
            html_body,
        )
        .await
    }

    async fn send_payout_update(&self, to: &str, update: &PayoutUpdate) -> Result<()> {
        let detail = match &update.failure_reason {
            Some(reason) => format!("<p>Reason: {reason}</p>"),
            None => String::new(),
        };

        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2>Payout {status}</h2>
        <p>Your payout of {amount} is now <strong>{status}</strong>.</p>
        {detail}
    </div>
</body>
</html>
            "#,
            status = update.status,
            amount = update.amount,
        );

        self.send_html(to, &format!("Payout {}", update.status), html_body)
            .await
    }
}
