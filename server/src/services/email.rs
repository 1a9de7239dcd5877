//! Verification email delivery.
//!
//! Codes are delivered through Resend when `RESEND_API_KEY` and `RESEND_FROM`
//! are configured. Without a provider the code is written to the server log
//! so local development can complete the registration flow.

use askama::Template;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;

use crate::config::ResendConfig;

const VERIFICATION_SUBJECT: &str = "Movie API - Verify Your Email";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
    #[error("email template failed: {0}")]
    Template(#[from] askama::Error),
}

/// Verification message body. Every field is HTML-escaped on render.
#[derive(Template)]
#[template(path = "verification_email.html")]
struct VerificationEmail<'a> {
    name: &'a str,
    email: &'a str,
    code: &'a str,
    minutes: i64,
}

/// # Errors
///
/// Returns [`EmailError::Template`] if rendering fails.
pub fn render_verification_email(name: &str, email: &str, code: &str, minutes: i64) -> Result<String, EmailError> {
    Ok(VerificationEmail { name, email, code, minutes }.render()?)
}

async fn send_via_resend(config: &ResendConfig, to_email: &str, html: &str) -> Result<(), EmailError> {
    let resend = Resend::new(&config.api_key);
    let to = [to_email];
    let email = CreateEmailBaseOptions::new(&config.from, to, VERIFICATION_SUBJECT).with_html(html);
    resend
        .emails
        .send(email)
        .await
        .map_err(|e| EmailError::Delivery(e.to_string()))?;
    Ok(())
}

/// Deliver a verification code, falling back to the log when no provider is set.
///
/// # Errors
///
/// Returns [`EmailError::Delivery`] if the configured provider rejects the message.
pub async fn deliver_verification_code(
    config: Option<&ResendConfig>,
    name: &str,
    to_email: &str,
    code: &str,
    minutes: i64,
) -> Result<(), EmailError> {
    let Some(config) = config else {
        tracing::warn!(email = %to_email, %code, "mail delivery not configured; verification code logged");
        return Ok(());
    };

    let html = render_verification_email(name, to_email, code, minutes)?;
    send_via_resend(config, to_email, &html).await
}

#[cfg(test)]
#[path = "email_test.rs"]
mod tests;
