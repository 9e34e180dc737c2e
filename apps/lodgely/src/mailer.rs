//! # Mailer
//!
//! Transactional email. Production sends through the Resend HTTP API;
//! development logs each message; tests record them in memory.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

// =============================================================================
// TEMPLATES
// =============================================================================

fn render(to: &str, subject: &str, greeting_name: &str, intro: &str, code: &str) -> Email {
    let greeting = if greeting_name.is_empty() {
        "Hi,".to_string()
    } else {
        format!("Hi {greeting_name},")
    };
    let text = format!("{greeting}\n\n{intro}\n\n    {code}\n\nThe Lodgely team\n");
    let html = format!(
        "<!doctype html>\n<html><body>\n<p>{greeting}</p>\n<p>{intro}</p>\n\
         <p style=\"font-size:20px;font-weight:bold;letter-spacing:2px\">{code}</p>\n\
         <p>The Lodgely team</p>\n</body></html>\n",
        greeting = escape_html(&greeting),
        intro = escape_html(intro),
        code = escape_html(code),
    );
    Email {
        to: to.to_string(),
        subject: subject.to_string(),
        text,
        html,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sent after registration.
pub fn verification_email(to: &str, name: &str, code: &str) -> Email {
    render(
        to,
        "Welcome to Lodgely! Confirm your email",
        name,
        "Thanks for signing up. Enter this code to activate your account:",
        code,
    )
}

/// Sent for `POST /v1/user/reset-password`.
pub fn password_reset_email(to: &str, name: &str, code: &str) -> Email {
    render(
        to,
        "Reset your Lodgely password",
        name,
        "We received a request to reset your password. Use this code to choose a new one:",
        code,
    )
}

/// Sent to the current address before an email change.
pub fn email_change_email(to: &str, name: &str, code: &str) -> Email {
    render(
        to,
        "Confirm your Lodgely email change",
        name,
        "Use this code to confirm the change of your account email address:",
        code,
    )
}

// =============================================================================
// RESEND
// =============================================================================

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Sends through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    /// Post to `endpoint` instead of the Resend API.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: [&email.to],
                subject: &email.subject,
                text: &email.text,
                html: &email.html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// =============================================================================
// LOG / MEMORY
// =============================================================================

/// Writes each message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "email not sent (no mail provider configured)\n{}", email.text);
        Ok(())
    }
}

/// Keeps every message. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<Email>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|e| e.to.eq_ignore_ascii_case(to))
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());
        Ok(())
    }
}
