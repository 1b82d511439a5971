use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

/// Default endpoint of the Mailtrap transactional send API.
pub const DEFAULT_MAILTRAP_API_URL: &str = "https://send.api.mailtrap.io/api/send";

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Category label for the provider's analytics.
    pub category: &'static str,
}

/// Trait for transactional email delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError>;
}

/// Send an email, logging instead of failing when rendering or delivery does not work.
///
/// Emails are a side effect of user actions and must never fail the request.
pub async fn send_best_effort(mailer: &dyn Mailer, message: Result<EmailMessage, AppError>) {
    let message = match message {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Skipping email that failed to render: {e}");
            return;
        }
    };
    let to = message.to.clone();
    let category = message.category;
    match mailer.send(message).await {
        Ok(()) => tracing::info!("Sent {category} email to {to}"),
        Err(e) => tracing::warn!("Failed to send {category} email to {to}: {e}"),
    }
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
    category: &'a str,
}

/// Mailtrap implementation of Mailer using the HTTP send API.
pub struct MailtrapMailer {
    http: reqwest::Client,
    api_url: String,
    token: String,
    from_email: String,
    from_name: String,
}

impl MailtrapMailer {
    pub fn new(api_url: String, token: String, from_email: String, from_name: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            token,
            from_email,
            from_name,
        }
    }
}

#[async_trait]
impl Mailer for MailtrapMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        let body = SendRequest {
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            to: vec![Address {
                email: &message.to,
                name: None,
            }],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
            category: message.category,
        };

        self.http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("Failed to reach mail API: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Mail(format!("Mail API rejected message: {e}")))?;

        Ok(())
    }
}

/// Mailer that only logs. Used when no mail provider is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery disabled, dropping email"
        );
        Ok(())
    }
}
