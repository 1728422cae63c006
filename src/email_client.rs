use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::config::EmailClientSettings;
use crate::domain::email_address::EmailAddress;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const SEND_EMAIL_PATH: &str = "/v3/smtp/email";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_RETRY_DELAY: time::Duration = time::Duration::from_millis(1000);
const INVALID_RECIPIENT_ERROR: &str = "Invalid recipient email address";
const NO_ATTEMPTS_ERROR: &str = "Failed to send email after retries";
const DEFAULT_FOOTER: &str = "Childminder Registration Team";

#[derive(thiserror::Error, Debug)]
pub enum EmailClientError {
    #[error("The email provider API key is not configured.")]
    MissingApiKey,
    #[error("The configured sender is not valid: {0}")]
    InvalidSender(String),
    #[error("Failed to build the email HTTP client.")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct EmailSender {
    pub email: EmailAddress,
    pub name: String,
}

/// Bounded exponential backoff: the delay before retry `n` is `initial_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delays slept between consecutive attempts, one fewer than `max_attempts`.
    pub fn backoff_delays(&self) -> impl Iterator<Item = time::Duration> {
        let initial_delay = self.initial_delay;

        (0..self.max_attempts.saturating_sub(1))
            .map(move |retry| initial_delay.saturating_mul(2u32.saturating_pow(retry)))
    }
}

#[derive(Debug, Clone)]
pub struct EmailSendRequest {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EmailSendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl EmailSendResult {
    fn delivered(message_id: Option<String>) -> Self {
        EmailSendResult {
            success: true,
            message_id,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        EmailSendResult {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: EmailSender,
    api_key: Secret<String>,
    retry_policy: RetryPolicy,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: BrevoContact<'a>,
    to: Vec<BrevoContact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

#[derive(serde::Serialize)]
struct BrevoContact<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    message_id: Option<String>,
}

#[derive(thiserror::Error, Debug)]
enum SendAttemptError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("Email provider error ({status}): {body}")]
    Provider { status: StatusCode, body: String },
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: EmailSender,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
        retry_policy: RetryPolicy,
    ) -> Result<EmailClient, EmailClientError> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .map_err(EmailClientError::HttpClient)?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
            retry_policy,
        })
    }

    /// Builds the client from configuration, failing when the API key or sender is unusable.
    pub fn from_settings(settings: &EmailClientSettings) -> Result<EmailClient, EmailClientError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(EmailClientError::MissingApiKey)?;
        let sender = EmailSender {
            email: EmailAddress::parse(settings.sender_email.clone())
                .map_err(EmailClientError::InvalidSender)?,
            name: settings.sender_name.clone(),
        };
        let retry_policy = RetryPolicy {
            max_attempts: settings.max_attempts,
            initial_delay: settings.get_initial_retry_delay(),
        };

        EmailClient::new(
            settings.base_url.clone(),
            sender,
            api_key,
            Some(settings.get_timeout()),
            retry_policy,
        )
    }

    pub async fn send_email(&self, request: &EmailSendRequest) -> EmailSendResult {
        self.send_email_with_retry(request, self.retry_policy).await
    }

    #[tracing::instrument(
        name = "Sending an email through the email provider",
        skip(self, request),
        fields(
            recipient = %request.to,
            subject = %request.subject,
            max_attempts = retry_policy.max_attempts
        )
    )]
    pub async fn send_email_with_retry(
        &self,
        request: &EmailSendRequest,
        retry_policy: RetryPolicy,
    ) -> EmailSendResult {
        let recipient = match EmailAddress::parse(request.to.clone()) {
            Ok(recipient) => recipient,
            Err(err) => {
                tracing::error!("Invalid recipient email: {}", err);
                return EmailSendResult::failed(INVALID_RECIPIENT_ERROR);
            }
        };
        let recipient_name = request.to_name.as_deref().unwrap_or(recipient.as_ref());
        let body = SendEmailBody {
            sender: BrevoContact {
                name: &self.sender.name,
                email: self.sender.email.as_ref(),
            },
            to: vec![BrevoContact {
                name: recipient_name,
                email: recipient.as_ref(),
            }],
            subject: &request.subject,
            html_content: &request.html_content,
        };

        let mut backoff_delays = retry_policy.backoff_delays();
        let mut last_error: Option<String> = None;

        for attempt in 1..=retry_policy.max_attempts {
            tracing::info!(
                "Email send attempt {}/{} to {}",
                attempt,
                retry_policy.max_attempts,
                recipient
            );

            match self.post_email(&body).await {
                Ok(message_id) => {
                    tracing::info!("Email sent successfully, message id: {:?}", message_id);
                    return EmailSendResult::delivered(message_id);
                }
                Err(err) => {
                    tracing::error!("Email send attempt {} failed: {}", attempt, err);
                    last_error = Some(err.to_string());

                    if let Some(delay) = backoff_delays.next() {
                        tracing::info!("Retrying in {}ms...", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        EmailSendResult::failed(last_error.unwrap_or_else(|| String::from(NO_ATTEMPTS_ERROR)))
    }

    async fn post_email(
        &self,
        body: &SendEmailBody<'_>,
    ) -> Result<Option<String>, SendAttemptError> {
        let url = format!("{}{}", self.base_url, SEND_EMAIL_PATH);

        let response = self
            .http_client
            .post(&url)
            .header("accept", "application/json")
            .header("api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendAttemptError::Provider { status, body });
        }

        let response_body: SendEmailResponse = response.json().await?;

        Ok(response_body.message_id)
    }

    /// Wraps trusted HTML content in the shared header/content/footer layout.
    pub fn create_email_template(
        &self,
        title: &str,
        content: &str,
        footer_text: Option<&str>,
    ) -> String {
        format!(
            r#"
<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; border-radius: 8px 8px 0 0; }}
    .content {{ background: #ffffff; padding: 30px; border: 1px solid #e0e0e0; border-top: none; }}
    .footer {{ background: #f5f5f5; padding: 20px; text-align: center; font-size: 12px; color: #666; border-radius: 0 0 8px 8px; }}
    h1 {{ margin: 0; font-size: 24px; }}
    ul {{ padding-left: 20px; }}
    a {{ color: #667eea; text-decoration: none; }}
  </style>
</head>
<body>
  <div class="header">
    <h1>{}</h1>
  </div>
  <div class="content">
    {}
  </div>
  <div class="footer">
    {}<br>
    Email: {}
  </div>
</body>
</html>
"#,
            title,
            content,
            footer_text.unwrap_or(DEFAULT_FOOTER),
            self.sender.email
        )
    }
}
