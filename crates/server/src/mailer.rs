use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqflow_core::config::{EmailConfig, EmailProvider};
use reqflow_core::notify::{Notification, Notifier, NotifyError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email.api_key is required for the http provider")]
    MissingApiKey,
    #[error("could not build the email http client: {0}")]
    Client(#[source] reqwest::Error),
}

pub fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn Notifier>, MailerError> {
    match config.provider {
        EmailProvider::Log => Ok(Arc::new(LogNotifier::new(config.sender.clone()))),
        EmailProvider::Http => {
            let api_key = config.api_key.clone().ok_or(MailerError::MissingApiKey)?;
            let notifier = HttpEmailNotifier::new(
                config.api_url.clone(),
                api_key,
                config.sender.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(notifier))
        }
    }
}

/// Sends mail through a JSON email API (`POST {from, to, subject, html}` with a bearer key).
pub struct HttpEmailNotifier {
    client: Client,
    api_url: String,
    api_key: SecretString,
    sender: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpEmailNotifier {
    pub fn new(
        api_url: String,
        api_key: SecretString,
        sender: String,
        timeout: Duration,
    ) -> Result<Self, MailerError> {
        let client = Client::builder().timeout(timeout).build().map_err(MailerError::Client)?;
        Ok(Self { client, api_url, api_key, sender })
    }
}

#[async_trait]
impl Notifier for HttpEmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&SendEmailRequest {
                from: &self.sender,
                to: [notification.to.as_str()],
                subject: &notification.subject,
                html: &notification.html_body,
            })
            .send()
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Development notifier: records the message in the log instead of sending it.
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: String) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            event_name = "notification.logged",
            from = %self.sender,
            to = %notification.to,
            subject = %notification.subject,
            body_bytes = notification.html_body.len(),
            "email provider is `log`; message not delivered"
        );
        Ok(())
    }
}
