use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Mailer, ReportEmail};

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";
pub const SENDER_NAME: &str = "Trend Reports";

/// Transactional email over the SendGrid v3 HTTP API.
#[derive(Clone)]
pub struct SendGridMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    to: String,
    from: String,
    timeout: Duration,
}

impl SendGridMailer {
    pub fn new(api_key: String, to: String, from: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
            api_key,
            to,
            from,
            timeout: Duration::from_secs(20),
        }
    }

    /// Point at a different API base (tests, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn payload(&self, email: &ReportEmail) -> SendGridPayload {
        SendGridPayload {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: self.to.clone(),
                    name: None,
                }],
            }],
            from: Address {
                email: self.from.clone(),
                name: Some(SENDER_NAME.to_string()),
            },
            subject: email.subject.clone(),
            content: vec![Content {
                kind: "text/plain".to_string(),
                value: email.body.clone(),
            }],
            attachments: vec![SendGridAttachment {
                content: STANDARD.encode(&email.attachment.bytes),
                kind: email.attachment.content_type.to_string(),
                filename: email.attachment.filename.clone(),
                disposition: "attachment".to_string(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &ReportEmail) -> Result<()> {
        let payload = self.payload(email);
        let rsp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("sendgrid request")?;

        let status = rsp.status();
        let text = rsp.text().await.unwrap_or_default();
        let snippet: String = text.chars().take(200).collect();
        tracing::info!(target: "email", status = status.as_u16(), body = %snippet, "sendgrid response");

        if !status.is_success() {
            bail!("sendgrid returned {status}: {snippet}");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

#[derive(Debug, Serialize)]
pub struct SendGridPayload {
    pub personalizations: Vec<Personalization>,
    pub from: Address,
    pub subject: String,
    pub content: Vec<Content>,
    pub attachments: Vec<SendGridAttachment>,
}

#[derive(Debug, Serialize)]
pub struct Personalization {
    pub to: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct Address {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SendGridAttachment {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub disposition: String,
}
