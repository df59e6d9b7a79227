// src/notify/mod.rs
//! Outbound delivery of the weekly report.

pub mod sendgrid;
pub mod smtp;

use anyhow::Result;

use crate::config::MailConfig;

pub use sendgrid::SendGridMailer;
pub use smtp::SmtpMailer;

/// A file attached to a report email.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReportEmail {
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &ReportEmail) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Build the configured transport; `None` means emailing is skipped.
pub fn mailer_from_config(cfg: Option<&MailConfig>) -> Result<Option<Box<dyn Mailer>>> {
    let Some(cfg) = cfg else {
        return Ok(None);
    };
    let mailer: Box<dyn Mailer> = match cfg {
        MailConfig::SendGrid { api_key, to, from } => {
            Box::new(SendGridMailer::new(api_key.clone(), to.clone(), from.clone()))
        }
        MailConfig::Smtp {
            host,
            user,
            pass,
            to,
            from,
        } => Box::new(SmtpMailer::new(host, user.clone(), pass.clone(), to, from)?),
    };
    Ok(Some(mailer))
}
