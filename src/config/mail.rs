// src/config/mail.rs
use std::fmt;

use lettre::message::Mailbox;

use super::{ConfigError, Settings};

pub const ENV_MAIL_TRANSPORT: &str = "MAIL_TRANSPORT";
pub const ENV_REPORT_TO: &str = "REPORT_TO_EMAIL";
pub const ENV_REPORT_FROM: &str = "REPORT_FROM_EMAIL";

/// How the weekly report is delivered. Built only when every required value
/// is present; otherwise emailing is skipped.
#[derive(Clone, PartialEq, Eq)]
pub enum MailConfig {
    SendGrid {
        api_key: String,
        to: String,
        from: String,
    },
    Smtp {
        host: String,
        user: String,
        pass: String,
        to: String,
        from: String,
    },
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailConfig::SendGrid { to, from, .. } => f
                .debug_struct("SendGrid")
                .field("to", to)
                .field("from", from)
                .finish_non_exhaustive(),
            MailConfig::Smtp { host, to, from, .. } => f
                .debug_struct("Smtp")
                .field("host", host)
                .field("to", to)
                .field("from", from)
                .finish_non_exhaustive(),
        }
    }
}

impl MailConfig {
    pub fn from_settings(s: &Settings) -> Result<Option<Self>, ConfigError> {
        let to = s.get(ENV_REPORT_TO);
        let from = s.get(ENV_REPORT_FROM);

        let transport = s.get_or(ENV_MAIL_TRANSPORT, "sendgrid").to_ascii_lowercase();
        let cfg = match transport.as_str() {
            "sendgrid" => match (s.get("SENDGRID_API_KEY"), to, from) {
                (Some(api_key), Some(to), Some(from)) => Some(MailConfig::SendGrid { api_key, to, from }),
                _ => None,
            },
            "smtp" => match (
                s.get("SMTP_HOST"),
                s.get("SMTP_USER"),
                s.get("SMTP_PASS"),
                to,
                from,
            ) {
                (Some(host), Some(user), Some(pass), Some(to), Some(from)) => Some(MailConfig::Smtp {
                    host,
                    user,
                    pass,
                    to,
                    from,
                }),
                _ => None,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: ENV_MAIL_TRANSPORT,
                    reason: format!("unknown transport '{other}' (expected sendgrid or smtp)"),
                })
            }
        };
        if let Some(cfg) = &cfg {
            cfg.check_addresses()?;
        }
        Ok(cfg)
    }

    fn addresses(&self) -> (&str, &str) {
        match self {
            MailConfig::SendGrid { to, from, .. } | MailConfig::Smtp { to, from, .. } => {
                (to.as_str(), from.as_str())
            }
        }
    }

    /// Both addresses must parse as mailboxes before any report work starts.
    fn check_addresses(&self) -> Result<(), ConfigError> {
        let (to, from) = self.addresses();
        for (key, value) in [(ENV_REPORT_TO, to), (ENV_REPORT_FROM, from)] {
            value.parse::<Mailbox>().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("'{value}' is not an email address ({e})"),
            })?;
        }
        Ok(())
    }
}
