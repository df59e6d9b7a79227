use anyhow::{anyhow, Context, Result};
use lettre::message::{header::ContentType, Attachment as MailAttachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Mailer, ReportEmail};

/// Report delivery over authenticated SMTP (STARTTLS relay).
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, user: String, pass: String, to: &str, from: &str) -> Result<Self> {
        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("invalid SMTP_HOST '{host}'"))?
            .credentials(creds)
            .build();

        let from = from
            .parse()
            .with_context(|| format!("invalid REPORT_FROM_EMAIL '{from}'"))?;
        let to = to
            .parse()
            .with_context(|| format!("invalid REPORT_TO_EMAIL '{to}'"))?;

        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, email: &ReportEmail) -> Result<Message> {
        let content_type = ContentType::parse(email.attachment.content_type)
            .map_err(|e| anyhow!("attachment content type: {e:?}"))?;
        let attachment = MailAttachment::new(email.attachment.filename.clone())
            .body(email.attachment.bytes.clone(), content_type);

        Message::builder()
            .from(Mailbox::new(Some("Trend Reports".to_string()), self.from.email.clone()))
            .to(self.to.clone())
            .subject(email.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body.clone()))
                    .singlepart(attachment),
            )
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &ReportEmail) -> Result<()> {
        let msg = self.build_message(email)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
