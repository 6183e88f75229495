//! Mail delivery of exported transcripts over SMTP

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Attachment;
use lettre::message::Mailbox;
use lettre::message::MultiPart;
use lettre::message::SinglePart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Address;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;
use tracing::info;

use crate::config::SmtpConfig;
use crate::errors::BarcraftError;
use crate::errors::Result;

/// A document to attach
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Validate a user-supplied recipient address
pub fn parse_recipient(raw: &str) -> Result<Address> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BarcraftError::Validation(
            "Email address is required".to_string(),
        ));
    }
    raw.parse::<Address>()
        .map_err(|e| BarcraftError::Validation(format!("Invalid email address: {e}")))
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_pdf(&self, recipient: &Address, attachment: PdfAttachment) -> Result<()>;
}

/// Implicit-TLS SMTP relay with username/password login
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
    body: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from_email
            .parse::<Mailbox>()
            .map_err(|e| BarcraftError::Config(format!("Invalid from address: {e}")))?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| BarcraftError::Config(format!("SMTP relay: {e}")))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from,
            subject: config.subject.clone(),
            body: config.body.clone(),
        })
    }

    /// Assemble the message without sending it
    pub fn build_message(&self, recipient: &Address, attachment: PdfAttachment) -> Result<Message> {
        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| BarcraftError::ExportFailure(format!("content type: {e}")))?;

        let parts = MultiPart::mixed()
            .singlepart(SinglePart::plain(self.body.clone()))
            .singlepart(Attachment::new(attachment.file_name).body(attachment.bytes, content_type));

        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, recipient.clone()))
            .subject(self.subject.clone())
            .multipart(parts)
            .map_err(|e| BarcraftError::ExportFailure(format!("Build email: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send_pdf(&self, recipient: &Address, attachment: PdfAttachment) -> Result<()> {
        let message = self.build_message(recipient, attachment)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| BarcraftError::ExportFailure(format!("SMTP send: {e}")))?;
        info!("Session summary mailed to {}", recipient);
        Ok(())
    }
}
