//! Outbound email transport over Amazon SES v2.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message, RawMessage};
use aws_sdk_sesv2::Client as SesClient;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A fully addressed message. Recipient lists are already normalized.
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    /// Builds a message for one or more recipients, given either as a single
    /// comma-joined string or as a list.
    pub fn new<I, S>(to: I, subject: &str, body: &str, is_html: bool) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            to: normalize_recipients(to)?,
            subject: subject.to_string(),
            body: body.to_string(),
            is_html,
            ..Default::default()
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_cc<I, S>(mut self, cc: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cc = split_addresses(cc);
        self
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_bcc<I, S>(mut self, bcc: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bcc = split_addresses(bcc);
        self
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Rejects a message with no primary recipient.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.to.iter().all(|r| r.trim().is_empty()) {
            return Err(AppError::Usage("At least one recipient is required".to_string()));
        }
        Ok(())
    }
}

/// Splits comma-joined entries, trims them and drops empties.
/// An empty result is a usage error.
pub fn normalize_recipients<I, S>(inputs: I) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let recipients = split_addresses(inputs);
    if recipients.is_empty() {
        return Err(AppError::Usage("At least one recipient is required".to_string()));
    }
    Ok(recipients)
}

fn split_addresses<I, S>(inputs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}

pub struct SesTransport {
    client: SesClient,
    from_address: String,
}

impl SesTransport {
    /// Loads AWS credentials from the environment for the given region.
    pub async fn from_env(from_address: String, region: String) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;
        Self::new(SesClient::new(&aws_config), from_address)
    }

    pub fn new(client: SesClient, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }

    fn simple_content(message: &EmailMessage) -> Result<EmailContent, AppError> {
        let subject = Content::builder()
            .data(&message.subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::EmailDispatch(format!("Failed to build subject: {e}")))?;

        let body_content = Content::builder()
            .data(&message.body)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::EmailDispatch(format!("Failed to build body: {e}")))?;

        let body = if message.is_html {
            Body::builder().html(body_content).build()
        } else {
            Body::builder().text(body_content).build()
        };

        let simple = Message::builder().subject(subject).body(body).build();
        Ok(EmailContent::builder().simple(simple).build())
    }

    fn raw_content(&self, message: &EmailMessage) -> Result<EmailContent, AppError> {
        let boundary = format!("recruitflow-{}", Uuid::new_v4().simple());
        let mime = build_mime(&self.from_address, message, &boundary);
        let raw = RawMessage::builder()
            .data(Blob::new(mime.into_bytes()))
            .build()
            .map_err(|e| AppError::EmailDispatch(format!("Failed to build raw message: {e}")))?;
        Ok(EmailContent::builder().raw(raw).build())
    }
}

#[async_trait]
impl EmailTransport for SesTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        message.validate()?;

        let destination = Destination::builder()
            .set_to_addresses(Some(message.to.clone()))
            .set_cc_addresses((!message.cc.is_empty()).then(|| message.cc.clone()))
            .set_bcc_addresses((!message.bcc.is_empty()).then(|| message.bcc.clone()))
            .build();

        let content = if message.attachments.is_empty() {
            Self::simple_content(message)?
        } else {
            self.raw_content(message)?
        };

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, to = ?message.to, "Failed to send email via SES");
                AppError::EmailDispatch(format!("Send failed: {e}"))
            })?;

        info!(
            to = ?message.to,
            message_id = ?result.message_id(),
            "Email sent via SES"
        );
        Ok(())
    }
}

/// Renders a multipart/mixed MIME document: the body part followed by one
/// base64 part per attachment. Bcc recipients are never written as headers.
pub fn build_mime(from: &str, message: &EmailMessage, boundary: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("From: {from}\r\n"));
    out.push_str(&format!("To: {}\r\n", message.to.join(", ")));
    if !message.cc.is_empty() {
        out.push_str(&format!("Cc: {}\r\n", message.cc.join(", ")));
    }
    out.push_str(&format!("Subject: {}\r\n", encode_header(&message.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    let subtype = if message.is_html { "html" } else { "plain" };
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&format!("Content-Type: text/{subtype}; charset=UTF-8\r\n"));
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&wrap_base64(message.body.as_bytes()));

    for attachment in &message.attachments {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, attachment.filename
        ));
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            attachment.filename
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&wrap_base64(&attachment.content));
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", BASE64.encode(value))
    }
}

fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = BASE64.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 * 2 + 2);
    for chunk in encoded.as_bytes().chunks(76) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}
