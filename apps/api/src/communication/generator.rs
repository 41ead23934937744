use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::communication::prompts::{DETAILS_LABEL, INTERVIEW_TASK, REJECTION_TASK};
use crate::communication::transport::{EmailMessage, EmailTransport};
use crate::errors::AppError;
use crate::extraction::{
    temperature, ExtractionGateway, FieldKind, FieldSchema, FieldSpec, Instruction,
    StructuredRecord,
};

/// Generation attempts per email, run strictly one after another.
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Interview,
    Rejection,
}

impl fmt::Display for EmailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailKind::Interview => write!(f, "interview"),
            EmailKind::Rejection => write!(f, "rejection"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchDetails {
    pub match_score: f64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailContext {
    pub job_title: String,
    pub candidate_name: String,
    #[serde(default)]
    pub match_details: Option<MatchDetails>,
    #[serde(default)]
    pub interview_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub html_body: Option<String>,
}

static EMAIL_CONTENT_SCHEMA: FieldSchema = FieldSchema {
    name: "email_content",
    fields: &[
        FieldSpec::required("subject", FieldKind::Text),
        FieldSpec::required("body", FieldKind::Text),
        FieldSpec::optional("html_body", FieldKind::Text),
    ],
};

impl StructuredRecord for EmailContent {
    fn schema() -> &'static FieldSchema {
        &EMAIL_CONTENT_SCHEMA
    }
}

impl EmailContent {
    fn validated(self) -> Result<Self, String> {
        if self.subject.trim().is_empty() {
            return Err("subject is empty".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("body is empty".to_string());
        }
        Ok(Self {
            html_body: self.html_body.filter(|h| !h.trim().is_empty()),
            ..self
        })
    }
}

/// Result of generate-then-send. Generated content is kept even when
/// dispatch fails so the caller can show it or resend it.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub email_content: Option<EmailContent>,
    pub error: Option<String>,
    pub dispatched: bool,
}

impl DeliveryReport {
    fn failed(email_content: Option<EmailContent>, error: String) -> Self {
        Self {
            success: false,
            email_content,
            error: Some(error),
            dispatched: false,
        }
    }
}

#[derive(Clone)]
pub struct CommunicationGenerator {
    gateway: Arc<ExtractionGateway>,
    transport: Arc<dyn EmailTransport>,
    company_name: String,
}

impl CommunicationGenerator {
    pub fn new(
        gateway: Arc<ExtractionGateway>,
        transport: Arc<dyn EmailTransport>,
        company_name: String,
    ) -> Self {
        Self {
            gateway,
            transport,
            company_name,
        }
    }

    /// Generates subject and body, retrying malformed or failed responses
    /// with the same prompt up to `MAX_ATTEMPTS` times.
    pub async fn generate(
        &self,
        kind: EmailKind,
        context: &EmailContext,
    ) -> Result<EmailContent, AppError> {
        let input = self.render_details(kind, context);
        let instruction = Instruction {
            task: match kind {
                EmailKind::Interview => INTERVIEW_TASK,
                EmailKind::Rejection => REJECTION_TASK,
            },
            input_label: DETAILS_LABEL,
            input: &input,
            temperature: temperature::EMAIL,
        };

        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            let outcome = self
                .gateway
                .extract::<EmailContent>(&instruction)
                .await
                .map_err(|e| e.to_string())
                .and_then(EmailContent::validated);

            match outcome {
                Ok(content) => return Ok(content),
                Err(reason) => {
                    warn!(
                        "{kind} email for '{}' attempt {attempt}/{MAX_ATTEMPTS} failed: {reason}",
                        context.candidate_name
                    );
                    last_error = reason;
                }
            }
        }

        Err(AppError::Extraction(format!(
            "{kind} email generation failed after {MAX_ATTEMPTS} attempts: {last_error}"
        )))
    }

    /// Generates the email and, when a recipient is given, sends it. The HTML
    /// body is sent when the model produced one, the plain body otherwise.
    pub async fn generate_and_send(
        &self,
        kind: EmailKind,
        context: &EmailContext,
        recipient: Option<&str>,
    ) -> DeliveryReport {
        let content = match self.generate(kind, context).await {
            Ok(content) => content,
            Err(e) => return DeliveryReport::failed(None, e.to_string()),
        };

        let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) else {
            return DeliveryReport {
                success: true,
                email_content: Some(content),
                error: None,
                dispatched: false,
            };
        };

        let (body, is_html) = match &content.html_body {
            Some(html) => (html.as_str(), true),
            None => (content.body.as_str(), false),
        };

        let sent = match EmailMessage::new([recipient], &content.subject, body, is_html) {
            Ok(message) => self.transport.send(&message).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                info!("Sent {kind} email to {recipient}");
                DeliveryReport {
                    success: true,
                    email_content: Some(content),
                    error: None,
                    dispatched: true,
                }
            }
            Err(e) => {
                warn!("Sending {kind} email to {recipient} failed: {e}");
                DeliveryReport::failed(Some(content), e.to_string())
            }
        }
    }

    fn render_details(&self, kind: EmailKind, context: &EmailContext) -> String {
        let mut lines = vec![
            format!("Company: {}", self.company_name),
            format!("Candidate Name: {}", context.candidate_name),
            format!("Job Title: {}", context.job_title),
        ];

        if kind == EmailKind::Interview {
            match &context.match_details {
                Some(details) => {
                    lines.push(format!("Match Score: {}%", details.match_score));
                    if !details.missing_skills.is_empty() {
                        lines.push(format!(
                            "Missing Skills: {}",
                            details.missing_skills.join(", ")
                        ));
                    }
                }
                None => lines.push("Match Score: N/A".to_string()),
            }
            lines.push(format!(
                "Interview Date: {}",
                context.interview_date.as_deref().unwrap_or("To be scheduled")
            ));
        }

        lines.join("\n")
    }
}
