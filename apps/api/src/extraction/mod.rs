//! Structured-Extraction Gateway — free text plus a field schema in, a typed
//! record (or a typed failure) out.
//!
//! The gateway never retries: a malformed response comes back as
//! `ExtractionFailure` and the caller decides whether to skip, surface, or
//! try again. Failures carry the raw model output for inspection.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_FOOTER, JSON_ONLY_SYSTEM};
use crate::llm_client::{strip_json_fences, CompletionClient, LlmError};

pub mod schema;

pub use schema::{FieldKind, FieldSchema, FieldSpec, StructuredRecord};

/// Sampling temperatures per task. Numeric outputs get the lowest.
pub mod temperature {
    pub const JOB_SUMMARY: f32 = 0.3;
    pub const CANDIDATE_PROFILE: f32 = 0.2;
    pub const MATCH_SCORING: f32 = 0.1;
    pub const EMAIL: f32 = 0.5;
}

#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("completion request failed: {0}")]
    Transport(#[from] LlmError),

    #[error("response is not valid JSON: {reason}")]
    Malformed { reason: String, raw_response: String },

    #[error("response does not match `{schema}` schema: {reason}")]
    SchemaMismatch {
        schema: &'static str,
        reason: String,
        raw_response: String,
    },
}

impl ExtractionFailure {
    /// The model output that failed validation, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractionFailure::Transport(_) => None,
            ExtractionFailure::Malformed { raw_response, .. }
            | ExtractionFailure::SchemaMismatch { raw_response, .. } => Some(raw_response),
        }
    }
}

impl From<ExtractionFailure> for AppError {
    fn from(failure: ExtractionFailure) -> Self {
        AppError::Extraction(failure.to_string())
    }
}

/// One extraction request: what to do, and the text to do it on.
#[derive(Debug, Clone, Copy)]
pub struct Instruction<'a> {
    /// Opening task statement, e.g. "Analyze the following job description...".
    pub task: &'a str,
    /// Heading placed above the input text.
    pub input_label: &'a str,
    pub input: &'a str,
    pub temperature: f32,
}

/// Builds the full prompt for an instruction and a schema. Deterministic:
/// the same instruction and schema always produce the same prompt.
pub fn build_prompt(instruction: &Instruction<'_>, schema: &FieldSchema) -> String {
    format!(
        "{task}\n\nReturn a JSON object with these fields:\n{fields}\n\n{label}:\n{input}\n\n{footer}",
        task = instruction.task.trim(),
        fields = schema.describe(),
        label = instruction.input_label,
        input = instruction.input.trim(),
        footer = JSON_ONLY_FOOTER,
    )
}

/// Validates raw model output against `T`'s schema and deserializes it.
pub fn parse_record<T: StructuredRecord>(raw: &str) -> Result<T, ExtractionFailure> {
    let schema = T::schema();
    let text = strip_json_fences(raw);

    let value: Value =
        serde_json::from_str(text).map_err(|e| ExtractionFailure::Malformed {
            reason: e.to_string(),
            raw_response: raw.to_string(),
        })?;

    let mismatch = |reason: String| ExtractionFailure::SchemaMismatch {
        schema: schema.name,
        reason,
        raw_response: raw.to_string(),
    };

    let conformed = schema.conform(value).map_err(mismatch)?;
    serde_json::from_value(conformed).map_err(|e| mismatch(e.to_string()))
}

/// Shared front door to the completion service for every structured call.
/// Constructed once per process and handed to each component.
#[derive(Clone)]
pub struct ExtractionGateway {
    client: Arc<dyn CompletionClient>,
}

impl ExtractionGateway {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn extract<T: StructuredRecord>(
        &self,
        instruction: &Instruction<'_>,
    ) -> Result<T, ExtractionFailure> {
        let schema = T::schema();
        let prompt = build_prompt(instruction, schema);

        let raw = self
            .client
            .complete(&prompt, JSON_ONLY_SYSTEM, instruction.temperature)
            .await?;

        debug!(
            "Extraction response for `{}`: {} bytes",
            schema.name,
            raw.len()
        );

        parse_record::<T>(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedCompletion;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        score: f64,
        #[serde(default)]
        tags: Vec<String>,
    }

    static PROBE_SCHEMA: FieldSchema = FieldSchema {
        name: "probe",
        fields: &[
            FieldSpec::required("score", FieldKind::Number),
            FieldSpec::optional("tags", FieldKind::TextList),
        ],
    };

    impl StructuredRecord for Probe {
        fn schema() -> &'static FieldSchema {
            &PROBE_SCHEMA
        }
    }

    fn instruction(input: &str) -> Instruction<'_> {
        Instruction {
            task: "Score the probe.",
            input_label: "Probe",
            input,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_prompt_is_deterministic_and_complete() {
        let a = build_prompt(&instruction("payload"), &PROBE_SCHEMA);
        let b = build_prompt(&instruction("payload"), &PROBE_SCHEMA);
        assert_eq!(a, b);
        assert!(a.starts_with("Score the probe."));
        assert!(a.contains("- score (number)"));
        assert!(a.contains("- tags (list of strings, optional)"));
        assert!(a.contains("Probe:\npayload"));
        assert!(a.ends_with(JSON_ONLY_FOOTER));
    }

    #[test]
    fn test_parse_record_accepts_fenced_json() {
        let probe: Probe = parse_record("```json\n{\"score\": 42}\n```").unwrap();
        assert_eq!(probe.score, 42.0);
        assert!(probe.tags.is_empty());
    }

    #[test]
    fn test_parse_record_reports_malformed_with_raw_text() {
        let err = parse_record::<Probe>("Sure! Here is the score: 42").unwrap_err();
        assert!(matches!(err, ExtractionFailure::Malformed { .. }));
        assert_eq!(err.raw_response(), Some("Sure! Here is the score: 42"));
    }

    #[test]
    fn test_parse_record_reports_schema_mismatch() {
        let err = parse_record::<Probe>(r#"{"tags": ["a"]}"#).unwrap_err();
        match err {
            ExtractionFailure::SchemaMismatch { schema, reason, .. } => {
                assert_eq!(schema, "probe");
                assert!(reason.contains("score"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_passes_temperature_and_system_prompt() {
        let client = Arc::new(ScriptedCompletion::new(vec![Ok(r#"{"score": "77"}"#.into())]));
        let gateway = ExtractionGateway::new(client.clone());

        let probe: Probe = gateway.extract(&instruction("x")).await.unwrap();
        assert_eq!(probe.score, 77.0);

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, JSON_ONLY_SYSTEM);
        assert!((calls[0].temperature - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_extract_transport_failure_is_not_fatal() {
        let client = Arc::new(ScriptedCompletion::new(vec![Err(LlmError::EmptyContent)]));
        let gateway = ExtractionGateway::new(client);

        let err = gateway.extract::<Probe>(&instruction("x")).await.unwrap_err();
        assert!(matches!(err, ExtractionFailure::Transport(_)));
        assert!(err.raw_response().is_none());
    }
}
