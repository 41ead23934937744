//! Shared fakes and fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::communication::transport::{EmailMessage, EmailTransport};
use crate::config::Config;
use crate::db::memory_pool;
use crate::errors::AppError;
use crate::extraction::ExtractionGateway;
use crate::llm_client::{CompletionClient, LlmError};
use crate::models::candidate::{EducationEntry, ExperienceEntry};
use crate::models::{ExtractedProfile, JobSummary, MatchResult, MatchRow};
use crate::state::AppState;
use crate::store::{NewCandidate, RecordStore};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub system: String,
    pub temperature: f32,
}

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Completion client that replays a fixed script, or answers through a
/// closure when call order is not deterministic (batch runs).
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            system: system.to_string(),
            temperature,
        });
        if let Some(responder) = &self.responder {
            return responder(prompt);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

pub fn gateway_with(client: Arc<ScriptedCompletion>) -> Arc<ExtractionGateway> {
    Arc::new(ExtractionGateway::new(client))
}

/// Email transport that records messages, optionally failing every send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EmailDispatch("SMTP connection refused".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        anthropic_api_key: "test-key".into(),
        email_from_address: "hr@example.com".into(),
        email_region: "us-east-1".into(),
        company_name: "Acme".into(),
        jobs_file: "data/jobs.json".into(),
        resumes_dir: "data/cvs".into(),
        match_workers: 2,
        port: 0,
        rust_log: "debug".into(),
    }
}

/// Full application state over an in-memory database and the given fakes.
pub async fn test_state(
    client: Arc<ScriptedCompletion>,
    transport: Arc<RecordingTransport>,
) -> AppState {
    AppState::new(
        test_config(),
        RecordStore::new(memory_pool().await),
        gateway_with(client),
        transport,
    )
}

pub fn sample_summary() -> JobSummary {
    JobSummary {
        required_skills: vec!["Go".into(), "SQL".into()],
        required_experience: "3+ years building backend services".into(),
        required_qualifications: vec!["BSc Computer Science".into()],
        key_responsibilities: vec!["Design and operate APIs".into()],
        preferred_qualifications: vec![],
        soft_skills: vec!["Communication".into()],
    }
}

pub fn sample_profile() -> ExtractedProfile {
    ExtractedProfile {
        name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        phone: None,
        skills: vec!["Go".into(), "SQL".into(), "Python".into()],
        experience: vec![ExperienceEntry {
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            duration: "4 years".into(),
            description: "Built payment APIs in Go".into(),
        }],
        education: vec![EducationEntry {
            degree: "BSc Computer Science".into(),
            institution: "UCL".into(),
            year: "2018".into(),
        }],
        certifications: vec![],
        projects: vec![],
    }
}

/// Stores a job (by title), a candidate (by path, named "Ada Lovelace") and
/// a scored match between them.
pub async fn seed_match(store: &RecordStore, title: &str, path: &str, score: f64) -> MatchRow {
    let job = store
        .insert_job(title, "desc", Some(&sample_summary()))
        .await
        .unwrap()
        .into_inner();
    let candidate = store
        .insert_candidate(NewCandidate {
            name: "Ada Lovelace",
            email: Some("ada@example.com"),
            phone: None,
            source_path: path,
            extracted_profile: Some(&sample_profile()),
        })
        .await
        .unwrap()
        .into_inner();
    let result = MatchResult {
        match_score: score,
        missing_skills: vec!["Kafka".into()],
        ..Default::default()
    };
    store
        .insert_match(job.id, candidate.id, &result)
        .await
        .unwrap()
        .into_inner()
}

pub const SUMMARY_JSON: &str = r#"{
    "required_skills": ["Go", "SQL"],
    "required_experience": "3+ years building backend services",
    "required_qualifications": ["BSc Computer Science"],
    "key_responsibilities": ["Design and operate APIs"],
    "soft_skills": ["Communication"]
}"#;

pub const PROFILE_JSON: &str = r#"{
    "name": "Ada Lovelace",
    "email": "ada@example.com",
    "skills": ["Go", "SQL", "Python"],
    "experience": [{"title": "Backend Engineer", "company": "Acme", "duration": "4 years", "description": "Built payment APIs in Go"}],
    "education": [{"degree": "BSc Computer Science", "institution": "UCL", "year": "2018"}]
}"#;
