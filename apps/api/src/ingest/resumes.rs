use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::batch::{log_progress, run_bounded, CancellationFlag};
use crate::errors::AppError;
use crate::extraction::{temperature, Instruction};
use crate::ingest::contact::{parse_contact_fields, ContactFields};
use crate::ingest::prompts::{CANDIDATE_PROFILE_TASK, CV_LABEL};
use crate::ingest::Ingestor;
use crate::models::{CandidateProfile, ExtractedProfile};
use crate::store::{Inserted, NewCandidate};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumeRunReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl Ingestor {
    /// Processes every PDF in `dir` that has no candidate yet.
    pub async fn process_resume_dir(
        &self,
        dir: &Path,
        cancel: &CancellationFlag,
    ) -> Result<ResumeRunReport, AppError> {
        let mut report = ResumeRunReport::default();
        let mut pending = Vec::new();

        for path in list_pdf_files(dir).await? {
            if self
                .store
                .find_candidate_by_source(&source_key(&path))
                .await?
                .is_some()
            {
                report.skipped += 1;
            } else {
                pending.push(path);
            }
        }

        info!(
            "Processing {} resumes from {} ({} already stored)",
            pending.len(),
            dir.display(),
            report.skipped
        );

        let run = run_bounded(
            "Resumes",
            pending,
            self.workers,
            cancel,
            |path| async move {
                let outcome = self.process_resume_file(&path).await;
                if let Err(e) = &outcome {
                    warn!("Processing resume {} failed: {e}", path.display());
                }
                outcome
            },
            log_progress("Resumes"),
        )
        .await;

        for outcome in run.outputs {
            match outcome {
                Ok(Inserted::Created(_)) => report.processed += 1,
                Ok(Inserted::AlreadyExists(_)) => report.skipped += 1,
                Err(_) => report.failed += 1,
            }
        }
        report.cancelled = run.cancelled;

        info!("Resume processing finished: {report:?}");
        Ok(report)
    }

    /// Stores an uploaded resume in the resumes directory and processes it.
    /// A file name that is already stored is returned without reprocessing.
    pub async fn process_resume_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Inserted<CandidateProfile>, AppError> {
        let file_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::Validation("upload has no file name".to_string()))?;

        if !is_pdf_path(Path::new(&file_name)) || !bytes.starts_with(b"%PDF") {
            return Err(AppError::Validation(format!(
                "{file_name} is not a PDF document"
            )));
        }

        let path = self.resumes_dir.join(&file_name);
        if let Some(existing) = self.store.find_candidate_by_source(&source_key(&path)).await? {
            return Ok(Inserted::AlreadyExists(existing));
        }

        tokio::fs::create_dir_all(&self.resumes_dir)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        self.process_resume_file(&path).await
    }

    async fn process_resume_file(&self, path: &Path) -> Result<Inserted<CandidateProfile>, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        let text = extract_pdf_text(bytes).await?;

        let contact = parse_contact_fields(&text);
        let profile = self.extract_profile(path, &text).await;
        let name = candidate_name(&contact, profile.as_ref(), path);

        let email = contact
            .email
            .or_else(|| profile.as_ref().and_then(|p| p.email.clone()));
        let phone = contact
            .phone
            .or_else(|| profile.as_ref().and_then(|p| p.phone.clone()));

        let source_path = source_key(path);
        self.store
            .insert_candidate(NewCandidate {
                name: &name,
                email: email.as_deref(),
                phone: phone.as_deref(),
                source_path: &source_path,
                extracted_profile: profile.as_ref(),
            })
            .await
    }

    async fn extract_profile(&self, path: &Path, text: &str) -> Option<ExtractedProfile> {
        let instruction = Instruction {
            task: CANDIDATE_PROFILE_TASK,
            input_label: CV_LABEL,
            input: text,
            temperature: temperature::CANDIDATE_PROFILE,
        };
        match self.gateway.extract::<ExtractedProfile>(&instruction).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Profile extraction for {} failed: {e}", path.display());
                if let Some(raw) = e.raw_response() {
                    debug!("Raw profile response: {raw}");
                }
                None
            }
        }
    }
}

/// `*.pdf` files directly inside `dir`, any extension casing, sorted by name.
pub async fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        AppError::Validation(format!("Cannot read resumes directory {}: {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::Internal(e.into()))?
    {
        let path = entry.path();
        if path.is_file() && is_pdf_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn source_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Regex-parsed name, then the model's name, then the file stem.
fn candidate_name(contact: &ContactFields, profile: Option<&ExtractedProfile>, path: &Path) -> String {
    contact
        .name
        .clone()
        .or_else(|| profile.and_then(|p| p.name.clone()))
        .filter(|n| !n.trim().is_empty())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// pdf-extract is synchronous and CPU bound, so it runs on the blocking pool.
async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| AppError::Extraction(format!("PDF text extraction failed: {e}")))?;

    if text.trim().is_empty() {
        return Err(AppError::Extraction(
            "PDF contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory_pool;
    use crate::store::RecordStore;
    use crate::test_support::{gateway_with, ScriptedCompletion, PROFILE_JSON};

    async fn ingestor(resumes_dir: &Path) -> (Ingestor, Arc<ScriptedCompletion>) {
        ingestor_with(resumes_dir, vec![]).await
    }

    async fn ingestor_with(
        resumes_dir: &Path,
        script: Vec<Result<String, crate::llm_client::LlmError>>,
    ) -> (Ingestor, Arc<ScriptedCompletion>) {
        let store = RecordStore::new(memory_pool().await);
        let client = Arc::new(ScriptedCompletion::new(script));
        let ingestor = Ingestor::new(store, gateway_with(client.clone()), resumes_dir.into(), 2);
        (ingestor, client)
    }

    #[tokio::test]
    async fn test_lists_only_pdfs_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = list_pdf_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_stored_resumes_are_skipped_without_model_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ada.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let (ingestor, client) = ingestor(dir.path()).await;
        ingestor
            .store
            .insert_candidate(NewCandidate {
                name: "Ada Lovelace",
                email: None,
                phone: None,
                source_path: &source_key(&path),
                extracted_profile: None,
            })
            .await
            .unwrap();

        let report = ingestor
            .process_resume_dir(dir.path(), &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(report, ResumeRunReport { skipped: 1, ..Default::default() });
        assert!(client.calls().is_empty());
        assert_eq!(ingestor.store.list_candidates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();

        let (ingestor, _) = ingestor(dir.path()).await;
        let report = ingestor
            .process_resume_dir(dir.path(), &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 0);
        assert!(ingestor.store.list_candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();

        let (ingestor, _) = ingestor(dir.path()).await;
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let report = ingestor.process_resume_dir(dir.path(), &cancel).await.unwrap();
        assert_eq!(report.cancelled, 2);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor(dir.path()).await;

        assert!(matches!(
            ingestor.process_resume_upload("resume.docx", b"PK\x03\x04").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ingestor.process_resume_upload("resume.pdf", b"not really").await,
            Err(AppError::Validation(_))
        ));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_upload_strips_directories_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor(dir.path()).await;

        // Garbage after the magic bytes: stored, then extraction fails.
        let result = ingestor
            .process_resume_upload("../../etc/ada.pdf", b"%PDF-garbage")
            .await;
        assert!(result.is_err());
        assert!(dir.path().join("ada.pdf").exists());
    }

    const RESUME_PDF: &[u8] = include_bytes!("testdata/ada_lovelace.pdf");

    #[tokio::test]
    async fn test_resume_processed_twice_is_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        // The model disagrees with the resume header; parsed contact fields win.
        let profile = r#"{"name": "Augusta Ada King", "email": "countess@example.org",
            "skills": ["Go", "SQL"], "experience": [], "education": []}"#;
        let (ingestor, client) = ingestor_with(dir.path(), vec![Ok(profile.into())]).await;

        let first = ingestor
            .process_resume_upload("ada_lovelace.pdf", RESUME_PDF)
            .await
            .unwrap();
        assert!(first.is_created());
        let candidate = first.into_inner();
        assert_eq!(candidate.name, "Ada Lovelace");
        assert_eq!(candidate.email.as_deref(), Some("ada@example.com"));
        assert_eq!(candidate.profile().unwrap().skills, vec!["Go", "SQL"]);

        let second = ingestor
            .process_resume_upload("ada_lovelace.pdf", RESUME_PDF)
            .await
            .unwrap();
        assert!(!second.is_created());
        assert_eq!(second.into_inner().id, candidate.id);

        let rerun = ingestor
            .process_resume_dir(dir.path(), &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(rerun, ResumeRunReport { skipped: 1, ..Default::default() });
        assert_eq!(ingestor.store.list_candidates().await.unwrap().len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_extraction_uses_candidate_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, client) = ingestor_with(dir.path(), vec![Ok(PROFILE_JSON.into())]).await;

        let profile = ingestor
            .extract_profile(Path::new("ada.pdf"), "Ada Lovelace\nBackend Engineer at Acme")
            .await
            .unwrap();
        assert_eq!(profile.skills, vec!["Go", "SQL", "Python"]);
        assert_eq!(profile.experience[0].company, "Acme");
        assert!(profile.projects.is_empty());

        let call = &client.calls()[0];
        assert!((call.temperature - temperature::CANDIDATE_PROFILE).abs() < f32::EPSILON);
        assert!(call.prompt.contains("CV Text:\nAda Lovelace"));
    }

    #[tokio::test]
    async fn test_failed_profile_extraction_is_absent_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor_with(dir.path(), vec![Ok("{\"skills\": 42".into())]).await;
        assert!(ingestor
            .extract_profile(Path::new("ada.pdf"), "Ada Lovelace")
            .await
            .is_none());
    }

    #[test]
    fn test_name_precedence() {
        let path = Path::new("cvs/grace_hopper.pdf");
        let profile = ExtractedProfile {
            name: Some("Grace Hopper".into()),
            ..Default::default()
        };
        let regex_name = ContactFields {
            name: Some("Rear Admiral Hopper".into()),
            ..Default::default()
        };

        assert_eq!(
            candidate_name(&regex_name, Some(&profile), path),
            "Rear Admiral Hopper"
        );
        assert_eq!(
            candidate_name(&ContactFields::default(), Some(&profile), path),
            "Grace Hopper"
        );
        assert_eq!(
            candidate_name(&ContactFields::default(), None, path),
            "grace_hopper"
        );
    }
}
