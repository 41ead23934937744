//! Interview invitations and rejections tied to workflow transitions.
//!
//! Scheduling is persisted before the email is generated and is never rolled
//! back by a generation or dispatch failure; the failure is reported next to
//! the updated match instead.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::communication::{
    CommunicationGenerator, DeliveryReport, EmailContext, EmailKind, MatchDetails,
};
use crate::errors::AppError;
use crate::models::{CandidateProfile, JobPosting, MatchRow};
use crate::workflow::{MatchState, Workflow};

#[derive(Debug, Clone, Serialize)]
pub struct InvitationOutcome {
    #[serde(rename = "match")]
    pub record: MatchRow,
    pub delivery: DeliveryReport,
}

#[derive(Clone)]
pub struct Invitations {
    workflow: Workflow,
    communications: CommunicationGenerator,
}

impl Invitations {
    pub fn new(workflow: Workflow, communications: CommunicationGenerator) -> Self {
        Self {
            workflow,
            communications,
        }
    }

    /// Schedules the interview, then generates and sends the invitation.
    pub async fn schedule_and_invite(
        &self,
        match_id: Uuid,
        interview_date: &str,
    ) -> Result<InvitationOutcome, AppError> {
        let record = self.workflow.schedule_interview(match_id, interview_date).await?;
        let (job, candidate) = self.parties(&record).await?;

        let delivery = self
            .communications
            .generate_and_send(
                EmailKind::Interview,
                &interview_context(&record, &job, &candidate),
                candidate.email.as_deref(),
            )
            .await;

        if !delivery.success {
            warn!(
                "Interview for match {match_id} is scheduled but the invitation failed: {}",
                delivery.error.as_deref().unwrap_or("unknown error")
            );
        }

        let record = if delivery.dispatched && record.feedback.is_none() {
            let note = format!(
                "Interview scheduled for {}. Email sent to candidate.",
                record.interview_date.as_deref().unwrap_or(interview_date)
            );
            match self.workflow.record_feedback(match_id, &note).await {
                Ok(updated) => updated,
                Err(e) => {
                    warn!("Invitation for match {match_id} was sent but the note was not saved: {e}");
                    record
                }
            }
        } else {
            record
        };

        Ok(InvitationOutcome { record, delivery })
    }

    /// Regenerates and resends the invitation of an already scheduled match.
    pub async fn resend_invitation(&self, match_id: Uuid) -> Result<InvitationOutcome, AppError> {
        let record = self.workflow.get(match_id).await?;
        if MatchState::of(&record) != MatchState::InterviewScheduled {
            return Err(AppError::InvalidStateTransition(format!(
                "Match {match_id}: no interview is scheduled"
            )));
        }

        let (job, candidate) = self.parties(&record).await?;
        let email = candidate.email.as_deref().ok_or_else(|| {
            AppError::Usage(format!("Candidate '{}' has no email address", candidate.name))
        })?;

        let delivery = self
            .communications
            .generate_and_send(
                EmailKind::Interview,
                &interview_context(&record, &job, &candidate),
                Some(email),
            )
            .await;

        Ok(InvitationOutcome { record, delivery })
    }

    /// Generates a rejection for any scored match and sends it when the
    /// candidate has an address. Workflow state is not touched.
    pub async fn send_rejection(&self, match_id: Uuid) -> Result<InvitationOutcome, AppError> {
        let record = self.workflow.get(match_id).await?;
        let (job, candidate) = self.parties(&record).await?;

        let context = EmailContext {
            job_title: job.title.clone(),
            candidate_name: candidate.name.clone(),
            match_details: None,
            interview_date: None,
        };
        let delivery = self
            .communications
            .generate_and_send(EmailKind::Rejection, &context, candidate.email.as_deref())
            .await;

        Ok(InvitationOutcome { record, delivery })
    }

    async fn parties(&self, record: &MatchRow) -> Result<(JobPosting, CandidateProfile), AppError> {
        let store = self.workflow.store();
        let job = store
            .get_job(record.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", record.job_id)))?;
        let candidate = store.get_candidate(record.candidate_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Candidate {} not found", record.candidate_id))
        })?;
        Ok((job, candidate))
    }
}

fn interview_context(record: &MatchRow, job: &JobPosting, candidate: &CandidateProfile) -> EmailContext {
    EmailContext {
        job_title: job.title.clone(),
        candidate_name: candidate.name.clone(),
        match_details: Some(MatchDetails {
            match_score: record.match_score,
            missing_skills: record
                .breakdown()
                .map(|b| b.missing_skills.clone())
                .unwrap_or_default(),
        }),
        interview_date: record.interview_date.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::communication::transport::{EmailMessage, EmailTransport};
    use crate::db::memory_pool;
    use crate::store::{NewCandidate, RecordStore};
    use crate::test_support::{gateway_with, seed_match, RecordingTransport, ScriptedCompletion};

    const INVITE: &str = r#"{"subject": "Interview invitation", "body": "Dear Ada, see you soon."}"#;

    struct Harness {
        invitations: Invitations,
        workflow: Workflow,
        client: Arc<ScriptedCompletion>,
        transport: Arc<RecordingTransport>,
    }

    async fn harness(transport: RecordingTransport) -> Harness {
        let store = RecordStore::new(memory_pool().await);
        let client = Arc::new(ScriptedCompletion::responding(|_| Ok(INVITE.into())));
        let transport = Arc::new(transport);
        let communications = CommunicationGenerator::new(
            gateway_with(client.clone()),
            transport.clone(),
            "Acme".into(),
        );
        let workflow = Workflow::new(store);
        Harness {
            invitations: Invitations::new(workflow.clone(), communications),
            workflow,
            client,
            transport,
        }
    }

    #[tokio::test]
    async fn test_schedule_and_invite_sends_and_records_note() {
        let h = harness(RecordingTransport::default()).await;
        let row = seed_match(h.workflow.store(), "Backend Engineer", "a.pdf", 88.0).await;
        h.workflow.shortlist(row.id).await.unwrap();

        let outcome = h
            .invitations
            .schedule_and_invite(row.id, "2026-11-02 10:00")
            .await
            .unwrap();

        assert!(outcome.delivery.success && outcome.delivery.dispatched);
        assert!(outcome.record.interview_scheduled);
        assert_eq!(
            outcome.record.feedback.as_deref(),
            Some("Interview scheduled for 2026-11-02 10:00. Email sent to candidate.")
        );

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ada@example.com"]);

        let prompt = &h.client.calls()[0].prompt;
        assert!(prompt.contains("Missing Skills: Kafka"));
        assert!(prompt.contains("Match Score: 88%"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_keeps_schedule() {
        let h = harness(RecordingTransport::failing()).await;
        let row = seed_match(h.workflow.store(), "Backend Engineer", "a.pdf", 88.0).await;
        h.workflow.shortlist(row.id).await.unwrap();

        let outcome = h
            .invitations
            .schedule_and_invite(row.id, "2026-11-02 10:00")
            .await
            .unwrap();

        assert!(!outcome.delivery.success);
        assert!(outcome.delivery.email_content.is_some());
        let stored = h.workflow.get(row.id).await.unwrap();
        assert!(stored.interview_scheduled);
        assert!(stored.feedback.is_none());
    }

    /// Removes every match while "sending", so writes after dispatch fail.
    struct DroppingTransport {
        pool: sqlx::SqlitePool,
    }

    #[async_trait::async_trait]
    impl EmailTransport for DroppingTransport {
        async fn send(&self, _message: &EmailMessage) -> Result<(), AppError> {
            sqlx::query("DELETE FROM matches")
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sent_invitation_is_reported_when_note_fails() {
        let pool = memory_pool().await;
        let store = RecordStore::new(pool.clone());
        let client = Arc::new(ScriptedCompletion::responding(|_| Ok(INVITE.into())));
        let communications = CommunicationGenerator::new(
            gateway_with(client),
            Arc::new(DroppingTransport { pool }),
            "Acme".into(),
        );
        let workflow = Workflow::new(store);
        let invitations = Invitations::new(workflow.clone(), communications);

        let row = seed_match(workflow.store(), "Backend Engineer", "a.pdf", 88.0).await;
        workflow.shortlist(row.id).await.unwrap();

        let outcome = invitations
            .schedule_and_invite(row.id, "2026-11-02 10:00")
            .await
            .unwrap();
        assert!(outcome.delivery.success && outcome.delivery.dispatched);
        assert!(outcome.delivery.email_content.is_some());
        assert!(outcome.record.interview_scheduled);
        assert!(outcome.record.feedback.is_none());
    }

    #[tokio::test]
    async fn test_schedule_and_invite_rejects_unshortlisted_before_generating() {
        let h = harness(RecordingTransport::default()).await;
        let row = seed_match(h.workflow.store(), "Backend Engineer", "a.pdf", 88.0).await;

        let err = h
            .invitations
            .schedule_and_invite(row.id, "2026-11-02 10:00")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resend_requires_schedule_and_email() {
        let h = harness(RecordingTransport::default()).await;
        let store = h.workflow.store().clone();
        let row = seed_match(&store, "Backend Engineer", "a.pdf", 88.0).await;

        assert!(matches!(
            h.invitations.resend_invitation(row.id).await,
            Err(AppError::InvalidStateTransition(_))
        ));

        h.workflow.shortlist(row.id).await.unwrap();
        h.workflow.schedule_interview(row.id, "2026-11-02 10:00").await.unwrap();
        let outcome = h.invitations.resend_invitation(row.id).await.unwrap();
        assert!(outcome.delivery.dispatched);

        let no_email = store
            .insert_candidate(NewCandidate {
                name: "Grace Hopper",
                email: None,
                phone: None,
                source_path: "b.pdf",
                extracted_profile: None,
            })
            .await
            .unwrap()
            .into_inner();
        let other = store
            .insert_match(row.job_id, no_email.id, &Default::default())
            .await
            .unwrap()
            .into_inner();
        h.workflow.shortlist(other.id).await.unwrap();
        h.workflow.schedule_interview(other.id, "2026-11-03 10:00").await.unwrap();

        assert!(matches!(
            h.invitations.resend_invitation(other.id).await,
            Err(AppError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_untouched() {
        let h = harness(RecordingTransport::default()).await;
        let row = seed_match(h.workflow.store(), "Backend Engineer", "a.pdf", 30.0).await;

        let outcome = h.invitations.send_rejection(row.id).await.unwrap();
        assert!(outcome.delivery.dispatched);
        assert!(!outcome.record.is_shortlisted);
        assert!(!h.client.calls()[0].prompt.contains("Match Score"));
    }
}
