//! Ingestion — jobs from a JSON file or a single form, candidates from a
//! resume directory or a single upload. Both paths are idempotent: jobs are
//! keyed by title, candidates by resume path.

pub mod contact;
pub mod handlers;
pub mod jobs;
mod prompts;
pub mod resumes;

use std::path::PathBuf;
use std::sync::Arc;

use crate::extraction::ExtractionGateway;
use crate::store::RecordStore;

pub use jobs::JobLoadReport;
pub use resumes::ResumeRunReport;

#[derive(Clone)]
pub struct Ingestor {
    store: RecordStore,
    gateway: Arc<ExtractionGateway>,
    resumes_dir: PathBuf,
    workers: usize,
}

impl Ingestor {
    pub fn new(
        store: RecordStore,
        gateway: Arc<ExtractionGateway>,
        resumes_dir: PathBuf,
        workers: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            resumes_dir,
            workers: workers.max(1),
        }
    }

    pub fn resumes_dir(&self) -> &PathBuf {
        &self.resumes_dir
    }
}
