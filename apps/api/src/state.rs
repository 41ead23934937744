use std::path::PathBuf;
use std::sync::Arc;

use crate::communication::{CommunicationGenerator, EmailTransport};
use crate::config::Config;
use crate::extraction::ExtractionGateway;
use crate::ingest::Ingestor;
use crate::matching::MatchEngine;
use crate::store::RecordStore;
use crate::workflow::{Invitations, Workflow};

/// Shared application state injected into all route handlers via Axum extractors.
/// The gateway, store and transport are built once in `main` and shared by
/// every component.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub ingestor: Ingestor,
    pub engine: MatchEngine,
    pub workflow: Workflow,
    pub invitations: Invitations,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        store: RecordStore,
        gateway: Arc<ExtractionGateway>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        let ingestor = Ingestor::new(
            store.clone(),
            gateway.clone(),
            PathBuf::from(&config.resumes_dir),
            config.match_workers,
        );
        let engine = MatchEngine::new(store.clone(), gateway.clone(), config.match_workers);
        let workflow = Workflow::new(store.clone());
        let communications =
            CommunicationGenerator::new(gateway, transport, config.company_name.clone());
        let invitations = Invitations::new(workflow.clone(), communications);

        Self {
            store,
            ingestor,
            engine,
            workflow,
            invitations,
            config,
        }
    }
}
