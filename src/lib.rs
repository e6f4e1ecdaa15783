pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::CandidateStore;
use crate::services::candidate_service::PipelineService;
use crate::services::workflow_service::WorkflowEngine;

pub struct AppState<S> {
    pub pipeline: PipelineService<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<S: CandidateStore> AppState<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        let workflow = WorkflowEngine::new(config.transition_policy, config.utc_offset());
        Self {
            pipeline: PipelineService::new(store, workflow),
        }
    }

    pub fn with_pipeline(pipeline: PipelineService<S>) -> Self {
        Self { pipeline }
    }
}
