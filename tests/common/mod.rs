#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use recruitment_pipeline::{
    database::MemoryStore,
    models::{candidate::CandidateDraft, user::Actor},
    services::{candidate_service::PipelineService, workflow_service::WorkflowEngine},
    utils::time::FixedClock,
};

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn recruiter() -> Actor {
    Actor::new("hr-1", "Tran Thi HR").with_role("hr")
}

pub fn draft(name: &str, phone: &str, national_id: Option<&str>) -> CandidateDraft {
    CandidateDraft {
        full_name: name.to_string(),
        phone: phone.to_string(),
        national_id: national_id.map(str::to_string),
        hometown: "Thanh Son, Phu Tho".to_string(),
        position: "Cong nhan may".to_string(),
        source: "facebook".to_string(),
        ..Default::default()
    }
}

/// Pipeline over a fresh in-memory store with a clock the test controls. Deadlines use UTC.
pub fn pipeline_at(
    start: &str,
    workflow: WorkflowEngine,
) -> (PipelineService<MemoryStore>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(at(start)));
    let service = PipelineService::with_clock(Arc::new(MemoryStore::new()), workflow, clock.clone());
    (service, clock)
}
