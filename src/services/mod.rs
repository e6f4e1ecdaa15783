pub mod audit_service;
pub mod candidate_service;
pub mod screening_service;
pub mod workflow_service;
