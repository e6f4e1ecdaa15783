pub mod audit_log;
pub mod candidate;
pub mod user;
pub mod workflow;
