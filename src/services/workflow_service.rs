use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::candidate::Candidate;
use crate::models::workflow::WorkflowState;

/// Which status moves `Update` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any recognized state may follow any other.
    #[default]
    Permissive,
    /// One step forward at a time, rejection from any open state, resignation after hire.
    Strict,
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!("unknown transition policy: {}", other)),
        }
    }
}

impl TransitionPolicy {
    pub fn allows(self, from: WorkflowState, to: WorkflowState) -> bool {
        if from == to {
            return true;
        }
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => match from {
                WorkflowState::Employed => to == WorkflowState::Resigned,
                WorkflowState::Rejected | WorkflowState::Resigned => false,
                open => {
                    to == WorkflowState::Rejected
                        || (to.step_ordinal() == open.step_ordinal() + 1
                            && to != WorkflowState::Resigned)
                }
            },
        }
    }
}

/// Deadline view of one candidate at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineStatus {
    /// `None` once the candidate reached a terminal state.
    pub days_remaining: Option<i64>,
    pub deadline: Option<NaiveDate>,
    pub is_terminal: bool,
}

impl DeadlineStatus {
    pub fn is_overdue(&self) -> bool {
        matches!(self.days_remaining, Some(days) if days < 0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkflowEngine {
    policy: TransitionPolicy,
    offset: FixedOffset,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(TransitionPolicy::default(), Utc.fix())
    }
}

impl WorkflowEngine {
    pub fn new(policy: TransitionPolicy, offset: FixedOffset) -> Self {
        Self { policy, offset }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn check_transition(&self, from: WorkflowState, to: WorkflowState) -> bool {
        self.policy.allows(from, to)
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Deadline is always measured from the intake date, not from when the current state was entered.
    pub fn compute_deadline(&self, candidate: &Candidate, now: DateTime<Utc>) -> DeadlineStatus {
        let state = candidate.status;
        if state.is_terminal() {
            return DeadlineStatus {
                days_remaining: None,
                deadline: None,
                is_terminal: true,
            };
        }

        let deadline = self.local_date(candidate.created_at) + Duration::days(state.sla_days());
        let today = self.local_date(now);
        DeadlineStatus {
            days_remaining: Some((deadline - today).num_days()),
            deadline: Some(deadline),
            is_terminal: false,
        }
    }

    pub fn list_overdue<'a, I>(&self, candidates: I, now: DateTime<Utc>) -> Vec<&'a Candidate>
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        candidates
            .into_iter()
            .filter(|c| self.compute_deadline(c, now).is_overdue())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{CandidateId, DocumentStatus};
    use chrono::TimeZone;

    fn candidate(status: WorkflowState, created_at: DateTime<Utc>) -> Candidate {
        Candidate {
            id: CandidateId::generate(),
            full_name: "Tran Thi B".into(),
            date_of_birth: None,
            hometown: "Phu Tho".into(),
            phone: "0900000002".into(),
            national_id: None,
            position: "QC/KCS".into(),
            source: "walk-in".into(),
            social_links: Vec::new(),
            document_status: DocumentStatus::Missing,
            bus_route: None,
            dormitory_requested: false,
            photo_ref: None,
            status,
            note: String::new(),
            created_at,
            created_by: "hr-1".into(),
            last_modified_by: "hr-1".into(),
            version: 1,
            audit_log: Vec::new(),
        }
    }

    #[test]
    fn screened_candidate_goes_overdue_after_three_days() {
        let engine = WorkflowEngine::default();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();
        let status = engine.compute_deadline(&candidate(WorkflowState::Screened, created), now);

        assert_eq!(status.days_remaining, Some(-1));
        assert_eq!(status.deadline, NaiveDate::from_ymd_opt(2025, 1, 4));
        assert!(!status.is_terminal);
        assert!(status.is_overdue());
    }

    #[test]
    fn terminal_states_report_completed() {
        let engine = WorkflowEngine::default();
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        for state in [
            WorkflowState::Employed,
            WorkflowState::Rejected,
            WorkflowState::Resigned,
        ] {
            let status = engine.compute_deadline(&candidate(state, created), now);
            assert_eq!(status.days_remaining, None);
            assert!(status.is_terminal);
            assert!(!status.is_overdue());
        }
    }

    #[test]
    fn local_offset_moves_the_day_boundary() {
        let plus_seven = FixedOffset::east_opt(7 * 3600).unwrap();
        let engine = WorkflowEngine::new(TransitionPolicy::Permissive, plus_seven);
        // 20:00 UTC on Jan 1 is already Jan 2 at the plant.
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap();
        let status = engine.compute_deadline(&candidate(WorkflowState::New, created), created);
        assert_eq!(status.deadline, NaiveDate::from_ymd_opt(2025, 1, 4));
        assert_eq!(status.days_remaining, Some(2));
    }

    #[test]
    fn list_overdue_skips_terminal_and_on_time() {
        let engine = WorkflowEngine::default();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        let pool = vec![
            candidate(WorkflowState::New, created),
            candidate(WorkflowState::Interviewing, created),
            candidate(WorkflowState::Rejected, created),
        ];
        let overdue = engine.list_overdue(&pool, now);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].status, WorkflowState::New);
    }

    #[test]
    fn strict_policy_walks_one_step_at_a_time() {
        let strict = TransitionPolicy::Strict;
        assert!(strict.allows(WorkflowState::New, WorkflowState::Screened));
        assert!(strict.allows(WorkflowState::Interviewing, WorkflowState::Rejected));
        assert!(strict.allows(WorkflowState::Employed, WorkflowState::Resigned));
        assert!(strict.allows(WorkflowState::Rejected, WorkflowState::Rejected));
        assert!(!strict.allows(WorkflowState::New, WorkflowState::Employed));
        assert!(!strict.allows(WorkflowState::OfferedPendingStart, WorkflowState::Resigned));
        assert!(!strict.allows(WorkflowState::Rejected, WorkflowState::New));
        assert!(TransitionPolicy::Permissive.allows(WorkflowState::Rejected, WorkflowState::New));
    }
}
