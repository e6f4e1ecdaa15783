use crate::database::CandidateStore;
use crate::error::PipelineError;
use crate::models::candidate::{Candidate, CandidateDraft};
use crate::models::workflow::WorkflowState;
use crate::utils::validation::normalize_national_id;

/// Status that places a national id on the denylist.
pub const DENYLIST_STATE: WorkflowState = WorkflowState::Rejected;

/// Intake gate. Runs before any write.
///
/// A national id match is checked against the denylist first, then as a duplicate.
/// Without a national id the phone is the only identity, and a phone match is
/// always a duplicate: the denylist is keyed on national id alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreeningEngine;

impl ScreeningEngine {
    pub fn new() -> Self {
        Self
    }

    pub async fn screen<S: CandidateStore>(
        &self,
        store: &S,
        draft: &CandidateDraft,
    ) -> Result<(), PipelineError> {
        match draft.national_id.as_deref().map(normalize_national_id) {
            Some(wanted) if !wanted.is_empty() => {
                let matches = store.find_by_national_id(&wanted).await?;
                self.evaluate(&matches)
            }
            _ => {
                let existing = store.find_by_phone(&draft.phone).await?;
                self.check_duplicate(existing.as_slice())
            }
        }
    }

    /// Decides on the records that share the draft's national id.
    pub fn evaluate(&self, matches: &[Candidate]) -> Result<(), PipelineError> {
        self.check_denylist(matches)?;
        self.check_duplicate(matches)
    }

    pub fn check_denylist(&self, matches: &[Candidate]) -> Result<(), PipelineError> {
        match oldest(matches.iter().filter(|c| c.status == DENYLIST_STATE)) {
            Some(banned) => Err(PipelineError::Denylisted {
                existing: banned.id,
            }),
            None => Ok(()),
        }
    }

    pub fn check_duplicate(&self, matches: &[Candidate]) -> Result<(), PipelineError> {
        match oldest(matches.iter()) {
            Some(first) => Err(PipelineError::DuplicateCandidate { existing: first.id }),
            None => Ok(()),
        }
    }
}

fn oldest<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    candidates.min_by_key(|c| (c.created_at, c.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{CandidateId, DocumentStatus};
    use chrono::{TimeZone, Utc};

    fn existing(status: WorkflowState, day: u32) -> Candidate {
        Candidate {
            id: CandidateId::generate(),
            full_name: "Pham Van D".into(),
            date_of_birth: None,
            hometown: String::new(),
            phone: "0900000009".into(),
            national_id: Some("001".into()),
            position: "Kho".into(),
            source: String::new(),
            social_links: Vec::new(),
            document_status: DocumentStatus::Complete,
            bus_route: None,
            dormitory_requested: true,
            photo_ref: None,
            status,
            note: String::new(),
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            created_by: "hr-1".into(),
            last_modified_by: "hr-1".into(),
            version: 1,
            audit_log: Vec::new(),
        }
    }

    #[test]
    fn no_matches_passes() {
        assert!(ScreeningEngine.evaluate(&[]).is_ok());
    }

    #[test]
    fn denylist_wins_over_duplicate() {
        let open = existing(WorkflowState::Interviewing, 1);
        let banned = existing(WorkflowState::Rejected, 2);
        let banned_id = banned.id;
        match ScreeningEngine.evaluate(&[open, banned]) {
            Err(PipelineError::Denylisted { existing }) => assert_eq!(existing, banned_id),
            other => panic!("expected denylist rejection, got {:?}", other),
        }
    }

    #[test]
    fn rejected_phone_match_is_only_a_duplicate() {
        let rejected = existing(WorkflowState::Rejected, 3);
        let rejected_id = rejected.id;
        match ScreeningEngine.check_duplicate(&[rejected]) {
            Err(PipelineError::DuplicateCandidate { existing }) => assert_eq!(existing, rejected_id),
            other => panic!("expected duplicate rejection, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_reports_oldest_match() {
        let newer = existing(WorkflowState::New, 5);
        let older = existing(WorkflowState::Employed, 2);
        let older_id = older.id;
        match ScreeningEngine.evaluate(&[newer, older]) {
            Err(PipelineError::DuplicateCandidate { existing }) => assert_eq!(existing, older_id),
            other => panic!("expected duplicate rejection, got {:?}", other),
        }
    }
}
