use chrono::{DateTime, Utc};

use crate::models::audit_log::{AuditEntry, COMMENT_FIELD, CREATED_FIELD};
use crate::models::candidate::{Candidate, FieldChange};
use crate::models::user::Actor;

/// Turns field edits into history entries. Performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditEngine;

impl AuditEngine {
    pub fn new() -> Self {
        Self
    }

    /// One entry per change that actually alters the snapshot, in the order given.
    /// A field edited twice in one batch is diffed against its intermediate value.
    pub fn diff(
        &self,
        previous: &Candidate,
        changes: &[FieldChange],
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, serde_json::Error> {
        let timestamp = monotonic(previous, now);
        let mut working = previous.clone();
        let mut entries = Vec::new();

        for change in changes {
            if change.is_noop_for(&working) {
                continue;
            }
            let old_value = field_value(&working, change)?;
            change.apply(&mut working);
            let new_value = field_value(&working, change)?;

            entries.push(AuditEntry {
                timestamp,
                actor: actor.display_name.clone(),
                field: change.field_name().to_string(),
                summary: format!(
                    "changed {} from {} to {}",
                    change.field_name().replace('_', " "),
                    shown(&old_value),
                    shown(&new_value)
                ),
                old_value,
                new_value,
            });
        }

        Ok(entries)
    }

    pub fn created(&self, candidate: &Candidate, actor: &Actor) -> AuditEntry {
        AuditEntry {
            timestamp: candidate.created_at,
            actor: actor.display_name.clone(),
            field: CREATED_FIELD.to_string(),
            old_value: None,
            new_value: Some(candidate.status.as_str().to_string()),
            summary: format!("record created for {}", candidate.full_name),
        }
    }

    pub fn comment(
        &self,
        previous: &Candidate,
        actor: &Actor,
        message: &str,
        now: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry {
            timestamp: monotonic(previous, now),
            actor: actor.display_name.clone(),
            field: COMMENT_FIELD.to_string(),
            old_value: None,
            new_value: Some(message.to_string()),
            summary: message.to_string(),
        }
    }
}

/// Keeps a candidate's log non-decreasing even if the clock steps backwards.
fn monotonic(previous: &Candidate, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous.last_audit_timestamp() {
        Some(last) if last > now => last,
        _ => now,
    }
}

fn shown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(empty)")
}

fn text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current value of the field `change` targets, rendered for the log.
fn field_value(candidate: &Candidate, change: &FieldChange) -> Result<Option<String>, serde_json::Error> {
    let value = match change {
        FieldChange::FullName(_) => text(&candidate.full_name),
        FieldChange::DateOfBirth(_) => candidate
            .date_of_birth
            .map(|d| d.format("%Y-%m-%d").to_string()),
        FieldChange::Hometown(_) => text(&candidate.hometown),
        FieldChange::Phone(_) => text(&candidate.phone),
        FieldChange::NationalId(_) => candidate.national_id.clone(),
        FieldChange::Position(_) => text(&candidate.position),
        FieldChange::Source(_) => text(&candidate.source),
        FieldChange::SocialLinks(_) => {
            if candidate.social_links.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&candidate.social_links)?)
            }
        }
        FieldChange::DocumentStatus(_) => Some(candidate.document_status.as_str().to_string()),
        FieldChange::BusRoute(_) => candidate.bus_route.clone(),
        FieldChange::DormitoryRequested(_) => Some(candidate.dormitory_requested.to_string()),
        FieldChange::PhotoRef(_) => candidate.photo_ref.clone(),
        FieldChange::Status(_) => Some(candidate.status.as_str().to_string()),
        FieldChange::Note(_) => text(&candidate.note),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{CandidateId, DocumentStatus};
    use crate::models::workflow::WorkflowState;
    use chrono::{Duration, TimeZone};

    fn snapshot() -> Candidate {
        Candidate {
            id: CandidateId::generate(),
            full_name: "Nguyen Van A".into(),
            date_of_birth: None,
            hometown: "Thanh Son, Phu Tho".into(),
            phone: "0900000001".into(),
            national_id: Some("001".into()),
            position: "Cong nhan may".into(),
            source: "facebook".into(),
            social_links: Vec::new(),
            document_status: DocumentStatus::Partial,
            bus_route: None,
            dormitory_requested: false,
            photo_ref: None,
            status: WorkflowState::Screened,
            note: "2 years sewing".into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
            created_by: "hr-1".into(),
            last_modified_by: "hr-1".into(),
            version: 1,
            audit_log: Vec::new(),
        }
    }

    fn actor() -> Actor {
        Actor::new("hr-2", "Le Thi C")
    }

    #[test]
    fn status_change_produces_one_entry() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 10, 0, 0).unwrap();
        let entries = AuditEngine
            .diff(
                &snapshot(),
                &[FieldChange::Status(WorkflowState::Rejected)],
                &actor(),
                now,
            )
            .unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.field, "status");
        assert_eq!(entry.old_value.as_deref(), Some("screened"));
        assert_eq!(entry.new_value.as_deref(), Some("rejected"));
        assert_eq!(entry.actor, "Le Thi C");
        assert_eq!(entry.timestamp, now);
        assert_eq!(entry.summary, "changed status from screened to rejected");
    }

    #[test]
    fn unchanged_fields_are_silent() {
        let base = snapshot();
        let changes = vec![
            FieldChange::Status(base.status),
            FieldChange::Note(base.note.clone()),
            FieldChange::Phone(base.phone.clone()),
            FieldChange::BusRoute(None),
        ];
        let entries = AuditEngine.diff(&base, &changes, &actor(), Utc::now()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn repeated_field_diffs_against_intermediate_value() {
        let changes = vec![
            FieldChange::Status(WorkflowState::Interviewing),
            FieldChange::Status(WorkflowState::AwaitingDecision),
        ];
        let entries = AuditEngine
            .diff(&snapshot(), &changes, &actor(), Utc::now())
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].old_value.as_deref(), Some("interviewing"));
        assert_eq!(entries[1].new_value.as_deref(), Some("awaiting_decision"));
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut base = snapshot();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        base.audit_log.push(AuditEngine.comment(&base, &actor(), "called", later));

        let skewed = later - Duration::hours(3);
        let entries = AuditEngine
            .diff(&base, &[FieldChange::Note("moved".into())], &actor(), skewed)
            .unwrap();
        assert_eq!(entries[0].timestamp, later);
    }

    #[test]
    fn clearing_a_value_renders_empty() {
        let entries = AuditEngine
            .diff(
                &snapshot(),
                &[FieldChange::NationalId(None)],
                &actor(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(entries[0].old_value.as_deref(), Some("001"));
        assert_eq!(entries[0].new_value, None);
        assert_eq!(entries[0].summary, "changed national id from 001 to (empty)");
    }
}
