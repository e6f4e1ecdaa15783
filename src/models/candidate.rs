use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::audit_log::AuditEntry;
use super::workflow::{UnknownWorkflowState, WorkflowState};

/// Immutable system-assigned key. Never derived from phone or national id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub Uuid);

impl CandidateId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CandidateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Paperwork completeness for the hiring file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Missing,
    Partial,
    Complete,
}

impl DocumentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Missing => "missing",
            DocumentStatus::Partial => "partial",
            DocumentStatus::Complete => "complete",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "missing" => Ok(DocumentStatus::Missing),
            "partial" => Ok(DocumentStatus::Partial),
            "complete" => Ok(DocumentStatus::Complete),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub hometown: String,
    pub phone: String,
    pub national_id: Option<String>,
    pub position: String,
    pub source: String,
    pub social_links: Vec<String>,
    pub document_status: DocumentStatus,
    pub bus_route: Option<String>,
    pub dormitory_requested: bool,
    pub photo_ref: Option<String>,
    pub status: WorkflowState,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_modified_by: String,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
    /// Oldest entry first.
    pub audit_log: Vec<AuditEntry>,
}

impl Candidate {
    pub fn last_audit_timestamp(&self) -> Option<DateTime<Utc>> {
        self.audit_log.last().map(|entry| entry.timestamp)
    }
}

/// Intake form as submitted by the recruiter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CandidateDraft {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub hometown: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    pub national_id: Option<String>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub social_links: Vec<String>,
    #[serde(default)]
    pub document_status: DocumentStatus,
    pub bus_route: Option<String>,
    #[serde(default)]
    pub dormitory_requested: bool,
    pub photo_ref: Option<String>,
    #[serde(default)]
    pub note: String,
}

impl CandidateDraft {
    /// Trims text fields and drops blank optionals so validation sees what will be stored.
    pub fn normalized(mut self) -> Self {
        self.full_name = self.full_name.trim().to_string();
        self.hometown = self.hometown.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.position = self.position.trim().to_string();
        self.source = self.source.trim().to_string();
        self.note = self.note.trim().to_string();
        self.national_id = non_blank(self.national_id);
        self.bus_route = non_blank(self.bus_route);
        self.photo_ref = non_blank(self.photo_ref);
        self.social_links = self
            .social_links
            .into_iter()
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
            .collect();
        self
    }
}

/// Wraps whatever was sent, `null` included, so it can be told apart from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One named field assignment. The unit the store applies and the audit engine diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    FullName(String),
    DateOfBirth(Option<NaiveDate>),
    Hometown(String),
    Phone(String),
    NationalId(Option<String>),
    Position(String),
    Source(String),
    SocialLinks(Vec<String>),
    DocumentStatus(DocumentStatus),
    BusRoute(Option<String>),
    DormitoryRequested(bool),
    PhotoRef(Option<String>),
    Status(WorkflowState),
    Note(String),
}

impl FieldChange {
    pub const fn field_name(&self) -> &'static str {
        match self {
            FieldChange::FullName(_) => "full_name",
            FieldChange::DateOfBirth(_) => "date_of_birth",
            FieldChange::Hometown(_) => "hometown",
            FieldChange::Phone(_) => "phone",
            FieldChange::NationalId(_) => "national_id",
            FieldChange::Position(_) => "position",
            FieldChange::Source(_) => "source",
            FieldChange::SocialLinks(_) => "social_links",
            FieldChange::DocumentStatus(_) => "document_status",
            FieldChange::BusRoute(_) => "bus_route",
            FieldChange::DormitoryRequested(_) => "dormitory_requested",
            FieldChange::PhotoRef(_) => "photo_ref",
            FieldChange::Status(_) => "status",
            FieldChange::Note(_) => "note",
        }
    }

    /// Whether applying this change would leave the candidate untouched.
    pub fn is_noop_for(&self, candidate: &Candidate) -> bool {
        match self {
            FieldChange::FullName(v) => *v == candidate.full_name,
            FieldChange::DateOfBirth(v) => *v == candidate.date_of_birth,
            FieldChange::Hometown(v) => *v == candidate.hometown,
            FieldChange::Phone(v) => *v == candidate.phone,
            FieldChange::NationalId(v) => *v == candidate.national_id,
            FieldChange::Position(v) => *v == candidate.position,
            FieldChange::Source(v) => *v == candidate.source,
            FieldChange::SocialLinks(v) => *v == candidate.social_links,
            FieldChange::DocumentStatus(v) => *v == candidate.document_status,
            FieldChange::BusRoute(v) => *v == candidate.bus_route,
            FieldChange::DormitoryRequested(v) => *v == candidate.dormitory_requested,
            FieldChange::PhotoRef(v) => *v == candidate.photo_ref,
            FieldChange::Status(v) => *v == candidate.status,
            FieldChange::Note(v) => *v == candidate.note,
        }
    }

    pub fn apply(&self, candidate: &mut Candidate) {
        match self {
            FieldChange::FullName(v) => candidate.full_name = v.clone(),
            FieldChange::DateOfBirth(v) => candidate.date_of_birth = *v,
            FieldChange::Hometown(v) => candidate.hometown = v.clone(),
            FieldChange::Phone(v) => candidate.phone = v.clone(),
            FieldChange::NationalId(v) => candidate.national_id = v.clone(),
            FieldChange::Position(v) => candidate.position = v.clone(),
            FieldChange::Source(v) => candidate.source = v.clone(),
            FieldChange::SocialLinks(v) => candidate.social_links = v.clone(),
            FieldChange::DocumentStatus(v) => candidate.document_status = *v,
            FieldChange::BusRoute(v) => candidate.bus_route = v.clone(),
            FieldChange::DormitoryRequested(v) => candidate.dormitory_requested = *v,
            FieldChange::PhotoRef(v) => candidate.photo_ref = v.clone(),
            FieldChange::Status(v) => candidate.status = *v,
            FieldChange::Note(v) => candidate.note = v.clone(),
        }
    }
}

/// Partial edit submitted by the caller. Absent fields are left alone; an empty string
/// clears an optional text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePatch {
    pub full_name: Option<String>,
    /// `null` clears the date; an absent key leaves it alone.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub hometown: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub position: Option<String>,
    pub source: Option<String>,
    pub social_links: Option<Vec<String>>,
    pub document_status: Option<DocumentStatus>,
    pub bus_route: Option<String>,
    pub dormitory_requested: Option<bool>,
    pub photo_ref: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
    /// Version the caller last saw; a mismatch is reported as a conflict.
    pub expected_version: Option<i64>,
}

impl CandidatePatch {
    pub fn into_changes(self) -> Result<Vec<FieldChange>, UnknownWorkflowState> {
        let mut changes = Vec::new();

        if let Some(v) = self.full_name {
            changes.push(FieldChange::FullName(v.trim().to_string()));
        }
        if let Some(v) = self.date_of_birth {
            changes.push(FieldChange::DateOfBirth(v));
        }
        if let Some(v) = self.hometown {
            changes.push(FieldChange::Hometown(v.trim().to_string()));
        }
        if let Some(v) = self.phone {
            changes.push(FieldChange::Phone(v.trim().to_string()));
        }
        if let Some(v) = self.national_id {
            changes.push(FieldChange::NationalId(non_blank(Some(v))));
        }
        if let Some(v) = self.position {
            changes.push(FieldChange::Position(v.trim().to_string()));
        }
        if let Some(v) = self.source {
            changes.push(FieldChange::Source(v.trim().to_string()));
        }
        if let Some(links) = self.social_links {
            let links = links
                .into_iter()
                .map(|link| link.trim().to_string())
                .filter(|link| !link.is_empty())
                .collect();
            changes.push(FieldChange::SocialLinks(links));
        }
        if let Some(v) = self.document_status {
            changes.push(FieldChange::DocumentStatus(v));
        }
        if let Some(v) = self.bus_route {
            changes.push(FieldChange::BusRoute(non_blank(Some(v))));
        }
        if let Some(v) = self.dormitory_requested {
            changes.push(FieldChange::DormitoryRequested(v));
        }
        if let Some(v) = self.photo_ref {
            changes.push(FieldChange::PhotoRef(non_blank(Some(v))));
        }
        if let Some(raw) = self.status {
            changes.push(FieldChange::Status(raw.trim().parse()?));
        }
        if let Some(v) = self.note {
            changes.push(FieldChange::Note(v.trim().to_string()));
        }

        Ok(changes)
    }
}
