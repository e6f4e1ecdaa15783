use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field name used for free-text comments that do not change a candidate field.
pub const COMMENT_FIELD: &str = "comment";
/// Field name of the synthetic entry written at intake.
pub const CREATED_FIELD: &str = "record";

/// One immutable line in a candidate's history. Identified only by its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub summary: String,
}
