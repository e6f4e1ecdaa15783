use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of the hiring pipeline a candidate currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    New,
    Screened,
    Interviewing,
    AwaitingDecision,
    OfferedPendingStart,
    Employed,
    Rejected,
    Resigned,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 8] = [
        WorkflowState::New,
        WorkflowState::Screened,
        WorkflowState::Interviewing,
        WorkflowState::AwaitingDecision,
        WorkflowState::OfferedPendingStart,
        WorkflowState::Employed,
        WorkflowState::Rejected,
        WorkflowState::Resigned,
    ];

    pub const MAX_STEP_ORDINAL: u8 = 6;

    pub const fn step_ordinal(self) -> u8 {
        match self {
            WorkflowState::New => 1,
            WorkflowState::Screened => 2,
            WorkflowState::Interviewing => 3,
            WorkflowState::AwaitingDecision => 4,
            WorkflowState::OfferedPendingStart => 5,
            WorkflowState::Employed | WorkflowState::Rejected | WorkflowState::Resigned => 6,
        }
    }

    /// Days a candidate may stay in this state, counted from intake. Zero marks a terminal state.
    pub const fn sla_days(self) -> i64 {
        match self {
            WorkflowState::New => 2,
            WorkflowState::Screened => 3,
            WorkflowState::Interviewing => 5,
            WorkflowState::AwaitingDecision => 7,
            WorkflowState::OfferedPendingStart => 10,
            WorkflowState::Employed | WorkflowState::Rejected | WorkflowState::Resigned => 0,
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.sla_days() == 0
    }

    pub fn progress(self) -> f32 {
        f32::from(self.step_ordinal()) / f32::from(Self::MAX_STEP_ORDINAL)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WorkflowState::New => "new",
            WorkflowState::Screened => "screened",
            WorkflowState::Interviewing => "interviewing",
            WorkflowState::AwaitingDecision => "awaiting_decision",
            WorkflowState::OfferedPendingStart => "offered_pending_start",
            WorkflowState::Employed => "employed",
            WorkflowState::Rejected => "rejected",
            WorkflowState::Resigned => "resigned",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workflow state: {0}")]
pub struct UnknownWorkflowState(pub String);

impl FromStr for WorkflowState {
    type Err = UnknownWorkflowState;

    /// Accepts both `awaiting_decision` and `AwaitingDecision` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str().replace('_', "") == folded)
            .ok_or_else(|| UnknownWorkflowState(s.to_string()))
    }
}
