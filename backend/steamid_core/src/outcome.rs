// backend/steamid_core/src/outcome.rs

use crate::error::FailureReason;

/// Result of one notify attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        steam_id: String,
        /// Server `message`, empty when the server omitted it.
        message: String,
        created: bool,
    },
    Failure {
        steam_id: String,
        reason: FailureReason,
    },
}

impl Outcome {
    pub fn steam_id(&self) -> &str {
        match self {
            Outcome::Success { steam_id, .. } | Outcome::Failure { steam_id, .. } => steam_id,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }
}
