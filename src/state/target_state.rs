/// Target state definitions for tracking one page visit
///
/// A dispatched Target walks `Queued → Loading → Stabilizing → Extracting →
/// Persisting → Completed`. `Retrying` loops back to `Loading`, and `Failed`
/// is reachable from every non-terminal state.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a Target in the fetch executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    // ===== Active States =====
    /// Target is in the frontier or just handed to an executor
    Queued,

    /// Navigation to the Target's URL is in progress
    Loading,

    /// Waiting for network and DOM activity to settle
    Stabilizing,

    /// Running the table extractor on the retrieved document
    Extracting,

    /// Writing artifacts and records
    Persisting,

    /// A recoverable error occurred and the retry budget allows another attempt
    Retrying,

    // ===== Terminal States =====
    /// Target was fully processed
    Completed,

    /// Target gave up (retry budget exhausted or persistence failed)
    Failed,
}

impl TargetState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if an error in this state may be retried
    ///
    /// Persisting is excluded: store failures end the Target immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Loading | Self::Stabilizing | Self::Extracting)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: Self) -> bool {
        use TargetState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Queued, Loading)
                | (Loading, Stabilizing)
                | (Stabilizing, Extracting)
                | (Extracting, Persisting)
                | (Persisting, Completed)
                | (Loading | Stabilizing | Extracting, Retrying)
                | (Retrying, Loading)
        )
    }

    /// Returns the lowercase name used in logs and the record database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Loading => "loading",
            Self::Stabilizing => "stabilizing",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its lowercase name
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "loading" => Some(Self::Loading),
            "stabilizing" => Some(Self::Stabilizing),
            "extracting" => Some(Self::Extracting),
            "persisting" => Some(Self::Persisting),
            "retrying" => Some(Self::Retrying),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Loading,
            Self::Stabilizing,
            Self::Extracting,
            Self::Persisting,
            Self::Retrying,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
