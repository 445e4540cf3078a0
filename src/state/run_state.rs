//! Orchestrator state machine definitions

use std::fmt;

/// Where the orchestrator is in a run
///
/// A run moves `Idle → Scanning → Fetching → Recording` and back to `Scanning` or
/// `Fetching` for the next target or candidate, ending in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Run has been created but no target has been scanned yet
    Idle,

    /// Discovering links on a target page
    Scanning,

    /// Downloading a candidate
    Fetching,

    /// Persisting a successful download to the history
    Recording,

    /// All targets processed
    Done,
}

impl RunState {
    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (*self, next),
            (Idle, Scanning)
                | (Idle, Done)
                | (Scanning, Scanning)
                | (Scanning, Fetching)
                | (Scanning, Done)
                | (Fetching, Fetching)
                | (Fetching, Recording)
                | (Fetching, Scanning)
                | (Fetching, Done)
                | (Recording, Fetching)
                | (Recording, Scanning)
                | (Recording, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Fetching => "fetching",
            Self::Recording => "recording",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
