//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunState`: the orchestrator's state machine (idle, scanning, fetching, recording, done)
//! - `CandidateOutcome`: how a single discovered link was resolved

mod outcome;
mod run_state;

// Re-export main types
pub use outcome::CandidateOutcome;
pub use run_state::RunState;
