pub mod cli;
pub mod clipboard;
pub mod config;
mod error;
pub mod git;
pub mod orchestrator;
pub mod planner;
pub mod process;

pub use error::{ErrorKind, ReleaseError, Result};
pub use orchestrator::{Orchestrator, Workflow, WorkflowOutcome, WorkflowState};
pub use planner::ReleasePlan;

#[cfg(test)]
pub mod test_helpers;
