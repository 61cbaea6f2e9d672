//! Workflow selection and state-machine vocabulary.
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::planner::ReleasePlan;

/// The three release workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Workflow {
    /// Cut `release/<version>` from the base branch and hand it to QA.
    #[strum(serialize = "to-test")]
    ToTest,
    /// Tag the release branch and publish it.
    #[strum(serialize = "to-production")]
    ToProduction,
    /// Remove the release branch of the pending version.
    #[strum(serialize = "delete-test-branch")]
    DeleteTestBranch,
}

impl Workflow {
    /// Command-line flag selecting this workflow.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::ToTest => "-test",
            Self::ToProduction => "-prod",
            Self::DeleteTestBranch => "-delete-test",
        }
    }

    /// Match a selector: either the flag (`-prod`) or the workflow name
    /// (`to-production`).
    pub fn from_selector(selector: &str) -> Option<Self> {
        Self::iter().find(|workflow| {
            workflow.flag() == selector || workflow.to_string() == selector
        })
    }
}

/// Steps of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WorkflowState {
    Idle,
    #[strum(serialize = "pre-release checks")]
    PreflightCi,
    #[strum(serialize = "sync base branch")]
    SyncBaseBranch,
    #[strum(serialize = "planning")]
    Planning,
    #[strum(serialize = "branch creation")]
    BranchCreation,
    #[strum(serialize = "branch switch")]
    BranchSwitch,
    #[strum(serialize = "tag and release")]
    TagAndRelease,
    #[strum(serialize = "push branch")]
    PushBranch,
    #[strum(serialize = "delete branch")]
    DeleteBranch,
    #[strum(serialize = "copy changelog")]
    CopyChangelog,
    Done,
    Failed,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    SentToTest(ReleasePlan),
    Released(ReleasePlan),
    TestBranchDeleted(String),
    NothingToDelete(String),
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SentToTest(plan) => write!(
                f,
                "{} pushed for testing, changelog copied to clipboard",
                plan.release_branch()
            ),
            Self::Released(plan) => write!(
                f,
                "v{} released from {}",
                plan.version(),
                plan.release_branch()
            ),
            Self::TestBranchDeleted(branch) => {
                write!(f, "{branch} deleted locally and remotely")
            }
            Self::NothingToDelete(branch) => {
                write!(f, "{branch} does not exist, nothing to delete")
            }
        }
    }
}
