//! Release workflows as a sequential state machine.
//!
//! Each workflow is a fixed path through [`WorkflowState`]s. Steps are
//! awaited one after another and the first failure ends the run in
//! [`WorkflowState::Failed`]; nothing already done is rolled back (a branch
//! created before a failed push stays in place).
use derive_builder::Builder;
use log::*;
use std::{cell::Cell, rc::Rc};

use crate::{
    ReleaseError, Result,
    clipboard::Clipboard,
    config::ReleaseConfig,
    git::VersionControl,
    planner::{PlanParser, ReleasePlan, ReleasePlanner, TaggingReleaseParser},
    process::ProcessRunner,
};

pub mod state;

pub use state::{Workflow, WorkflowOutcome, WorkflowState};

#[derive(Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct OrchestratorParams {
    pub config: Rc<ReleaseConfig>,
    pub vcs: Rc<dyn VersionControl>,
    pub runner: Rc<dyn ProcessRunner>,
    pub clipboard: Rc<dyn Clipboard>,
    #[builder(default = "Rc::new(TaggingReleaseParser) as Rc<dyn PlanParser>")]
    pub parser: Rc<dyn PlanParser>,
}

impl OrchestratorParamsBuilder {
    pub fn build(&self) -> Result<Orchestrator> {
        let params = self._build().map_err(|e| {
            ReleaseError::invalid_config(format!(
                "Failed to build orchestrator: {}",
                e
            ))
        })?;
        Ok(Orchestrator::new(params))
    }
}

pub struct Orchestrator {
    config: Rc<ReleaseConfig>,
    vcs: Rc<dyn VersionControl>,
    runner: Rc<dyn ProcessRunner>,
    clipboard: Rc<dyn Clipboard>,
    planner: ReleasePlanner,
    state: Cell<WorkflowState>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorParamsBuilder {
        OrchestratorParamsBuilder::default()
    }

    pub fn new(params: OrchestratorParams) -> Self {
        let planner = ReleasePlanner::new(
            &params.config,
            Rc::clone(&params.runner),
            Rc::clone(&params.parser),
        );

        Self {
            config: params.config,
            vcs: params.vcs,
            runner: params.runner,
            clipboard: params.clipboard,
            planner,
            state: Cell::new(WorkflowState::Idle),
        }
    }

    /// State reached by the last (or current) run.
    pub fn state(&self) -> WorkflowState {
        self.state.get()
    }

    pub async fn run(&self, workflow: Workflow) -> Result<WorkflowOutcome> {
        self.state.set(WorkflowState::Idle);
        info!("starting {workflow} workflow");

        let result = match workflow {
            Workflow::ToTest => self.release_to_test().await,
            Workflow::ToProduction => self.release_to_production().await,
            Workflow::DeleteTestBranch => self.delete_test_branch().await,
        };

        match &result {
            Ok(_) => self.enter(WorkflowState::Done),
            Err(err) => {
                error!("{workflow} failed during {}: {err}", self.state());
                self.enter(WorkflowState::Failed);
            }
        }

        result
    }

    fn enter(&self, state: WorkflowState) {
        debug!("{} -> {state}", self.state.get());
        self.state.set(state);
    }

    async fn release_to_test(&self) -> Result<WorkflowOutcome> {
        self.preflight().await?;
        self.sync_base_branch().await?;
        let plan = self.plan().await?;

        self.enter(WorkflowState::BranchCreation);
        let branch = plan.release_branch();
        self.vcs.create_local_branch(branch).await?;
        info!("branch {branch} created and checked out");
        self.vcs.push(&self.config.remote, branch).await?;
        info!("branch {branch} pushed to {}", self.config.remote);

        self.enter(WorkflowState::CopyChangelog);
        self.clipboard.write(plan.changelog()).await?;
        info!("changelog preview copied to clipboard");

        Ok(WorkflowOutcome::SentToTest(plan))
    }

    async fn release_to_production(&self) -> Result<WorkflowOutcome> {
        self.preflight().await?;
        self.sync_base_branch().await?;
        let plan = self.plan().await?;

        self.enter(WorkflowState::BranchSwitch);
        let branch = plan.release_branch();
        self.switch_and_update(branch).await?;

        let current = self.vcs.current_branch().await?;
        if current != branch {
            return Err(ReleaseError::checkout(
                branch,
                format!("refusing to tag: {current} is checked out"),
            ));
        }

        self.enter(WorkflowState::TagAndRelease);
        self.planner.release(&plan).await?;

        self.enter(WorkflowState::PushBranch);
        self.vcs.push(&self.config.remote, branch).await?;
        self.vcs.push_tags(&self.config.remote).await?;
        info!("{branch} and tags pushed to {}", self.config.remote);

        Ok(WorkflowOutcome::Released(plan))
    }

    async fn delete_test_branch(&self) -> Result<WorkflowOutcome> {
        self.sync_base_branch().await?;
        let plan = self.plan().await?;
        let branch = plan.release_branch().to_string();

        let branches = self.vcs.list_branches().await?;
        if !branches.contains(&branch) {
            info!("branch {branch} does not exist");
            return Ok(WorkflowOutcome::NothingToDelete(branch));
        }

        // a failed to-test push leaves the branch local only
        self.enter(WorkflowState::DeleteBranch);
        if branches.is_local(&branch) {
            self.vcs.delete_local_branch(&branch).await?;
            info!("deleted branch {branch}");
        }
        if branches.is_remote(&branch) {
            self.vcs
                .delete_remote_branch(&self.config.remote, &branch)
                .await?;
            info!("deleted branch {branch} from {}", self.config.remote);
        }

        Ok(WorkflowOutcome::TestBranchDeleted(branch))
    }

    async fn preflight(&self) -> Result<()> {
        self.enter(WorkflowState::PreflightCi);
        info!("running pre-release checks");

        let output = self
            .runner
            .run(&self.config.preflight_command(), &self.config.project_path)
            .await
            .map_err(ReleaseError::Preflight)?;

        debug!("pre-release checks exited with status {}", output.code);

        // the checks report progress on stderr
        let stderr = output.stderr.trim_end();
        if !stderr.is_empty() {
            info!("{stderr}");
        }

        Ok(())
    }

    async fn sync_base_branch(&self) -> Result<()> {
        self.enter(WorkflowState::SyncBaseBranch);
        self.switch_and_update(&self.config.base_branch).await
    }

    async fn switch_and_update(&self, branch: &str) -> Result<()> {
        info!("switching to {branch} and updating it");
        self.vcs.checkout(branch).await?;
        self.vcs.pull(&self.config.remote, branch).await?;
        info!("{branch} is up to date with {}", self.config.remote);
        Ok(())
    }

    async fn plan(&self) -> Result<ReleasePlan> {
        self.enter(WorkflowState::Planning);
        self.planner.plan().await
    }
}
