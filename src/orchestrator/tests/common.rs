//! Common test utilities for orchestrator tests.

use mockall::Sequence;
use std::{path::Path, rc::Rc};

use crate::{
    clipboard::{Clipboard, MockClipboard},
    config::{DEFAULT_DRY_RUN, DEFAULT_PREFLIGHT, DEFAULT_RELEASE},
    git::{MockVersionControl, VersionControl},
    orchestrator::Orchestrator,
    process::{MockProcessRunner, ProcessError, ProcessOutput, ProcessRunner},
    test_helpers::create_test_config,
};

pub use crate::{
    ErrorKind, ReleaseError,
    orchestrator::{Workflow, WorkflowOutcome, WorkflowState},
    test_helpers::{TEST_BASE_BRANCH, TEST_REMOTE, dry_run_output},
};

pub const PROJECT_PATH: &str = "/work/lt-frontend";
pub const VERSION: &str = "1.4.0";
pub const RELEASE_BRANCH: &str = "release/1.4.0";

/// Mocks for every collaborator. Tests set expectations, then call
/// [`Mocks::orchestrator`]. A call without a matching expectation panics,
/// which is how "this step never runs" is asserted.
pub struct Mocks {
    pub vcs: MockVersionControl,
    pub runner: MockProcessRunner,
    pub clipboard: MockClipboard,
    pub seq: Sequence,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            vcs: MockVersionControl::new(),
            runner: MockProcessRunner::new(),
            clipboard: MockClipboard::new(),
            seq: Sequence::new(),
        }
    }

    pub fn orchestrator(self) -> Orchestrator {
        let vcs: Rc<dyn VersionControl> = Rc::new(self.vcs);
        let runner: Rc<dyn ProcessRunner> = Rc::new(self.runner);
        let clipboard: Rc<dyn Clipboard> = Rc::new(self.clipboard);

        Orchestrator::builder()
            .config(Rc::new(create_test_config(Path::new(PROJECT_PATH))))
            .vcs(vcs)
            .runner(runner)
            .clipboard(clipboard)
            .build()
            .unwrap()
    }

    pub fn expect_preflight(&mut self, result: std::result::Result<(), &'static str>) {
        self.runner
            .expect_run()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(|cmd, dir| {
                cmd.line() == DEFAULT_PREFLIGHT && dir == Path::new(PROJECT_PATH)
            })
            .returning(move |cmd, _| match result {
                Ok(()) => Ok(output("")),
                Err(stderr) => Err(ProcessError::Failed {
                    command: cmd.to_string(),
                    code: Some(1),
                    stderr: stderr.into(),
                }),
            });
    }

    pub fn expect_sync(&mut self, branch: &'static str) {
        self.vcs
            .expect_checkout()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(move |b| b == branch)
            .returning(|_| Ok(()));
        self.vcs
            .expect_pull()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(move |remote, b| remote == TEST_REMOTE && b == branch)
            .returning(|_, _| Ok(()));
    }

    /// Dry run of the version tool printing `stdout`.
    pub fn expect_dry_run(&mut self, stdout: String) {
        self.runner
            .expect_run()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(|cmd, dir| {
                cmd.line() == DEFAULT_DRY_RUN && dir == Path::new(PROJECT_PATH)
            })
            .returning(move |_, _| Ok(output(&stdout)));
    }

    /// Live run of the version tool printing `stdout`.
    pub fn expect_live_release(&mut self, stdout: String) {
        self.runner
            .expect_run()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(|cmd, _| cmd.line() == DEFAULT_RELEASE)
            .returning(move |_, _| Ok(output(&stdout)));
    }

    pub fn expect_push(&mut self, branch: &'static str) {
        self.vcs
            .expect_push()
            .times(1)
            .in_sequence(&mut self.seq)
            .withf(move |remote, b| remote == TEST_REMOTE && b == branch)
            .returning(|_, _| Ok(()));
    }
}

pub fn output(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}
