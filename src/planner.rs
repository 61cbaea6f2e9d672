//! Release planning on top of the version-bumping tool.
//!
//! The tool is run in dry-run mode to learn the next version and the
//! changelog it would write; its freeform report is turned into a
//! [`ReleasePlan`] by a [`PlanParser`]. The same parser verifies the report
//! of the live run that actually bumps, commits and tags.
use log::*;
use regex::Regex;
use semver::Version;
use std::{path::PathBuf, rc::Rc, sync::LazyLock};

#[cfg(test)]
use mockall::automock;

use crate::{
    ReleaseError, Result,
    config::ReleaseConfig,
    process::{ProcessRunner, ShellCommand},
};

/// Prefix of every release branch name.
pub const RELEASE_BRANCH_PREFIX: &str = "release/";

static TAGGING_RELEASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"tagging release v(?<version>\d+\.\d+\.\d+)").unwrap()
});

/// Next release as computed from a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    version: Version,
    release_branch: String,
    changelog: String,
}

impl ReleasePlan {
    pub fn new(version: Version, changelog: impl Into<String>) -> Self {
        let release_branch = format!("{RELEASE_BRANCH_PREFIX}{version}");
        Self {
            version,
            release_branch,
            changelog: changelog.into(),
        }
    }

    /// Plan for a version exactly as the tool printed it. Components may
    /// carry leading zeros (`1.04.0`), which strict semver rejects; the
    /// branch keeps the printed form.
    pub fn from_printed(
        printed: &str,
        changelog: impl Into<String>,
    ) -> Result<Self> {
        let invalid = |reason: String| {
            ReleaseError::version_parse(format!(
                "invalid release version {printed}: {reason}"
            ))
        };

        let parts = printed
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<u64>>>()?;

        let [major, minor, patch] = parts[..] else {
            return Err(invalid("expected major.minor.patch".into()));
        };

        Ok(Self {
            version: Version::new(major, minor, patch),
            release_branch: format!("{RELEASE_BRANCH_PREFIX}{printed}"),
            changelog: changelog.into(),
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `release/<version>` as printed by the tool, without a `v` prefix.
    pub fn release_branch(&self) -> &str {
        &self.release_branch
    }

    /// Full report of the dry run.
    pub fn changelog(&self) -> &str {
        &self.changelog
    }
}

/// Turns the version tool's report into a plan.
#[cfg_attr(test, automock)]
pub trait PlanParser: Send + Sync {
    fn parse(&self, output: &str) -> Result<ReleasePlan>;
}

/// Parser for `standard-version` style reports, which announce the tag with
/// a `tagging release vX.Y.Z` line.
#[derive(Debug, Default, Clone)]
pub struct TaggingReleaseParser;

impl PlanParser for TaggingReleaseParser {
    fn parse(&self, output: &str) -> Result<ReleasePlan> {
        let captures = TAGGING_RELEASE_REGEX.captures(output).ok_or_else(|| {
            ReleaseError::version_parse(
                "version tool output has no 'tagging release vX.Y.Z' line \
                 (nothing to release, or the output format changed)",
            )
        })?;

        ReleasePlan::from_printed(&captures["version"], output)
    }
}

/// Runs the version tool and interprets its reports.
pub struct ReleasePlanner {
    runner: Rc<dyn ProcessRunner>,
    parser: Rc<dyn PlanParser>,
    project_path: PathBuf,
    dry_run_command: ShellCommand,
    release_command: ShellCommand,
}

impl ReleasePlanner {
    pub fn new(
        config: &ReleaseConfig,
        runner: Rc<dyn ProcessRunner>,
        parser: Rc<dyn PlanParser>,
    ) -> Self {
        Self {
            runner,
            parser,
            project_path: config.project_path.clone(),
            dry_run_command: config.dry_run_command(),
            release_command: config.release_command(),
        }
    }

    /// Compute the next release without touching the repository.
    pub async fn plan(&self) -> Result<ReleasePlan> {
        info!("computing next release version and changelog");

        let output = self
            .runner
            .run(&self.dry_run_command, &self.project_path)
            .await
            .map_err(ReleaseError::PlannerExecution)?;

        let plan = self.parser.parse(&output.stdout)?;

        info!("next release version: {}", plan.version());
        Ok(plan)
    }

    /// Run the version tool for real and check that it tagged the planned
    /// version.
    pub async fn release(&self, plan: &ReleasePlan) -> Result<()> {
        info!("creating release v{}", plan.version());

        let output = self
            .runner
            .run(&self.release_command, &self.project_path)
            .await
            .map_err(ReleaseError::PlannerExecution)?;

        let released = self.parser.parse(&output.stdout)?;

        if released.version() != plan.version() {
            return Err(ReleaseError::version_parse(format!(
                "version tool tagged v{} but v{} was planned",
                released.version(),
                plan.version()
            )));
        }

        info!("tagged release v{}", released.version());
        Ok(())
    }
}
