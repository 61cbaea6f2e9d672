//! CLI argument parsing.
use clap::Parser;
use std::path::PathBuf;

use crate::{config::ConfigOverrides, orchestrator::Workflow};

/// Drive the develop -> release/<version> -> production workflow.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Workflow to run: -test, -prod or -delete-test.
    #[arg(allow_hyphen_values = true)]
    pub selector: Option<String>,

    #[arg(long)]
    /// Configuration file. Defaults to release-train.toml when present.
    pub config: Option<PathBuf>,

    #[arg(long)]
    /// Project checkout to release. Defaults to the current directory.
    pub project_path: Option<PathBuf>,

    #[arg(long)]
    /// Branch releases are cut from.
    pub base_branch: Option<String>,

    #[arg(long)]
    /// Remote receiving release branches and tags.
    pub remote: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Workflow named by the selector, if any.
    pub fn workflow(&self) -> Option<Workflow> {
        self.selector.as_deref().and_then(Workflow::from_selector)
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_path: self.project_path.clone(),
            base_branch: self.base_branch.clone(),
            remote: self.remote.clone(),
        }
    }
}
