//! Configuration loading and parsing for `release-train.toml` files.
//!
//! Every field has a default matching a standard-version driven frontend
//! project, so the file is optional. Values from the command line override
//! values from the file.
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::{ReleaseError, Result, process::ShellCommand};

/// Default configuration filename, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "release-train.toml";

/// Environment variable holding an HTTPS token for the remote.
pub const GIT_TOKEN_ENV: &str = "GIT_TOKEN";

pub const DEFAULT_BASE_BRANCH: &str = "develop";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_PREFLIGHT: &str = "sh ./script/pre-release.sh";
pub const DEFAULT_DRY_RUN: &str = "npx standard-version --dry-run";
pub const DEFAULT_RELEASE: &str = "npx standard-version";

/// Root configuration structure for `release-train.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Checkout of the project being released. Relative paths resolve
    /// against the current directory.
    pub project_path: PathBuf,
    /// Long-lived development branch releases are cut from.
    pub base_branch: String,
    /// Remote that receives release branches and tags.
    pub remote: String,
    /// Pre-release validation command, run from the project directory.
    pub preflight: String,
    /// Version tool invocation that only reports the next release.
    pub dry_run: String,
    /// Version tool invocation that bumps, commits and tags.
    pub release: String,
    /// Extra environment for the live release (git hooks are disabled by
    /// default since the tool commits on its own).
    pub release_env: BTreeMap<String, String>,
    /// Clipboard utility argv; detected from the platform when unset.
    pub clipboard: Option<Vec<String>>,
    /// HTTPS token for the remote, taken from [`GIT_TOKEN_ENV`].
    #[serde(skip)]
    pub git_token: Option<SecretString>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from("."),
            base_branch: DEFAULT_BASE_BRANCH.into(),
            remote: DEFAULT_REMOTE.into(),
            preflight: DEFAULT_PREFLIGHT.into(),
            dry_run: DEFAULT_DRY_RUN.into(),
            release: DEFAULT_RELEASE.into(),
            release_env: BTreeMap::from([("HUSKY".into(), "0".into())]),
            clipboard: None,
            git_token: None,
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_path: Option<PathBuf>,
    pub base_branch: Option<String>,
    pub remote: Option<String>,
}

impl ReleaseConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when present, or
    /// fall back to defaults. An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    info!("configuration not found: using default");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ReleaseConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(project_path) = overrides.project_path {
            self.project_path = project_path;
        }
        if let Some(base_branch) = overrides.base_branch {
            self.base_branch = base_branch;
        }
        if let Some(remote) = overrides.remote {
            self.remote = remote;
        }
        self
    }

    /// Make the project path absolute, pick up the token from the
    /// environment and validate the result.
    pub fn resolve(mut self) -> Result<Self> {
        if self.project_path.is_relative() {
            self.project_path = env::current_dir()?.join(&self.project_path);
        }

        if !self.project_path.is_dir() {
            return Err(ReleaseError::invalid_config(format!(
                "project path {} is not a directory",
                self.project_path.display()
            )));
        }

        for (name, value) in [
            ("base_branch", &self.base_branch),
            ("remote", &self.remote),
            ("dry_run", &self.dry_run),
            ("release", &self.release),
        ] {
            if value.trim().is_empty() {
                return Err(ReleaseError::invalid_config(format!(
                    "{name} must not be empty"
                )));
            }
        }

        if self.git_token.is_none()
            && let Ok(token) = env::var(GIT_TOKEN_ENV)
            && !token.is_empty()
        {
            self.git_token = Some(SecretString::from(token));
        }

        Ok(self)
    }

    pub fn preflight_command(&self) -> ShellCommand {
        ShellCommand::new(&self.preflight)
    }

    pub fn dry_run_command(&self) -> ShellCommand {
        ShellCommand::new(&self.dry_run)
    }

    pub fn release_command(&self) -> ShellCommand {
        self.release_env
            .iter()
            .fold(ShellCommand::new(&self.release), |cmd, (key, value)| {
                cmd.env(key, value)
            })
    }
}
