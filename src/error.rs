//! Error types for release-train.
//!
//! Every failure that ends a workflow is a [`ReleaseError`]. Each variant
//! belongs to one [`ErrorKind`], and the kind name is part of the rendered
//! message (`[PushError] ...`) so scripts wrapping the binary can match on
//! it.

use strum::Display;
use thiserror::Error;

use crate::process::ProcessError;

/// Taxonomy of workflow failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[strum(serialize = "PreflightError")]
    Preflight,
    #[strum(serialize = "PlannerExecutionError")]
    PlannerExecution,
    #[strum(serialize = "VersionParseError")]
    VersionParse,
    #[strum(serialize = "CheckoutError")]
    Checkout,
    #[strum(serialize = "SyncError")]
    Sync,
    #[strum(serialize = "BranchExistsError")]
    BranchExists,
    #[strum(serialize = "PushError")]
    Push,
    #[strum(serialize = "DeleteError")]
    Delete,
    #[strum(serialize = "ClipboardError")]
    Clipboard,
    #[strum(serialize = "ConfigError")]
    Config,
    #[strum(serialize = "RepositoryError")]
    Repository,
    #[strum(serialize = "IoError")]
    Io,
}

/// Main error type for release-train operations.
#[derive(Error, Debug)]
pub enum ReleaseError {
    // External process failures
    #[error("[PreflightError] pre-release checks failed: {0}")]
    Preflight(#[source] ProcessError),

    #[error("[PlannerExecutionError] version tool failed: {0}")]
    PlannerExecution(#[source] ProcessError),

    #[error("[VersionParseError] {0}")]
    VersionParse(String),

    // Git errors
    #[error("[CheckoutError] unable to check out '{branch}': {reason}")]
    Checkout { branch: String, reason: String },

    #[error("[SyncError] unable to pull '{branch}' from '{remote}': {reason}")]
    Sync {
        remote: String,
        branch: String,
        reason: String,
    },

    #[error("[BranchExistsError] branch '{0}' already exists")]
    BranchExists(String),

    #[error("[PushError] push of '{refname}' to '{remote}' failed: {reason}")]
    Push {
        remote: String,
        refname: String,
        reason: String,
    },

    #[error("[DeleteError] unable to delete branch '{branch}': {reason}")]
    Delete { branch: String, reason: String },

    #[error("[RepositoryError] {0}")]
    Repository(#[from] git2::Error),

    // Host clipboard
    #[error("[ClipboardError] {0}")]
    Clipboard(String),

    // Configuration errors
    #[error("[ConfigError] invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("[ConfigError] TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("[ConfigError] logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("[IoError] {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using ReleaseError
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Preflight(_) => ErrorKind::Preflight,
            Self::PlannerExecution(_) => ErrorKind::PlannerExecution,
            Self::VersionParse(_) => ErrorKind::VersionParse,
            Self::Checkout { .. } => ErrorKind::Checkout,
            Self::Sync { .. } => ErrorKind::Sync,
            Self::BranchExists(_) => ErrorKind::BranchExists,
            Self::Push { .. } => ErrorKind::Push,
            Self::Delete { .. } => ErrorKind::Delete,
            Self::Repository(_) => ErrorKind::Repository,
            Self::Clipboard(_) => ErrorKind::Clipboard,
            Self::InvalidConfig(_) | Self::TomlParse(_) | Self::Logger(_) => {
                ErrorKind::Config
            }
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn version_parse(msg: impl Into<String>) -> Self {
        Self::VersionParse(msg.into())
    }

    pub fn checkout(branch: impl Into<String>, reason: impl ToString) -> Self {
        Self::Checkout {
            branch: branch.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sync(
        remote: impl Into<String>,
        branch: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Sync {
            remote: remote.into(),
            branch: branch.into(),
            reason: reason.to_string(),
        }
    }

    pub fn push(
        remote: impl Into<String>,
        refname: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Push {
            remote: remote.into(),
            refname: refname.into(),
            reason: reason.to_string(),
        }
    }

    pub fn delete(branch: impl Into<String>, reason: impl ToString) -> Self {
        Self::Delete {
            branch: branch.into(),
            reason: reason.to_string(),
        }
    }

    pub fn clipboard(msg: impl Into<String>) -> Self {
        Self::Clipboard(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
