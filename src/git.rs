//! Version-control operations used by the release workflows.
//!
//! The workflows only talk to the [`VersionControl`] trait; [`GitRepository`]
//! is the libgit2 implementation working on the project checkout.
use async_trait::async_trait;
use std::collections::BTreeSet;

#[cfg(test)]
use mockall::automock;

use crate::Result;

mod auth;
pub mod repository;

pub use repository::GitRepository;

/// Branch names known locally and on the remote, taken at one point in time.
/// Remote names carry no `<remote>/` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSnapshot {
    pub local: BTreeSet<String>,
    pub remote: BTreeSet<String>,
}

impl BranchSnapshot {
    /// Known on either side.
    pub fn contains(&self, name: &str) -> bool {
        self.is_local(name) || self.is_remote(name)
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local.contains(name)
    }

    pub fn is_remote(&self, name: &str) -> bool {
        self.remote.contains(name)
    }

    /// Union of local and remote names.
    pub fn names(&self) -> BTreeSet<&str> {
        self.local
            .iter()
            .chain(&self.remote)
            .map(String::as_str)
            .collect()
    }
}

/// Operations against a single repository checkout.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Switch the working tree to `branch`, creating a local tracking branch
    /// when it only exists on the remote.
    async fn checkout(&self, branch: &str) -> Result<()>;

    /// Fetch `branch` from `remote` and fast-forward the local branch.
    async fn pull(&self, remote: &str, branch: &str) -> Result<()>;

    /// Fresh snapshot of local and remote branch names.
    async fn list_branches(&self) -> Result<BranchSnapshot>;

    /// Create `name` at HEAD and check it out. Fails with
    /// [`crate::ReleaseError::BranchExists`] when `name` is already known.
    async fn create_local_branch(&self, name: &str) -> Result<()>;

    async fn push(&self, remote: &str, branch: &str) -> Result<()>;

    async fn push_tags(&self, remote: &str) -> Result<()>;

    async fn delete_local_branch(&self, name: &str) -> Result<()>;

    async fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()>;

    /// Short name of the checked-out branch.
    async fn current_branch(&self) -> Result<String>;
}
