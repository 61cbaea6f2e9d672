//! libgit2 implementation of [`VersionControl`].
use async_trait::async_trait;
use git2::{BranchType, ErrorCode, build::CheckoutBuilder};
use log::*;
use secrecy::SecretString;
use std::{cell::RefCell, path::Path, rc::Rc};
use tokio::sync::Mutex;

use crate::{
    ReleaseError, Result,
    git::{
        BranchSnapshot, VersionControl,
        auth::{self, Rejections},
    },
};

/// Project checkout opened with libgit2.
pub struct GitRepository {
    remote: String,
    token: Option<SecretString>,
    repo: Mutex<git2::Repository>,
}

impl GitRepository {
    /// Open the checkout at `path`. `remote` is the remote consulted when
    /// listing branches or checking out a branch that only exists remotely.
    pub fn open(
        path: &Path,
        remote: impl Into<String>,
        token: Option<SecretString>,
    ) -> Result<Self> {
        let repo = git2::Repository::open(path)?;
        Ok(Self {
            remote: remote.into(),
            token,
            repo: Mutex::new(repo),
        })
    }
}

fn fetch(
    repo: &git2::Repository,
    remote_name: &str,
    refspecs: &[&str],
    token: Option<SecretString>,
    prune: bool,
) -> std::result::Result<(), git2::Error> {
    let mut remote = repo.find_remote(remote_name)?;
    let mut opts = git2::FetchOptions::new();
    opts.remote_callbacks(auth::remote_callbacks(repo.config()?, token));
    if prune {
        opts.prune(git2::FetchPrune::On);
    }
    remote.fetch(refspecs, Some(&mut opts), None)
}

/// Push `refspecs`, folding transport errors and per-ref rejections into a
/// single failure reason.
fn push_refs(
    repo: &git2::Repository,
    remote_name: &str,
    refspecs: &[String],
    token: Option<SecretString>,
) -> std::result::Result<(), String> {
    let mut remote = repo.find_remote(remote_name).map_err(|e| e.to_string())?;
    let config = repo.config().map_err(|e| e.to_string())?;

    let rejections: Rejections = Rc::new(RefCell::new(vec![]));
    let mut opts = git2::PushOptions::new();
    opts.remote_callbacks(auth::push_callbacks(
        config,
        token,
        Rc::clone(&rejections),
    ));

    remote
        .push(refspecs, Some(&mut opts))
        .map_err(|e| e.to_string())?;

    let rejected = rejections.borrow();
    if !rejected.is_empty() {
        return Err(format!("rejected by remote: {}", rejected.join(", ")));
    }

    Ok(())
}

fn branch_names(
    repo: &git2::Repository,
    remote_name: &str,
    token: Option<SecretString>,
) -> Result<BranchSnapshot> {
    debug!("refreshing branches from {remote_name}");
    fetch(repo, remote_name, &[], token, true)?;

    let mut snapshot = BranchSnapshot::default();

    for entry in repo.branches(None)? {
        let (branch, branch_type) = entry?;
        let Some(name) = branch.name()? else {
            continue;
        };

        match branch_type {
            BranchType::Local => {
                snapshot.local.insert(name.to_string());
            }
            BranchType::Remote => {
                if let Some((remote, short)) = name.split_once('/')
                    && remote == remote_name
                    && short != "HEAD"
                {
                    snapshot.remote.insert(short.to_string());
                }
            }
        }
    }

    Ok(snapshot)
}

fn checkout_branch(
    repo: &git2::Repository,
    remote_name: &str,
    token: Option<SecretString>,
    branch: &str,
) -> Result<()> {
    let local = match repo.find_branch(branch, BranchType::Local) {
        Ok(local) => local,
        Err(err) if err.code() == ErrorCode::NotFound => {
            debug!("{branch} not found locally, looking on {remote_name}");
            fetch(repo, remote_name, &[], token, false)
                .map_err(|e| ReleaseError::checkout(branch, e))?;

            let tracking = format!("{remote_name}/{branch}");
            let remote_branch = repo
                .find_branch(&tracking, BranchType::Remote)
                .map_err(|_| {
                    ReleaseError::checkout(
                        branch,
                        format!("branch not found locally or on {remote_name}"),
                    )
                })?;
            let commit = remote_branch
                .get()
                .peel_to_commit()
                .map_err(|e| ReleaseError::checkout(branch, e))?;

            let mut local = repo
                .branch(branch, &commit, false)
                .map_err(|e| ReleaseError::checkout(branch, e))?;
            local
                .set_upstream(Some(&tracking))
                .map_err(|e| ReleaseError::checkout(branch, e))?;
            local
        }
        Err(err) => return Err(ReleaseError::checkout(branch, err)),
    };

    let ref_name = local
        .get()
        .name()
        .ok_or_else(|| ReleaseError::checkout(branch, "invalid branch name"))?
        .to_string();

    let target = repo
        .revparse_single(&ref_name)
        .map_err(|e| ReleaseError::checkout(branch, e))?;
    repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
        .map_err(|e| ReleaseError::checkout(branch, e))?;
    repo.set_head(&ref_name)
        .map_err(|e| ReleaseError::checkout(branch, e))?;

    Ok(())
}

fn fast_forward(
    repo: &git2::Repository,
    remote_name: &str,
    token: Option<SecretString>,
    branch: &str,
) -> std::result::Result<(), String> {
    let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote_name}/{branch}");
    fetch(repo, remote_name, &[refspec.as_str()], token, false)
        .map_err(|e| e.to_string())?;

    let tracking = repo
        .find_reference(&format!("refs/remotes/{remote_name}/{branch}"))
        .map_err(|_| format!("branch not found on {remote_name}"))?;
    let fetched = repo
        .reference_to_annotated_commit(&tracking)
        .map_err(|e| e.to_string())?;

    let local_ref_name = format!("refs/heads/{branch}");
    let mut local_ref = repo
        .find_reference(&local_ref_name)
        .map_err(|_| "no local branch to update".to_string())?;

    let (analysis, _) = repo
        .merge_analysis_for_ref(&local_ref, &[&fetched])
        .map_err(|e| e.to_string())?;

    if analysis.is_up_to_date() {
        debug!("{branch} already up to date");
        return Ok(());
    }

    if !analysis.is_fast_forward() {
        return Err(
            "local and remote history diverged, fast-forward impossible".into()
        );
    }

    let is_head = repo
        .head()
        .ok()
        .and_then(|head| head.name().map(|name| name == local_ref_name))
        .unwrap_or(false);

    // update the working tree first so a conflict leaves the ref untouched
    if is_head {
        let target = repo
            .find_object(fetched.id(), None)
            .map_err(|e| e.to_string())?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(|e| e.to_string())?;
    }

    local_ref
        .set_target(fetched.id(), &format!("pull: fast-forward {branch}"))
        .map_err(|e| e.to_string())?;

    Ok(())
}

#[async_trait]
impl VersionControl for GitRepository {
    async fn checkout(&self, branch: &str) -> Result<()> {
        info!("switching to branch: {branch}");
        let repo = self.repo.lock().await;
        checkout_branch(&repo, &self.remote, self.token.clone(), branch)
    }

    async fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        info!("pulling {branch} from {remote}");
        let repo = self.repo.lock().await;
        fast_forward(&repo, remote, self.token.clone(), branch)
            .map_err(|reason| ReleaseError::sync(remote, branch, reason))
    }

    async fn list_branches(&self) -> Result<BranchSnapshot> {
        let repo = self.repo.lock().await;
        branch_names(&repo, &self.remote, self.token.clone())
    }

    async fn create_local_branch(&self, name: &str) -> Result<()> {
        let repo = self.repo.lock().await;

        let known = branch_names(&repo, &self.remote, self.token.clone())?;
        if known.contains(name) {
            return Err(ReleaseError::BranchExists(name.to_string()));
        }

        info!("creating branch: {name}");
        let commit = repo.head()?.peel_to_commit()?;
        let branch = repo.branch(name, &commit, false)?;
        let ref_name = branch
            .get()
            .name()
            .ok_or_else(|| ReleaseError::checkout(name, "invalid branch name"))?
            .to_string();

        // the new branch points at HEAD, so only HEAD itself moves
        repo.set_head(&ref_name)
            .map_err(|e| ReleaseError::checkout(name, e))?;

        Ok(())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        info!("pushing branch {branch} to {remote}");
        let repo = self.repo.lock().await;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        push_refs(&repo, remote, &[refspec], self.token.clone())
            .map_err(|reason| ReleaseError::push(remote, branch, reason))
    }

    async fn push_tags(&self, remote: &str) -> Result<()> {
        let repo = self.repo.lock().await;

        let refspecs = repo
            .tag_names(None)?
            .iter()
            .flatten()
            .map(|tag| format!("refs/tags/{tag}:refs/tags/{tag}"))
            .collect::<Vec<String>>();

        if refspecs.is_empty() {
            warn!("no tags to push");
            return Ok(());
        }

        info!("pushing {} tags to {remote}", refspecs.len());
        push_refs(&repo, remote, &refspecs, self.token.clone())
            .map_err(|reason| ReleaseError::push(remote, "tags", reason))
    }

    async fn delete_local_branch(&self, name: &str) -> Result<()> {
        info!("deleting local branch {name}");
        let repo = self.repo.lock().await;

        let mut branch = repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| ReleaseError::delete(name, "no such local branch"))?;

        if branch.is_head() {
            return Err(ReleaseError::delete(
                name,
                "branch is currently checked out",
            ));
        }

        branch.delete().map_err(|e| ReleaseError::delete(name, e))
    }

    async fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()> {
        info!("deleting branch {name} from {remote}");
        let repo = self.repo.lock().await;

        let tracking_ref = format!("refs/remotes/{remote}/{name}");
        if repo.find_reference(&tracking_ref).is_err() {
            return Err(ReleaseError::delete(
                name,
                format!("no such branch on {remote}"),
            ));
        }

        let refspec = format!(":refs/heads/{name}");
        push_refs(&repo, remote, &[refspec], self.token.clone())
            .map_err(|reason| ReleaseError::delete(name, reason))?;

        // libgit2 may already have pruned the tracking ref while updating tips
        if let Ok(mut reference) = repo.find_reference(&tracking_ref) {
            reference.delete()?;
        }

        Ok(())
    }

    async fn current_branch(&self) -> Result<String> {
        let repo = self.repo.lock().await;
        let head = repo
            .head()
            .map_err(|e| ReleaseError::checkout("HEAD", e))?;

        if !head.is_branch() {
            return Err(ReleaseError::checkout("HEAD", "HEAD is detached"));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::checkout("HEAD", "invalid branch name"))
    }
}
