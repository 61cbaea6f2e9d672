//! Common test helper functions shared across test modules.
//!
//! Provides scratch git repositories wired to a local bare "origin" and
//! canned configuration so tests never touch a real project checkout.
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

use crate::config::ReleaseConfig;

pub const TEST_REMOTE: &str = "origin";
pub const TEST_BASE_BRANCH: &str = "develop";

/// Output of a dry run that would tag `version`, shaped like the real tool.
pub fn dry_run_output(version: &str) -> String {
    format!(
        "✔ bumping version in package.json from 1.3.2 to {version}\n\
         ✔ outputting changes to CHANGELOG.md\n\n\
         ---\n\
         ### [{version}] (2026-10-16)\n\n\
         ### Features\n\n\
         * **search:** add hotel filters\n\
         ---\n\n\
         ✔ committing package.json and CHANGELOG.md\n\
         ✔ tagging release v{version}\n"
    )
}

/// Creates a test ReleaseConfig pointing at `project_path`.
pub fn create_test_config(project_path: &Path) -> ReleaseConfig {
    ReleaseConfig {
        project_path: project_path.to_path_buf(),
        base_branch: TEST_BASE_BRANCH.into(),
        remote: TEST_REMOTE.into(),
        ..ReleaseConfig::default()
    }
}

/// A working repository cloned from a bare origin, plus helpers for a second
/// developer's clone to simulate activity on the remote.
pub struct GitFixture {
    // held for cleanup
    _tmp: TempDir,
    pub origin: PathBuf,
    pub work: PathBuf,
    root: PathBuf,
}

impl GitFixture {
    /// Bare origin with one commit on `develop`, and a working clone with
    /// `develop` checked out.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let origin = root.join("origin.git");
        let work = root.join("work");

        let bare = git2::Repository::init_bare(&origin).unwrap();

        let repo = git2::Repository::init(&work).unwrap();
        repo.set_head(&format!("refs/heads/{TEST_BASE_BRANCH}"))
            .unwrap();
        commit_file(&repo, "package.json", "{\"version\":\"1.3.2\"}", "init");
        repo.remote(TEST_REMOTE, origin.to_str().unwrap()).unwrap();
        push(&repo, &format!("refs/heads/{TEST_BASE_BRANCH}"));

        bare.set_head(&format!("refs/heads/{TEST_BASE_BRANCH}"))
            .unwrap();

        Self {
            _tmp: tmp,
            origin,
            work,
            root,
        }
    }

    pub fn work_repo(&self) -> git2::Repository {
        git2::Repository::open(&self.work).unwrap()
    }

    pub fn origin_repo(&self) -> git2::Repository {
        git2::Repository::open_bare(&self.origin).unwrap()
    }

    /// Second clone of origin, as another developer would have.
    pub fn other_clone(&self, name: &str) -> git2::Repository {
        let path = self.root.join(name);
        git2::Repository::clone(self.origin.to_str().unwrap(), path).unwrap()
    }

    pub fn origin_has_ref(&self, refname: &str) -> bool {
        self.origin_repo().find_reference(refname).is_ok()
    }
}

/// Write `file` with `content`, stage it and commit on HEAD.
pub fn commit_file(
    repo: &git2::Repository,
    file: &str,
    content: &str,
    msg: &str,
) -> git2::Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(file), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature =
        git2::Signature::now("Release Train", "release-train@example.com")
            .unwrap();

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => vec![],
    };
    let parent_refs = parents.iter().collect::<Vec<&git2::Commit>>();

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        msg,
        &tree,
        &parent_refs,
    )
    .unwrap()
}

/// Create `branch` at HEAD in `repo` without switching to it.
pub fn create_branch(repo: &git2::Repository, branch: &str) {
    let commit = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(branch, &commit, false).unwrap();
}

/// Push `refname` to the test remote of `repo`.
pub fn push(repo: &git2::Repository, refname: &str) {
    let mut remote = repo.find_remote(TEST_REMOTE).unwrap();
    remote
        .push(&[format!("{refname}:{refname}")], None)
        .unwrap();
}
