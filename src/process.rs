//! Execution of external shell commands.
//!
//! Every command runs through `sh -c` inside a target directory. The process
//! current directory is switched with a [`WorkdirGuard`] for the lifetime of
//! the child and restored afterwards, whatever the outcome. No timeout is
//! applied: a hanging script blocks the workflow.
use async_trait::async_trait;
use log::*;
use std::{io, path::Path};
use thiserror::Error;
use tokio::process::Command;

#[cfg(test)]
use mockall::automock;

pub mod workdir;

pub use workdir::WorkdirGuard;

/// Shell used to interpret command lines.
const SHELL: &str = "sh";

/// A shell command line plus environment overrides for the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    line: String,
    envs: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            envs: vec![],
        }
    }

    /// Add an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }
}

impl std::fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.line)
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("unable to enter working directory {path}: {source}")]
    Workdir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {}: {stderr}", exit_status(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".into(),
    }
}

/// Runs external commands on behalf of the workflow steps.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` with `workdir` as the current directory.
    ///
    /// Resolves with the captured output on a zero exit status and fails with
    /// [`ProcessError::Failed`] carrying stderr otherwise.
    async fn run(
        &self,
        command: &ShellCommand,
        workdir: &Path,
    ) -> std::result::Result<ProcessOutput, ProcessError>;
}

/// [`ProcessRunner`] backed by `sh -c`.
#[derive(Debug, Default, Clone)]
pub struct ShellRunner;

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(
        &self,
        command: &ShellCommand,
        workdir: &Path,
    ) -> std::result::Result<ProcessOutput, ProcessError> {
        let _guard =
            WorkdirGuard::enter(workdir).map_err(|source| ProcessError::Workdir {
                path: workdir.display().to_string(),
                source,
            })?;

        debug!("running `{command}` in {}", workdir.display());

        let output = Command::new(SHELL)
            .arg("-c")
            .arg(command.line())
            .envs(command.envs().iter().map(|(k, v)| (k, v)))
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        debug!("stdout of `{command}`:\n{stdout}");

        if !output.status.success() {
            return Err(ProcessError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(ProcessOutput {
            code: output.status.code().unwrap_or_default(),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    use super::*;

    fn canonical(path: &Path) -> std::path::PathBuf {
        path.canonicalize().unwrap()
    }

    #[test_log::test(tokio::test)]
    #[serial(cwd)]
    async fn runs_in_workdir_and_restores_cwd() {
        let before = env::current_dir().unwrap();
        let tmp = TempDir::new().unwrap();

        let output = ShellRunner
            .run(&ShellCommand::new("pwd"), tmp.path())
            .await
            .unwrap();

        assert_eq!(output.code, 0);
        assert_eq!(
            canonical(Path::new(output.stdout.trim())),
            canonical(tmp.path())
        );
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    #[serial(cwd)]
    async fn failure_surfaces_stderr_and_code() {
        let before = env::current_dir().unwrap();
        let tmp = TempDir::new().unwrap();

        let err = ShellRunner
            .run(&ShellCommand::new("echo 'lint failed' >&2; exit 3"), tmp.path())
            .await
            .unwrap_err();

        match err {
            ProcessError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "lint failed");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    #[serial(cwd)]
    async fn passes_environment_overrides() {
        let tmp = TempDir::new().unwrap();

        let output = ShellRunner
            .run(&ShellCommand::new("echo \"$HUSKY\"").env("HUSKY", "0"), tmp.path())
            .await
            .unwrap();

        assert_eq!(output.stdout, "0\n");
    }

    #[tokio::test]
    #[serial(cwd)]
    async fn missing_workdir_is_reported_and_cwd_untouched() {
        let before = env::current_dir().unwrap();
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let err = ShellRunner
            .run(&ShellCommand::new("true"), &missing)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Workdir { .. }));
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    #[serial(cwd)]
    async fn repeated_invocations_always_restore_cwd() {
        let before = env::current_dir().unwrap();
        let tmp = TempDir::new().unwrap();

        for line in ["true", "false", "echo ok", "exit 42"] {
            let _ = ShellRunner.run(&ShellCommand::new(line), tmp.path()).await;
            assert_eq!(env::current_dir().unwrap(), before, "after `{line}`");
        }
    }

    #[test]
    fn displays_env_overrides_before_line() {
        let cmd = ShellCommand::new("npx standard-version").env("HUSKY", "0");
        assert_eq!(cmd.to_string(), "HUSKY=0 npx standard-version");
    }
}
