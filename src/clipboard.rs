//! Writing text to the host clipboard through its command-line utility.
use async_trait::async_trait;
use log::*;
use std::{env, process::Stdio};
use tokio::{io::AsyncWriteExt, process::Command};

#[cfg(test)]
use mockall::automock;

use crate::{ReleaseError, Result};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write(&self, text: &str) -> Result<()>;
}

/// Clipboard utility for the current platform.
pub fn platform_command() -> Vec<String> {
    let argv: &[&str] = if cfg!(target_os = "macos") {
        &["pbcopy"]
    } else if cfg!(windows) {
        &["clip"]
    } else if env::var_os("WAYLAND_DISPLAY").is_some() {
        &["wl-copy"]
    } else {
        &["xclip", "-selection", "clipboard"]
    };

    argv.iter().map(|s| s.to_string()).collect()
}

/// [`Clipboard`] that pipes text into a utility such as `pbcopy`.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// Build from an argv; an empty argv selects [`platform_command`].
    pub fn new(argv: Option<Vec<String>>) -> Self {
        let mut argv = argv
            .filter(|argv| !argv.is_empty())
            .unwrap_or_else(platform_command)
            .into_iter();

        // argv is never empty here
        let program = argv.next().unwrap_or_default();
        let args = argv.collect();

        Self { program, args }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write(&self, text: &str) -> Result<()> {
        debug!("piping {} bytes into {}", text.len(), self.program);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReleaseError::clipboard(format!(
                    "unable to start {}: {e}",
                    self.program
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await.map_err(|e| {
                ReleaseError::clipboard(format!(
                    "failed to write to {}: {e}",
                    self.program
                ))
            })?;
            // closing stdin lets the utility finish
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| {
            ReleaseError::clipboard(format!("{} failed: {e}", self.program))
        })?;

        if !output.status.success() {
            return Err(ReleaseError::clipboard(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}
