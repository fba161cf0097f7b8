//! Git-backed checkpoint publisher
//!
//! Drives the `git` binary in the repository that holds the output:
//! `pull` to merge the shared branch, `add` + `commit` for the sink files,
//! `push` to publish. Only an empty index counts as "nothing to commit"; any
//! other failing git command is an error.

use crate::checkpoint::{CheckpointError, CheckpointPublisher, CommitStatus};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Publishes checkpoints by committing and pushing to a git remote
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    author_name: Option<String>,
    author_email: Option<String>,
}

impl GitPublisher {
    pub fn new(
        repo_dir: &Path,
        remote: &str,
        branch: &str,
        author_name: Option<String>,
        author_email: Option<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
            remote: remote.to_string(),
            branch: branch.to_string(),
            author_name,
            author_email,
        }
    }

    /// Leading arguments shared by every invocation
    ///
    /// The identity is passed per command instead of writing global config.
    fn base_args(&self) -> Vec<String> {
        let mut args = vec!["-C".to_string(), self.repo_dir.display().to_string()];
        if let Some(name) = &self.author_name {
            args.push("-c".to_string());
            args.push(format!("user.name={}", name));
        }
        if let Some(email) = &self.author_email {
            args.push("-c".to_string());
            args.push(format!("user.email={}", email));
        }
        args
    }

    async fn git(&self, args: &[&str]) -> Result<Output, CheckpointError> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!("Running {}", command);

        Command::new("git")
            .args(self.base_args())
            .args(args)
            .output()
            .await
            .map_err(|source| CheckpointError::Spawn { command, source })
    }

    /// Runs a git command that must succeed
    async fn git_checked(&self, args: &[&str]) -> Result<Output, CheckpointError> {
        let output = self.git(args).await?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(output)
    }

    /// Whether the index holds changes relative to HEAD
    ///
    /// `git diff --cached --quiet` exits 1 when something is staged and 0
    /// when nothing is; anything else is a failure.
    async fn has_staged_changes(&self) -> Result<bool, CheckpointError> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.git(&args).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed(&args, &output)),
        }
    }
}

fn command_failed(args: &[&str], output: &Output) -> CheckpointError {
    CheckpointError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Absolute form of every artifact
///
/// Sink paths are relative to the process working directory; git runs in
/// `repo_dir`.
fn absolute_artifacts(artifacts: &[PathBuf]) -> Result<Vec<String>, CheckpointError> {
    artifacts
        .iter()
        .map(|path| {
            std::fs::canonicalize(path)
                .map(|absolute| absolute.display().to_string())
                .map_err(|source| CheckpointError::Artifact {
                    path: path.display().to_string(),
                    source,
                })
        })
        .collect()
}

#[async_trait]
impl CheckpointPublisher for GitPublisher {
    async fn sync(&self) -> Result<(), CheckpointError> {
        self.git_checked(&["pull", &self.remote, &self.branch])
            .await?;
        tracing::info!("Pulled latest changes from {}/{}", self.remote, self.branch);
        Ok(())
    }

    async fn commit(
        &self,
        artifacts: &[PathBuf],
        label: &str,
    ) -> Result<CommitStatus, CheckpointError> {
        let paths = absolute_artifacts(artifacts)?;
        let mut add_args = vec!["add", "--"];
        add_args.extend(paths.iter().map(String::as_str));
        self.git_checked(&add_args).await?;

        if !self.has_staged_changes().await? {
            tracing::warn!("No changes to commit for '{}'", label);
            return Ok(CommitStatus::NothingToCommit);
        }

        self.git_checked(&["commit", "-m", label]).await?;
        tracing::info!("Git commit successful: {}", label);
        Ok(CommitStatus::Committed)
    }

    async fn publish(&self) -> Result<(), CheckpointError> {
        let refspec = format!("HEAD:{}", self.branch);
        self.git_checked(&["push", &self.remote, &refspec]).await?;
        Ok(())
    }
}
