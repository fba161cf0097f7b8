//! Checkpoint publishing
//!
//! A checkpoint makes the collected output durable outside this process:
//! merge the latest shared state, commit the sink's files under a label, and
//! publish the commit. Failures are returned to the coordinator, which treats
//! them as fatal.

mod git;

pub use git::GitPublisher;

use crate::config::Config;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while checkpointing
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Cannot resolve checkpoint artifact {path}: {source}")]
    Artifact {
        path: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Whether a commit actually recorded changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    NothingToCommit,
}

/// Destination for periodic checkpoints
#[async_trait]
pub trait CheckpointPublisher: Send + Sync {
    /// Merges the latest shared state before committing
    async fn sync(&self) -> Result<(), CheckpointError>;

    /// Commits `artifacts` with a descriptive label
    async fn commit(&self, artifacts: &[PathBuf], label: &str)
        -> Result<CommitStatus, CheckpointError>;

    /// Publishes committed changes
    async fn publish(&self) -> Result<(), CheckpointError>;
}

/// Runs a full checkpoint: sync, commit, and publish if anything was committed
pub async fn run_checkpoint(
    publisher: &dyn CheckpointPublisher,
    artifacts: &[PathBuf],
    label: &str,
) -> Result<CommitStatus, CheckpointError> {
    publisher.sync().await?;
    let status = publisher.commit(artifacts, label).await?;

    match status {
        CommitStatus::Committed => {
            publisher.publish().await?;
            tracing::info!("Checkpoint published: {}", label);
        }
        CommitStatus::NothingToCommit => {
            tracing::warn!("Checkpoint '{}' had no changes to commit", label);
        }
    }

    Ok(status)
}

/// Publisher used when checkpointing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl CheckpointPublisher for NoopPublisher {
    async fn sync(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn commit(
        &self,
        _artifacts: &[PathBuf],
        label: &str,
    ) -> Result<CommitStatus, CheckpointError> {
        tracing::debug!("Checkpointing disabled, skipping '{}'", label);
        Ok(CommitStatus::NothingToCommit)
    }

    async fn publish(&self) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// Builds the publisher selected by the checkpoint configuration
pub fn open_publisher(config: &Config) -> Box<dyn CheckpointPublisher> {
    let checkpoint = &config.checkpoint;
    if checkpoint.enabled {
        Box::new(GitPublisher::new(
            Path::new(&checkpoint.repo_dir),
            &checkpoint.remote,
            &checkpoint.branch,
            checkpoint.author_name.clone(),
            checkpoint.author_email.clone(),
        ))
    } else {
        Box::new(NoopPublisher)
    }
}
