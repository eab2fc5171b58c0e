use std::path::Path;

use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::progress::ProgressSender;

/// Options passed to the Fetcher (C1). Mirrors the clone-related entries of
/// `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub depth: u32,
    pub max_repo_size_mib: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            max_repo_size_mib: 200,
        }
    }
}

/// What the Fetcher hands back to the Orchestrator.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// All tracked files, repository-relative, forward-slash-canonical,
    /// unfiltered — the File Filter (C2) sees these next.
    pub files: Vec<String>,
    pub branch: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to acquire repository: {0}")]
    Clone(String),
    #[error("repository exceeds the configured size limit")]
    TooLarge,
    #[error("fetch cancelled")]
    Cancelled,
}

/// Materialises a repository in a local workspace.
///
/// Implemented by `dsm-fetch::GitFetcher`. `dsm-core` depends only on this
/// trait, never on `dsm-fetch` itself, the same "polymorphism over
/// analyzers" pattern applied one level up so the orchestrator stays
/// decoupled from any one VCS implementation.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        opts: &FetchOptions,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError>;
}
