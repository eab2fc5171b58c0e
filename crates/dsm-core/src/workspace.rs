use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// The scoped filesystem root a repository is materialised into for the
/// duration of one run.
///
/// Owns the temporary directory via `tempfile::TempDir`: cleanup is the
/// `Drop` impl `TempDir` already gives us, which is what guarantees
/// removal on every exit path — success, error, or cancellation — without
/// a hand-rolled `Drop` impl of our own.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self> {
        let dir = TempDir::with_prefix("dsm-").context("failed to create workspace directory")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_exists_and_is_removed_on_drop() {
        let root;
        {
            let workspace = Workspace::create().unwrap();
            root = workspace.root().to_path_buf();
            assert!(root.exists());
        }
        assert!(!root.exists());
    }
}
