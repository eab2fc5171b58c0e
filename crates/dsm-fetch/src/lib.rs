use std::cell::Cell;
use std::path::Path;

use dsm_core::cancel::CancellationToken;
use dsm_core::fetch::{FetchError, FetchOptions, FetchOutcome, Fetcher};
use dsm_core::progress::ProgressSender;

/// `dsm_core::fetch::Fetcher` implementation backed by `git2` (libgit2),
/// grounded on `Loctree-Loctree/loctree_rs/src/git.rs`'s `GitRepo` wrapper
/// — same crate, same `tree.walk`-based file listing — extended here with
/// a remote shallow clone and progress streaming, which Loctree's
/// local-repository-only module never needed.
#[derive(Debug, Default)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        Self
    }
}

/// Tracks the last phase/percentage reported so the progress callback only
/// emits on a phase change or a >=5% advance.
struct ProgressState {
    phase: &'static str,
    last_pct: u32,
}

impl ProgressState {
    fn new() -> Self {
        Self {
            phase: "",
            last_pct: 0,
        }
    }

    fn should_emit(&mut self, phase: &'static str, pct: u32) -> bool {
        if phase != self.phase || pct >= self.last_pct + 5 || pct == 100 {
            self.phase = phase;
            self.last_pct = pct;
            true
        } else {
            false
        }
    }
}

impl Fetcher for GitFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        opts: &FetchOptions,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let max_bytes = opts.max_repo_size_mib.saturating_mul(1024 * 1024);
        let too_large = Cell::new(false);
        let cancelled = Cell::new(false);
        let state = std::cell::RefCell::new(ProgressState::new());

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.transfer_progress(|stats| {
            if cancel.is_cancelled() {
                cancelled.set(true);
                return false;
            }
            if stats.received_bytes() as u64 > max_bytes {
                too_large.set(true);
                return false;
            }

            let total_objects = stats.total_objects().max(1);
            if stats.total_deltas() > 0 {
                let pct = (stats.indexed_deltas() * 100 / stats.total_deltas().max(1)) as u32;
                if state.borrow_mut().should_emit("resolving deltas", pct) {
                    progress.progress(format!("Resolving deltas: {pct}%"));
                }
            } else {
                let pct = (stats.received_objects() * 100 / total_objects) as u32;
                if state.borrow_mut().should_emit("receiving objects", pct) {
                    progress.progress(format!("Receiving objects: {pct}%"));
                }
            }
            true
        });

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options
            .remote_callbacks(callbacks)
            .download_tags(git2::AutotagOption::None)
            .depth(opts.depth as i32);

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_options);

        let repo = builder.clone(url, dest).map_err(|e| {
            if cancelled.get() {
                FetchError::Cancelled
            } else if too_large.get() {
                FetchError::TooLarge
            } else {
                FetchError::Clone(e.message().to_string())
            }
        })?;

        progress.progress("resolving HEAD".to_string());
        let head = repo.head().map_err(|e| FetchError::Clone(e.message().to_string()))?;
        let branch = head
            .shorthand()
            .unwrap_or("HEAD")
            .to_string();

        let files = list_tracked_files(&repo)?;

        Ok(FetchOutcome { files, branch })
    }
}

/// Lists every blob in HEAD's tree via `Tree::walk`, the same
/// `git2::TreeWalkMode::PreOrder` pattern `GitRepo::list_files_at` uses —
/// this is the VCS's canonical listing rather than a filesystem walk, so
/// `.gitignore`d files never appear.
fn list_tracked_files(repo: &git2::Repository) -> Result<Vec<String>, FetchError> {
    let head = repo
        .head()
        .map_err(|e| FetchError::Clone(e.message().to_string()))?;
    let tree = head
        .peel_to_tree()
        .map_err(|e| FetchError::Clone(e.message().to_string()))?;

    let mut files = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            let name = entry.name().unwrap_or("");
            let path = if dir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{name}", dir.trim_end_matches('/'))
            };
            files.push(path);
        }
        git2::TreeWalkResult::Ok
    })
    .map_err(|e| FetchError::Clone(e.message().to_string()))?;

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_local_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let path = dir.path();
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(path)
                .output()
                .expect("git available in test environment")
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@test.com"]);
        run(&["config", "user.name", "Test User"]);
        std::fs::write(path.join("a.go"), "package main\n").unwrap();
        std::fs::create_dir_all(path.join("node_modules")).unwrap();
        std::fs::write(path.join("node_modules/ignored.js"), "// ignored\n").unwrap();
        run(&["add", "a.go"]);
        run(&["commit", "-q", "-m", "initial"]);
        dir
    }

    #[test]
    fn clones_local_repo_and_lists_tracked_files() {
        let source = init_local_repo();
        let dest = TempDir::new().unwrap();
        // Leave the freshly-created dest dir empty for git2 to clone into.
        std::fs::remove_dir(dest.path()).unwrap();

        let fetcher = GitFetcher::new();
        let (progress_tx, progress_rx) = dsm_core::progress::channel();
        let cancel = CancellationToken::new();
        let url = format!("file://{}", source.path().display());

        let outcome = fetcher
            .fetch(
                &url,
                dest.path(),
                &FetchOptions::default(),
                &progress_tx,
                &cancel,
            )
            .expect("local clone should succeed");

        assert_eq!(outcome.files, vec!["a.go".to_string()]);
        drop(progress_tx);
        assert!(progress_rx.iter().count() >= 1);
    }

    #[test]
    fn reports_cancelled_when_token_is_already_set() {
        let source = init_local_repo();
        let dest = TempDir::new().unwrap();
        std::fs::remove_dir(dest.path()).unwrap();

        let fetcher = GitFetcher::new();
        let (progress_tx, _progress_rx) = dsm_core::progress::channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let url = format!("file://{}", source.path().display());

        let result = fetcher.fetch(&url, dest.path(), &FetchOptions::default(), &progress_tx, &cancel);
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
