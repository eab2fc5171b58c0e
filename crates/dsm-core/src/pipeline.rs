use std::collections::HashMap;

use rayon::prelude::*;

use crate::aggregator;
use crate::analyzer::{AnalyzerOptions, LanguageAnalyzer};
use crate::cancel::CancellationToken;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::{FetchOptions, Fetcher};
use crate::filter;
use crate::hierarchy;
use crate::progress::ProgressSender;
use crate::types::{DSMPayload, LanguageTag};
use crate::workspace::Workspace;

/// Orchestrator (C8). Owns the workspace lifecycle and sequences
/// fetch -> filter -> per-language analyze -> aggregate -> hierarchy,
/// writing progress frames throughout and guaranteeing workspace cleanup
/// on every exit path.
pub struct Orchestrator {
    fetcher: Box<dyn Fetcher>,
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        analyzers: Vec<Box<dyn LanguageAnalyzer>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            analyzers,
            config,
        }
    }

    /// Run a full analysis of `url`, streaming progress through `progress`
    /// and honouring `cancel` at every suspension point. Returns the same
    /// `DSMPayload` that was sent as the channel's terminal `complete`
    /// frame, for callers that want the value directly rather than
    /// draining the channel.
    pub fn run(
        &self,
        url: &str,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<DSMPayload, PipelineError> {
        let workspace = Workspace::create().map_err(|e| {
            let err = PipelineError::Fetch(crate::fetch::FetchError::Clone(e.to_string()));
            progress.error(err.to_string());
            err
        })?;

        if cancel.is_cancelled() {
            progress.error(PipelineError::Cancelled.to_string());
            return Err(PipelineError::Cancelled);
        }

        progress.progress(format!("fetching {url}"));
        let fetch_opts = FetchOptions {
            depth: self.config.clone_depth,
            max_repo_size_mib: self.config.max_repo_size_mib,
        };
        let outcome = self
            .fetcher
            .fetch(url, workspace.root(), &fetch_opts, progress, cancel)
            .map_err(|e| {
                let err = PipelineError::Fetch(e);
                progress.error(err.to_string());
                err
            })?;

        if cancel.is_cancelled() {
            progress.error(PipelineError::Cancelled.to_string());
            return Err(PipelineError::Cancelled);
        }

        progress.progress(format!("filtering {} files", outcome.files.len()));
        let buckets = filter::filter_files(&outcome.files, self.config.include_tests);

        if buckets.values().all(Vec::is_empty) || buckets.is_empty() {
            let payload = DSMPayload::empty(outcome.branch);
            progress.complete(payload.clone());
            return Ok(payload);
        }

        let mut tags: HashMap<String, LanguageTag> = HashMap::new();
        let mut admitted: Vec<String> = Vec::new();
        for (tag, paths) in &buckets {
            for path in paths {
                tags.insert(path.clone(), *tag);
                admitted.push(path.clone());
            }
        }

        let root = workspace.root().to_path_buf();
        let mut contents: HashMap<String, String> = admitted
            .par_iter()
            .map(|path| {
                let content = std::fs::read_to_string(root.join(path)).unwrap_or_else(|e| {
                    progress.progress(format!("failed to read {path}: {e}"));
                    String::new()
                });
                (path.clone(), content)
            })
            .collect();

        // Side channel for dsm-lang-js's tsconfig.json path-alias table: read
        // directly from the workspace, never added to `admitted`/`buckets`
        // so it can't surface as a phantom file in the final payload.
        if let Some(tsconfig_path) = outcome
            .files
            .iter()
            .find(|path| path.rsplit('/').next() == Some("tsconfig.json"))
        {
            if let Ok(content) = std::fs::read_to_string(root.join(tsconfig_path)) {
                contents.insert(tsconfig_path.clone(), content);
            }
        }

        let symbol_counting = admitted.len() <= self.config.large_repo_threshold;
        let opts = AnalyzerOptions {
            include_type_only_imports: self.config.include_type_only_imports,
            symbol_counting,
        };
        if !symbol_counting {
            progress.progress(format!(
                "{} admitted files exceeds the large-repo threshold; using fast-path weights",
                admitted.len()
            ));
        }

        let mut analyses = Vec::new();
        for analyzer in &self.analyzers {
            if cancel.is_cancelled() {
                progress.error(PipelineError::Cancelled.to_string());
                return Err(PipelineError::Cancelled);
            }
            let Some(files) = buckets.get(&analyzer.tag()) else {
                continue;
            };
            if files.is_empty() {
                continue;
            }
            progress.progress(format!("analyzing {} {} files", files.len(), analyzer.tag()));
            let analysis = analyzer.analyze_all(files, &contents, &opts);
            for (path, message) in &analysis.parse_errors {
                progress.progress(format!("failed to parse {path}: {message}"));
            }
            analyses.push(analysis);
        }

        admitted.sort();
        let files = aggregator::aggregate(&admitted, &tags, &contents, &analyses);
        let file_list: Vec<String> = files.keys().cloned().collect();
        let display_items = hierarchy::build(&file_list);

        let payload = DSMPayload {
            files,
            display_items,
            file_list,
            branch: outcome.branch,
        };
        progress.complete(payload.clone());
        Ok(payload)
    }
}
