use std::collections::HashMap;

use crate::types::LanguageTag;

/// Options threaded through to every language analyzer's `analyze_all` call.
///
/// Constructed once by the Orchestrator per run and passed by reference — it
/// never becomes per-run global state.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub include_type_only_imports: bool,
    /// false once the large-repo fast path has been triggered: every
    /// resolved edge gets weight 1 and symbol-usage counting is skipped.
    pub symbol_counting: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            include_type_only_imports: true,
            symbol_counting: true,
        }
    }
}

/// Per-file output of a language analyzer's resolution pass.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub complexity: u32,
    /// target path -> weight.
    pub dependencies: HashMap<String, u32>,
}

/// Output of one call to `LanguageAnalyzer::analyze_all`.
#[derive(Debug, Clone, Default)]
pub struct LanguageAnalysis {
    pub per_file: HashMap<String, FileAnalysis>,
    /// Files that failed to parse: (path, message). Logged by the caller;
    /// never propagated as a pipeline-fatal error (`LanguageParseError`).
    pub parse_errors: Vec<(String, String)>,
}

/// Capability set every language analyzer implements.
///
/// A registry (`dsm_core::registry`) maps extension -> analyzer; the
/// orchestrator dispatches by tagged union rather than open inheritance.
pub trait LanguageAnalyzer: Send + Sync {
    fn tag(&self) -> LanguageTag;

    fn extensions(&self) -> &'static [&'static str];

    /// Run the two-pass index-then-resolve protocol over every admitted
    /// file of this language. `contents` holds every admitted file's
    /// content, read once by the orchestrator and shared across analyzers.
    ///
    /// The index pass (building package/module/namespace identity and
    /// exported-symbol sets) must fully complete, for every file in
    /// `files`, before the resolution pass reads any of it — this is a
    /// barrier, not a pipeline stage boundary, and is enforced simply by
    /// sequential composition inside each implementation.
    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis;
}
