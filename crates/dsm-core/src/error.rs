use thiserror::Error;

use crate::fetch::FetchError;

/// Error taxonomy for a single pipeline run.
///
/// Only the globally-fatal kinds get a variant here. Per-file failures
/// (`LanguageParseError`, file-read `IOError`) never reach this type — they
/// are absorbed by the analyzer that hit them and show up as a zero
/// complexity score and no outgoing edges on that one file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("analysis cancelled")]
    Cancelled,
}
