pub mod aggregator;
pub mod analyzer;
pub mod cancel;
pub mod complexity;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod hierarchy;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod symbols;
pub mod types;
pub mod workspace;

pub use analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
pub use cancel::CancellationToken;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use fetch::{FetchError, FetchOptions, FetchOutcome, Fetcher};
pub use pipeline::Orchestrator;
pub use progress::{channel, Frame, ProgressReceiver, ProgressSender};
pub use types::*;
