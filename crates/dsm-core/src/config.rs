use std::path::Path;

use serde::{Deserialize, Serialize};

/// Recognised run options. There are no hidden
/// environment toggles in the core — everything that shapes a run is a
/// field here, constructed once by the caller and threaded through the
/// Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub include_tests: bool,
    #[serde(default = "default_true")]
    pub include_type_only_imports: bool,
    /// Admitted-file count above which an analyzer's resolution pass may
    /// skip symbol-usage counting and use weight = 1 for every resolved
    /// edge.
    #[serde(default = "default_large_repo_threshold")]
    pub large_repo_threshold: usize,
    #[serde(default = "default_max_repo_size_mib")]
    pub max_repo_size_mib: u64,
    #[serde(default = "default_clone_depth")]
    pub clone_depth: u32,
}

fn default_true() -> bool {
    true
}

fn default_large_repo_threshold() -> usize {
    100
}

fn default_max_repo_size_mib() -> u64 {
    200
}

fn default_clone_depth() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            include_tests: default_true(),
            include_type_only_imports: default_true(),
            large_repo_threshold: default_large_repo_threshold(),
            max_repo_size_mib: default_max_repo_size_mib(),
            clone_depth: default_clone_depth(),
        }
    }
}

/// On-disk shape of `dsm.toml`: a single `[pipeline]` table wrapping
/// `PipelineConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a `dsm.toml` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok(file.pipeline)
    }

    /// Load `dsm.toml` from the given directory, or return defaults if it
    /// doesn't exist or fails to parse — the same `load_or_default`
    /// shape `boundary_core::config::Config` uses for `.boundary.toml`.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join("dsm.toml");
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default TOML content for a freshly generated `dsm.toml`.
    pub fn default_toml() -> String {
        r#"[pipeline]
include_tests = true
include_type_only_imports = true
large_repo_threshold = 100
max_repo_size_mib = 200
clone_depth = 1
"#
        .to_string()
    }
}
