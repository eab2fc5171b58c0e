use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A language tag recognised by the File Filter.
///
/// `Other` covers extensions that are admitted into the matrix but have no
/// registered analyzer yet (Rust, Ruby, PHP, Swift, Kotlin, Scala).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Js,
    Python,
    Cpp,
    Java,
    Csharp,
    Go,
    Other,
    Unknown,
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageTag::Js => write!(f, "js"),
            LanguageTag::Python => write!(f, "python"),
            LanguageTag::Cpp => write!(f, "cpp"),
            LanguageTag::Java => write!(f, "java"),
            LanguageTag::Csharp => write!(f, "csharp"),
            LanguageTag::Go => write!(f, "go"),
            LanguageTag::Other => write!(f, "other"),
            LanguageTag::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single file in the analysed repository, keyed externally by its
/// repository-relative, forward-slash-canonical path.
///
/// Invariants (enforced by `dsm_core::aggregator`): `dependencies` never
/// contains a self-edge, and every key of `dependencies` is itself a key of
/// the owning `DSMPayload::files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub language_tag: LanguageTag,
    pub line_count: u32,
    /// 0 means "not computed" (parse failure).
    pub complexity: u32,
    /// target path -> weight (count of distinct symbol usages, >= 1).
    pub dependencies: BTreeMap<String, u32>,
}

/// A hierarchical descriptor of a file or directory node, produced once by
/// the Hierarchy Builder (C6) from the final file list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayItem {
    pub path: String,
    pub display_name: String,
    pub indent_level: u32,
    pub is_directory: bool,
    /// Dotted-decimal outline id, e.g. "2.3.1".
    pub outline_id: String,
    /// Indices into `DSMPayload::file_list` covered by this node.
    pub file_indices: Vec<usize>,
}

/// The final object delivered by a completed analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DSMPayload {
    pub files: BTreeMap<String, FileRecord>,
    pub display_items: Vec<DisplayItem>,
    pub file_list: Vec<String>,
    pub branch: String,
}

impl DSMPayload {
    /// An empty, well-formed payload — the `FilterEmpty` non-fatal outcome.
    pub fn empty(branch: impl Into<String>) -> Self {
        Self {
            files: BTreeMap::new(),
            display_items: Vec::new(),
            file_list: Vec::new(),
            branch: branch.into(),
        }
    }
}
