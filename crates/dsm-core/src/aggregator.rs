use std::collections::{BTreeMap, HashMap};

use crate::analyzer::LanguageAnalysis;
use crate::types::{FileRecord, LanguageTag};

/// Aggregator (C5): merges every language's `LanguageAnalysis` into one
/// `{path -> FileRecord}`, reading each file's content once (already done
/// by the Orchestrator and handed in via `contents`) to derive `line_count`.
///
/// Enforces, independently of what the analyzers produced, two invariants
/// for this stage: no self-edges, and every edge target is itself a key
/// of the returned map.
pub fn aggregate(
    admitted: &[String],
    tags: &HashMap<String, LanguageTag>,
    contents: &HashMap<String, String>,
    analyses: &[LanguageAnalysis],
) -> BTreeMap<String, FileRecord> {
    let mut complexity: HashMap<&str, u32> = HashMap::new();
    let mut dependencies: HashMap<&str, BTreeMap<String, u32>> = HashMap::new();

    for analysis in analyses {
        for (path, file_analysis) in &analysis.per_file {
            complexity.insert(path.as_str(), file_analysis.complexity);
            let entry = dependencies.entry(path.as_str()).or_default();
            for (target, weight) in &file_analysis.dependencies {
                if target == path {
                    continue;
                }
                *entry.entry(target.clone()).or_insert(0) += weight;
            }
        }
    }

    let admitted_set: std::collections::HashSet<&str> =
        admitted.iter().map(String::as_str).collect();

    let mut files = BTreeMap::new();
    for path in admitted {
        let content = contents.get(path).map(String::as_str).unwrap_or("");
        let line_count = content.lines().filter(|line| !line.trim().is_empty()).count() as u32;
        let language_tag = tags.get(path).copied().unwrap_or(LanguageTag::Unknown);
        let file_complexity = complexity.get(path.as_str()).copied().unwrap_or(0);
        let file_deps = dependencies
            .get(path.as_str())
            .map(|deps| {
                deps.iter()
                    .filter(|(target, _)| admitted_set.contains(target.as_str()))
                    .map(|(target, weight)| (target.clone(), *weight))
                    .collect()
            })
            .unwrap_or_default();

        files.insert(
            path.clone(),
            FileRecord {
                language_tag,
                line_count,
                complexity: file_complexity,
                dependencies: file_deps,
            },
        );
    }

    files
}
