use std::collections::HashMap;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::registry::tag_for_extension;
use crate::types::LanguageTag;

/// Path segments that exclude a file regardless of extension.
const DENYLISTED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "vendor",
    "dist",
    "build",
    ".git",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
];

/// Per-language "is this a test file" globs, dropped during filtering when
/// `include_tests` is false so test sources never reach an analyzer or the
/// line/complexity counters.
const TEST_FILE_GLOBS: &[&str] = &[
    "*_test.go",
    "*.test.ts",
    "*.test.tsx",
    "*.test.js",
    "*.test.jsx",
    "*.spec.ts",
    "*.spec.tsx",
    "*.spec.js",
    "*.spec.jsx",
    "test_*.py",
    "*_test.py",
    "*Test.java",
    "*Tests.cs",
];

fn minified_globs() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new("*.min.js").expect("valid glob"));
    builder.add(Glob::new("*.bundle.js").expect("valid glob"));
    builder.build().expect("valid globset")
}

fn test_file_globs() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in TEST_FILE_GLOBS {
        builder.add(Glob::new(pattern).expect("valid glob"));
    }
    builder.build().expect("valid globset")
}

fn is_denylisted(path: &str) -> bool {
    path.split('/')
        .any(|segment| DENYLISTED_DIRS.contains(&segment))
}

fn extension_of(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// File Filter (C2): partitions an unfiltered file list by language tag,
/// applying the extension allow-list and directory/file deny-lists.
///
/// `include_tests` (default true) drops any file matching a per-language
/// test-file glob before it is bucketed, so a disabled test suite never
/// reaches an analyzer or the aggregator's line/complexity counters.
pub fn filter_files(files: &[String], include_tests: bool) -> HashMap<LanguageTag, Vec<String>> {
    let minified = minified_globs();
    let test_files = test_file_globs();
    let mut buckets: HashMap<LanguageTag, Vec<String>> = HashMap::new();

    for path in files {
        if is_denylisted(path) {
            continue;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if minified.is_match(file_name) {
            continue;
        }
        if !include_tests && test_files.is_match(file_name) {
            continue;
        }
        let Some(ext) = extension_of(path) else {
            continue;
        };
        let Some(tag) = tag_for_extension(&ext.to_lowercase()) else {
            continue;
        };
        buckets.entry(tag).or_default().push(path.clone());
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_extension() {
        let files = vec!["a.go".to_string(), "b.py".to_string(), "c.ts".to_string()];
        let buckets = filter_files(&files, true);
        assert_eq!(buckets[&LanguageTag::Go], vec!["a.go".to_string()]);
        assert_eq!(buckets[&LanguageTag::Python], vec!["b.py".to_string()]);
        assert_eq!(buckets[&LanguageTag::Js], vec!["c.ts".to_string()]);
    }

    #[test]
    fn drops_denylisted_directories() {
        let files = vec![
            "vendor/lib.go".to_string(),
            "src/node_modules/pkg/index.js".to_string(),
            "src/main.go".to_string(),
        ];
        let buckets = filter_files(&files, true);
        assert_eq!(buckets[&LanguageTag::Go], vec!["src/main.go".to_string()]);
        assert!(!buckets.contains_key(&LanguageTag::Js));
    }

    #[test]
    fn drops_minified_bundles() {
        let files = vec!["dist-free/app.min.js".to_string(), "app.bundle.js".to_string()];
        let buckets = filter_files(&files, true);
        assert!(buckets.is_empty());
    }

    #[test]
    fn unrecognised_extensions_are_skipped() {
        let files = vec!["README.md".to_string(), "data.json".to_string()];
        let buckets = filter_files(&files, true);
        assert!(buckets.is_empty());
    }

    #[test]
    fn extensionless_files_are_skipped() {
        let files = vec!["Makefile".to_string()];
        let buckets = filter_files(&files, true);
        assert!(buckets.is_empty());
    }

    #[test]
    fn tsconfig_json_is_not_admitted_into_any_bucket() {
        let files = vec!["tsconfig.json".to_string(), "src/a.ts".to_string()];
        let buckets = filter_files(&files, true);
        assert_eq!(buckets[&LanguageTag::Js], vec!["src/a.ts".to_string()]);
    }

    #[test]
    fn test_files_are_admitted_by_default() {
        let files = vec!["pkg/widget_test.go".to_string()];
        let buckets = filter_files(&files, true);
        assert_eq!(buckets[&LanguageTag::Go], vec!["pkg/widget_test.go".to_string()]);
    }

    #[test]
    fn test_files_are_dropped_when_include_tests_is_false() {
        let files = vec![
            "pkg/widget_test.go".to_string(),
            "pkg/widget.go".to_string(),
            "app/Widget.test.ts".to_string(),
            "app/main.ts".to_string(),
            "a/test_util.py".to_string(),
            "a/util.py".to_string(),
            "com/app/WidgetTest.java".to_string(),
            "com/app/Widget.java".to_string(),
            "App/WidgetTests.cs".to_string(),
            "App/Widget.cs".to_string(),
        ];
        let buckets = filter_files(&files, false);
        assert_eq!(buckets[&LanguageTag::Go], vec!["pkg/widget.go".to_string()]);
        assert_eq!(buckets[&LanguageTag::Js], vec!["app/main.ts".to_string()]);
        assert_eq!(buckets[&LanguageTag::Python], vec!["a/util.py".to_string()]);
        assert_eq!(buckets[&LanguageTag::Java], vec!["com/app/Widget.java".to_string()]);
        assert_eq!(buckets[&LanguageTag::Csharp], vec!["App/Widget.cs".to_string()]);
    }
}
