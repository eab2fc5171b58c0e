use std::collections::HashMap;

use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::complexity::{cyclomatic_complexity, Dialect};
use dsm_core::symbols::wildcard_weight;
use dsm_core::types::LanguageTag;

/// Exact-match or prefix-match (trailing `/`) standard library roots.
/// Anything whose first import-path segment contains a `.` is always
/// third-party, independent of this table.
const GO_STDLIB_ROOTS: &[&str] = &[
    "fmt",
    "os",
    "io",
    "strings",
    "strconv",
    "errors",
    "log",
    "time",
    "math",
    "sort",
    "sync",
    "context",
    "encoding/",
    "net/",
    "crypto/",
    "database/",
    "testing",
    "runtime",
    "reflect",
    "regexp",
    "bytes",
    "bufio",
    "flag",
    "path",
    "filepath",
];

fn is_stdlib(import_path: &str) -> bool {
    GO_STDLIB_ROOTS.iter().any(|root| {
        if let Some(prefix) = root.strip_suffix('/') {
            import_path == prefix || import_path.starts_with(root)
        } else {
            import_path == *root
        }
    })
}

fn is_third_party(import_path: &str) -> bool {
    let first_segment = import_path.split('/').next().unwrap_or(import_path);
    first_segment.contains('.')
}

/// Per-language, per-run index: package directory of every file, and
/// each file's exported (capitalised) top-level symbols. Built fully
/// before resolution begins, then dropped at the end of `analyze_all`.
#[derive(Default)]
struct GoIndex {
    files_by_dir: HashMap<String, Vec<String>>,
    exports_by_file: HashMap<String, Vec<String>>,
}

pub struct GoAnalyzer {
    language: Language,
    decl_query: Query,
    import_query: Query,
}

impl GoAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();

        let decl_query = Query::new(
            &language,
            r#"
            [
              (function_declaration name: (identifier) @name)
              (type_declaration (type_spec name: (type_identifier) @name))
              (const_declaration (const_spec name: (identifier) @name))
              (var_declaration (var_spec name: (identifier) @name))
            ]
            "#,
        )?;

        let import_query = Query::new(
            &language,
            r#"(import_spec path: (interpreted_string_literal) @path)"#,
        )?;

        Ok(Self {
            language,
            decl_query,
            import_query,
        })
    }

    fn parse(&self, content: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).ok()?;
        parser.parse(content, None)
    }

    fn top_level_exports(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut names = Vec::new();
        let mut matches = cursor.matches(&self.decl_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = content[capture.node.byte_range()].to_string();
                if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn imports(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut paths = Vec::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let raw = &content[capture.node.byte_range()];
                paths.push(raw.trim_matches('"').to_string());
            }
        }
        paths
    }
}

fn package_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

fn resolve_intra_repo<'a>(index: &'a GoIndex, import_path: &str, from_dir: &str) -> Vec<&'a str> {
    let candidate = if let Some(rest) = import_path.strip_prefix("./") {
        normalize_join(from_dir, rest)
    } else if import_path.starts_with("../") {
        normalize_join(from_dir, import_path)
    } else {
        import_path.to_string()
    };

    index
        .files_by_dir
        .keys()
        .filter(|dir| *dir == &candidate || dir.ends_with(&format!("/{candidate}")))
        .flat_map(|dir| index.files_by_dir[dir].iter().map(String::as_str))
        .collect()
}

fn normalize_join(base: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

impl LanguageAnalyzer for GoAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Go
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let mut index = GoIndex::default();
        let mut trees: HashMap<String, tree_sitter::Tree> = HashMap::new();

        for path in files {
            let Some(content) = contents.get(path) else {
                continue;
            };
            let Some(tree) = self.parse(content) else {
                result
                    .parse_errors
                    .push((path.clone(), "failed to parse Go source".to_string()));
                continue;
            };
            let exports = self.top_level_exports(&tree, content);
            index
                .files_by_dir
                .entry(package_dir(path))
                .or_default()
                .push(path.clone());
            index.exports_by_file.insert(path.clone(), exports);
            trees.insert(path.clone(), tree);
        }

        for path in files {
            let Some(tree) = trees.get(path) else {
                continue;
            };
            let content = &contents[path];
            let from_dir = package_dir(path);
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for import_path in self.imports(tree, content) {
                if is_third_party(&import_path) || is_stdlib(&import_path) {
                    continue;
                }
                let targets = resolve_intra_repo(&index, &import_path, &from_dir);
                for target in targets {
                    if target == path {
                        continue;
                    }
                    let weight = if opts.symbol_counting {
                        let exports = index.exports_by_file.get(target).cloned().unwrap_or_default();
                        wildcard_weight(content, &exports)
                    } else {
                        1
                    };
                    *dependencies.entry(target.to_string()).or_insert(0) += weight;
                }
            }

            let complexity = cyclomatic_complexity(
                content,
                Dialect::CLike {
                    extra_keywords: &["switch", "select"],
                },
            );
            result.per_file.insert(
                path.clone(),
                FileAnalysis {
                    complexity,
                    dependencies,
                },
            );
        }

        result
    }
}

impl GoAnalyzer {
    #[cfg(test)]
    fn analyze(
        &self,
        files: &[(&str, &str)],
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        let contents: HashMap<String, String> = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self.analyze_all(&paths, &contents, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_package_import_with_weight_equal_to_call_count() {
        let analyzer = GoAnalyzer::new().unwrap();
        let files = [
            ("mod/util/u.go", "package util\nfunc Help() {}\n"),
            (
                "mod/main.go",
                "package main\nimport \"mod/util\"\nfunc main(){ util.Help(); util.Help() }\n",
            ),
        ];
        let analysis = analyzer.analyze(&files, &AnalyzerOptions::default());
        let deps = &analysis.per_file["mod/main.go"].dependencies;
        assert_eq!(deps["mod/util/u.go"], 2);
    }

    #[test]
    fn drops_stdlib_and_third_party_imports() {
        let analyzer = GoAnalyzer::new().unwrap();
        let files = [(
            "main.go",
            "package main\nimport (\n  \"fmt\"\n  \"github.com/x/y\"\n)\nfunc main(){ fmt.Println(\"hi\") }\n",
        )];
        let analysis = analyzer.analyze(&files, &AnalyzerOptions::default());
        assert!(analysis.per_file["main.go"].dependencies.is_empty());
    }

    #[test]
    fn large_repo_fast_path_uses_weight_one() {
        let analyzer = GoAnalyzer::new().unwrap();
        let files = [
            ("mod/util/u.go", "package util\nfunc Help() {}\n"),
            (
                "mod/main.go",
                "package main\nimport \"mod/util\"\nfunc main(){ util.Help(); util.Help() }\n",
            ),
        ];
        let mut opts = AnalyzerOptions::default();
        opts.symbol_counting = false;
        let analysis = analyzer.analyze(&files, &opts);
        let deps = &analysis.per_file["mod/main.go"].dependencies;
        assert_eq!(deps["mod/util/u.go"], 1);
    }

    #[test]
    fn complexity_counts_decision_points() {
        let analyzer = GoAnalyzer::new().unwrap();
        let files = [(
            "a.go",
            "package main\nfunc f(x int) int {\n  if x > 0 {\n    return x\n  }\n  return 0\n}\n",
        )];
        let analysis = analyzer.analyze(&files, &AnalyzerOptions::default());
        assert_eq!(analysis.per_file["a.go"].complexity, 2);
    }
}
