use std::collections::HashMap;

use regex::Regex;
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::complexity::{cyclomatic_complexity, Dialect};
use dsm_core::types::LanguageTag;

/// Common include roots searched in step 3 of resolution.
const INCLUDE_ROOTS: &[&str] = &["include", "src", "lib", "common", "inc", "headers"];

const IMPORT_QUERY_SRC: &str = r#"
(preproc_include path: (string_literal) @quoted)
(preproc_include path: (system_lib_string) @angled)
"#;

/// Standard C/C++, POSIX, and common platform headers — angled includes
/// matching this set are never project candidates.
fn stdlib_header_regex() -> Regex {
    Regex::new(
        r"^(c[a-z]+|[a-z]+\.h|bits/.*|sys/.*|netinet/.*|arpa/.*|windows\.h|winsock2\.h|unistd\.h|pthread\.h|dirent\.h|fcntl\.h|termios\.h|sched\.h|poll\.h|dlfcn\.h)$",
    )
    .expect("valid regex")
}

fn is_stdlib_header(path: &str) -> bool {
    stdlib_header_regex().is_match(path)
}

enum Include {
    Quoted(String),
    Angled(String),
}

fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(d, _)| d).unwrap_or("")
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

/// Resolve an include path against the repository's file list using an
/// ordered strategy. First match wins.
fn resolve_include<'a>(files: &'a [String], importer: &str, include_path: &str) -> Option<&'a str> {
    let relative_to_importer = normalize_join(dir_of(importer), include_path);
    if let Some(hit) = files.iter().find(|f| f.as_str() == relative_to_importer) {
        return Some(hit);
    }

    if let Some(hit) = files.iter().find(|f| f.as_str() == include_path) {
        return Some(hit);
    }

    for root in INCLUDE_ROOTS {
        let candidate = format!("{root}/{include_path}");
        if let Some(hit) = files.iter().find(|f| f.as_str() == candidate) {
            return Some(hit);
        }
    }

    let suffix = format!("/{include_path}");
    let suffix_matches: Vec<&str> = files
        .iter()
        .filter(|f| f.ends_with(&suffix) || f.as_str() == include_path)
        .map(String::as_str)
        .collect();
    if suffix_matches.len() == 1 {
        return Some(suffix_matches[0]);
    }

    let basename = include_path.rsplit('/').next().unwrap_or(include_path);
    let basename_matches: Vec<&str> = files
        .iter()
        .filter(|f| f.rsplit('/').next() == Some(basename))
        .map(String::as_str)
        .collect();
    match basename_matches.as_slice() {
        [] => None,
        [only] => Some(only),
        many => {
            let include_dir = dir_of(include_path);
            many.iter()
                .find(|f| dir_of(f).ends_with(include_dir))
                .copied()
                .or_else(|| Some(many[0]))
        }
    }
}

pub struct CppAnalyzer {
    c_language: Language,
    cpp_language: Language,
    c_import_query: Query,
    cpp_import_query: Query,
}

impl CppAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let c_language: Language = tree_sitter_c::LANGUAGE.into();
        let cpp_language: Language = tree_sitter_cpp::LANGUAGE.into();
        let c_import_query = Query::new(&c_language, IMPORT_QUERY_SRC)?;
        let cpp_import_query = Query::new(&cpp_language, IMPORT_QUERY_SRC)?;
        Ok(Self {
            c_language,
            cpp_language,
            c_import_query,
            cpp_import_query,
        })
    }

    fn is_cpp(path: &str) -> bool {
        matches!(
            path.rsplit('.').next(),
            Some("cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx")
        )
    }

    fn language_for(&self, path: &str) -> &Language {
        if Self::is_cpp(path) {
            &self.cpp_language
        } else {
            &self.c_language
        }
    }

    fn query_for(&self, path: &str) -> &Query {
        if Self::is_cpp(path) {
            &self.cpp_import_query
        } else {
            &self.c_import_query
        }
    }

    fn parse(&self, path: &str, content: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(self.language_for(path)).ok()?;
        parser.parse(content, None)
    }

    fn includes(&self, path: &str, tree: &tree_sitter::Tree, content: &str) -> Vec<Include> {
        let query = self.query_for(path);
        let mut cursor = QueryCursor::new();
        let mut includes = Vec::new();
        let mut matches = cursor.matches(query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let raw = content[capture.node.byte_range()]
                    .trim_matches(|c| c == '"' || c == '<' || c == '>')
                    .to_string();
                let name = query.capture_names()[capture.index as usize];
                if name == "quoted" {
                    includes.push(Include::Quoted(raw));
                } else {
                    includes.push(Include::Angled(raw));
                }
            }
        }
        includes
    }
}

impl LanguageAnalyzer for CppAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Cpp
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["c", "h", "cpp", "cc", "cxx", "hpp", "hh", "hxx"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        _opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let mut trees: HashMap<String, tree_sitter::Tree> = HashMap::new();

        for path in files {
            let Some(content) = contents.get(path) else {
                continue;
            };
            match self.parse(path, content) {
                Some(tree) => {
                    trees.insert(path.clone(), tree);
                }
                None => result
                    .parse_errors
                    .push((path.clone(), "failed to parse C/C++ source".to_string())),
            }
        }

        for path in files {
            let Some(tree) = trees.get(path) else {
                continue;
            };
            let content = &contents[path];
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for include in self.includes(path, tree, content) {
                let include_path = match include {
                    Include::Quoted(p) => p,
                    Include::Angled(p) => {
                        if is_stdlib_header(&p) {
                            continue;
                        }
                        p
                    }
                };
                if let Some(target) = resolve_include(files, path, &include_path) {
                    if target != path {
                        *dependencies.entry(target.to_string()).or_insert(0) += 1;
                    }
                }
            }

            let complexity = cyclomatic_complexity(content, Dialect::CLike { extra_keywords: &[] });
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

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(files: &[(&str, &str)]) -> LanguageAnalysis {
        let analyzer = CppAnalyzer::new().unwrap();
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        let contents: HashMap<String, String> = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        analyzer.analyze_all(&paths, &contents, &AnalyzerOptions::default())
    }

    #[test]
    fn quoted_includes_to_same_file_sum_weight() {
        let files = [
            ("include/lib/foo.hpp", "#pragma once\n"),
            (
                "src/a.cpp",
                "#include \"lib/foo.hpp\"\n#include \"lib/foo.hpp\"\nint main() { return 0; }\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["src/a.cpp"].dependencies;
        assert_eq!(deps["include/lib/foo.hpp"], 2);
    }

    #[test]
    fn angled_stdlib_includes_are_dropped() {
        let files = [("a.c", "#include <stdio.h>\n#include <unistd.h>\n")];
        let analysis = analyze(&files);
        assert!(analysis.per_file["a.c"].dependencies.is_empty());
    }

    #[test]
    fn suffix_match_resolves_when_relative_lookup_misses() {
        let files = [
            ("vendor/util/helpers.h", "#pragma once\n"),
            ("src/a.c", "#include \"util/helpers.h\"\n"),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["src/a.c"].dependencies;
        assert_eq!(deps["vendor/util/helpers.h"], 1);
    }

    #[test]
    fn complexity_counts_decision_points() {
        let files = [(
            "a.c",
            "int f(int x) {\n  if (x > 0) {\n    return x;\n  }\n  return 0;\n}\n",
        )];
        let analysis = analyze(&files);
        assert_eq!(analysis.per_file["a.c"].complexity, 2);
    }
}
