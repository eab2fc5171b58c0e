use std::collections::HashMap;

use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::complexity::{cyclomatic_complexity, Dialect};
use dsm_core::types::LanguageTag;

/// Prefixes excluded from resolution regardless of what else is in the
/// repository.
const EXCLUDED_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "org.junit.",
    "org.mockito.",
    "org.apache.commons.",
    "org.apache.log4j.",
];

fn is_excluded(import_path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|p| import_path.starts_with(p))
}

pub struct JavaAnalyzer {
    language: Language,
    import_query: Query,
}

impl JavaAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();
        let import_query = Query::new(
            &language,
            r#"(import_declaration (scoped_identifier) @path)
               (import_declaration (identifier) @path)"#,
        )?;
        Ok(Self {
            language,
            import_query,
        })
    }

    fn parse(&self, content: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).ok()?;
        parser.parse(content, None)
    }

    /// Wildcard imports (`import a.b.*;`) parse with an `(asterisk)` sibling
    /// that this query doesn't capture, so the capture text alone can't
    /// distinguish them from `import a.b.C;`. Re-derive the marker from the
    /// enclosing declaration's raw text instead.
    fn imports(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut paths = Vec::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let mut dotted = content[node.byte_range()].to_string();
                if let Some(parent) = node.parent() {
                    if content[parent.byte_range()].contains(".*") {
                        dotted.push_str(".*");
                    }
                }
                paths.push(dotted);
            }
        }
        paths
    }
}

/// Resolve `import a.b.C;` to a concrete file path. Wildcard imports
/// (`import a.b.*;`) are dropped — no cheap resolution.
fn resolve_import<'a>(files: &'a [String], import_path: &str) -> Option<&'a str> {
    if import_path.ends_with(".*") {
        return None;
    }
    let converted = format!("{}.java", import_path.replace('.', "/"));
    let suffix_matches: Vec<&str> = files
        .iter()
        .filter(|f| f.ends_with(&converted))
        .map(String::as_str)
        .collect();
    if let [only] = suffix_matches.as_slice() {
        return Some(only);
    }

    let basename = converted.rsplit('/').next().unwrap_or(&converted);
    let basename_matches: Vec<&str> = files
        .iter()
        .filter(|f| f.rsplit('/').next() == Some(basename))
        .map(String::as_str)
        .collect();
    match basename_matches.as_slice() {
        [only] => Some(only),
        _ => None,
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Java
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        _opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let mut trees: HashMap<String, tree_sitter::Tree> = HashMap::new();

        // Index pass: parse every file up front so resolution can see files
        // that appear later in `files`, regardless of iteration order.
        for path in files {
            let Some(content) = contents.get(path) else {
                continue;
            };
            match self.parse(content) {
                Some(tree) => {
                    trees.insert(path.clone(), tree);
                }
                None => result
                    .parse_errors
                    .push((path.clone(), "failed to parse Java source".to_string())),
            }
        }

        for path in files {
            let Some(tree) = trees.get(path) else {
                continue;
            };
            let content = &contents[path];
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for import_path in self.imports(tree, content) {
                if is_excluded(&import_path) {
                    continue;
                }
                if let Some(target) = resolve_import(files, &import_path) {
                    if target == path {
                        continue;
                    }
                    // Named-symbol rule: one import clause names one class,
                    // contributing weight 1 to its target.
                    *dependencies.entry(target.to_string()).or_insert(0) += 1;
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
        let analyzer = JavaAnalyzer::new().unwrap();
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        let contents: HashMap<String, String> = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        analyzer.analyze_all(&paths, &contents, &AnalyzerOptions::default())
    }

    #[test]
    fn resolves_class_import_to_unique_suffix_match() {
        let files = [
            (
                "com/app/domain/User.java",
                "package com.app.domain;\npublic class User {}\n",
            ),
            (
                "com/app/service/UserService.java",
                "package com.app.service;\nimport com.app.domain.User;\nclass UserService { User u; }\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["com/app/service/UserService.java"].dependencies;
        assert_eq!(deps["com/app/domain/User.java"], 1);
    }

    #[test]
    fn drops_jdk_and_test_framework_imports() {
        let files = [(
            "A.java",
            "import java.util.List;\nimport org.junit.Test;\nclass A {}\n",
        )];
        let analysis = analyze(&files);
        assert!(analysis.per_file["A.java"].dependencies.is_empty());
    }

    #[test]
    fn drops_wildcard_imports() {
        let files = [
            ("com/app/domain/User.java", "package com.app.domain;\nclass User {}\n"),
            (
                "com/app/service/S.java",
                "package com.app.service;\nimport com.app.domain.*;\nclass S {}\n",
            ),
        ];
        let analysis = analyze(&files);
        assert!(analysis.per_file["com/app/service/S.java"]
            .dependencies
            .is_empty());
    }

    #[test]
    fn multiple_imports_to_same_file_sum_weight() {
        let mut contents = HashMap::new();
        contents.insert(
            "com/app/domain/Types.java".to_string(),
            "package com.app.domain;\nclass Types {}\n".to_string(),
        );
        contents.insert(
            "com/app/a/A.java".to_string(),
            "package com.app.a;\nimport com.app.domain.Types;\nimport com.app.domain.Types;\nclass A {}\n"
                .to_string(),
        );
        let analyzer = JavaAnalyzer::new().unwrap();
        let paths = vec![
            "com/app/domain/Types.java".to_string(),
            "com/app/a/A.java".to_string(),
        ];
        let analysis = analyzer.analyze_all(&paths, &contents, &AnalyzerOptions::default());
        let deps = &analysis.per_file["com/app/a/A.java"].dependencies;
        assert_eq!(deps["com/app/domain/Types.java"], 2);
    }

    #[test]
    fn complexity_counts_decision_points() {
        let files = [(
            "A.java",
            "class A {\n  int f(int x) {\n    if (x > 0) {\n      return x;\n    }\n    return 0;\n  }\n}\n",
        )];
        let analysis = analyze(&files);
        assert_eq!(analysis.per_file["A.java"].complexity, 2);
    }
}
