use std::collections::HashMap;

use regex::Regex;
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::complexity::{cyclomatic_complexity, Dialect};
use dsm_core::symbols::wildcard_weight;
use dsm_core::types::LanguageTag;

const USING_DIRECTIVE_QUERY_SRC: &str = "(using_directive) @stmt";

enum Using {
    /// `using N.C;` or `using N;` — ambiguous until resolved against the
    /// namespace index.
    Plain(String),
    /// `using static N;` — treated like a namespace using.
    Static(String),
    /// `using A = N.Foo;` — the alias name is recorded but resolution
    /// follows the aliased target.
    Alias(String),
}

fn parse_using(raw: &str) -> Option<Using> {
    let text = raw.trim().trim_end_matches(';').trim();
    let text = text.strip_prefix("global ").unwrap_or(text).trim();
    let rest = text.strip_prefix("using ")?.trim();

    if let Some(ns) = rest.strip_prefix("static ") {
        return Some(Using::Static(ns.trim().to_string()));
    }
    if let Some((_, target)) = rest.split_once('=') {
        return Some(Using::Alias(target.trim().to_string()));
    }
    Some(Using::Plain(rest.to_string()))
}

fn is_excluded(path: &str, root_namespace: &str) -> bool {
    if path.starts_with("System") || path.starts_with("Xunit") || path.starts_with("Moq") {
        return true;
    }
    if path.starts_with("Microsoft.") {
        let is_own = !root_namespace.is_empty()
            && (path == root_namespace || path.starts_with(&format!("{root_namespace}.")));
        return !is_own;
    }
    false
}

fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".cs").unwrap_or(name)
}

fn extract_namespace(content: &str) -> Option<String> {
    let re = Regex::new(r"namespace\s+([A-Za-z_][\w.]*)\s*[{;]").ok()?;
    re.captures(content)
        .map(|c| c.get(1).unwrap().as_str().to_string())
}

/// Names declared by `class`/`struct`/`interface`/`enum`/`record` in a file —
/// the symbols a `using N.*;` wildcard actually brings into scope.
fn extract_type_names(content: &str) -> Vec<String> {
    let re = Regex::new(r"(?:class|struct|interface|enum|record)\s+([A-Za-z_]\w*)")
        .expect("static pattern");
    re.captures_iter(content)
        .map(|c| c.get(1).unwrap().as_str().to_string())
        .collect()
}

/// Per-run index: every file's fully qualified name
/// (`<namespace>.<filename-without-extension>`) and the set of files that
/// live in each namespace.
#[derive(Default)]
struct CsharpIndex {
    fqn_to_file: HashMap<String, String>,
    files_by_namespace: HashMap<String, Vec<String>>,
    namespace_of: HashMap<String, String>,
    exports_by_file: HashMap<String, Vec<String>>,
}

enum Resolution<'a> {
    Named(&'a str),
    Wildcard(Vec<&'a str>),
    None,
}

fn resolve_using<'a>(index: &'a CsharpIndex, path: &str) -> Resolution<'a> {
    if let Some(file) = index.fqn_to_file.get(path) {
        return Resolution::Named(file);
    }
    if let Some(files) = index.files_by_namespace.get(path) {
        return Resolution::Wildcard(files.iter().map(String::as_str).collect());
    }
    Resolution::None
}

pub struct CsharpAnalyzer {
    language: Language,
    using_query: Query,
}

impl CsharpAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let language: Language = tree_sitter_c_sharp::LANGUAGE.into();
        let using_query = Query::new(&language, USING_DIRECTIVE_QUERY_SRC)?;
        Ok(Self {
            language,
            using_query,
        })
    }

    fn parse(&self, content: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).ok()?;
        parser.parse(content, None)
    }

    fn using_directives(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<Using> {
        let mut cursor = QueryCursor::new();
        let mut directives = Vec::new();
        let mut matches = cursor.matches(&self.using_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let raw = &content[capture.node.byte_range()];
                if let Some(using) = parse_using(raw) {
                    directives.push(using);
                }
            }
        }
        directives
    }
}

impl LanguageAnalyzer for CsharpAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Csharp
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let mut index = CsharpIndex::default();
        let mut trees: HashMap<String, tree_sitter::Tree> = HashMap::new();
        let mut namespace_counts: HashMap<String, u32> = HashMap::new();

        for path in files {
            let Some(content) = contents.get(path) else {
                continue;
            };
            let Some(tree) = self.parse(content) else {
                result
                    .parse_errors
                    .push((path.clone(), "failed to parse C# source".to_string()));
                continue;
            };
            let namespace = extract_namespace(content).unwrap_or_default();
            let stem = file_stem(path);
            let fqn = if namespace.is_empty() {
                stem.to_string()
            } else {
                format!("{namespace}.{stem}")
            };
            index.fqn_to_file.insert(fqn, path.clone());
            index
                .exports_by_file
                .insert(path.clone(), extract_type_names(content));
            if !namespace.is_empty() {
                index
                    .files_by_namespace
                    .entry(namespace.clone())
                    .or_default()
                    .push(path.clone());
                *namespace_counts.entry(namespace.clone()).or_insert(0) += 1;
                let root = namespace.split('.').next().unwrap_or(&namespace).to_string();
                index.namespace_of.insert(path.clone(), root);
            }
            trees.insert(path.clone(), tree);
        }

        // Heuristic "project root namespace": the most
        // common top-level namespace segment across indexed files.
        let root_namespace = index
            .namespace_of
            .values()
            .fold(HashMap::<&str, u32>::new(), |mut acc, ns| {
                *acc.entry(ns.as_str()).or_insert(0) += 1;
                acc
            })
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(ns, _)| ns.to_string())
            .unwrap_or_default();

        for path in files {
            let Some(tree) = trees.get(path) else {
                continue;
            };
            let content = &contents[path];
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for using in self.using_directives(tree, content) {
                let target_path = match &using {
                    Using::Plain(p) | Using::Static(p) | Using::Alias(p) => p.clone(),
                };
                if is_excluded(&target_path, &root_namespace) {
                    continue;
                }
                match resolve_using(&index, &target_path) {
                    Resolution::Named(target) => {
                        if target != path {
                            *dependencies.entry(target.to_string()).or_insert(0) += 1;
                        }
                    }
                    Resolution::Wildcard(targets) => {
                        for target in targets {
                            if target == path {
                                continue;
                            }
                            let weight = if !opts.symbol_counting {
                                1
                            } else {
                                let exports = index
                                    .exports_by_file
                                    .get(target)
                                    .map(Vec::as_slice)
                                    .unwrap_or(&[]);
                                wildcard_weight(content, exports)
                            };
                            *dependencies.entry(target.to_string()).or_insert(0) += weight;
                        }
                    }
                    Resolution::None => {}
                }
            }

            let complexity = cyclomatic_complexity(
                content,
                Dialect::CLike {
                    extra_keywords: &["foreach"],
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

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(files: &[(&str, &str)]) -> LanguageAnalysis {
        let analyzer = CsharpAnalyzer::new().unwrap();
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        let contents: HashMap<String, String> = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        analyzer.analyze_all(&paths, &contents, &AnalyzerOptions::default())
    }

    #[test]
    fn namespace_using_weight_counts_occurrences() {
        let files = [
            (
                "Core/Entities/Basket.cs",
                "namespace MyApp.Core.Entities;\npublic class Basket {}\n",
            ),
            (
                "Web/Controller.cs",
                "using MyApp.Core.Entities;\nclass C { Basket b; Basket f() => new Basket(); }\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["Web/Controller.cs"].dependencies;
        assert_eq!(deps["Core/Entities/Basket.cs"], 3);
    }

    #[test]
    fn fqn_using_resolves_to_single_file_with_weight_one() {
        let files = [
            (
                "Core/Entities/Basket.cs",
                "namespace MyApp.Core.Entities;\npublic class Basket {}\n",
            ),
            (
                "Web/Controller.cs",
                "using MyApp.Core.Entities.Basket;\nclass C {}\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["Web/Controller.cs"].dependencies;
        assert_eq!(deps["Core/Entities/Basket.cs"], 1);
    }

    #[test]
    fn drops_system_and_test_framework_usings() {
        let files = [(
            "A.cs",
            "using System;\nusing System.Collections.Generic;\nusing Xunit;\nclass A {}\n",
        )];
        let analysis = analyze(&files);
        assert!(analysis.per_file["A.cs"].dependencies.is_empty());
    }

    #[test]
    fn own_microsoft_prefixed_namespace_is_not_excluded() {
        let files = [
            (
                "Lib/Widget.cs",
                "namespace Microsoft.Contoso.Lib;\npublic class Widget {}\n",
            ),
            (
                "App/Program.cs",
                "namespace Microsoft.Contoso.App;\nusing Microsoft.Contoso.Lib;\nclass P { Widget w; }\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["App/Program.cs"].dependencies;
        assert_eq!(deps["Lib/Widget.cs"], 1);
    }

    #[test]
    fn wildcard_weight_uses_declared_type_name_not_filename() {
        let files = [
            (
                "Core/Entities/Basket.cs",
                "namespace MyApp.Core.Entities;\npublic class ShoppingCart {}\n",
            ),
            (
                "Web/Controller.cs",
                "using MyApp.Core.Entities;\nclass C { ShoppingCart a; ShoppingCart b; }\n",
            ),
        ];
        let analysis = analyze(&files);
        let deps = &analysis.per_file["Web/Controller.cs"].dependencies;
        assert_eq!(deps["Core/Entities/Basket.cs"], 2);
    }

    #[test]
    fn complexity_counts_foreach_as_decision_point() {
        let files = [(
            "A.cs",
            "class A { void M(int[] xs) { foreach (var x in xs) { } } }",
        )];
        let analysis = analyze(&files);
        assert_eq!(analysis.per_file["A.cs"].complexity, 2);
    }
}
